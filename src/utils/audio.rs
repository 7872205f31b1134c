use anyhow::{anyhow, Result};
use std::io::{Cursor, Read, Seek, SeekFrom};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
    Unknown,
}

impl AudioFormat {
    /// Sniffs the container from the first bytes of the payload.
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
            AudioFormat::Wav
        } else if bytes.starts_with(b"ID3") || (bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] & 0xE0 == 0xE0) {
            AudioFormat::Mp3
        } else {
            AudioFormat::Unknown
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 | AudioFormat::Unknown => "mp3",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Mp3 | AudioFormat::Unknown => "audio/mpeg",
        }
    }
}

struct WavInfo {
    fmt_content: Vec<u8>,
    data_size: u32,
}

fn scan_wav(bytes: &[u8]) -> Result<WavInfo> {
    let mut f = Cursor::new(bytes);

    // Check RIFF
    let mut id = [0u8; 4];
    f.read_exact(&mut id)?;
    if &id != b"RIFF" { return Err(anyhow!("Not a RIFF file")); }

    // Skip File Size
    f.seek(SeekFrom::Current(4))?;

    // Check WAVE
    f.read_exact(&mut id)?;
    if &id != b"WAVE" { return Err(anyhow!("Not a WAVE file")); }

    let mut fmt_content: Option<Vec<u8>> = None;
    let mut data_size: Option<u32> = None;

    loop {
        let mut chunk_id = [0u8; 4];
        let n = f.read(&mut chunk_id)?;
        if n == 0 { break; } // EOF
        if n < 4 { return Err(anyhow!("Unexpected EOF reading chunk ID")); }

        let mut size_buf = [0u8; 4];
        f.read_exact(&mut size_buf)?;
        let chunk_size = u32::from_le_bytes(size_buf);

        if &chunk_id == b"fmt " {
            let mut buf = vec![0u8; chunk_size as usize];
            f.read_exact(&mut buf)?;
            fmt_content = Some(buf);
        } else if &chunk_id == b"data" {
            data_size = Some(chunk_size);
            break;
        } else {
            f.seek(SeekFrom::Current(chunk_size as i64))?;
        }
    }

    Ok(WavInfo {
        fmt_content: fmt_content.ok_or_else(|| anyhow!("Missing fmt chunk"))?,
        data_size: data_size.ok_or_else(|| anyhow!("Missing data chunk"))?,
    })
}

/// Duration in seconds of a WAV payload, from its header.
pub fn wav_duration(bytes: &[u8]) -> Result<f64> {
    let info = scan_wav(bytes)?;
    // fmt: format(2) channels(2) sample_rate(4) byte_rate(4) ...
    let byte_rate = info
        .fmt_content
        .get(8..12)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| anyhow!("fmt chunk too short"))?;
    if byte_rate == 0 {
        return Err(anyhow!("Invalid byte rate"));
    }
    Ok(info.data_size as f64 / byte_rate as f64)
}

/// `mm:ss`, or `h:mm:ss` past one hour.
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 { seconds.floor() as u64 } else { 0 };
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    pub(crate) fn create_dummy_wav(size: u32, sample_rate: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_all(b"RIFF").unwrap();
        let total_size = 36 + size;
        buf.write_all(&total_size.to_le_bytes()).unwrap();
        buf.write_all(b"WAVE").unwrap();

        buf.write_all(b"fmt ").unwrap();
        buf.write_all(&16u32.to_le_bytes()).unwrap();
        // PCM (1), Mono (1), SampleRate, ByteRate, BlockAlign (2), Bits (16)
        buf.write_all(&1u16.to_le_bytes()).unwrap();
        buf.write_all(&1u16.to_le_bytes()).unwrap();
        buf.write_all(&sample_rate.to_le_bytes()).unwrap();
        buf.write_all(&(sample_rate * 2).to_le_bytes()).unwrap();
        buf.write_all(&2u16.to_le_bytes()).unwrap();
        buf.write_all(&16u16.to_le_bytes()).unwrap();

        buf.write_all(b"data").unwrap();
        buf.write_all(&size.to_le_bytes()).unwrap();
        buf.write_all(&vec![0u8; size as usize]).unwrap();

        buf
    }

    #[test]
    fn test_wav_duration() -> Result<()> {
        // 2 bytes per sample, mono: 88200 bytes at 22050 Hz = 2 s
        let wav = create_dummy_wav(88_200, 22_050);
        assert_eq!(wav_duration(&wav)?, 2.0);
        assert!(wav_duration(b"ID3 not a wav").is_err());
        Ok(())
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(AudioFormat::detect(&create_dummy_wav(4, 8000)), AudioFormat::Wav);
        assert_eq!(AudioFormat::detect(b"ID3\x04rest"), AudioFormat::Mp3);
        assert_eq!(AudioFormat::detect(&[0xFF, 0xFB, 0x90]), AudioFormat::Mp3);
        assert_eq!(AudioFormat::detect(b"??"), AudioFormat::Unknown);
        assert_eq!(AudioFormat::Unknown.extension(), "mp3");
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0.0), "00:00");
        assert_eq!(format_clock(65.9), "01:05");
        assert_eq!(format_clock(3725.0), "1:02:05");
        assert_eq!(format_clock(f64::NAN), "00:00");
    }
}
