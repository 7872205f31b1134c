use crate::core::error::WizardError;
use std::path::Path;

pub const MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

/// Accepted uploads: extension and MIME type.
pub const ALLOWED_TYPES: [(&str, &str); 4] = [
    ("pdf", "application/pdf"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("doc", "application/msword"),
    ("txt", "text/plain"),
];

pub fn mime_for_name(name: &str) -> Option<&'static str> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    ALLOWED_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

fn is_allowed_mime(mime: &str) -> bool {
    // "text/plain; charset=utf-8" -> "text/plain"
    let essence = mime.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    ALLOWED_TYPES.iter().any(|(_, m)| *m == essence)
}

/// An upload that passed client-side checks.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    /// `mime` is what the caller reported (e.g. a browser `File.type`); when
    /// missing or blank it is inferred from the file name.
    pub fn new(name: &str, bytes: Vec<u8>, mime: Option<&str>) -> Result<Self, WizardError> {
        let mime = match mime.map(str::trim).filter(|m| !m.is_empty()) {
            Some(m) => m.to_string(),
            None => mime_for_name(name)
                .ok_or_else(|| unsupported(name))?
                .to_string(),
        };
        if !is_allowed_mime(&mime) {
            return Err(unsupported(name));
        }
        check_size(bytes.len())?;
        Ok(Self {
            name: name.to_string(),
            mime,
            bytes,
        })
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub async fn from_path(path: &Path) -> Result<Self, WizardError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| WizardError::validation("Please choose a file"))?;
        let read_error =
            |e: std::io::Error| WizardError::validation(format!("Cannot read {}: {}", path.display(), e));

        // Size first, so oversized files are never read into memory.
        let meta = tokio::fs::metadata(path).await.map_err(read_error)?;
        check_size(usize::try_from(meta.len()).unwrap_or(usize::MAX))?;
        if mime_for_name(&name).is_none() {
            return Err(unsupported(&name));
        }

        let bytes = tokio::fs::read(path).await.map_err(read_error)?;
        Self::new(&name, bytes, None)
    }
}

fn unsupported(name: &str) -> WizardError {
    WizardError::validation(format!(
        "Unsupported file type: {} (allowed: PDF, DOCX, DOC, TXT)",
        name
    ))
}

fn check_size(len: usize) -> Result<(), WizardError> {
    if len >= MAX_FILE_BYTES {
        return Err(WizardError::validation("File must be smaller than 10 MB"));
    }
    Ok(())
}

pub fn validate_url(url: &str) -> Result<String, WizardError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(WizardError::validation("Please enter a URL"));
    }
    Ok(url.to_string())
}

#[derive(Debug, Clone)]
pub enum SourceInput {
    File(SourceFile),
    Url(String),
}

impl SourceInput {
    pub fn url(url: &str) -> Result<Self, WizardError> {
        validate_url(url).map(SourceInput::Url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_inferred_from_extension() {
        assert_eq!(mime_for_name("notes.TXT"), Some("text/plain"));
        assert_eq!(mime_for_name("paper.pdf"), Some("application/pdf"));
        assert_eq!(mime_for_name("image.png"), None);
        assert_eq!(mime_for_name("README"), None);
    }

    #[test]
    fn test_accepts_allowed_files() {
        let f = SourceFile::new("a.txt", b"hello".to_vec(), None).unwrap();
        assert_eq!(f.mime, "text/plain");

        let f = SourceFile::new("blob", vec![0; 10], Some("application/pdf")).unwrap();
        assert_eq!(f.mime, "application/pdf");

        assert!(SourceFile::new("a.txt", vec![], Some("text/plain; charset=utf-8")).is_ok());
    }

    #[test]
    fn test_rejects_type_and_size() {
        let err = SourceFile::new("a.png", vec![1], None).unwrap_err();
        assert!(matches!(err, WizardError::Validation(_)));

        let err = SourceFile::new("a.txt", vec![1], Some("image/png")).unwrap_err();
        assert!(err.to_string().contains("Unsupported"));

        let err = SourceFile::new("big.txt", vec![0; MAX_FILE_BYTES], None).unwrap_err();
        assert_eq!(err.to_string(), "File must be smaller than 10 MB");

        assert!(SourceFile::new("ok.txt", vec![0; MAX_FILE_BYTES - 1], None).is_ok());
    }

    #[test]
    fn test_url_must_not_be_blank() {
        assert!(validate_url("   ").is_err());
        assert_eq!(validate_url(" https://example.com/a ").unwrap(), "https://example.com/a");
    }

    #[tokio::test]
    async fn test_from_path_checks_before_reading() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let ok = dir.path().join("episode.txt");
        std::fs::write(&ok, "Hello world")?;
        let file = SourceFile::from_path(&ok).await?;
        assert_eq!(file.name, "episode.txt");
        assert_eq!(file.bytes, b"Hello world");

        let bad = dir.path().join("episode.mp4");
        std::fs::write(&bad, "x")?;
        assert!(SourceFile::from_path(&bad).await.is_err());

        assert!(SourceFile::from_path(&dir.path().join("missing.txt")).await.is_err());
        Ok(())
    }
}
