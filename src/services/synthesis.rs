use crate::core::config::SynthesisConfig;
use crate::core::error::WizardError;
use crate::core::script::Script;
use crate::core::settings::{Mode, PodcastSettings};
use crate::core::voice::{TtsParams, Voice};
use crate::utils::audio::{format_clock, AudioFormat};
use anyhow::Result;
use async_trait::async_trait;

// --- Request ---

/// Multipart fields of `/api/generate_audio`, in sending order.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisForm {
    pub fields: Vec<(String, String)>,
}

impl SynthesisForm {
    pub fn build(
        script: &Script,
        settings: &PodcastSettings,
        tts: &TtsParams,
        catalog: &[Voice],
    ) -> Result<Self, WizardError> {
        let text = script.synthesis_text(settings.mode);
        if text.trim().is_empty() {
            return Err(WizardError::validation("The script is empty"));
        }
        tts.validate(settings.mode, catalog)?;

        let mut fields = vec![
            ("text".to_string(), text),
            ("mode".to_string(), settings.mode.to_string()),
            ("language".to_string(), settings.language.to_string()),
        ];
        // The backend routes each double-mode line by matching its role.
        if settings.mode == Mode::Double {
            let labels = settings.role_labels();
            for (key, label) in ["roleAName", "roleBName"].into_iter().zip(labels) {
                fields.push((key.to_string(), label));
            }
        }
        fields.extend(tts.form_fields(settings.mode));
        Ok(Self { fields })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

// --- Progress ---

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressState {
    Running,
    Done,
    Failed(String),
}

/// Timer-driven progress. The backend reports nothing, so the bar creeps up
/// to `cap` and only reaches 100 when the audio arrives.
#[derive(Debug, Clone)]
pub struct ProgressTicker {
    percent: f32,
    step: f32,
    cap: f32,
    state: ProgressState,
}

impl ProgressTicker {
    pub fn new(config: &SynthesisConfig) -> Self {
        Self {
            percent: 0.0,
            step: config.progress_step.max(0.0),
            cap: config.progress_cap.clamp(0.0, 99.0),
            state: ProgressState::Running,
        }
    }

    pub fn tick(&mut self) -> f32 {
        if self.state == ProgressState::Running {
            self.percent = (self.percent + self.step).min(self.cap);
        }
        self.percent
    }

    pub fn complete(&mut self) {
        self.percent = 100.0;
        self.state = ProgressState::Done;
    }

    pub fn fail(&mut self, error: &WizardError) {
        self.state = ProgressState::Failed(error.to_string());
    }

    pub fn percent(&self) -> f32 {
        self.percent
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    pub fn label(&self) -> String {
        match &self.state {
            ProgressState::Running => format!("Synthesizing... {:.0}%", self.percent),
            ProgressState::Done => "Synthesis complete".to_string(),
            ProgressState::Failed(msg) => format!("Synthesis failed: {}", msg),
        }
    }
}

// --- Audio handles ---

#[cfg(target_arch = "wasm32")]
pub trait SinkBounds {}
#[cfg(target_arch = "wasm32")]
impl<T> SinkBounds for T {}

#[cfg(not(target_arch = "wasm32"))]
pub trait SinkBounds: Send + Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync> SinkBounds for T {}

/// Turns synthesized bytes into something playable and releases it again
/// once a newer result replaces it.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait AudioSink: SinkBounds {
    async fn publish(&self, audio: &[u8]) -> Result<String>;
    fn release(&self, locator: &str);
}

/// Writes each result into the output folder. Files are the user's
/// downloads, so release keeps them.
#[cfg(not(target_arch = "wasm32"))]
pub struct FileAudioSink {
    folder: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileAudioSink {
    pub fn new(folder: impl Into<std::path::PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[async_trait]
impl AudioSink for FileAudioSink {
    async fn publish(&self, audio: &[u8]) -> Result<String> {
        use anyhow::Context;

        let format = AudioFormat::detect(audio);
        let stamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let path = self
            .folder
            .join(format!("podcast_{}.{}", stamp, format.extension()));
        tokio::fs::create_dir_all(&self.folder).await?;
        tokio::fs::write(&path, audio)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Saved audio to {}", path.display());
        Ok(path.to_string_lossy().to_string())
    }

    fn release(&self, _locator: &str) {}
}

/// Blob object URLs for the `<audio>` element.
#[cfg(target_arch = "wasm32")]
pub struct ObjectUrlSink;

#[cfg(target_arch = "wasm32")]
#[async_trait(?Send)]
impl AudioSink for ObjectUrlSink {
    async fn publish(&self, audio: &[u8]) -> Result<String> {
        use anyhow::anyhow;
        use wasm_bindgen::JsValue;

        let format = AudioFormat::detect(audio);
        let array = js_sys::Uint8Array::from(audio);
        let parts = js_sys::Array::new();
        parts.push(&JsValue::from(array));
        let options = web_sys::BlobPropertyBag::new();
        options.set_type(format.mime());
        let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &options)
            .map_err(|e| anyhow!("Blob error: {:?}", e))?;
        web_sys::Url::create_object_url_with_blob(&blob)
            .map_err(|e| anyhow!("Object URL error: {:?}", e))
    }

    fn release(&self, locator: &str) {
        if let Err(e) = web_sys::Url::revoke_object_url(locator) {
            log::warn!("Failed to revoke {}: {:?}", locator, e);
        }
    }
}

// --- Playback ---

/// Transport state of the audio player, driven by the element's
/// `timeupdate` / `loadedmetadata` / `ended` events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Playback {
    playing: bool,
    position: f64,
    duration: Option<f64>,
}

impl Playback {
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// Returns the new playing state.
    pub fn toggle(&mut self) -> bool {
        self.playing = !self.playing;
        self.playing
    }

    /// Clamps the target into the known duration and returns it.
    pub fn seek(&mut self, seconds: f64) -> f64 {
        let upper = self.duration.unwrap_or(f64::MAX);
        self.position = if seconds.is_finite() { seconds.clamp(0.0, upper) } else { 0.0 };
        self.position
    }

    pub fn on_loaded(&mut self, duration: f64) {
        self.duration = (duration.is_finite() && duration > 0.0).then_some(duration);
        self.position = 0.0;
    }

    pub fn on_time_update(&mut self, position: f64) {
        self.position = position.max(0.0);
    }

    pub fn on_ended(&mut self) {
        self.playing = false;
        self.position = self.duration.unwrap_or(self.position);
    }

    /// `elapsed / total`, e.g. `00:12 / 03:04`.
    pub fn display(&self) -> String {
        format!(
            "{} / {}",
            format_clock(self.position),
            self.duration.map(format_clock).unwrap_or_else(|| "--:--".to_string())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::script::ScriptLine;
    use crate::core::settings::{Language, SettingsField};

    fn catalog() -> Vec<Voice> {
        vec![
            Voice { value: "v1".to_string(), label: "One".to_string() },
            Voice { value: "v2".to_string(), label: "Two".to_string() },
        ]
    }

    #[test]
    fn test_form_for_double_mode() {
        let script = Script::new(vec![
            ScriptLine::new("HostA", "Hi"),
            ScriptLine::new("HostB", ""),
            ScriptLine::new("HostB", "Hello"),
        ]);
        let settings = PodcastSettings::default()
            .with(SettingsField::Mode(Mode::Double))
            .with(SettingsField::Language(Language::En));
        let mut tts = TtsParams::default();
        tts.apply_catalog_defaults(&catalog());
        tts.role2.set_pitch(3);

        let form = SynthesisForm::build(&script, &settings, &tts, &catalog()).unwrap();
        assert_eq!(form.get("text"), Some("HostA：Hi\n\nHostB：Hello"));
        assert_eq!(form.get("mode"), Some("double"));
        assert_eq!(form.get("language"), Some("en"));
        assert_eq!(form.get("roleAName"), Some("HostA"));
        assert_eq!(form.get("roleBName"), Some("HostB"));
        assert_eq!(form.get("roleAVoice"), Some("v1"));
        assert_eq!(form.get("roleBVoice"), Some("v2"));
        assert_eq!(form.get("pitchB"), Some("3"));
        assert_eq!(form.get("speedA"), Some("1"));
        assert_eq!(form.get("voice"), None);
    }

    #[test]
    fn test_double_form_names_follow_settings() {
        let script = Script::new(vec![ScriptLine::new("角色A", "你好")]);
        let settings = PodcastSettings::default()
            .with(SettingsField::Mode(Mode::Double))
            .with(SettingsField::RoleBName("小林".to_string()));
        let mut tts = TtsParams::default();
        tts.apply_catalog_defaults(&catalog());

        let form = SynthesisForm::build(&script, &settings, &tts, &catalog()).unwrap();
        assert_eq!(form.get("roleAName"), Some("角色A"));
        assert_eq!(form.get("roleBName"), Some("小林"));
    }

    #[test]
    fn test_form_rejects_empty_script_and_missing_voice() {
        let settings = PodcastSettings::default().with(SettingsField::Mode(Mode::Single));
        let empty = Script::new(vec![ScriptLine::new("主播", " ")]);
        let mut tts = TtsParams::default();
        assert!(SynthesisForm::build(&empty, &settings, &tts, &catalog()).is_err());

        let script = Script::new(vec![ScriptLine::new("主播", "大家好")]);
        assert!(SynthesisForm::build(&script, &settings, &tts, &catalog()).is_err());

        tts.role1.voice = "v2".to_string();
        let form = SynthesisForm::build(&script, &settings, &tts, &catalog()).unwrap();
        assert_eq!(form.get("voice"), Some("v2"));
        assert_eq!(form.get("text"), Some("大家好"));
        assert_eq!(form.get("roleAName"), None);
    }

    #[test]
    fn test_progress_caps_until_complete() {
        let mut ticker = ProgressTicker::new(&SynthesisConfig {
            progress_interval_ms: 10,
            progress_step: 40.0,
            progress_cap: 95.0,
        });
        assert_eq!(ticker.tick(), 40.0);
        assert_eq!(ticker.tick(), 80.0);
        assert_eq!(ticker.tick(), 95.0);
        assert_eq!(ticker.tick(), 95.0);
        ticker.complete();
        assert_eq!(ticker.percent(), 100.0);
        assert_eq!(ticker.label(), "Synthesis complete");
    }

    #[test]
    fn test_progress_failure_freezes_and_reports() {
        let mut ticker = ProgressTicker::new(&SynthesisConfig::default());
        ticker.tick();
        ticker.fail(&WizardError::Transport {
            status: Some(500),
            message: String::new(),
        });
        assert_eq!(ticker.tick(), 5.0);
        assert_eq!(ticker.label(), "Synthesis failed: HTTP 500");
    }

    #[test]
    fn test_playback_transport() {
        let mut p = Playback::default();
        assert_eq!(p.display(), "00:00 / --:--");
        p.on_loaded(184.0);
        assert!(p.toggle());
        p.on_time_update(12.4);
        assert_eq!(p.display(), "00:12 / 03:04");
        assert_eq!(p.seek(500.0), 184.0);
        assert_eq!(p.seek(-3.0), 0.0);
        p.on_ended();
        assert!(!p.is_playing());
        assert_eq!(p.position(), 184.0);
    }

    #[tokio::test]
    async fn test_file_sink_writes_detected_extension() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let sink = FileAudioSink::new(dir.path());
        let wav = crate::utils::audio::tests::create_dummy_wav(8, 8000);
        let path = sink.publish(&wav).await?;
        assert!(path.ends_with(".wav"));
        assert_eq!(std::fs::read(&path)?, wav);
        sink.release(&path);
        assert!(std::path::Path::new(&path).exists());
        Ok(())
    }
}
