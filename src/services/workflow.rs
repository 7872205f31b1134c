use crate::core::config::Config;
use crate::core::content::{ExtractResponse, ExtractedContent};
use crate::core::error::{RequestKind, WizardError};
use crate::core::io::Storage;
use crate::core::prefs::RoleNames;
use crate::core::script::Script;
use crate::core::settings::SettingsField;
use crate::core::voice::Voice;
use crate::core::wizard::{RequestToken, Step, StepError, SynthesisResult, WizardState};
use crate::services::acquisition::SourceInput;
use crate::services::api::{PodcastBackend, TaskRecord};
use crate::services::generation::{GenerateScriptRequest, GenerateScriptResponse};
use crate::services::synthesis::{AudioSink, SynthesisForm};
use anyhow::Result;
use log::{error, info, warn};
use std::sync::Arc;

/// File name used when the script is exported.
pub const SCRIPT_EXPORT_NAME: &str = "播客脚本.txt";

/// Owns the wizard state and everything it talks to. Each front-end action
/// maps to one method here.
///
/// Network operations come in two flavours: a single `async fn` for callers
/// that can hold `&mut self` across the request (the console wizard), and a
/// `begin_*` / `finish_*` pair for event-driven callers that must not keep
/// the controller borrowed while waiting (the web page).
pub struct WizardController {
    config: Config,
    state: WizardState,
    backend: Arc<dyn PodcastBackend>,
    storage: Arc<dyn Storage>,
    sink: Arc<dyn AudioSink>,
}

impl WizardController {
    /// Starts a session with configured defaults plus any saved role names.
    pub async fn new(
        config: Config,
        backend: Arc<dyn PodcastBackend>,
        storage: Arc<dyn Storage>,
        sink: Arc<dyn AudioSink>,
    ) -> Result<Self> {
        let mut settings = config.initial_settings();
        match RoleNames::load(storage.as_ref()).await {
            Ok(Some(names)) => {
                info!("Restored saved role names");
                settings = names.apply(settings);
            }
            Ok(None) => {}
            Err(e) => warn!("Ignoring saved role names: {:#}", e),
        }

        Ok(Self {
            config,
            state: WizardState::new(settings),
            backend,
            storage,
            sink,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut WizardState {
        &mut self.state
    }

    pub fn backend(&self) -> Arc<dyn PodcastBackend> {
        self.backend.clone()
    }

    pub fn sink(&self) -> Arc<dyn AudioSink> {
        self.sink.clone()
    }

    pub fn storage(&self) -> Arc<dyn Storage> {
        self.storage.clone()
    }

    // --- Navigation ---

    pub fn advance(&mut self) -> Result<Step, StepError> {
        self.state.advance().inspect_err(|e| warn!("{}", e))
    }

    pub fn back(&mut self) -> Step {
        self.state.back()
    }

    pub fn jump_to(&mut self, step: Step) -> Result<Step, StepError> {
        self.state.jump_to(step).inspect_err(|e| warn!("{}", e))
    }

    // --- Settings ---

    /// Applies one settings change and persists role names when they change.
    pub async fn update_settings(&mut self, field: SettingsField) -> Result<()> {
        let persist = field.touches_role_name();
        self.state.update_settings(field);
        if persist {
            RoleNames::from_settings(self.state.settings())
                .save(self.storage.as_ref())
                .await?;
        }
        Ok(())
    }

    // --- Extraction ---

    pub fn begin_extract(&mut self) -> Result<RequestToken, WizardError> {
        self.state.requests.begin(RequestKind::Extract)
    }

    /// Stores the raw content on success and returns its normalized text.
    pub fn finish_extract(
        &mut self,
        token: RequestToken,
        response: Result<ExtractResponse, WizardError>,
    ) -> Result<String, WizardError> {
        let content = match response {
            Ok(ExtractResponse { error: Some(err), .. }) if !err.trim().is_empty() => {
                Err(WizardError::Payload(err))
            }
            Ok(ExtractResponse { content, .. }) => {
                let content = content.unwrap_or(ExtractedContent::Text(String::new()));
                if content.is_empty() {
                    Err(WizardError::Payload("No text could be extracted".to_string()))
                } else {
                    Ok(content)
                }
            }
            Err(e) => Err(e),
        };

        match content {
            Ok(content) => {
                let text = content.normalize();
                if self.state.apply_extraction(token, content) {
                    info!("Extracted {} characters", text.chars().count());
                    Ok(text)
                } else {
                    Err(WizardError::Payload("Extraction was cancelled".to_string()))
                }
            }
            Err(e) => {
                error!("Extraction failed: {}", e);
                self.state.fail(token);
                Err(e)
            }
        }
    }

    pub async fn extract(&mut self, input: SourceInput) -> Result<String, WizardError> {
        let token = self.begin_extract()?;
        let response = fetch_extraction(self.backend.as_ref(), &input).await;
        self.finish_extract(token, response)
    }

    // --- Script generation ---

    pub fn begin_generate(&mut self) -> Result<(RequestToken, GenerateScriptRequest), WizardError> {
        let request =
            GenerateScriptRequest::build(&self.state.normalized_content(), self.state.settings())?;
        let token = self.state.requests.begin(RequestKind::Generate)?;
        Ok((token, request))
    }

    /// Replaces the script. A server-reported error still clears it and is
    /// returned as a payload error.
    pub fn finish_generate(
        &mut self,
        token: RequestToken,
        response: Result<GenerateScriptResponse, WizardError>,
    ) -> Result<&Script, WizardError> {
        let response = match response {
            Ok(r) => r,
            Err(e) => {
                error!("Script generation failed: {}", e);
                self.state.fail(token);
                return Err(e);
            }
        };

        let (script, reported) = response.into_script(self.state.settings());
        if script.is_empty() && reported.is_none() {
            warn!("Script generation returned no usable lines");
        }
        self.state.apply_script(token, script);
        match reported {
            Some(msg) => Err(WizardError::Payload(msg)),
            None => Ok(&self.state.script),
        }
    }

    pub async fn generate_script(&mut self) -> Result<&Script, WizardError> {
        let (token, request) = self.begin_generate()?;
        let response = self.backend.generate_script(&request).await;
        self.finish_generate(token, response)
    }

    /// Text of the current script as the user sees it, for download or copy.
    pub fn export_text(&self) -> Result<String, WizardError> {
        let script = &self.state.script;
        if script.is_empty() {
            return Err(WizardError::validation("There is no script to export"));
        }
        Ok(script.render(self.state.settings().mode))
    }

    /// Writes [`Self::export_text`] into the output folder.
    #[cfg(not(target_arch = "wasm32"))]
    pub async fn export_script(&self) -> Result<std::path::PathBuf> {
        use anyhow::Context;

        let text = self.export_text()?;
        let folder = std::path::Path::new(&self.config.output_folder);
        tokio::fs::create_dir_all(folder).await?;
        let path = folder.join(SCRIPT_EXPORT_NAME);
        tokio::fs::write(&path, text.as_bytes())
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Exported script to {}", path.display());
        Ok(path)
    }

    // --- Voices ---

    pub fn begin_voices(&mut self) -> Result<RequestToken, WizardError> {
        self.state.requests.begin(RequestKind::Voices)
    }

    pub fn finish_voices(
        &mut self,
        token: RequestToken,
        response: Result<Vec<Voice>, WizardError>,
    ) -> Result<&[Voice], WizardError> {
        match response {
            Ok(voices) => {
                info!("Voice catalog has {} entries", voices.len());
                self.state.apply_voices(token, voices);
                Ok(self.state.voices())
            }
            Err(e) => {
                error!("Failed to load voices: {}", e);
                self.state.fail(token);
                Err(e)
            }
        }
    }

    pub async fn load_voices(&mut self) -> Result<&[Voice], WizardError> {
        let token = self.begin_voices()?;
        let response = self.backend.available_voices().await;
        self.finish_voices(token, response)
    }

    // --- Synthesis ---

    pub fn begin_synthesis(&mut self) -> Result<(RequestToken, SynthesisForm), WizardError> {
        let form = SynthesisForm::build(
            &self.state.script,
            self.state.settings(),
            &self.state.tts,
            self.state.voices(),
        )?;
        let token = self.state.requests.begin(RequestKind::Synthesize)?;
        Ok((token, form))
    }

    /// Stores a published result, releasing whatever it replaces. A failure
    /// leaves the previous audio in place.
    pub fn finish_synthesis(
        &mut self,
        token: RequestToken,
        result: Result<SynthesisResult, WizardError>,
    ) -> Result<&SynthesisResult, WizardError> {
        let result = match result {
            Ok(r) => r,
            Err(e) => {
                error!("Synthesis failed: {}", e);
                self.state.fail(token);
                return Err(e);
            }
        };

        if let Some(released) = self.state.apply_synthesis(token, result) {
            self.sink.release(&released.locator);
        }
        self.state
            .audio()
            .ok_or_else(|| WizardError::Payload("Synthesis was cancelled".to_string()))
    }

    pub async fn synthesize(&mut self) -> Result<&SynthesisResult, WizardError> {
        let (token, form) = self.begin_synthesis()?;
        let result = fetch_synthesis(self.backend.as_ref(), self.sink.as_ref(), &form).await;
        self.finish_synthesis(token, result)
    }

    // --- History ---

    pub async fn task_list(&self) -> Result<Vec<TaskRecord>, WizardError> {
        self.backend.task_list().await
    }
}

/// Sends the source to the matching extraction endpoint.
pub async fn fetch_extraction(
    backend: &dyn PodcastBackend,
    input: &SourceInput,
) -> Result<ExtractResponse, WizardError> {
    match input {
        SourceInput::File(file) => backend.extract_file(file).await,
        SourceInput::Url(url) => backend.extract_url(url).await,
    }
}

/// Requests audio and publishes it through `sink`.
pub async fn fetch_synthesis(
    backend: &dyn PodcastBackend,
    sink: &dyn AudioSink,
    form: &SynthesisForm,
) -> Result<SynthesisResult, WizardError> {
    let audio = backend.generate_audio(form).await?;
    let locator = sink.publish(&audio).await.map_err(|e| WizardError::Transport {
        status: None,
        message: format!("{:#}", e),
    })?;
    Ok(SynthesisResult { audio, locator })
}
