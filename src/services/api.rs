use crate::core::config::BackendConfig;
use crate::core::content::ExtractResponse;
use crate::core::error::WizardError;
use crate::core::voice::{Voice, VoiceCatalogResponse};
use crate::services::acquisition::SourceFile;
use crate::services::generation::{GenerateScriptRequest, GenerateScriptResponse};
use crate::services::synthesis::SynthesisForm;
use anyhow::Context;
use async_trait::async_trait;
use log::{debug, info};
use reqwest::{multipart, Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

/// One entry of `/api/task_list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub text_preview: String,
    #[serde(default)]
    pub voice_id: String,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub audio_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaskListResponse {
    #[serde(default)]
    tasks: Vec<TaskRecord>,
}

/// Failure body: `{"error": ..}` or `{"success": false, "message": ..}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ErrorBody {
    /// The reported message, or `raw` itself when it carries none.
    fn message_from(raw: &[u8]) -> String {
        serde_json::from_slice::<ErrorBody>(raw)
            .ok()
            .and_then(|b| b.error.or(b.message))
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| String::from_utf8_lossy(raw).trim().to_string())
    }
}

#[cfg(target_arch = "wasm32")]
pub trait BackendBounds {}
#[cfg(target_arch = "wasm32")]
impl<T> BackendBounds for T {}

#[cfg(not(target_arch = "wasm32"))]
pub trait BackendBounds: Send + Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync> BackendBounds for T {}

/// The podcast backend's HTTP contract.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait PodcastBackend: BackendBounds {
    async fn extract_file(&self, file: &SourceFile) -> Result<ExtractResponse, WizardError>;
    async fn extract_url(&self, url: &str) -> Result<ExtractResponse, WizardError>;
    async fn generate_script(
        &self,
        request: &GenerateScriptRequest,
    ) -> Result<GenerateScriptResponse, WizardError>;
    async fn available_voices(&self) -> Result<Vec<Voice>, WizardError>;
    async fn generate_audio(&self, form: &SynthesisForm) -> Result<Vec<u8>, WizardError>;
    async fn task_list(&self) -> Result<Vec<TaskRecord>, WizardError>;
}

pub struct HttpBackend {
    base: Url,
    client: Client,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> anyhow::Result<Self> {
        let mut base = Url::parse(config.base_url.trim())
            .with_context(|| format!("Invalid backend URL: {}", config.base_url))?;
        // Keep any path prefix when joining "api/..." onto it.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        #[allow(unused_mut)]
        let mut builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        if let Some(secs) = config.timeout_seconds {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }
        let client = builder.build().context("Failed to build HTTP client")?;

        info!("Using podcast backend at {}", base);
        Ok(Self { base, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, WizardError> {
        self.base.join(path).map_err(|e| WizardError::Transport {
            status: None,
            message: format!("Bad endpoint {}: {}", path, e),
        })
    }
}

fn network_error(e: reqwest::Error) -> WizardError {
    WizardError::Transport {
        status: e.status().map(|s| s.as_u16()),
        message: e.to_string(),
    }
}

/// Maps non-2xx responses to transport errors carrying the server's message.
async fn ensure_success(resp: Response) -> Result<Response, WizardError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.bytes().await.unwrap_or_default();
    Err(WizardError::Transport {
        status: Some(status.as_u16()),
        message: ErrorBody::message_from(&body),
    })
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, WizardError> {
    let resp = ensure_success(resp).await?;
    let text = resp.text().await.map_err(network_error)?;
    serde_json::from_str(&text)
        .map_err(|e| WizardError::Payload(format!("Unexpected response ({}): {}", e, text)))
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl PodcastBackend for HttpBackend {
    async fn extract_file(&self, file: &SourceFile) -> Result<ExtractResponse, WizardError> {
        debug!("Uploading {} ({} bytes, {})", file.name, file.bytes.len(), file.mime);
        let part = multipart::Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime)
            .map_err(|e| WizardError::validation(format!("Invalid MIME type: {}", e)))?;
        let form = multipart::Form::new().part("file", part);

        let resp = self
            .client
            .post(self.endpoint("api/extract_file")?)
            .multipart(form)
            .send()
            .await
            .map_err(network_error)?;
        read_json(resp).await
    }

    async fn extract_url(&self, url: &str) -> Result<ExtractResponse, WizardError> {
        debug!("Extracting {}", url);
        let form = multipart::Form::new().text("url", url.to_string());
        let resp = self
            .client
            .post(self.endpoint("api/extract_url")?)
            .multipart(form)
            .send()
            .await
            .map_err(network_error)?;
        read_json(resp).await
    }

    async fn generate_script(
        &self,
        request: &GenerateScriptRequest,
    ) -> Result<GenerateScriptResponse, WizardError> {
        debug!(
            "Requesting {} script ({} chars of content)",
            request.mode,
            request.content.chars().count()
        );
        let resp = self
            .client
            .post(self.endpoint("api/generate_podcast_script")?)
            .json(request)
            .send()
            .await
            .map_err(network_error)?;
        read_json(resp).await
    }

    async fn available_voices(&self) -> Result<Vec<Voice>, WizardError> {
        let resp = self
            .client
            .get(self.endpoint("api/available_voices")?)
            .send()
            .await
            .map_err(network_error)?;
        let catalog: VoiceCatalogResponse = read_json(resp).await?;
        Ok(catalog.voices)
    }

    async fn generate_audio(&self, form: &SynthesisForm) -> Result<Vec<u8>, WizardError> {
        let multipart = form
            .fields
            .iter()
            .fold(multipart::Form::new(), |f, (k, v)| f.text(k.clone(), v.clone()));
        let resp = self
            .client
            .post(self.endpoint("api/generate_audio")?)
            .multipart(multipart)
            .send()
            .await
            .map_err(network_error)?;
        let resp = ensure_success(resp).await?;

        let is_json = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));
        let bytes = resp.bytes().await.map_err(network_error)?;

        // A JSON body instead of audio means the server gave up.
        if is_json {
            return Err(WizardError::Payload(ErrorBody::message_from(&bytes)));
        }
        if bytes.is_empty() {
            return Err(WizardError::Payload("Empty audio response".to_string()));
        }
        debug!("Received {} bytes of audio", bytes.len());
        Ok(bytes.to_vec())
    }

    async fn task_list(&self) -> Result<Vec<TaskRecord>, WizardError> {
        let resp = self
            .client
            .get(self.endpoint("api/task_list")?)
            .send()
            .await
            .map_err(network_error)?;
        let list: TaskListResponse = read_json(resp).await?;
        Ok(list.tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_keep_path_prefix() -> anyhow::Result<()> {
        let backend = HttpBackend::new(&BackendConfig {
            base_url: "http://example.com/podcast".to_string(),
            timeout_seconds: Some(30),
        })?;
        assert_eq!(
            backend.endpoint("api/task_list")?.as_str(),
            "http://example.com/podcast/api/task_list"
        );

        let backend = HttpBackend::new(&BackendConfig::default())?;
        assert_eq!(
            backend.endpoint("api/extract_url")?.as_str(),
            "http://127.0.0.1:8000/api/extract_url"
        );
        Ok(())
    }

    #[test]
    fn test_invalid_base_url() {
        let result = HttpBackend::new(&BackendConfig {
            base_url: "not a url".to_string(),
            timeout_seconds: None,
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_error_body_message() {
        assert_eq!(ErrorBody::message_from(br#"{"error": "voice not loaded"}"#), "voice not loaded");
        assert_eq!(
            ErrorBody::message_from(br#"{"success": false, "message": " tts down "}"#),
            "tts down"
        );
        assert_eq!(
            ErrorBody::message_from(br#"{"error": "first", "message": "second"}"#),
            "first"
        );
        assert_eq!(ErrorBody::message_from(br#"{"success": false}"#), r#"{"success": false}"#);
        assert_eq!(ErrorBody::message_from(b"Bad Gateway\n"), "Bad Gateway");
    }

    #[test]
    fn test_task_record_optional_fields() {
        let list: TaskListResponse = serde_json::from_str(
            r#"{"tasks": [{"status": "done", "created_at": "2024-05-01 10:00", "text_preview": "Hi", "voice_id": "v1"}]}"#,
        )
        .unwrap();
        assert_eq!(list.tasks[0].duration, None);
        assert_eq!(list.tasks[0].audio_url, None);
    }
}
