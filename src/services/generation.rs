use crate::core::error::WizardError;
use crate::core::script::{parse_script_payload, Script};
use crate::core::settings::{Language, Mode, PodcastSettings, ScriptLength};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON body of `/api/generate_podcast_script`. Keys follow the backend's
/// payload names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateScriptRequest {
    pub content: String,
    #[serde(rename = "podcast_title")]
    pub title: String,
    #[serde(rename = "next_episode_preview")]
    pub preview: String,
    #[serde(rename = "podcast_mode")]
    pub mode: Mode,
    pub language: Language,
    #[serde(rename = "scriptLength")]
    pub script_length: ScriptLength,
    #[serde(rename = "role1_name", skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,
    #[serde(rename = "role1_style", skip_serializing_if = "Option::is_none")]
    pub role_style: Option<String>,
    #[serde(rename = "roleA_name", skip_serializing_if = "Option::is_none")]
    pub role_a_name: Option<String>,
    #[serde(rename = "roleA_style", skip_serializing_if = "Option::is_none")]
    pub role_a_style: Option<String>,
    #[serde(rename = "roleB_name", skip_serializing_if = "Option::is_none")]
    pub role_b_name: Option<String>,
    #[serde(rename = "roleB_style", skip_serializing_if = "Option::is_none")]
    pub role_b_style: Option<String>,
}

impl GenerateScriptRequest {
    /// Combines normalized content with the settings. Only the role fields of
    /// the active mode are sent, with blank names already resolved.
    pub fn build(content: &str, settings: &PodcastSettings) -> Result<Self, WizardError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(WizardError::validation(
                "No content to generate from; extract a file or URL first",
            ));
        }

        let labels = settings.role_labels();
        let mut request = Self {
            content: content.to_string(),
            title: settings.title.trim().to_string(),
            preview: settings.preview.trim().to_string(),
            mode: settings.mode,
            language: settings.language,
            script_length: settings.script_length,
            role_name: None,
            role_style: None,
            role_a_name: None,
            role_a_style: None,
            role_b_name: None,
            role_b_style: None,
        };
        match settings.mode {
            Mode::Single => {
                request.role_name = labels.first().cloned();
                request.role_style = Some(settings.role1.style.trim().to_string());
            }
            Mode::Double => {
                request.role_a_name = labels.first().cloned();
                request.role_a_style = Some(settings.role_a.style.trim().to_string());
                request.role_b_name = labels.get(1).cloned();
                request.role_b_style = Some(settings.role_b.style.trim().to_string());
            }
        }
        Ok(request)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateScriptResponse {
    #[serde(default)]
    pub podcast_script: Value,
    #[serde(default)]
    pub error: Option<String>,
}

impl GenerateScriptResponse {
    /// The decoded script plus the server-reported error, if any. A reported
    /// error always yields an empty script.
    pub fn into_script(self, settings: &PodcastSettings) -> (Script, Option<String>) {
        if let Some(err) = self.error.filter(|e| !e.trim().is_empty()) {
            warn!("Script generation reported an error: {}", err);
            return (Script::default(), Some(err));
        }
        let mut script = parse_script_payload(&self.podcast_script);
        if let Some(first) = settings.role_labels().first() {
            script.fill_blank_roles(first);
        }
        (script, None)
    }
}
