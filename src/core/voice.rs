use crate::core::error::WizardError;
use crate::core::settings::Mode;
use serde::{Deserialize, Serialize};

pub const SPEED_RANGE: (f32, f32) = (0.5, 2.0);
pub const VOLUME_RANGE: (f32, f32) = (0.5, 2.0);
pub const PITCH_RANGE: (i32, i32) = (-12, 12);
pub const DEFAULT_EMOTION: &str = "neutral";
pub const EMOTIONS: [&str; 7] = [
    "neutral",
    "happy",
    "sad",
    "angry",
    "fearful",
    "disgusted",
    "surprised",
];

/// Entry of `/api/available_voices`. Older backends use `voice_id` and
/// `voice_name` instead of `value` and `label`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    #[serde(alias = "voice_id")]
    pub value: String,
    #[serde(alias = "voice_name", default)]
    pub label: String,
}

impl Voice {
    pub fn display_name(&self) -> &str {
        if self.label.is_empty() {
            &self.value
        } else {
            &self.label
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoiceCatalogResponse {
    #[serde(default)]
    pub voices: Vec<Voice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceParams {
    #[serde(default)]
    pub voice: String,
    #[serde(default = "default_ratio")]
    pub speed: f32,
    #[serde(default = "default_ratio")]
    pub volume: f32,
    #[serde(default)]
    pub pitch: i32,
    #[serde(default = "default_emotion")]
    pub emotion: String,
}

fn default_ratio() -> f32 {
    1.0
}

fn default_emotion() -> String {
    DEFAULT_EMOTION.to_string()
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            voice: String::new(),
            speed: default_ratio(),
            volume: default_ratio(),
            pitch: 0,
            emotion: default_emotion(),
        }
    }
}

impl VoiceParams {
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed.clamp(SPEED_RANGE.0, SPEED_RANGE.1);
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(VOLUME_RANGE.0, VOLUME_RANGE.1);
    }

    pub fn set_pitch(&mut self, pitch: i32) {
        self.pitch = pitch.clamp(PITCH_RANGE.0, PITCH_RANGE.1);
    }

    /// Form fields for this role. Single mode uses bare names; double mode
    /// uses `roleAVoice`, `speedA` and so on.
    fn form_fields(&self, voice_key: &str, suffix: &str) -> Vec<(String, String)> {
        vec![
            (voice_key.to_string(), self.voice.clone()),
            (format!("speed{}", suffix), self.speed.to_string()),
            (format!("volume{}", suffix), self.volume.to_string()),
            (format!("pitch{}", suffix), self.pitch.to_string()),
            (format!("emotion{}", suffix), self.emotion.clone()),
        ]
    }
}

/// Voice parameters for the narrator (`role1`, also role A) and the second
/// host (`role2`, role B in double mode).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TtsParams {
    pub role1: VoiceParams,
    pub role2: VoiceParams,
}

impl TtsParams {
    /// Fills voices that are still empty from a freshly fetched catalog.
    /// Returns true if anything changed.
    pub fn apply_catalog_defaults(&mut self, catalog: &[Voice]) -> bool {
        let Some(first) = catalog.first() else {
            return false;
        };
        let second = catalog.get(1).unwrap_or(first);
        let mut changed = false;
        if self.role1.voice.is_empty() {
            self.role1.voice = first.value.clone();
            changed = true;
        }
        if self.role2.voice.is_empty() {
            self.role2.voice = second.value.clone();
            changed = true;
        }
        changed
    }

    pub fn active_roles(&self, mode: Mode) -> Vec<&VoiceParams> {
        match mode {
            Mode::Single => vec![&self.role1],
            Mode::Double => vec![&self.role1, &self.role2],
        }
    }

    /// Every active role must use a voice from the catalog.
    pub fn validate(&self, mode: Mode, catalog: &[Voice]) -> Result<(), WizardError> {
        for (i, params) in self.active_roles(mode).into_iter().enumerate() {
            if params.voice.is_empty() {
                return Err(WizardError::validation(format!(
                    "Please select a voice for role {}",
                    i + 1
                )));
            }
            if !catalog.iter().any(|v| v.value == params.voice) {
                return Err(WizardError::validation(format!(
                    "Voice '{}' is not available",
                    params.voice
                )));
            }
        }
        Ok(())
    }

    pub fn form_fields(&self, mode: Mode) -> Vec<(String, String)> {
        match mode {
            Mode::Single => self.role1.form_fields("voice", ""),
            Mode::Double => {
                let mut fields = self.role1.form_fields("roleAVoice", "A");
                fields.extend(self.role2.form_fields("roleBVoice", "B"));
                fields
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(ids: &[&str]) -> Vec<Voice> {
        ids.iter()
            .map(|id| Voice {
                value: id.to_string(),
                label: format!("{} voice", id),
            })
            .collect()
    }

    #[test]
    fn test_catalog_fills_empty_voices() {
        let mut params = TtsParams::default();
        assert!(params.apply_catalog_defaults(&catalog(&["v1", "v2", "v3"])));
        assert_eq!(params.role1.voice, "v1");
        assert_eq!(params.role2.voice, "v2");
    }

    #[test]
    fn test_catalog_never_overwrites_selection() {
        let mut params = TtsParams::default();
        params.role1.voice = "mine".to_string();
        params.apply_catalog_defaults(&catalog(&["v1", "v2"]));
        assert_eq!(params.role1.voice, "mine");
        assert_eq!(params.role2.voice, "v2");

        assert!(!params.apply_catalog_defaults(&catalog(&["x", "y"])));
        assert_eq!(params.role2.voice, "v2");
    }

    #[test]
    fn test_single_voice_catalog_reused_for_second_role() {
        let mut params = TtsParams::default();
        params.apply_catalog_defaults(&catalog(&["only"]));
        assert_eq!(params.role2.voice, "only");

        let mut untouched = TtsParams::default();
        assert!(!untouched.apply_catalog_defaults(&[]));
        assert!(untouched.role1.voice.is_empty());
    }

    #[test]
    fn test_setters_clamp() {
        let mut p = VoiceParams::default();
        p.set_speed(3.0);
        p.set_volume(0.1);
        p.set_pitch(-40);
        assert_eq!(p.speed, 2.0);
        assert_eq!(p.volume, 0.5);
        assert_eq!(p.pitch, -12);
    }

    #[test]
    fn test_validate_against_catalog() {
        let voices = catalog(&["v1"]);
        let mut params = TtsParams::default();
        assert!(params.validate(Mode::Single, &voices).is_err());

        params.role1.voice = "v1".to_string();
        assert!(params.validate(Mode::Single, &voices).is_ok());
        // role2 only matters in double mode
        assert!(params.validate(Mode::Double, &voices).is_err());

        params.role2.voice = "gone".to_string();
        let err = params.validate(Mode::Double, &voices).unwrap_err();
        assert_eq!(err.to_string(), "Voice 'gone' is not available");
    }

    #[test]
    fn test_voice_aliases() {
        let v: Voice = serde_json::from_str(r#"{"voice_id": "x1", "voice_name": "Xiao"}"#).unwrap();
        assert_eq!(v.value, "x1");
        assert_eq!(v.display_name(), "Xiao");
    }

    #[test]
    fn test_form_field_names() {
        let params = TtsParams::default();
        let single: Vec<String> = params.form_fields(Mode::Single).into_iter().map(|(k, _)| k).collect();
        assert_eq!(single, vec!["voice", "speed", "volume", "pitch", "emotion"]);

        let double: Vec<String> = params.form_fields(Mode::Double).into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            double,
            vec![
                "roleAVoice", "speedA", "volumeA", "pitchA", "emotionA",
                "roleBVoice", "speedB", "volumeB", "pitchB", "emotionB",
            ]
        );
    }
}
