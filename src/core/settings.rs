use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Zh,
    En,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::Zh => "zh",
            Language::En => "en",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Single,
    Double,
}

impl Mode {
    pub fn code(&self) -> &'static str {
        match self {
            Mode::Single => "single",
            Mode::Double => "double",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl ScriptLength {
    pub fn code(&self) -> &'static str {
        match self {
            ScriptLength::Short => "short",
            ScriptLength::Medium => "medium",
            ScriptLength::Long => "long",
        }
    }
}

macro_rules! display_code {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.code())
            }
        })*
    };
}

display_code!(Language, Mode, ScriptLength);

/// Name and speaking style of one narrator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoleProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub style: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodcastSettings {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub preview: String,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub script_length: ScriptLength,
    /// Narrator in single mode.
    #[serde(default = "default_role1")]
    pub role1: RoleProfile,
    /// Narrators in double mode.
    #[serde(default = "default_partner")]
    pub role_a: RoleProfile,
    #[serde(default = "default_partner")]
    pub role_b: RoleProfile,
}

pub const DEFAULT_HOST_STYLE: &str = "专业";
pub const DEFAULT_PARTNER_STYLE: &str = "温和";

impl RoleProfile {
    fn styled(style: &str) -> Self {
        Self {
            name: String::new(),
            style: style.to_string(),
        }
    }
}

fn default_role1() -> RoleProfile {
    RoleProfile::styled(DEFAULT_HOST_STYLE)
}

fn default_partner() -> RoleProfile {
    RoleProfile::styled(DEFAULT_PARTNER_STYLE)
}

impl Default for PodcastSettings {
    fn default() -> Self {
        Self {
            title: String::new(),
            preview: String::new(),
            language: Language::default(),
            mode: Mode::default(),
            script_length: ScriptLength::default(),
            role1: default_role1(),
            role_a: default_partner(),
            role_b: default_partner(),
        }
    }
}

/// One edit from the settings form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsField {
    Title(String),
    Preview(String),
    Language(Language),
    Mode(Mode),
    ScriptLength(ScriptLength),
    Role1Name(String),
    Role1Style(String),
    RoleAName(String),
    RoleAStyle(String),
    RoleBName(String),
    RoleBStyle(String),
}

impl SettingsField {
    pub fn touches_role_name(&self) -> bool {
        matches!(
            self,
            SettingsField::Role1Name(_) | SettingsField::RoleAName(_) | SettingsField::RoleBName(_)
        )
    }
}

impl PodcastSettings {
    /// Returns the full record with one field replaced.
    pub fn with(self, field: SettingsField) -> Self {
        let mut next = self;
        match field {
            SettingsField::Title(v) => next.title = v,
            SettingsField::Preview(v) => next.preview = v,
            SettingsField::Language(v) => next.language = v,
            SettingsField::Mode(v) => next.mode = v,
            SettingsField::ScriptLength(v) => next.script_length = v,
            SettingsField::Role1Name(v) => next.role1.name = v,
            SettingsField::Role1Style(v) => next.role1.style = v,
            SettingsField::RoleAName(v) => next.role_a.name = v,
            SettingsField::RoleAStyle(v) => next.role_a.style = v,
            SettingsField::RoleBName(v) => next.role_b.name = v,
            SettingsField::RoleBStyle(v) => next.role_b.style = v,
        }
        next
    }

    /// Display labels of the active roles, blank names replaced by the
    /// locale default. One label in single mode, two in double mode.
    pub fn role_labels(&self) -> Vec<String> {
        let pick = |name: &str, fallback: &str| {
            let name = name.trim();
            if name.is_empty() {
                fallback.to_string()
            } else {
                name.to_string()
            }
        };
        match (self.mode, self.language) {
            (Mode::Single, Language::Zh) => vec![pick(&self.role1.name, "主播")],
            (Mode::Single, Language::En) => vec![pick(&self.role1.name, "Host")],
            (Mode::Double, Language::Zh) => vec![
                pick(&self.role_a.name, "角色A"),
                pick(&self.role_b.name, "角色B"),
            ],
            (Mode::Double, Language::En) => vec![
                pick(&self.role_a.name, "HostA"),
                pick(&self.role_b.name, "HostB"),
            ],
        }
    }
}
