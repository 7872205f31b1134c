use crate::core::io::Storage;
use crate::core::settings::{PodcastSettings, SettingsField};
use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

pub const ROLE_NAMES_KEY: &str = "role_names.json";

/// Role display names, the only state kept across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoleNames {
    #[serde(default)]
    pub role1: String,
    #[serde(default)]
    pub role_a: String,
    #[serde(default)]
    pub role_b: String,
}

impl RoleNames {
    pub fn from_settings(settings: &PodcastSettings) -> Self {
        Self {
            role1: settings.role1.name.clone(),
            role_a: settings.role_a.name.clone(),
            role_b: settings.role_b.name.clone(),
        }
    }

    /// Copies saved names into `settings`.
    pub fn apply(&self, settings: PodcastSettings) -> PodcastSettings {
        settings
            .with(SettingsField::Role1Name(self.role1.clone()))
            .with(SettingsField::RoleAName(self.role_a.clone()))
            .with(SettingsField::RoleBName(self.role_b.clone()))
    }

    pub async fn load(storage: &dyn Storage) -> Result<Option<Self>> {
        if !storage.exists(ROLE_NAMES_KEY).await? {
            return Ok(None);
        }
        let bytes = storage.read(ROLE_NAMES_KEY).await?;
        let names = serde_json::from_slice(&bytes).context("Failed to parse saved role names")?;
        Ok(Some(names))
    }

    pub async fn save(&self, storage: &dyn Storage) -> Result<()> {
        debug!("Saving role names: {:?}", self);
        let content = serde_json::to_string_pretty(self)?;
        storage.write(ROLE_NAMES_KEY, content.as_bytes()).await
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::core::io::NativeStorage;

    #[tokio::test]
    async fn test_names_survive_reload() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = NativeStorage::new(dir.path());
        assert_eq!(RoleNames::load(&storage).await?, None);

        let settings = PodcastSettings::default()
            .with(SettingsField::RoleAName("Ada".to_string()))
            .with(SettingsField::RoleBName("Grace".to_string()));
        RoleNames::from_settings(&settings).save(&storage).await?;

        let restored = RoleNames::load(&storage).await?.unwrap_or_default();
        let fresh = restored.apply(PodcastSettings::default());
        assert_eq!(fresh.role_a.name, "Ada");
        assert_eq!(fresh.role_b.name, "Grace");
        assert_eq!(fresh.role1.name, "");
        Ok(())
    }
}
