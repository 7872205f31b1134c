use anyhow::Result;
use async_trait::async_trait;

#[cfg(target_arch = "wasm32")]
pub trait StorageBounds {}
#[cfg(target_arch = "wasm32")]
impl<T> StorageBounds for T {}

#[cfg(not(target_arch = "wasm32"))]
pub trait StorageBounds: Send + Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync> StorageBounds for T {}

/// Small key-value store for local preferences.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait Storage: StorageBounds {
    async fn read(&self, key: &str) -> Result<Vec<u8>>;
    async fn write(&self, key: &str, content: &[u8]) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
    async fn exists(&self, key: &str) -> Result<bool>;
}

// --- Native Implementation ---

/// Keys are file names under `root`.
#[cfg(not(target_arch = "wasm32"))]
pub struct NativeStorage {
    root: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl NativeStorage {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, key: &str) -> std::path::PathBuf {
        self.root.join(key)
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[async_trait]
impl Storage for NativeStorage {
    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(self.path(key)).await?)
    }

    async fn write(&self, key: &str, content: &[u8]) -> Result<()> {
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path(key);
        if tokio::fs::try_exists(&path).await? {
            tokio::fs::remove_file(path).await?;
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.path(key)).await?)
    }
}

// --- Web Implementation ---

#[cfg(target_arch = "wasm32")]
use anyhow::anyhow;

#[cfg(target_arch = "wasm32")]
const KEY_PREFIX: &str = "podcast_wizard:";

/// Browser `localStorage`. Values are stored as UTF-8 text.
#[cfg(target_arch = "wasm32")]
pub struct WebStorage {
    store: web_sys::Storage,
}

#[cfg(target_arch = "wasm32")]
impl WebStorage {
    pub fn new() -> Result<Self> {
        let window = web_sys::window().ok_or_else(|| anyhow!("No window available"))?;
        let store = window
            .local_storage()
            .map_err(|e| anyhow!("localStorage error: {:?}", e))?
            .ok_or_else(|| anyhow!("localStorage is disabled"))?;
        Ok(Self { store })
    }

    fn key(key: &str) -> String {
        format!("{}{}", KEY_PREFIX, key)
    }
}

#[cfg(target_arch = "wasm32")]
#[async_trait(?Send)]
impl Storage for WebStorage {
    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let value = self
            .store
            .get_item(&Self::key(key))
            .map_err(|e| anyhow!("Get error: {:?}", e))?;
        match value {
            Some(v) => Ok(v.into_bytes()),
            None => Err(anyhow!("Key not found: {}", key)),
        }
    }

    async fn write(&self, key: &str, content: &[u8]) -> Result<()> {
        let text = String::from_utf8_lossy(content);
        self.store
            .set_item(&Self::key(key), &text)
            .map_err(|e| anyhow!("Set error: {:?}", e))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.store
            .remove_item(&Self::key(key))
            .map_err(|e| anyhow!("Remove error: {:?}", e))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let value = self
            .store
            .get_item(&Self::key(key))
            .map_err(|e| anyhow!("Get error: {:?}", e))?;
        Ok(value.is_some())
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_native_storage_round_trip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = NativeStorage::new(dir.path().join("prefs"));

        assert!(!storage.exists("a.json").await?);
        storage.write("a.json", b"{}").await?;
        assert!(storage.exists("a.json").await?);
        assert_eq!(storage.read("a.json").await?, b"{}");

        storage.delete("a.json").await?;
        assert!(!storage.exists("a.json").await?);
        // deleting twice is fine
        storage.delete("a.json").await?;
        Ok(())
    }
}
