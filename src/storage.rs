use crate::models::LastSearch;
use std::path::{Path, PathBuf};
use tokio::{fs, sync::Mutex};
use tracing::{debug, error, warn};

pub struct LastSearchStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl LastSearchStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn remember(&self, search: &LastSearch) {
        let _guard = self.lock.lock().await;
        let payload = match serde_json::to_vec_pretty(search) {
            Ok(payload) => payload,
            Err(err) => {
                error!("failed to encode last search: {err}");
                return;
            }
        };
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            if let Err(err) = fs::create_dir_all(parent).await {
                warn!(path = %parent.display(), "failed to create data directory: {err}");
                return;
            }
        }
        match fs::write(&self.path, payload).await {
            Ok(()) => debug!(path = %self.path.display(), "last search saved"),
            Err(err) => warn!(path = %self.path.display(), "failed to save last search: {err}"),
        }
    }

    pub async fn recall(&self) -> Option<LastSearch> {
        let _guard = self.lock.lock().await;
        match fs::read(&self.path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(search) => Some(search),
                Err(err) => {
                    error!("failed to parse last search file: {err}");
                    None
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                error!("failed to read last search file: {err}");
                None
            }
        }
    }
}
