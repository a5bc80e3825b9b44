//! In-memory store for generated artifacts.
//!
//! Every image, audio clip and video produced in a session lives here behind
//! a [`ResourceHandle`]. Handles are released explicitly; nothing is freed
//! behind the owner's back.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::types::MediaKind;

/// Opaque reference to a stored artifact
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    id: Uuid,
    kind: MediaKind,
    file_name: String,
}

impl ResourceHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn mime_type(&self) -> &'static str {
        self.kind.mime_type()
    }

    /// Name used when the artifact is downloaded
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// URL-like reference for players and download links
    pub fn url(&self) -> String {
        format!("blob:greeting/{}", self.id)
    }
}

#[derive(Debug)]
struct StoredResource {
    bytes: Arc<Vec<u8>>,
    created_at: DateTime<Utc>,
}

/// Shared registry of artifact bytes
#[derive(Clone, Debug, Default)]
pub struct ResourceStore(Arc<RwLock<HashMap<Uuid, StoredResource>>>);

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, kind: MediaKind, bytes: Vec<u8>, file_name: impl Into<String>) -> ResourceHandle {
        let handle = ResourceHandle {
            id: Uuid::now_v7(),
            kind,
            file_name: file_name.into(),
        };
        log::info!(
            "Created {:?} resource {} ({} bytes)",
            kind,
            handle.url(),
            bytes.len()
        );
        self.write().insert(
            handle.id,
            StoredResource {
                bytes: Arc::new(bytes),
                created_at: Utc::now(),
            },
        );
        handle
    }

    pub fn bytes(&self, handle: &ResourceHandle) -> Option<Arc<Vec<u8>>> {
        self.read().get(&handle.id).map(|r| Arc::clone(&r.bytes))
    }

    pub fn contains(&self, handle: &ResourceHandle) -> bool {
        self.read().contains_key(&handle.id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Free the artifact. Returns false if it was already gone.
    pub fn release(&self, handle: &ResourceHandle) -> bool {
        let Some(released) = self.write().remove(&handle.id) else {
            return false;
        };
        let held = Utc::now().signed_duration_since(released.created_at);
        log::info!(
            "Released {:?} resource {} after {}s",
            handle.kind,
            handle.url(),
            held.num_seconds()
        );
        true
    }

    /// Write the artifact into `dir` under its download name.
    pub fn save(&self, handle: &ResourceHandle, dir: &Path) -> std::io::Result<PathBuf> {
        let bytes = self.bytes(handle).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Resource {} has been released", handle.url()),
            )
        })?;
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&handle.file_name);
        std::fs::write(&path, bytes.as_slice())?;
        Ok(path)
    }

    // Poisoning only happens if a holder panicked mid-insert; the map is still usable.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<Uuid, StoredResource>> {
        self.0.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<Uuid, StoredResource>> {
        self.0.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_release() {
        let store = ResourceStore::new();
        let handle = store.create(MediaKind::Audio, vec![1, 2, 3], "配音.wav");

        assert!(store.contains(&handle));
        assert_eq!(store.bytes(&handle).unwrap().as_slice(), &[1, 2, 3]);
        assert_eq!(handle.mime_type(), "audio/wav");
        assert!(handle.url().starts_with("blob:greeting/"));

        assert!(store.release(&handle));
        assert!(!store.release(&handle));
        assert!(store.is_empty());
        assert!(store.bytes(&handle).is_none());
    }

    #[test]
    fn test_clones_share_storage() {
        let store = ResourceStore::new();
        let other = store.clone();
        let a = store.create(MediaKind::Image, vec![0], "a.png");
        let b = other.create(MediaKind::Image, vec![1], "b.png");
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_save_uses_download_name() {
        let store = ResourceStore::new();
        let handle = store.create(MediaKind::Video, b"mp4".to_vec(), "祝福-春节.mp4");
        let dir = std::env::temp_dir().join(format!("greeting-save-{}", handle.id()));

        let path = store.save(&handle, &dir).unwrap();
        assert_eq!(path.file_name().unwrap(), "祝福-春节.mp4");
        assert_eq!(std::fs::read(&path).unwrap(), b"mp4");

        store.release(&handle);
        assert!(store.save(&handle, &dir).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
