//! Storage for synthesized audio.

use crate::config::{AudioEncoding, StorageConfig};
use crate::error::{Result, VisageError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// A persisted audio file and the reference handed to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAudio {
    /// Bare file name, e.g. `3f1c….mp3`.
    pub file_name: String,
    /// Location on disk.
    pub path: PathBuf,
    /// Client-facing reference, e.g. `/audio/3f1c….mp3`.
    pub reference: String,
}

/// Persists audio under a fresh unique name.
#[async_trait]
pub trait AudioStore: Send + Sync {
    /// Write `audio` and return where it lives.
    ///
    /// The file is complete on disk before this returns `Ok`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or times out.
    async fn persist(&self, audio: &[u8], encoding: AudioEncoding) -> Result<StoredAudio>;
}

/// Audio store backed by a local directory.
#[derive(Debug, Clone)]
pub struct FsAudioStore {
    dir: PathBuf,
    url_prefix: String,
    write_timeout: Duration,
}

impl FsAudioStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            dir: config.audio_dir.clone(),
            url_prefix: config.url_prefix.trim_end_matches('/').to_owned(),
            write_timeout: Duration::from_secs(config.write_timeout_secs.max(1)),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Map a client-supplied file name back to a stored file.
    ///
    /// # Errors
    ///
    /// Returns [`VisageError::Storage`] for names that could escape the audio
    /// directory, or when no such file exists.
    pub fn resolve(&self, file_name: &str) -> Result<PathBuf> {
        let invalid = file_name.is_empty()
            || file_name.contains(['/', '\\'])
            || file_name.contains("..")
            || file_name.starts_with('.');
        if invalid {
            return Err(VisageError::Storage(format!(
                "invalid audio file name: {file_name:?}"
            )));
        }
        let path = self.dir.join(file_name);
        if !path.is_file() {
            return Err(VisageError::Storage(format!(
                "audio file not found: {file_name}"
            )));
        }
        Ok(path)
    }
}

#[async_trait]
impl AudioStore for FsAudioStore {
    async fn persist(&self, audio: &[u8], encoding: AudioEncoding) -> Result<StoredAudio> {
        let file_name = format!("{}.{}", uuid::Uuid::new_v4(), encoding.extension());
        let path = self.dir.join(&file_name);
        let abandoned = Arc::new(AtomicBool::new(false));

        let write = tokio::task::spawn_blocking({
            let dir = self.dir.clone();
            let path = path.clone();
            let audio = audio.to_vec();
            let abandoned = Arc::clone(&abandoned);
            move || write_atomically(&dir, &path, &audio, &abandoned)
        });

        match tokio::time::timeout(self.write_timeout, write).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => {
                return Err(VisageError::Storage(format!(
                    "failed to write {}: {e}",
                    path.display()
                )));
            }
            Ok(Err(e)) => {
                return Err(VisageError::Storage(format!("audio write task failed: {e}")));
            }
            Err(_) => {
                // The blocking write keeps running; it deletes its own output.
                abandoned.store(true, Ordering::SeqCst);
                warn!(path = %path.display(), "audio write timed out, discarding");
                return Err(VisageError::Timeout(format!(
                    "audio write exceeded {} seconds",
                    self.write_timeout.as_secs()
                )));
            }
        }

        debug!(path = %path.display(), bytes = audio.len(), "saved audio file");

        Ok(StoredAudio {
            reference: format!("{}/{file_name}", self.url_prefix),
            file_name,
            path,
        })
    }
}

/// Write `audio` to a hidden temp file and rename it into place.
///
/// Nothing is left behind on failure, or when `abandoned` is set before the
/// write completes.
fn write_atomically(
    dir: &Path,
    path: &Path,
    audio: &[u8],
    abandoned: &AtomicBool,
) -> std::io::Result<()> {
    let file_name = path.file_name().unwrap_or_default().to_string_lossy();
    let partial = dir.join(format!(".{file_name}.part"));

    std::fs::create_dir_all(dir)?;
    let written = std::fs::write(&partial, audio).and_then(|()| {
        if abandoned.load(Ordering::SeqCst) {
            Err(std::io::Error::other("write abandoned"))
        } else {
            std::fs::rename(&partial, path)
        }
    });
    if let Err(e) = written {
        let _ = std::fs::remove_file(&partial);
        return Err(e);
    }

    if abandoned.load(Ordering::SeqCst) {
        let _ = std::fs::remove_file(path);
        return Err(std::io::Error::other("write abandoned"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    fn store_in(dir: &Path) -> FsAudioStore {
        FsAudioStore::new(&StorageConfig {
            audio_dir: dir.join("audio"),
            ..StorageConfig::default()
        })
    }

    #[tokio::test]
    async fn persists_under_unique_names() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());

        let a = store.persist(b"one", AudioEncoding::Mp3).await.unwrap();
        let b = store.persist(b"two", AudioEncoding::Mp3).await.unwrap();

        assert_ne!(a.file_name, b.file_name);
        assert!(a.file_name.ends_with(".mp3"));
        assert_eq!(a.reference, format!("/audio/{}", a.file_name));
        assert_eq!(std::fs::read(&a.path).unwrap(), b"one");
        assert_eq!(std::fs::read(&b.path).unwrap(), b"two");
    }

    #[tokio::test]
    async fn leaves_no_partial_files() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        store.persist(b"data", AudioEncoding::OggOpus).await.unwrap();

        let names: Vec<String> = std::fs::read_dir(store.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].ends_with(".ogg"));
    }

    #[tokio::test]
    async fn resolve_finds_persisted_audio() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        let saved = store.persist(b"data", AudioEncoding::Mp3).await.unwrap();
        assert_eq!(store.resolve(&saved.file_name).unwrap(), saved.path);
    }

    #[test]
    fn resolve_rejects_traversal_and_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        for name in ["", "../secret", "a/b.mp3", "a\\b.mp3", ".hidden"] {
            assert!(
                matches!(store.resolve(name), Err(VisageError::Storage(_))),
                "{name:?}"
            );
        }
        let err = store.resolve("missing.mp3").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn write_failure_is_storage_error() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, b"").unwrap();
        // A regular file where the directory should be.
        let store = FsAudioStore::new(&StorageConfig {
            audio_dir: blocker,
            ..StorageConfig::default()
        });
        let result = store.persist(b"x", AudioEncoding::Mp3).await;
        assert!(matches!(result, Err(VisageError::Storage(_))));
    }

    #[test]
    fn abandoned_write_leaves_nothing_behind() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("clip.mp3");

        let result = write_atomically(tmp.path(), &path, b"late", &AtomicBool::new(true));
        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn failed_rename_removes_partial() {
        let tmp = tempfile::tempdir().unwrap();
        // A non-empty directory at the target makes the rename fail.
        let path = tmp.path().join("clip.mp3");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), b"").unwrap();

        let result = write_atomically(tmp.path(), &path, b"data", &AtomicBool::new(false));
        assert!(result.is_err());
        let names: Vec<String> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["clip.mp3"]);
    }

    #[test]
    fn completed_write_renames_into_place() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("clip.wav");

        write_atomically(path.parent().unwrap(), &path, b"pcm", &AtomicBool::new(false))
            .unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"pcm");
        assert_eq!(std::fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }
}
