//! Photo object storage.
//!
//! Uploads happen before a status change is submitted; the lifecycle only
//! stores the returned references. [`DirObjectStore`] is a content-addressed
//! directory store whose references look like `obj:<blake3-hex>.<ext>`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::CaretakerError;

pub const REFERENCE_PREFIX: &str = "obj:";
const DEFAULT_EXTENSION: &str = "bin";
const MAX_EXTENSION_CHARS: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid object reference '{0}'")]
    InvalidReference(String),

    #[error("object '{0}' not found")]
    NotFound(String),

    #[error("object storage I/O at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl From<StorageError> for CaretakerError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidReference(reference) => Self::validation(
                "photo_reference",
                format!("'{reference}' is not an object reference"),
            ),
            other => Self::Storage(other.to_string()),
        }
    }
}

/// Stores photo bytes and hands back opaque references.
pub trait ObjectStore {
    /// Store `bytes` and return its reference. Storing identical content twice
    /// returns the same reference.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] when the object cannot be written.
    fn put(&self, bytes: &[u8], extension: &str) -> Result<String, StorageError>;

    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] for unknown references.
    fn get(&self, reference: &str) -> Result<Vec<u8>, StorageError>;

    /// Remove an object by reference.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] when nothing was stored under the
    /// reference, or [`StorageError::Io`] on removal failure.
    fn delete(&self, reference: &str) -> Result<(), StorageError>;
}

/// Content-addressed objects in a flat directory.
#[derive(Debug, Clone)]
pub struct DirObjectStore {
    root: PathBuf,
}

impl DirObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store the contents of a local file, keeping its extension.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the file cannot be read or stored.
    pub fn put_file(&self, path: &Path) -> Result<String, StorageError> {
        let bytes = fs::read(path).map_err(|source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or(DEFAULT_EXTENSION);
        self.put(&bytes, extension)
    }

    fn object_path(&self, reference: &str) -> Result<PathBuf, StorageError> {
        let file_name = parse_reference(reference)?;
        Ok(self.root.join(file_name))
    }
}

impl ObjectStore for DirObjectStore {
    fn put(&self, bytes: &[u8], extension: &str) -> Result<String, StorageError> {
        let digest = blake3::hash(bytes).to_hex();
        let file_name = format!("{digest}.{}", normalize_extension(extension));
        let path = self.root.join(&file_name);

        if !path.exists() {
            fs::create_dir_all(&self.root).map_err(|source| StorageError::Io {
                path: self.root.clone(),
                source,
            })?;
            let staging = self.root.join(format!(".{file_name}.tmp"));
            fs::write(&staging, bytes)
                .and_then(|()| fs::rename(&staging, &path))
                .map_err(|source| StorageError::Io {
                    path: path.clone(),
                    source,
                })?;
            tracing::debug!(object = %file_name, bytes = bytes.len(), "stored object");
        }

        Ok(format!("{REFERENCE_PREFIX}{file_name}"))
    }

    fn get(&self, reference: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.object_path(reference)?;
        fs::read(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                StorageError::NotFound(reference.to_string())
            } else {
                StorageError::Io { path, source }
            }
        })
    }

    fn delete(&self, reference: &str) -> Result<(), StorageError> {
        let path = self.object_path(reference)?;
        fs::remove_file(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                StorageError::NotFound(reference.to_string())
            } else {
                StorageError::Io { path, source }
            }
        })
    }
}

/// Split `obj:<hex>.<ext>` into its file name, rejecting anything that could
/// escape the store directory.
///
/// # Errors
///
/// Returns [`StorageError::InvalidReference`] for malformed references.
pub fn parse_reference(reference: &str) -> Result<&str, StorageError> {
    let invalid = || StorageError::InvalidReference(reference.to_string());

    let file_name = reference.strip_prefix(REFERENCE_PREFIX).ok_or_else(invalid)?;
    let (digest, extension) = file_name.split_once('.').ok_or_else(invalid)?;

    let digest_ok = digest.len() == blake3::OUT_LEN * 2
        && digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase());
    let extension_ok = !extension.is_empty()
        && extension.len() <= MAX_EXTENSION_CHARS
        && extension.chars().all(|c| c.is_ascii_alphanumeric());

    if digest_ok && extension_ok {
        Ok(file_name)
    } else {
        Err(invalid())
    }
}

fn normalize_extension(extension: &str) -> String {
    let cleaned: String = extension
        .trim_start_matches('.')
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(MAX_EXTENSION_CHARS)
        .collect::<String>()
        .to_ascii_lowercase();
    if cleaned.is_empty() {
        DEFAULT_EXTENSION.to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::{DirObjectStore, ObjectStore, StorageError, parse_reference};

    #[test]
    fn put_is_content_addressed() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = DirObjectStore::new(dir.path().join("objects"));

        let first = store.put(b"before photo", "JPG").expect("put");
        let second = store.put(b"before photo", ".jpg").expect("put again");
        assert_eq!(first, second);
        assert!(first.starts_with("obj:"));
        assert!(first.ends_with(".jpg"));
        assert_eq!(store.get(&first).expect("get"), b"before photo");

        let other = store.put(b"after photo", "jpg").expect("put other");
        assert_ne!(first, other);
    }

    #[test]
    fn put_file_keeps_extension() {
        let dir = tempfile::tempdir().expect("temp dir");
        let source = dir.path().join("boiler.png");
        std::fs::write(&source, b"png bytes").expect("write source");

        let store = DirObjectStore::new(dir.path().join("objects"));
        let reference = store.put_file(&source).expect("put file");
        assert!(reference.ends_with(".png"));
    }

    #[test]
    fn delete_removes_and_then_reports_missing() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = DirObjectStore::new(dir.path());
        let reference = store.put(b"x", "jpg").expect("put");

        store.delete(&reference).expect("delete");
        assert!(matches!(
            store.delete(&reference),
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(store.get(&reference), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn references_cannot_escape_the_store() {
        let hex = "a".repeat(64);
        assert!(parse_reference(&format!("obj:{hex}.jpg")).is_ok());
        assert!(parse_reference(&format!("{hex}.jpg")).is_err());
        assert!(parse_reference("obj:../../etc/passwd").is_err());
        assert!(parse_reference(&format!("obj:{hex}./jpg")).is_err());
        assert!(parse_reference(&format!("obj:{}.jpg", "A".repeat(64))).is_err());
        assert!(parse_reference("obj:abc.jpg").is_err());
    }
}
