//! Persistence of the access code.

use std::fmt::Debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use log::debug;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("couldn't access the code file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no access code is stored")]
    Empty,
}

/// Where the access code lives.
pub trait PasswordStore: Debug {
    /// Reads the stored code, without surrounding whitespace.
    ///
    /// # Errors
    /// - `StoreError::Empty` if the store holds no code at all.
    fn read(&self) -> Result<String, StoreError>;

    /// Replaces the stored code.
    fn write(&mut self, code: &str) -> Result<(), StoreError>;
}

/// Keeps the access code as plain text in a file.
///
/// The file is overwritten in place; a crash mid-write can leave it truncated.
#[derive(Debug, Clone)]
pub struct FilePasswordStore {
    path: PathBuf,
}

impl FilePasswordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl PasswordStore for FilePasswordStore {
    fn read(&self) -> Result<String, StoreError> {
        let contents = fs::read_to_string(&self.path).map_err(|err| self.io_error(err))?;
        let code = contents.trim();
        if code.is_empty() {
            return Err(StoreError::Empty);
        }
        Ok(code.to_owned())
    }

    fn write(&mut self, code: &str) -> Result<(), StoreError> {
        fs::write(&self.path, code).map_err(|err| self.io_error(err))?;
        debug!("Access code written to {:?}.", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process;

    struct TempFile(PathBuf);

    impl TempFile {
        fn new(name: &str) -> Self {
            Self(std::env::temp_dir().join(format!("kpc-{}-{}", process::id(), name)))
        }
    }

    impl Drop for TempFile {
        fn drop(&mut self) {
            _ = fs::remove_file(&self.0);
        }
    }

    #[test]
    fn read_trims_whitespace() {
        let file = TempFile::new("trim");
        fs::write(&file.0, "  1234\n").unwrap();

        assert_eq!(FilePasswordStore::new(&file.0).read().unwrap(), "1234");
    }

    #[test]
    fn written_code_is_read_back() {
        let file = TempFile::new("roundtrip");
        let mut store = FilePasswordStore::new(&file.0);
        fs::write(&file.0, "1234").unwrap();

        store.write("98765").unwrap();

        assert_eq!(store.read().unwrap(), "98765");
        assert_eq!(fs::read_to_string(&file.0).unwrap(), "98765");
    }

    #[test]
    fn missing_file_is_an_error() {
        let file = TempFile::new("missing");

        let err = FilePasswordStore::new(&file.0).read().unwrap_err();

        assert!(matches!(err, StoreError::Io { ref source, .. } if source.kind() == io::ErrorKind::NotFound));
    }

    #[test]
    fn blank_file_is_not_an_empty_code() {
        let file = TempFile::new("blank");
        fs::write(&file.0, " \n").unwrap();

        assert!(matches!(FilePasswordStore::new(&file.0).read(), Err(StoreError::Empty)));
    }
}
