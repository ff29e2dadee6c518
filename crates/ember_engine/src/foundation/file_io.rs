//! Text file helpers with open-mode flags
//!
//! Failures never panic: every error is logged where it happens and handed
//! back to the caller, who may ignore it and carry on with an empty result.

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use bitflags::bitflags;
use thiserror::Error;

bitflags! {
    /// Open-mode flags for [`read_file`] and [`write_file`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OpenMode: u8 {
        /// Treat content as raw bytes; text is not required to be UTF-8 on read
        const BINARY = 1 << 0;
        /// Start at the end of the file (reads return nothing new, writes go last)
        const AT_END = 1 << 1;
        /// Every write goes to the end of the file
        const APPEND = 1 << 2;
        /// Truncate the file before writing
        const TRUNCATE = 1 << 3;
    }
}

/// File I/O errors
#[derive(Error, Debug)]
pub enum FileIoError {
    /// The flags contradict each other
    #[error("invalid open mode {0:?}: APPEND and TRUNCATE are mutually exclusive")]
    InvalidMode(OpenMode),

    /// Underlying I/O failure
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path that was being accessed
        path: String,
        /// Source error
        #[source]
        source: std::io::Error,
    },
}

/// Result type for file operations
pub type FileIoResult<T> = Result<T, FileIoError>;

fn validate(mode: OpenMode) -> FileIoResult<()> {
    if mode.contains(OpenMode::APPEND | OpenMode::TRUNCATE) {
        return Err(FileIoError::InvalidMode(mode));
    }
    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> FileIoError {
    FileIoError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Read a whole file as text
///
/// With [`OpenMode::BINARY`] invalid UTF-8 sequences are replaced instead of
/// failing. With [`OpenMode::AT_END`] the read starts at the end of the file.
pub fn read_file(path: impl AsRef<Path>, mode: OpenMode) -> FileIoResult<String> {
    let path = path.as_ref();
    let result = validate(mode).and_then(|()| {
        let mut file = OpenOptions::new()
            .read(true)
            .open(path)
            .map_err(|e| io_error(path, e))?;
        if mode.contains(OpenMode::AT_END) {
            file.seek(SeekFrom::End(0)).map_err(|e| io_error(path, e))?;
        }
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).map_err(|e| io_error(path, e))?;
        if mode.contains(OpenMode::BINARY) {
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        } else {
            String::from_utf8(bytes).map_err(|e| {
                io_error(path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
            })
        }
    });
    if let Err(e) = &result {
        log::error!("Failed to read file: {e}");
    }
    result
}

/// Write text to a file, creating it if needed
///
/// Without APPEND or AT_END the file is truncated and replaced by `content`.
/// AT_END keeps the existing content and writes after it unless TRUNCATE is
/// also given. APPEND combined with TRUNCATE is rejected before the file
/// system is touched.
pub fn write_file(path: impl AsRef<Path>, content: &str, mode: OpenMode) -> FileIoResult<()> {
    let path = path.as_ref();
    let result = validate(mode).and_then(|()| {
        let mut options = OpenOptions::new();
        options.create(true);
        if mode.contains(OpenMode::APPEND) {
            options.append(true);
        } else {
            options.write(true);
        }
        if mode.contains(OpenMode::TRUNCATE) || !mode.intersects(OpenMode::APPEND | OpenMode::AT_END) {
            options.truncate(true);
        }
        let mut file = options.open(path).map_err(|e| io_error(path, e))?;
        if mode.contains(OpenMode::AT_END) && !mode.contains(OpenMode::APPEND) {
            file.seek(SeekFrom::End(0)).map_err(|e| io_error(path, e))?;
        }
        file.write_all(content.as_bytes()).map_err(|e| io_error(path, e))
    });
    if let Err(e) = &result {
        log::error!("Failed to write file: {e}");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_with_truncate_is_rejected_without_touching_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never.txt");

        let result = write_file(&path, "data", OpenMode::APPEND | OpenMode::TRUNCATE);
        assert!(matches!(result, Err(FileIoError::InvalidMode(_))));
        assert!(!path.exists());

        std::fs::write(&path, "keep").unwrap();
        let result = write_file(&path, "data", OpenMode::APPEND | OpenMode::TRUNCATE);
        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep");
    }

    #[test]
    fn test_truncate_then_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");

        write_file(&path, "first line\n", OpenMode::TRUNCATE).unwrap();
        write_file(&path, "second line\n", OpenMode::APPEND).unwrap();
        assert_eq!(
            read_file(&path, OpenMode::empty()).unwrap(),
            "first line\nsecond line\n"
        );

        write_file(&path, "reset", OpenMode::TRUNCATE).unwrap();
        assert_eq!(read_file(&path, OpenMode::empty()).unwrap(), "reset");
    }

    #[test]
    fn test_plain_write_replaces_longer_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("greeting.txt");

        write_file(&path, "hello world", OpenMode::empty()).unwrap();
        write_file(&path, "hi", OpenMode::empty()).unwrap();
        assert_eq!(read_file(&path, OpenMode::empty()).unwrap(), "hi");

        write_file(&path, "!", OpenMode::AT_END).unwrap();
        assert_eq!(read_file(&path, OpenMode::empty()).unwrap(), "hi!");
    }

    #[test]
    fn test_read_at_end_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        write_file(&path, "content", OpenMode::TRUNCATE).unwrap();
        assert_eq!(read_file(&path, OpenMode::AT_END).unwrap(), "");
    }

    #[test]
    fn test_missing_file_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_file(dir.path().join("missing.txt"), OpenMode::empty());
        assert!(matches!(result, Err(FileIoError::Io { .. })));
    }

    #[test]
    fn test_binary_read_tolerates_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        std::fs::write(&path, [0x66, 0x6f, 0xff, 0x6f]).unwrap();

        assert!(read_file(&path, OpenMode::empty()).is_err());
        let text = read_file(&path, OpenMode::BINARY).unwrap();
        assert!(text.starts_with("fo"));
    }
}
