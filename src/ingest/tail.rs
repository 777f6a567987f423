use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::TailError;

/// Incrementally reads a single append-only file, tracking the read position.
///
/// Only whole lines are handed out: bytes after the last newline stay unread
/// until the writer finishes the line.
#[derive(Debug)]
pub struct TailCursor {
    source_path: PathBuf,
    byte_offset: u64,
}

impl TailCursor {
    /// Create a cursor at an explicit offset.
    pub fn new(source_path: impl Into<PathBuf>, byte_offset: u64) -> Self {
        Self {
            source_path: source_path.into(),
            byte_offset,
        }
    }

    /// Create a cursor at the current end of file, so only lines appended
    /// from now on are read.
    pub fn at_end(source_path: impl Into<PathBuf>) -> Result<Self, TailError> {
        let source_path = source_path.into();
        let len = file_len(&source_path)?;
        Ok(Self::new(source_path, len))
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn byte_offset(&self) -> u64 {
        self.byte_offset
    }

    /// Read text appended since the last call. Returns an empty string when
    /// nothing new (or no complete line) is available.
    ///
    /// Unterminated trailing text is never returned, even right after the
    /// file was truncated; it is delivered once its line ends.
    pub fn read_new(&mut self) -> Result<String, TailError> {
        let current_len = file_len(&self.source_path)?;

        if current_len < self.byte_offset {
            warn!(
                path = %self.source_path.display(),
                offset = self.byte_offset,
                len = current_len,
                "source file shrank or was replaced; rereading from start"
            );
            self.byte_offset = 0;
        }
        if current_len == self.byte_offset {
            return Ok(String::new());
        }

        let read_err = |source| TailError::Read {
            path: self.source_path.clone(),
            source,
        };
        let mut file = fs::File::open(&self.source_path).map_err(read_err)?;
        file.seek(SeekFrom::Start(self.byte_offset)).map_err(read_err)?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).map_err(read_err)?;

        // Hold back a trailing partial line for the next read.
        let complete = match buf.iter().rposition(|&b| b == b'\n') {
            Some(last_newline) => last_newline + 1,
            None => {
                debug!(pending = buf.len(), "no complete line yet");
                return Ok(String::new());
            }
        };
        buf.truncate(complete);
        self.byte_offset += complete as u64;

        debug!(offset = self.byte_offset, bytes = complete, "read new history bytes");
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

fn file_len(path: &Path) -> Result<u64, TailError> {
    fs::metadata(path)
        .map(|m| m.len())
        .map_err(|source| TailError::Stat {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn append(path: &Path, text: &str) {
        let mut f = fs::OpenOptions::new().append(true).open(path).unwrap();
        f.write_all(text.as_bytes()).unwrap();
    }

    #[test]
    fn test_at_end_skips_existing_content() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".zsh_history");
        fs::write(&path, ": 1:0;old\n").unwrap();

        let mut cursor = TailCursor::at_end(&path).unwrap();
        assert_eq!(cursor.byte_offset(), 10);
        assert_eq!(cursor.read_new().unwrap(), "");

        append(&path, ": 2:0;new\n");
        assert_eq!(cursor.read_new().unwrap(), ": 2:0;new\n");
        assert_eq!(cursor.byte_offset(), 20);
    }

    #[test]
    fn test_second_read_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".zsh_history");
        fs::write(&path, ": 1:0;ls\n").unwrap();

        let mut cursor = TailCursor::new(&path, 0);
        assert_eq!(cursor.read_new().unwrap(), ": 1:0;ls\n");
        let offset = cursor.byte_offset();
        assert_eq!(cursor.read_new().unwrap(), "");
        assert_eq!(cursor.byte_offset(), offset);
    }

    #[test]
    fn test_truncation_resets_offset() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".zsh_history");
        fs::write(&path, ": 1:0;one\n: 2:0;two\n: 3:0;three\n").unwrap();

        let mut cursor = TailCursor::at_end(&path).unwrap();
        fs::write(&path, ": 4:0;four\n").unwrap();

        assert_eq!(cursor.read_new().unwrap(), ": 4:0;four\n");
        assert_eq!(cursor.byte_offset(), 11);
    }

    #[test]
    fn test_partial_line_held_back() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".zsh_history");
        fs::write(&path, "").unwrap();

        let mut cursor = TailCursor::new(&path, 0);
        append(&path, ": 1:0;ls\n: 2:0;ma");
        assert_eq!(cursor.read_new().unwrap(), ": 1:0;ls\n");
        assert_eq!(cursor.byte_offset(), 9);

        append(&path, "ke\n");
        assert_eq!(cursor.read_new().unwrap(), ": 2:0;make\n");
    }

    #[test]
    fn test_truncation_to_unterminated_content_waits_for_newline() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".zsh_history");
        fs::write(&path, ": 1:0;one\n: 2:0;two\n").unwrap();

        let mut cursor = TailCursor::at_end(&path).unwrap();
        fs::write(&path, ": 4:0;four").unwrap();
        assert_eq!(cursor.read_new().unwrap(), "");
        assert_eq!(cursor.byte_offset(), 0);

        append(&path, "\n");
        assert_eq!(cursor.read_new().unwrap(), ": 4:0;four\n");
        assert_eq!(cursor.byte_offset(), 11);
    }

    #[test]
    fn test_missing_file_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cursor = TailCursor::new(tmp.path().join("gone"), 0);
        assert!(matches!(cursor.read_new(), Err(TailError::Stat { .. })));
    }
}
