//! Archive decoding seam.
//!
//! Decompression belongs to the caller's side of the boundary: an [`ArchiveDecoder`] turns the
//! bytes handed to `add_dataset` into already-unpacked [`ArchiveEntry`] files, and the record
//! parser takes it from there.

use crate::error::{InsightError, InsightResult};

/// One unpacked file of a dataset archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path of the file inside the archive. Directories end with `/`.
    pub path: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl ArchiveEntry {
    /// Create an entry.
    pub fn new(path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            bytes: bytes.into(),
        }
    }

    /// Whether this entry is a directory marker rather than a file.
    pub fn is_dir(&self) -> bool {
        self.path.ends_with('/')
    }
}

/// Turns archive bytes into unpacked file entries.
///
/// Implementations report unreadable content as [`InsightError::MalformedDataset`].
pub trait ArchiveDecoder: Send + Sync {
    fn decode(&self, content: &[u8]) -> InsightResult<Vec<ArchiveEntry>>;
}

/// Decodes a JSON bundle: a single object mapping file path to file document.
///
/// ```rust
/// use insight_engine::ingestion::{ArchiveDecoder, JsonBundleDecoder};
///
/// let content = br#"{"courses/CPSC310": {"result": []}}"#;
/// let entries = JsonBundleDecoder.decode(content).unwrap();
/// assert_eq!(entries[0].path, "courses/CPSC310");
/// ```
///
/// Entries come out in path order.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonBundleDecoder;

impl ArchiveDecoder for JsonBundleDecoder {
    fn decode(&self, content: &[u8]) -> InsightResult<Vec<ArchiveEntry>> {
        let text = std::str::from_utf8(content)
            .map_err(|e| InsightError::malformed(format!("archive is not valid utf-8: {e}")))?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(InsightError::malformed("archive is empty"));
        }

        let bundle = serde_json::from_str::<serde_json::Value>(trimmed)
            .map_err(|e| InsightError::malformed(format!("archive is not a json bundle: {e}")))?;
        let serde_json::Value::Object(files) = bundle else {
            return Err(InsightError::malformed(
                "archive bundle must be a json object of files",
            ));
        };

        files
            .into_iter()
            .map(|(path, doc)| {
                let bytes = serde_json::to_vec(&doc).map_err(|e| {
                    InsightError::malformed(format!("archive file '{path}' is unreadable: {e}"))
                })?;
                Ok(ArchiveEntry { path, bytes })
            })
            .collect()
    }
}
