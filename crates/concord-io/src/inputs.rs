//! JSON reader for pre-computed consensus inputs.

use std::path::{Path, PathBuf};

use concord_consensus::ConsensusInput;
use tracing::{info, instrument};

use crate::IoError;

/// Reads a JSON array of `{"source","action","confidence","weight"}` objects.
///
/// Value ranges are not checked here; [`concord_consensus::combine`] rejects
/// out-of-range confidences and weights with the source name attached.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::JsonParse`] | Not a JSON array of inputs, or an unknown action |
/// | [`IoError::EmptyDataset`] | The array is empty |
pub struct ConsensusInputReader {
    path: PathBuf,
}

impl ConsensusInputReader {
    /// Create a new reader for the given JSON file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and parse the inputs in file order.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Vec<ConsensusInput>, IoError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;
        let inputs: Vec<ConsensusInput> =
            serde_json::from_str(&content).map_err(|e| IoError::JsonParse {
                path: self.path.clone(),
                source: e,
            })?;
        if inputs.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }
        info!(n_inputs = inputs.len(), "consensus inputs loaded");
        Ok(inputs)
    }
}
