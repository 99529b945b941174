//! File I/O, validation, and serialization for the concord pipeline.

mod domain;
mod error;
mod inputs;
mod reader;
mod report;
mod writer;

pub use domain::{ClassSet, FeatureTable, RowId, RunName, TrainingSet};
pub use error::IoError;
pub use inputs::ConsensusInputReader;
pub use reader::{FeatureReader, TrainingReader};
pub use report::{
    ClassReport, OobSummary, PredictionRecord, TrainingSummary, prediction_records,
};
pub use writer::ReportWriter;
