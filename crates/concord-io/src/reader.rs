//! CSV readers for labeled training rows and unlabeled inference rows.
//!
//! Both formats share one layout: a header row, a key column first (class
//! label or row id), then one column per numeric feature.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use concord_forest::LabeledSample;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::{ClassSet, FeatureTable, RowId, TrainingSet};

/// Header feature names plus `(key, values)` rows, already validated for
/// shape and finiteness.
struct RawTable {
    feature_names: Vec<String>,
    rows: Vec<(String, Vec<f64>)>,
}

fn read_table(path: &Path) -> Result<RawTable, IoError> {
    let file = std::fs::File::open(path).map_err(|e| IoError::FileNotFound {
        path: path.to_path_buf(),
        source: e,
    })?;

    // flexible(true) so ragged rows reach our InconsistentRowLength check
    // instead of surfacing as a low-level CsvParse error.
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let csv_err = |e: csv::Error| IoError::CsvParse {
        path: path.to_path_buf(),
        offset: e.position().map_or(0, |p| p.byte()),
        source: e,
    };

    let header = rdr.headers().map_err(csv_err)?;
    let expected_cols = header.len();
    debug!(expected_cols, "read CSV header");
    if expected_cols < 2 {
        return Err(IoError::NoFeatureColumns {
            path: path.to_path_buf(),
        });
    }
    let feature_names: Vec<String> = header.iter().skip(1).map(String::from).collect();

    let mut rows = Vec::new();
    for (row_index, result) in rdr.records().enumerate() {
        let record = result.map_err(csv_err)?;
        let key = record.get(0).unwrap_or("").to_string();

        if record.len() != expected_cols {
            return Err(IoError::InconsistentRowLength {
                path: path.to_path_buf(),
                row_index,
                key,
                expected: expected_cols,
                got: record.len(),
            });
        }

        let values = record
            .iter()
            .skip(1)
            .enumerate()
            .map(|(col_index, raw)| {
                raw.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| IoError::NonFiniteValue {
                        path: path.to_path_buf(),
                        row_index,
                        col_index,
                        raw: raw.to_string(),
                    })
            })
            .collect::<Result<Vec<f64>, IoError>>()?;

        rows.push((key, values));
    }

    if rows.is_empty() {
        return Err(IoError::EmptyDataset {
            path: path.to_path_buf(),
        });
    }

    Ok(RawTable {
        feature_names,
        rows,
    })
}

/// Reads labeled training rows from a CSV file.
///
/// Expected format: `label,feature1,...,featureN`, where each label is one of
/// the configured class names (case-insensitive).
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::NoFeatureColumns`] | Only the label column |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::NonFiniteValue`] | Cell is NaN, Inf, or unparseable float |
/// | [`IoError::UnknownLabel`] | Label is not in the class set |
pub struct TrainingReader {
    path: PathBuf,
    classes: ClassSet,
}

impl TrainingReader {
    /// Create a reader mapping labels through `classes`.
    pub fn new(path: &Path, classes: ClassSet) -> Self {
        Self {
            path: path.to_path_buf(),
            classes,
        }
    }

    /// Read and validate the CSV file, returning a [`TrainingSet`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<TrainingSet, IoError> {
        let table = read_table(&self.path)?;

        let samples = table
            .rows
            .into_iter()
            .enumerate()
            .map(|(row_index, (label, features))| {
                self.classes
                    .index_of(&label)
                    .map(|class| LabeledSample::new(features, class))
                    .ok_or_else(|| IoError::UnknownLabel {
                        path: self.path.clone(),
                        row_index,
                        label,
                        known: self.classes.names().join(","),
                    })
            })
            .collect::<Result<Vec<_>, IoError>>()?;

        let set = TrainingSet::new(table.feature_names, self.classes.clone(), samples);
        info!(
            n_samples = set.samples().len(),
            n_features = set.feature_names().len(),
            class_counts = ?set.class_counts(),
            "training set loaded"
        );
        Ok(set)
    }
}

/// Reads unlabeled feature rows from a CSV file.
///
/// Expected format: `id,feature1,...,featureN` with unique ids.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::NoFeatureColumns`] | Only the id column |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::NonFiniteValue`] | Cell is NaN, Inf, or unparseable float |
/// | [`IoError::DuplicateId`] | Same id appears twice |
pub struct FeatureReader {
    path: PathBuf,
}

impl FeatureReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the CSV file, returning a [`FeatureTable`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<FeatureTable, IoError> {
        let table = read_table(&self.path)?;

        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut ids = Vec::with_capacity(table.rows.len());
        let mut rows = Vec::with_capacity(table.rows.len());
        for (row_index, (id, values)) in table.rows.into_iter().enumerate() {
            if let Some(&first_row) = seen.get(&id) {
                return Err(IoError::DuplicateId {
                    path: self.path.clone(),
                    id,
                    first_row,
                    second_row: row_index,
                });
            }
            seen.insert(id.clone(), row_index);
            ids.push(RowId::new(id));
            rows.push(values);
        }

        info!(
            n_rows = ids.len(),
            n_features = table.feature_names.len(),
            "feature table loaded"
        );
        Ok(FeatureTable::new(ids, table.feature_names, rows))
    }

    /// Read the file and check its columns against `expected` names.
    ///
    /// # Errors
    ///
    /// Everything [`FeatureReader::read`] returns, plus
    /// [`IoError::FeatureMismatch`] when the header differs from `expected`.
    pub fn read_matching(&self, expected: &[String]) -> Result<FeatureTable, IoError> {
        let table = self.read()?;
        if table.feature_names() != expected {
            return Err(IoError::FeatureMismatch {
                path: self.path.clone(),
                expected: expected.to_vec(),
                got: table.feature_names().to_vec(),
            });
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    fn classes() -> ClassSet {
        ClassSet::parse("BUY,SELL,HOLD").unwrap()
    }

    #[test]
    fn read_valid_training_rows() {
        let f = write_csv(
            "label,rsi,macd\nBUY,30.0,0.5\nsell,70.0,-0.4\nHOLD,50.0,0.0\nBUY,25.0,0.6\n",
        );
        let set = TrainingReader::new(f.path(), classes()).read().unwrap();
        assert_eq!(set.feature_names(), &["rsi", "macd"]);
        assert_eq!(set.samples().len(), 4);
        assert_eq!(set.samples()[1].label, 1);
        assert_eq!(set.samples()[2].features, vec![50.0, 0.0]);
        assert_eq!(set.class_counts(), vec![2, 1, 1]);
    }

    #[test]
    fn unknown_label_error() {
        let f = write_csv("label,rsi\nBUY,30.0\nSHORT,70.0\n");
        let err = TrainingReader::new(f.path(), classes()).read().unwrap_err();
        assert!(matches!(
            err,
            IoError::UnknownLabel { row_index: 1, ref label, .. } if label == "SHORT"
        ));
    }

    #[test]
    fn empty_dataset_error() {
        let f = write_csv("label,rsi,macd\n");
        let err = TrainingReader::new(f.path(), classes()).read().unwrap_err();
        assert!(matches!(err, IoError::EmptyDataset { .. }));
    }

    #[test]
    fn no_feature_columns_error() {
        let f = write_csv("label\nBUY\nSELL\n");
        let err = TrainingReader::new(f.path(), classes()).read().unwrap_err();
        assert!(matches!(err, IoError::NoFeatureColumns { .. }));
    }

    #[test]
    fn inconsistent_row_length_error() {
        let f = write_csv("id,rsi,macd\nr1,30.0,0.5\nr2,70.0\n");
        let err = FeatureReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::InconsistentRowLength { row_index: 1, got: 2, .. }));
    }

    #[test]
    fn non_finite_value_error() {
        for bad in ["NaN", "inf", "abc", ""] {
            let f = write_csv(&format!("id,rsi\nr1,{bad}\n"));
            let err = FeatureReader::new(f.path()).read().unwrap_err();
            assert!(matches!(err, IoError::NonFiniteValue { col_index: 0, .. }), "{bad}");
        }
    }

    #[test]
    fn duplicate_id_error() {
        let f = write_csv("id,rsi\nr1,30.0\nr1,40.0\n");
        let err = FeatureReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::DuplicateId { first_row: 0, second_row: 1, .. }));
    }

    #[test]
    fn read_matching_checks_columns() {
        let f = write_csv("id,macd,rsi\nr1,0.5,30.0\n");
        let expected = vec!["rsi".to_string(), "macd".to_string()];
        let err = FeatureReader::new(f.path()).read_matching(&expected).unwrap_err();
        assert!(matches!(err, IoError::FeatureMismatch { .. }));

        let ok = vec!["macd".to_string(), "rsi".to_string()];
        let table = FeatureReader::new(f.path()).read_matching(&ok).unwrap();
        assert_eq!(table.ids()[0].as_str(), "r1");
    }

    #[test]
    fn missing_file_error() {
        let err = FeatureReader::new(Path::new("/nonexistent/rows.csv"))
            .read()
            .unwrap_err();
        assert!(matches!(err, IoError::FileNotFound { .. }));
    }
}
