use std::path::Path;

use walkdir::WalkDir;

use crate::error::StorageError;
use crate::models::PassageRecord;

/// In-memory collection of precomputed passage embeddings. Read-only after
/// load; callers cache one instance per session.
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    records: Vec<PassageRecord>,
    dimension: Option<usize>,
}

impl Corpus {
    /// Loads every `.json` batch file directly under `dir` and concatenates
    /// them into one ordered collection.
    ///
    /// Batches are read in file-name order so repeated loads produce the same
    /// record ordering; each batch's internal order is preserved. No caching
    /// happens here, callers hold on to the result.
    pub fn load(dir: &Path) -> Result<Self, StorageError> {
        let mut batch_paths = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| StorageError::DirUnreadable {
                path: dir.to_path_buf(),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.into_path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                batch_paths.push(path);
            }
        }

        let mut records = Vec::new();
        for path in &batch_paths {
            let data = std::fs::read_to_string(path).map_err(|source| {
                StorageError::BatchUnreadable {
                    path: path.clone(),
                    source,
                }
            })?;
            let batch: Vec<PassageRecord> =
                serde_json::from_str(&data).map_err(|source| StorageError::BatchCorrupt {
                    path: path.clone(),
                    source,
                })?;
            records.extend(batch);
        }

        let corpus = Self::from_records(records)?;
        tracing::info!(
            "loaded {} passages from {} batch files in {}",
            corpus.len(),
            batch_paths.len(),
            dir.display()
        );
        Ok(corpus)
    }

    /// Builds a corpus from records already in memory. The first record fixes
    /// the embedding dimensionality; any disagreeing record is an integrity
    /// fault.
    pub fn from_records(records: Vec<PassageRecord>) -> Result<Self, StorageError> {
        let mut dimension = None;
        for (index, record) in records.iter().enumerate() {
            let found = record.embedding.len();
            match dimension {
                None => dimension = Some(found),
                Some(expected) if expected != found => {
                    return Err(StorageError::InconsistentDimensions {
                        index,
                        found,
                        expected,
                    });
                }
                Some(_) => {}
            }
        }
        Ok(Self { records, dimension })
    }

    pub fn records(&self) -> &[PassageRecord] {
        &self.records
    }

    /// Embedding dimensionality shared by every record; `None` when empty.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static DIR_SEQ: AtomicUsize = AtomicUsize::new(0);

    fn temp_corpus_dir() -> PathBuf {
        let seq = DIR_SEQ.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!(
            "komath-corpus-{}-{}",
            std::process::id(),
            seq
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_batch(dir: &Path, name: &str, records: &[(&str, Vec<f32>)]) {
        let batch: Vec<PassageRecord> = records
            .iter()
            .map(|(text, embedding)| PassageRecord {
                text: text.to_string(),
                embedding: embedding.clone(),
            })
            .collect();
        fs::write(dir.join(name), serde_json::to_string(&batch).unwrap()).unwrap();
    }

    #[test]
    fn batches_concatenate_in_file_name_order() {
        let dir = temp_corpus_dir();
        // written out of order on purpose
        write_batch(&dir, "b.json", &[("셋째", vec![0.0, 1.0])]);
        write_batch(
            &dir,
            "a.json",
            &[("첫째", vec![1.0, 0.0]), ("둘째", vec![0.5, 0.5])],
        );

        let corpus = Corpus::load(&dir).unwrap();
        let texts: Vec<&str> = corpus.records().iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["첫째", "둘째", "셋째"]);
        assert_eq!(corpus.dimension(), Some(2));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn loading_twice_yields_equal_corpora() {
        let dir = temp_corpus_dir();
        write_batch(&dir, "0001.json", &[("가", vec![1.0, 0.0])]);
        write_batch(&dir, "0002.json", &[("나", vec![0.0, 1.0])]);

        let first = Corpus::load(&dir).unwrap();
        let second = Corpus::load(&dir).unwrap();
        assert_eq!(first, second);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn non_json_files_are_ignored() {
        let dir = temp_corpus_dir();
        write_batch(&dir, "batch.json", &[("가", vec![1.0])]);
        fs::write(dir.join("notes.txt"), "not a batch").unwrap();

        let corpus = Corpus::load(&dir).unwrap();
        assert_eq!(corpus.len(), 1);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn corrupt_batch_is_an_error() {
        let dir = temp_corpus_dir();
        fs::write(dir.join("bad.json"), "{ not valid").unwrap();

        let err = Corpus::load(&dir).unwrap_err();
        assert!(matches!(err, StorageError::BatchCorrupt { .. }));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn inconsistent_dimensions_are_an_error() {
        let dir = temp_corpus_dir();
        write_batch(
            &dir,
            "batch.json",
            &[("가", vec![1.0, 0.0]), ("나", vec![1.0, 0.0, 0.0])],
        );

        let err = Corpus::load(&dir).unwrap_err();
        assert!(matches!(
            err,
            StorageError::InconsistentDimensions {
                index: 1,
                found: 3,
                expected: 2,
            }
        ));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = std::env::temp_dir().join("komath-corpus-no-such-dir");
        let err = Corpus::load(&dir).unwrap_err();
        assert!(matches!(err, StorageError::DirUnreadable { .. }));
    }

    #[test]
    fn empty_directory_yields_empty_corpus() {
        let dir = temp_corpus_dir();
        let corpus = Corpus::load(&dir).unwrap();
        assert!(corpus.is_empty());
        assert_eq!(corpus.dimension(), None);

        fs::remove_dir_all(&dir).unwrap();
    }
}
