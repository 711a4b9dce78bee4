//! Posterior run records on disk.
//!
//! The sampler writes one JSON record per `(zeta, seed)` cell into the
//! experiment's results directory. [`FileRecordStore`] resolves a cell to a
//! file through a [`NameTemplate`]; templates may contain `*`/`?` for the
//! parts of the name (hyperparameter descriptions) the pipeline does not
//! reconstruct.

use std::path::{Path, PathBuf};

use bps_core::{
    Error, NameFields, NameTemplate, PosteriorRunRecord, Result, RunRecordStore, locate_unique,
    write_atomic,
};

/// Read and validate one run record.
pub fn read_run_record(path: &Path) -> Result<PosteriorRunRecord> {
    if !path.is_file() {
        return Err(Error::MissingArtifact { path: path.to_path_buf() });
    }
    let bytes = std::fs::read(path)?;
    let record: PosteriorRunRecord = serde_json::from_slice(&bytes)?;
    record.validate()?;
    Ok(record)
}

/// Write a run record as JSON.
pub fn write_run_record(path: &Path, record: &PosteriorRunRecord) -> Result<()> {
    record.validate()?;
    write_atomic(path, &serde_json::to_vec(record)?)
}

/// Run records stored as files named by a template.
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    dir: PathBuf,
    template: NameTemplate,
    experiment: String,
}

impl FileRecordStore {
    /// Store over `dir` for the experiment variant `experiment`.
    pub fn new(dir: impl Into<PathBuf>, template: NameTemplate, experiment: impl Into<String>) -> Self {
        Self { dir: dir.into(), template, experiment: experiment.into() }
    }

    /// Results directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File-name pattern of one cell.
    pub fn file_pattern(&self, zeta: f64, seed: u64) -> String {
        self.template.render(&NameFields { exp: &self.experiment, seed, zeta })
    }

    /// Path of the record for a cell, if present.
    ///
    /// Several files matching one wildcard pattern is an
    /// [`Error::AmbiguousMatch`].
    pub fn locate(&self, zeta: f64, seed: u64) -> Result<Option<PathBuf>> {
        locate_unique(&self.dir, &self.file_pattern(zeta, seed))
    }
}

impl RunRecordStore for FileRecordStore {
    fn fetch(&self, zeta: f64, seed: u64) -> Result<Option<PosteriorRunRecord>> {
        match self.locate(zeta, seed)? {
            Some(path) => read_run_record(&path).map(Some),
            None => Ok(None),
        }
    }

    fn describe(&self, zeta: f64, seed: u64) -> String {
        self.dir.join(self.file_pattern(zeta, seed)).display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bps_core::Array3;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn tmp_dir(name: &str) -> PathBuf {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
        let mut p = std::env::temp_dir();
        p.push(format!("bps_inference_posterior_{}_{}_{}", std::process::id(), nanos, name));
        std::fs::create_dir_all(&p).unwrap();
        p
    }

    fn record() -> PosteriorRunRecord {
        let arr = Array3::from_fn([2, 3, 4], |a, b, c| (a + b + c) as f64);
        PosteriorRunRecord {
            loadings: arr.clone(),
            signatures: arr,
            expected_loadings: Array3::from_fn([1, 2, 4], |_, b, _| b as f64),
            runtime: 12.5,
            hyperparameters: [("a".to_string(), 0.5)].into_iter().collect(),
            counts: None,
        }
    }

    #[test]
    fn test_store_resolves_template() {
        let dir = tmp_dir("store");
        let template = NameTemplate::parse("{exp}-zeta{zeta}-seed{seed}-*.json").unwrap();
        let store = FileRecordStore::new(&dir, template, "1-contamination-2.0");
        write_run_record(&dir.join("1-contamination-2.0-zeta0.3-seed2-a0.5.json"), &record())
            .unwrap();

        assert_eq!(store.fetch(0.3, 2).unwrap(), Some(record()));
        assert_eq!(store.fetch(0.3, 3).unwrap(), None);
        assert!(store.describe(0.3, 3).ends_with("1-contamination-2.0-zeta0.3-seed3-*.json"));
    }

    #[test]
    fn test_store_reports_ambiguity() {
        let dir = tmp_dir("ambiguous");
        let template = NameTemplate::parse("r-{seed}-*.json").unwrap();
        let store = FileRecordStore::new(&dir, template, "");
        write_run_record(&dir.join("r-1-x.json"), &record()).unwrap();
        write_run_record(&dir.join("r-1-y.json"), &record()).unwrap();
        assert!(matches!(store.fetch(1.0, 1), Err(Error::AmbiguousMatch { .. })));
    }

    #[test]
    fn test_missing_record_file() {
        let dir = tmp_dir("missing");
        let err = read_run_record(&dir.join("none.json")).unwrap_err();
        assert!(matches!(err, Error::MissingArtifact { .. }));
    }
}
