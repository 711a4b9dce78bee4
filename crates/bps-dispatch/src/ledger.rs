//! Dispatch ledger: the state of every `(zeta, variant, seed)` cell.
//!
//! Result-file existence stays the ground truth; the ledger records what the
//! dispatcher observed and issued so operators can see retries and launch
//! failures. It is persisted as JSON and replaced atomically.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use bps_core::{Result, format_param, write_atomic};
use serde::{Deserialize, Serialize};

/// Ledger file name inside an experiment directory.
pub const LEDGER_FILE: &str = "dispatch-ledger.json";

/// Identity of one sampler run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellKey {
    /// Zeta as rendered in names (`0.1`, `1.0`).
    pub zeta: String,
    /// Experiment variant identifier; empty for the original counts.
    pub variant: String,
    /// Sampler seed.
    pub seed: u64,
}

impl CellKey {
    /// Key for a numeric zeta.
    pub fn new(zeta: f64, variant: &str, seed: u64) -> Self {
        Self { zeta: format_param(zeta), variant: variant.to_string(), seed }
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "zeta={} variant={} seed={}", self.zeta, self.variant, self.seed)
    }
}

/// Lifecycle of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellState {
    /// No result and not submitted by this ledger.
    Pending,
    /// Submitted; no result seen yet.
    Submitted,
    /// Result file present.
    Done,
    /// The submission command could not be issued.
    Failed,
}

/// State and submission count of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellEntry {
    /// Current state.
    pub state: CellState,
    /// Number of submissions issued.
    pub attempts: u32,
}

#[derive(Serialize, Deserialize)]
struct LedgerRow {
    #[serde(flatten)]
    key: CellKey,
    state: CellState,
    attempts: u32,
}

#[derive(Serialize, Deserialize)]
struct LedgerFile {
    cells: Vec<LedgerRow>,
}

/// State table keyed by [`CellKey`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchLedger {
    cells: BTreeMap<CellKey, CellEntry>,
}

impl DispatchLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the ledger at `path`; a missing file is an empty ledger.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Ok(Self::new());
        }
        let file: LedgerFile = serde_json::from_slice(&std::fs::read(path)?)?;
        let cells = file
            .cells
            .into_iter()
            .map(|r| (r.key, CellEntry { state: r.state, attempts: r.attempts }))
            .collect();
        Ok(Self { cells })
    }

    /// Write the ledger via a temp file and rename.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = LedgerFile {
            cells: self
                .cells
                .iter()
                .map(|(k, e)| LedgerRow { key: k.clone(), state: e.state, attempts: e.attempts })
                .collect(),
        };
        write_atomic(path, &serde_json::to_vec_pretty(&file)?)
    }

    /// Entry of `key`, if tracked.
    pub fn get(&self, key: &CellKey) -> Option<CellEntry> {
        self.cells.get(key).copied()
    }

    /// State of `key`; untracked cells are pending.
    pub fn state(&self, key: &CellKey) -> CellState {
        self.get(key).map_or(CellState::Pending, |e| e.state)
    }

    /// Number of tracked cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// `true` when no cell is tracked.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Record a scan result for `key`.
    ///
    /// A present result makes the cell done. A missing one leaves submitted
    /// and failed cells as they are and turns a done cell (whose result
    /// disappeared) back into pending.
    pub fn observe(&mut self, key: &CellKey, result_present: bool) {
        let entry =
            self.cells.entry(key.clone()).or_insert(CellEntry { state: CellState::Pending, attempts: 0 });
        entry.state = match (result_present, entry.state) {
            (true, _) => CellState::Done,
            (false, CellState::Done) => CellState::Pending,
            (false, s) => s,
        };
    }

    /// Record a successful submission.
    pub fn mark_submitted(&mut self, key: &CellKey) {
        let entry =
            self.cells.entry(key.clone()).or_insert(CellEntry { state: CellState::Pending, attempts: 0 });
        entry.state = CellState::Submitted;
        entry.attempts += 1;
    }

    /// Record a submission that could not be issued.
    pub fn mark_failed(&mut self, key: &CellKey) {
        let entry =
            self.cells.entry(key.clone()).or_insert(CellEntry { state: CellState::Pending, attempts: 0 });
        entry.state = CellState::Failed;
    }

    /// Number of cells per state.
    pub fn counts(&self) -> BTreeMap<&'static str, usize> {
        let mut out = BTreeMap::new();
        for e in self.cells.values() {
            let name = match e.state {
                CellState::Pending => "pending",
                CellState::Submitted => "submitted",
                CellState::Done => "done",
                CellState::Failed => "failed",
            };
            *out.entry(name).or_insert(0) += 1;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn tmp_dir(name: &str) -> PathBuf {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
        let mut p = std::env::temp_dir();
        p.push(format!("bps_dispatch_ledger_{}_{}_{}", std::process::id(), nanos, name));
        std::fs::create_dir_all(&p).unwrap();
        p
    }

    #[test]
    fn test_transitions() {
        let mut ledger = DispatchLedger::new();
        let key = CellKey::new(0.1, "1", 3);
        assert_eq!(ledger.state(&key), CellState::Pending);

        ledger.observe(&key, false);
        ledger.mark_submitted(&key);
        ledger.observe(&key, false);
        assert_eq!(ledger.state(&key), CellState::Submitted);
        ledger.mark_submitted(&key);
        assert_eq!(ledger.get(&key).unwrap().attempts, 2);

        ledger.observe(&key, true);
        assert_eq!(ledger.state(&key), CellState::Done);
        ledger.observe(&key, false);
        assert_eq!(ledger.state(&key), CellState::Pending);

        ledger.mark_failed(&key);
        assert_eq!(ledger.state(&key), CellState::Failed);
        assert_eq!(ledger.counts().get("failed"), Some(&1));
    }

    #[test]
    fn test_persistence() {
        let dir = tmp_dir("persist");
        let path = dir.join(LEDGER_FILE);
        assert!(DispatchLedger::load(&path).unwrap().is_empty());

        let mut ledger = DispatchLedger::new();
        ledger.mark_submitted(&CellKey::new(1.0, "", 1));
        ledger.observe(&CellKey::new(0.2, "1-contamination-2.0", 2), true);
        ledger.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"zeta\": \"1.0\""));
        assert!(text.contains("\"submitted\""));
        assert_eq!(DispatchLedger::load(&path).unwrap(), ledger);
        assert!(!dir.join(format!("{LEDGER_FILE}.tmp")).exists());
    }
}
