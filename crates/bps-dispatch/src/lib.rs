//! # bps-dispatch
//!
//! Resumable dispatch of sampler runs to a batch scheduler.
//!
//! - [`JobDispatcher`]: diff the run grid against result files and submit
//!   the missing cells as array jobs
//! - [`DispatchLedger`]: persisted per-cell state (pending, submitted, done, failed)
//! - [`Submitter`]: the seam to the scheduler command, with a process-backed
//!   and a dry-run implementation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dispatcher;
pub mod ledger;
pub mod submit;

pub use dispatcher::{
    ALL_COMPLETE_MESSAGE, DispatchGrid, DispatchOutcome, JobDispatcher, experiment_subdirs,
    missing_cells,
};
pub use ledger::{CellEntry, CellKey, CellState, DispatchLedger, LEDGER_FILE};
pub use submit::{CommandSubmitter, DryRunSubmitter, SubmissionRequest, SubmitCommand, Submitter};
