//! Batch-submission requests and the submitters that issue them.
//!
//! A submitter only launches the scheduler command. Whether the runs succeed
//! is observed later through their result files, never through the return
//! code of the submission.

use std::path::PathBuf;
use std::process::Command;

use bps_core::{Error, Result, format_param};
use serde::{Deserialize, Serialize};

/// One array job: every missing seed of a `(zeta, variant)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRequest {
    /// Scheduler job name.
    pub job_name: String,
    /// Tempering exponent passed to the sampler.
    pub zeta: f64,
    /// Experiment variant identifier; empty for the original counts.
    pub variant: String,
    /// Missing seeds, in grid order.
    pub seeds: Vec<u64>,
    /// Count table the sampler reads.
    pub data_file: String,
    /// Sampler script run by every array task.
    pub script: PathBuf,
    /// Scheduler stdout log pattern.
    pub stdout_log: PathBuf,
    /// Scheduler stderr log pattern.
    pub stderr_log: PathBuf,
}

impl SubmissionRequest {
    /// Compact array spec: the seeds joined by commas.
    pub fn array_spec(&self) -> String {
        self.seeds.iter().map(u64::to_string).collect::<Vec<_>>().join(",")
    }
}

/// Scheduler command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitCommand {
    /// Scheduler executable.
    pub program: String,
    /// Array flag, rendered as `{flag}={spec}`.
    pub array_flag: String,
    /// Job-name flag.
    pub job_name_flag: String,
    /// Stdout log flag.
    pub stdout_flag: String,
    /// Stderr log flag.
    pub stderr_flag: String,
    /// Extra arguments placed before the script.
    pub extra_args: Vec<String>,
}

impl Default for SubmitCommand {
    fn default() -> Self {
        Self {
            program: "sbatch".to_string(),
            array_flag: "--array".to_string(),
            job_name_flag: "--job-name".to_string(),
            stdout_flag: "-o".to_string(),
            stderr_flag: "-e".to_string(),
            extra_args: Vec::new(),
        }
    }
}

impl SubmitCommand {
    /// Arguments for `request`: flags, then `script zeta data_file`.
    pub fn args(&self, request: &SubmissionRequest) -> Vec<String> {
        let mut args = vec![
            format!("{}={}", self.array_flag, request.array_spec()),
            format!("{}={}", self.job_name_flag, request.job_name),
            self.stdout_flag.clone(),
            request.stdout_log.display().to_string(),
            self.stderr_flag.clone(),
            request.stderr_log.display().to_string(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args.push(request.script.display().to_string());
        args.push(format_param(request.zeta));
        args.push(request.data_file.clone());
        args
    }

    /// Full command line, for logs and dry runs.
    pub fn render(&self, request: &SubmissionRequest) -> String {
        std::iter::once(self.program.clone()).chain(self.args(request)).collect::<Vec<_>>().join(" ")
    }
}

/// Issues submission requests.
pub trait Submitter {
    /// Launch one request. An error means the command could not be issued.
    fn submit(&mut self, request: &SubmissionRequest) -> Result<()>;
}

/// Runs the scheduler command as a child process.
#[derive(Debug, Clone, Default)]
pub struct CommandSubmitter {
    command: SubmitCommand,
}

impl CommandSubmitter {
    /// Submitter for `command`.
    pub fn new(command: SubmitCommand) -> Self {
        Self { command }
    }
}

impl Submitter for CommandSubmitter {
    fn submit(&mut self, request: &SubmissionRequest) -> Result<()> {
        tracing::info!(command = %self.command.render(request), "submitting");
        let output = Command::new(&self.command.program)
            .args(self.command.args(request))
            .output()
            .map_err(|e| {
                Error::Submission(format!("failed to launch '{}': {e}", self.command.program))
            })?;
        if !output.status.success() {
            // The scheduler may still have queued work; the next scan decides.
            tracing::warn!(
                job = %request.job_name,
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "scheduler returned non-zero"
            );
        }
        Ok(())
    }
}

/// Records requests without launching anything.
#[derive(Debug, Clone, Default)]
pub struct DryRunSubmitter {
    command: SubmitCommand,
    issued: Vec<SubmissionRequest>,
}

impl DryRunSubmitter {
    /// Dry-run submitter rendering lines with `command`.
    pub fn new(command: SubmitCommand) -> Self {
        Self { command, issued: Vec::new() }
    }

    /// Requests seen so far.
    pub fn issued(&self) -> &[SubmissionRequest] {
        &self.issued
    }

    /// Command lines that would have been run.
    pub fn command_lines(&self) -> Vec<String> {
        self.issued.iter().map(|r| self.command.render(r)).collect()
    }
}

impl Submitter for DryRunSubmitter {
    fn submit(&mut self, request: &SubmissionRequest) -> Result<()> {
        tracing::info!(command = %self.command.render(request), "dry run");
        self.issued.push(request.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SubmissionRequest {
        SubmissionRequest {
            job_name: "syn-seed-1_NMF_0.1".into(),
            zeta: 0.1,
            variant: "1".into(),
            seeds: vec![2, 5, 9],
            data_file: "syn-seed-1.tsv".into(),
            script: PathBuf::from("exp/experiment_scripts/run_nmf.sh"),
            stdout_log: PathBuf::from("exp/logs/output_%A_%a.out"),
            stderr_log: PathBuf::from("exp/logs/error_%A_%a.err"),
        }
    }

    #[test]
    fn test_array_spec_and_args() {
        let req = request();
        assert_eq!(req.array_spec(), "2,5,9");
        let cmd = SubmitCommand::default();
        assert_eq!(
            cmd.render(&req),
            "sbatch --array=2,5,9 --job-name=syn-seed-1_NMF_0.1 -o exp/logs/output_%A_%a.out \
             -e exp/logs/error_%A_%a.err exp/experiment_scripts/run_nmf.sh 0.1 syn-seed-1.tsv"
        );
    }

    #[test]
    fn test_unlaunchable_program_is_submission_error() {
        let cmd = SubmitCommand {
            program: "/nonexistent/bps-scheduler".into(),
            ..SubmitCommand::default()
        };
        let err = CommandSubmitter::new(cmd).submit(&request()).unwrap_err();
        assert!(matches!(err, Error::Submission(_)));
    }

    #[test]
    fn test_dry_run_records() {
        let mut sub = DryRunSubmitter::new(SubmitCommand::default());
        sub.submit(&request()).unwrap();
        assert_eq!(sub.issued().len(), 1);
        assert!(sub.command_lines()[0].starts_with("sbatch --array=2,5,9"));
    }
}
