//! bps CLI
//!
//! Drives the signature-evaluation pipeline over one experiment directory:
//! catalog, synthetic data, batch dispatch, evidence evaluation and
//! diagnostics.

mod config;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use bps_dispatch::{
    CommandSubmitter, DispatchGrid, DispatchOutcome, DryRunSubmitter, JobDispatcher,
};
use bps_inference::{
    EvidenceSummary, FileRecordStore, PoissonNmfEvidence, RunEvidenceEvaluator, ZetaDiagnostics,
    summary_file_name,
};
use bps_synth::{GroundTruthSummary, NoiseModelGenerator, read_manifest};
use config::{ExperimentConfig, ExperimentPaths, read_experiment_config};

#[derive(Parser)]
#[command(name = "bps")]
#[command(about = "Bayesian power analysis of mutational-signature inference")]
#[command(version)]
struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the experiment layout and update the experiment manifest
    Catalog {
        /// Experiment config (YAML or JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Output file for the manifest (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate synthetic count tables for every cataloged variant
    Generate {
        #[arg(short, long)]
        config: PathBuf,

        /// Regenerate tables that already exist
        #[arg(long)]
        overwrite: bool,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Submit sampler runs for every missing (zeta, variant, seed) cell
    Dispatch {
        #[arg(short, long)]
        config: PathBuf,

        /// Print the scheduler commands without submitting
        #[arg(long)]
        dry_run: bool,

        /// Target the original counts instead of the cataloged variants
        #[arg(long)]
        original: bool,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Estimate evidence per zeta and write the summary archive
    Evaluate {
        #[arg(short, long)]
        config: PathBuf,

        /// Only this variant (default: every manifest entry)
        #[arg(long)]
        variant: Option<String>,

        /// Evaluate runs on the original counts
        #[arg(long, conflicts_with = "variant")]
        original: bool,

        /// Recompute even when a summary archive exists
        #[arg(long)]
        force: bool,

        /// Thinning factor (overrides `skip` in the config)
        #[arg(long)]
        skip: Option<usize>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Finite-difference diagnostics of the evidence curves
    Diagnose {
        #[arg(short, long)]
        config: PathBuf,

        #[arg(long)]
        variant: Option<String>,

        #[arg(long, conflicts_with = "variant")]
        original: bool,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Catalog { config, output } => cmd_catalog(&config, output.as_ref()),
        Commands::Generate { config, overwrite, output } => {
            cmd_generate(&config, overwrite, output.as_ref())
        }
        Commands::Dispatch { config, dry_run, original, output } => {
            cmd_dispatch(&config, dry_run, original, output.as_ref())
        }
        Commands::Evaluate { config, variant, original, force, skip, output } => {
            cmd_evaluate(&config, variant, original, force, skip, output.as_ref())
        }
        Commands::Diagnose { config, variant, original, output } => {
            cmd_diagnose(&config, variant, original, output.as_ref())
        }
    }
}

fn cmd_catalog(config: &Path, output: Option<&PathBuf>) -> Result<()> {
    let cfg = read_experiment_config(config)?;
    let paths = cfg.paths();
    paths.create_all()?;
    let manifest = cfg.catalog().write_manifest(&paths.manifest)?;
    write_json(
        output,
        serde_json::json!({
            "experiment": cfg.experiment_name,
            "manifest": paths.manifest,
            "experiments": manifest,
        }),
    )
}

fn cmd_generate(config: &Path, overwrite: bool, output: Option<&PathBuf>) -> Result<()> {
    let cfg = read_experiment_config(config)?;
    let paths = cfg.paths();
    paths.create_all()?;

    let loadings_path = cfg.loadings.as_ref().context("config has no `loadings` path")?;
    if !loadings_path.is_file() {
        bail!(
            "ground-truth loadings {} not found; Stage I (loadings from the original fit) is incomplete",
            loadings_path.display()
        );
    }
    let loadings = bps_synth::io::read_loadings_tsv(loadings_path)
        .with_context(|| format!("reading loadings {}", loadings_path.display()))?;

    let signatures_path = cfg.signatures.as_ref().context("config has no `signatures` path")?;
    let channels = cfg.substitution_type()?.channel_labels();
    let mut signatures =
        bps_synth::io::read_signature_table(signatures_path, &cfg.signature_prefix, &channels)
            .with_context(|| format!("reading signatures {}", signatures_path.display()))?;
    if let Some(indices) = &cfg.signature_indices {
        let rows = indices
            .iter()
            .map(|&i| i.checked_sub(1).context("signature_indices are 1-based"))
            .collect::<Result<Vec<usize>>>()?;
        signatures = signatures.select(&rows)?;
    }
    let names = signatures.names().to_vec();

    let generator =
        NoiseModelGenerator::new(loadings, signatures)?.with_channel_labels(channels)?;
    let catalog = cfg.catalog();
    catalog.write_manifest(&paths.manifest)?;
    let written =
        catalog.materialize(&generator, &paths.synthetic_data, &cfg.synthetic_prefix, overwrite)?;

    let truth = GroundTruthSummary::from_loadings(generator.loadings(), &names, cfg.trim_sigs)?;
    let truth_path =
        catalog.write_ground_truth(&truth, &paths.synthetic_data, &cfg.synthetic_prefix)?;
    tracing::info!(
        tables = written.len(),
        retained = truth.entries().len(),
        "synthetic data ready"
    );

    write_json(
        output,
        serde_json::json!({
            "counts": written,
            "ground_truth": truth_path,
            "retained_signatures": truth.signatures(),
        }),
    )
}

fn cmd_dispatch(
    config: &Path,
    dry_run: bool,
    original: bool,
    output: Option<&PathBuf>,
) -> Result<()> {
    let cfg = read_experiment_config(config)?;
    let paths = cfg.paths();
    let variants = if original { Vec::new() } else { manifest_variants(&paths)? };
    let grid = DispatchGrid::new(cfg.zetas.clone(), variants, cfg.seeds())?;
    let dispatcher =
        JobDispatcher::new(&paths.root, cfg.synthetic_prefix.clone(), cfg.output_template()?, grid);

    if dry_run {
        let mut submitter = DryRunSubmitter::new(cfg.submit.clone());
        dispatcher.preview(&mut submitter)?;
        let missing: usize = submitter.issued().iter().map(|r| r.seeds.len()).sum();
        return write_json(
            output,
            serde_json::json!({
                "dry_run": true,
                "completed": dispatcher.grid().keys().len() - missing,
                "missing": missing,
                "commands": submitter.command_lines(),
            }),
        );
    }

    std::fs::create_dir_all(&paths.logs)
        .with_context(|| format!("creating {}", paths.logs.display()))?;
    let mut submitter = CommandSubmitter::new(cfg.submit.clone());
    let value = match dispatcher.dispatch(&mut submitter)? {
        DispatchOutcome::AllComplete => serde_json::json!({
            "complete": true,
            "message": bps_dispatch::ALL_COMPLETE_MESSAGE,
        }),
        DispatchOutcome::Submitted { requests, failed } => serde_json::json!({
            "complete": false,
            "submitted": requests,
            "failed": failed,
            "ledger": dispatcher.ledger_path(),
        }),
    };
    write_json(output, value)
}

fn cmd_evaluate(
    config: &Path,
    variant: Option<String>,
    original: bool,
    force: bool,
    skip: Option<usize>,
    output: Option<&PathBuf>,
) -> Result<()> {
    let mut cfg = read_experiment_config(config)?;
    if let Some(skip) = skip {
        cfg.skip = skip;
        cfg.validate()?;
    }
    let paths = cfg.paths();
    let template = cfg.output_template()?;
    let seeds = cfg.seeds();

    let mut summaries = Vec::new();
    for v in selected_variants(&paths, variant, original)? {
        let counts_path = counts_path(&cfg, &paths, &v);
        let model = if counts_path.is_file() {
            PoissonNmfEvidence::with_counts(
                bps_synth::io::read_counts_tsv(&counts_path)
                    .with_context(|| format!("reading counts {}", counts_path.display()))?,
            )
        } else {
            tracing::warn!(path = %counts_path.display(), "count table not found; relying on counts stored in run records");
            PoissonNmfEvidence::new()
        };
        let evaluator = RunEvidenceEvaluator::new(model).with_skip(cfg.skip)?;
        let store = FileRecordStore::new(&paths.results, template.clone(), v.clone());
        let cache = paths.results.join(summary_file_name(&cfg.experiment_name, &v));
        let summary = evaluator.evaluate_cached(
            &store,
            &cfg.experiment_name,
            &v,
            &cfg.zetas,
            &seeds,
            &cache,
            force,
        )?;
        summaries.push(serde_json::json!({
            "variant": v,
            "summary": cache,
            "best_seed": summary.best_seed,
            "valid_zetas": summary.valid().zetas,
        }));
    }
    write_json(output, serde_json::Value::Array(summaries))
}

fn cmd_diagnose(
    config: &Path,
    variant: Option<String>,
    original: bool,
    output: Option<&PathBuf>,
) -> Result<()> {
    let cfg = read_experiment_config(config)?;
    let paths = cfg.paths();
    std::fs::create_dir_all(&paths.figures)
        .with_context(|| format!("creating {}", paths.figures.display()))?;

    let mut reports = Vec::new();
    for v in selected_variants(&paths, variant, original)? {
        let summary_path = paths.results.join(summary_file_name(&cfg.experiment_name, &v));
        let summary = EvidenceSummary::load(&summary_path).with_context(|| {
            format!("loading {}; run `bps evaluate` first", summary_path.display())
        })?;
        let diagnostics = ZetaDiagnostics::from_summary(&summary)?;
        let out_path = paths.figures.join(diagnostics_file_name(&cfg.experiment_name, &v));
        bps_core::write_atomic(&out_path, &serde_json::to_vec_pretty(&diagnostics)?)
            .with_context(|| format!("writing {}", out_path.display()))?;
        reports.push(serde_json::json!({
            "variant": v,
            "diagnostics": out_path,
            "elbows": diagnostics
                .curves()
                .iter()
                .map(|c| serde_json::json!({ "curve": c.name, "elbow": c.elbow }))
                .collect::<Vec<_>>(),
        }));
    }
    write_json(output, serde_json::Value::Array(reports))
}

fn manifest_variants(paths: &ExperimentPaths) -> Result<Vec<String>> {
    read_manifest(&paths.manifest).with_context(|| {
        format!("reading {}; run `bps catalog` first", paths.manifest.display())
    })
}

fn selected_variants(
    paths: &ExperimentPaths,
    variant: Option<String>,
    original: bool,
) -> Result<Vec<String>> {
    if original {
        return Ok(vec![String::new()]);
    }
    match variant {
        Some(v) => Ok(vec![v]),
        None => manifest_variants(paths),
    }
}

fn counts_path(cfg: &ExperimentConfig, paths: &ExperimentPaths, variant: &str) -> PathBuf {
    if variant.is_empty() {
        cfg.original_counts.clone().unwrap_or_else(|| {
            paths.synthetic_data.join(format!("{}_original_counts.tsv", cfg.synthetic_prefix))
        })
    } else {
        paths.synthetic_data.join(bps_synth::data_file_name(&cfg.synthetic_prefix, variant))
    }
}

fn diagnostics_file_name(experiment: &str, variant: &str) -> String {
    if variant.is_empty() {
        format!("{experiment}-diagnostics.json")
    } else {
        format!("{experiment}-{variant}-diagnostics.json")
    }
}

fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    let json = serde_json::to_string_pretty(&value)?;
    if let Some(path) = output {
        bps_core::write_atomic(path, json.as_bytes())?;
    } else {
        println!("{}", json);
    }
    Ok(())
}
