//! Catalog materialization and manifest maintenance on disk.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use bps_core::{CorruptionModel, Error, LoadingsMatrix, SignatureSet};
use bps_synth::{ExperimentCatalog, GroundTruthSummary, NoiseModelGenerator, io, read_manifest};

fn tmp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let mut p = std::env::temp_dir();
    p.push(format!("bps_synth_catalog_{}_{}_{}", std::process::id(), nanos, name));
    std::fs::create_dir_all(&p).unwrap();
    p
}

fn small_generator() -> NoiseModelGenerator {
    let sigs = SignatureSet::from_rows(
        vec!["Signature 1".into(), "Signature 2".into()],
        &[vec![0.5, 0.25, 0.125, 0.125], vec![0.1, 0.2, 0.3, 0.4]],
    )
    .unwrap();
    let loadings = LoadingsMatrix::from_rows(&[vec![40.0, 20.0, 15.0], vec![5.0, 30.0, 107.5]]).unwrap();
    NoiseModelGenerator::new(loadings, sigs).unwrap()
}

#[test]
fn test_manifest_is_append_only() {
    let dir = tmp_dir("manifest");
    let path = dir.join("experiment_list.txt");

    let first = ExperimentCatalog::new(1).with_contamination(vec![2.0]);
    assert_eq!(first.write_manifest(&path).unwrap(), vec!["1", "1-contamination-2.0"]);

    let second = ExperimentCatalog::new(1)
        .with_perturbed(vec![0.0025])
        .with_contamination(vec![2.0])
        .with_overdispersed(vec![2.0]);
    let manifest = second.write_manifest(&path).unwrap();
    assert_eq!(
        manifest,
        vec!["1", "1-contamination-2.0", "1-perturbed-0.0025", "1-overdispersed-2.0"]
    );
    assert_eq!(read_manifest(&path).unwrap(), manifest);

    // Re-running with the same catalog leaves the file unchanged.
    let before = std::fs::read_to_string(&path).unwrap();
    second.write_manifest(&path).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn test_materialize_writes_every_variant() {
    let dir = tmp_dir("materialize");
    let catalog = ExperimentCatalog::new(3)
        .with_perturbed(vec![0.01])
        .with_contamination(vec![5.0])
        .with_overdispersed(vec![2.0])
        .with_dirichlet(vec![100.0]);
    let generator = small_generator();
    let paths = catalog.materialize(&generator, &dir, "synthetic-test", false).unwrap();
    assert_eq!(paths.len(), 5);
    assert!(paths[0].ends_with("synthetic-test-seed-3.tsv"));
    assert!(paths[4].ends_with("synthetic-test-seed-3-dirichlet-100.0.tsv"));

    let exact = io::read_counts_tsv(&paths[0]).unwrap();
    assert_eq!(exact, generator.generate(&CorruptionModel::Exact, 3).unwrap());

    // Existing tables are kept as-is.
    std::fs::write(&paths[1], "sentinel").unwrap();
    catalog.materialize(&generator, &dir, "synthetic-test", false).unwrap();
    assert_eq!(std::fs::read_to_string(&paths[1]).unwrap(), "sentinel");
}

#[test]
fn test_invalid_variant_writes_nothing() {
    let dir = tmp_dir("invalid");
    let catalog = ExperimentCatalog::new(1).with_overdispersed(vec![2.0, 0.5]);
    let err = catalog.materialize(&small_generator(), &dir, "p", false).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
    assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
}

#[test]
fn test_ground_truth_file_for_seed() {
    let dir = tmp_dir("gt");
    let generator = small_generator();
    let summary = GroundTruthSummary::from_loadings(
        generator.loadings(),
        generator.signatures().names(),
        true,
    )
    .unwrap();
    let catalog = ExperimentCatalog::new(8);
    let path = catalog.write_ground_truth(&summary, &dir, "synthetic-test").unwrap();
    assert!(path.ends_with("synthetic-test-seed-8-GT-loadings.csv"));
    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text, "25,Signature 1\n47.5,Signature 2\n");
}
