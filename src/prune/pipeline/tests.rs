//! Tests for the pruning pipeline module

use super::*;
use crate::cli::LogLevel;
use crate::config::{parse_spec, PruneJobSpec};
use crate::error::Error;
use crate::model::tests::{export_to, tiny_model};
use crate::model::{inspect, load_config, CalibratableModel, GptModel, KeptChannels};
use crate::runtime::Runtime;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const TEXTS: [&str; 6] = [
    "The quick brown fox jumps over the lazy dog.",
    "Structured pruning removes whole channels.",
    "Calibration text drives the importance estimate.",
    "Every batch has the same number of prompts.",
    "Short",
    "A last line that only matters when the sample size allows it.",
];

/// Checkpoint, JSONL dataset and job spec under one temp dir
fn job(tmp: &Path, overrides: &[&str]) -> PruneJobSpec {
    let checkpoint = tmp.join("tiny");
    tiny_model(5).save_to(&checkpoint, &export_to(&checkpoint)).unwrap();

    let dataset = tmp.join("calib.jsonl");
    let lines: Vec<String> = TEXTS.iter().map(|t| serde_json::json!({ "text": t }).to_string()).collect();
    fs::write(&dataset, lines.join("\n")).unwrap();

    let yaml = format!(
        "model:\n  restore_from_path: '{}'\n  seq_length: 128\n\
         trainer:\n  accelerator: cpu\n  precision: 32\n  num_threads: 2\n\
         prune:\n  calib_dataset: '{}'\n  num_calib_size: 4\n  ffn_hidden_size: 8\n  \
         num_attention_heads: 2\n  num_query_groups: 1\n\
         export:\n  save_path: '{}'\n\
         inference:\n  batch_size: 2\n  max_context_length: 32\n",
        checkpoint.display(),
        dataset.display(),
        tmp.join("pruned").display(),
    );
    let overrides: Vec<String> = overrides.iter().map(|s| (*s).to_string()).collect();
    parse_spec(&yaml, &overrides).unwrap()
}

// =============================================================================
// PruningStage Tests
// =============================================================================

#[test]
fn test_stage_is_active() {
    // TEST_ID: PL-001
    assert!(!PruningStage::Idle.is_active(), "PL-001 FALSIFIED: Idle should not be active");
    assert!(PruningStage::Restoring.is_active(), "PL-001 FALSIFIED: Restoring should be active");
    assert!(PruningStage::Calibrating.is_active(), "PL-001 FALSIFIED: Calibrating should be active");
    assert!(PruningStage::Pruning.is_active(), "PL-001 FALSIFIED: Pruning should be active");
    assert!(PruningStage::Correcting.is_active());
    assert!(PruningStage::Exporting.is_active());
    assert!(!PruningStage::Complete.is_active(), "PL-001 FALSIFIED: Complete should not be active");
    assert!(!PruningStage::Failed.is_active(), "PL-001 FALSIFIED: Failed should not be active");
}

#[test]
fn test_stage_is_terminal() {
    // TEST_ID: PL-002
    assert!(!PruningStage::Idle.is_terminal(), "PL-002 FALSIFIED: Idle should not be terminal");
    assert!(!PruningStage::Pruning.is_terminal(), "PL-002 FALSIFIED: Pruning should not be terminal");
    assert!(PruningStage::Complete.is_terminal(), "PL-002 FALSIFIED: Complete should be terminal");
    assert!(PruningStage::Failed.is_terminal(), "PL-002 FALSIFIED: Failed should be terminal");
}

#[test]
fn test_stage_order() {
    // TEST_ID: PL-003
    let mut stage = PruningStage::default();
    let mut seen = vec![stage];
    while !stage.is_terminal() {
        stage = stage.next();
        seen.push(stage);
    }
    assert_eq!(
        seen,
        vec![
            PruningStage::Idle,
            PruningStage::Restoring,
            PruningStage::Calibrating,
            PruningStage::Pruning,
            PruningStage::Correcting,
            PruningStage::Exporting,
            PruningStage::Complete,
        ],
        "PL-003 FALSIFIED: stages must run in fixed order"
    );
    assert_eq!(PruningStage::Failed.next(), PruningStage::Failed);
    assert_eq!(PruningStage::Correcting.display_name(), "Correcting Config");
}

// =============================================================================
// PruningMetrics Tests
// =============================================================================

#[test]
fn test_metrics_parameters() {
    // TEST_ID: PL-004
    let mut metrics = PruningMetrics::new();
    assert_eq!(metrics.retained_fraction(), 1.0);
    metrics.update_parameters(1000, 600);
    assert_eq!(metrics.parameters_removed(), 400);
    assert!((metrics.retained_fraction() - 0.6).abs() < 1e-12, "PL-004 FALSIFIED: 600 of 1000 kept");

    // growth is not negative removal
    metrics.update_parameters(10, 20);
    assert_eq!(metrics.parameters_removed(), 0);
}

#[test]
fn test_metrics_stage_durations() {
    // TEST_ID: PL-005
    let mut metrics = PruningMetrics::new();
    metrics.record_stage_duration(PruningStage::Calibrating, 1.5);
    metrics.record_stage_duration(PruningStage::Pruning, 2.0);
    assert!((metrics.total_duration_secs() - 3.5).abs() < 1e-12);
    assert_eq!(metrics.stage_duration(PruningStage::Pruning), Some(2.0));
    assert_eq!(metrics.stage_duration(PruningStage::Exporting), None);
}

#[test]
fn test_metrics_serde() {
    let mut metrics = PruningMetrics::new();
    metrics.update_parameters(8, 4);
    metrics.kept = vec![KeptChannels { ffn_neurons: vec![0, 2], heads: vec![1], query_groups: vec![0] }];
    let json = serde_json::to_string(&metrics).unwrap();
    let back: PruningMetrics = serde_json::from_str(&json).unwrap();
    assert_eq!(back, metrics);
}

// =============================================================================
// PrunePipeline Tests
// =============================================================================

#[test]
fn test_pipeline_initial_state() {
    let tmp = TempDir::new().unwrap();
    let spec = job(tmp.path(), &[]);
    let pipeline = PrunePipeline::new(&spec, LogLevel::Quiet);
    assert_eq!(pipeline.stage(), PruningStage::Idle);
    assert!(pipeline.error().is_none());
    assert_eq!(pipeline.metrics(), &PruningMetrics::default());
}

#[test]
fn test_pipeline_advance_and_fail() {
    // TEST_ID: PL-006
    let tmp = TempDir::new().unwrap();
    let spec = job(tmp.path(), &[]);
    let mut pipeline = PrunePipeline::new(&spec, LogLevel::Quiet);
    pipeline.advance();
    pipeline.advance();
    assert_eq!(pipeline.stage(), PruningStage::Calibrating);
    assert_eq!(
        pipeline.metrics().stage_durations.len(),
        1,
        "PL-006 FALSIFIED: leaving a stage records its duration"
    );
    pipeline.fail("dataset unreachable");
    assert_eq!(pipeline.stage(), PruningStage::Failed);
    assert_eq!(pipeline.error(), Some("dataset unreachable"));
}

#[test]
fn test_run_prune_job_end_to_end() {
    // TEST_ID: PL-007
    let tmp = TempDir::new().unwrap();
    let spec = job(tmp.path(), &[]);
    let outcome = run_prune_job(&spec, LogLevel::Quiet).unwrap();

    assert_eq!(outcome.save_path, tmp.path().join("pruned"));
    assert_eq!(outcome.workers, 2, "PL-007 FALSIFIED: barrier must reach every worker");
    assert_eq!(outcome.world_size, 1);
    assert_eq!(outcome.metrics.calibration_batches, 2);
    assert_eq!(outcome.metrics.calibration_samples, 4);
    assert!(outcome.metrics.parameters_after < outcome.metrics.parameters_before);
    assert_eq!(outcome.metrics.kept.len(), 2);
    assert_eq!(outcome.metrics.stage_durations.len(), 5);

    let saved = load_config(&outcome.save_path).unwrap();
    assert_eq!(saved.name(), Some("modelopt"));
    assert_eq!(saved.usize_field("ffn_hidden_size").unwrap(), Some(8));
    assert_eq!(saved.usize_field("num_attention_heads").unwrap(), Some(2));
    assert_eq!(saved.usize_field("num_query_groups").unwrap(), Some(1));
    assert_eq!(
        saved.usize_field("kv_channels").unwrap(),
        Some(4),
        "PL-007 FALSIFIED: kv_channels pinned to the unpruned head width"
    );
    assert_eq!(saved.usize_field("seq_length").unwrap(), Some(128));

    let model = GptModel::restore_from(&outcome.save_path, &saved, &spec.trainer).unwrap();
    assert_eq!(model.dims().ffn_hidden_size, 8);
    assert!(model.forward(&[1, 2, 3], false).is_ok());
    let summary = inspect(&outcome.save_path).unwrap();
    assert_eq!(summary.tensors.len(), model.state_dict().len());
    assert_eq!(summary.num_parameters(), outcome.metrics.parameters_after);
}

#[test]
fn test_missing_checkpoint_fails_before_export() {
    // TEST_ID: PL-008
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nowhere");
    let spec = job(tmp.path(), &[&format!("model.restore_from_path={}", missing.display())]);
    let err = run_prune_job(&spec, LogLevel::Quiet).unwrap_err();
    assert!(
        matches!(err, Error::Checkpoint { .. }),
        "PL-008 FALSIFIED: unexpected error {err:?}"
    );
    assert!(!tmp.path().join("pruned").exists(), "PL-008 FALSIFIED: nothing may be written on failure");
}

#[test]
fn test_invalid_targets_fail_in_pruning() {
    let tmp = TempDir::new().unwrap();
    let spec = job(tmp.path(), &["prune.ffn_hidden_size=4096"]);
    let err = run_prune_job(&spec, LogLevel::Quiet).unwrap_err();
    assert!(matches!(err, Error::Prune(_)));
    assert!(!tmp.path().join("pruned").exists());
}

#[test]
fn test_dataset_smaller_than_batch_rejected() {
    // TEST_ID: PL-009
    let tmp = TempDir::new().unwrap();
    let spec = job(tmp.path(), &["inference.batch_size=16"]);
    let err = run_prune_job(&spec, LogLevel::Quiet).unwrap_err();
    assert!(matches!(err, Error::Dataset(_)), "PL-009 FALSIFIED: L < B must be rejected, got {err:?}");
}

#[test]
fn test_pipeline_runs_on_caller_runtime() {
    // TEST_ID: PL-010
    let tmp = TempDir::new().unwrap();
    let spec = job(tmp.path(), &["trainer.num_threads=3"]);
    let runtime = Runtime::for_job(&spec.trainer).unwrap();
    assert_eq!(runtime.num_threads(), 3);

    let outcome = PrunePipeline::new(&spec, LogLevel::Quiet).run(&runtime).unwrap();
    assert_eq!(outcome.workers, 3, "PL-010 FALSIFIED: the pipeline must use the pool it was given");
    assert!(outcome.save_path.join("model_weights.safetensors").is_file());
}
