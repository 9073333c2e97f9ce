//! End-to-end pruning tests
//!
//! Builds a random checkpoint on disk, prunes it with a local calibration
//! file on the CPU backend and reloads the result.

use podar::config::{parse_spec, validate_spec, ExportSpec, PruneJobSpec};
use podar::model::{inspect, load_config, CalibratableModel, GptModel, ModelConfig, WeightDtype};
use podar::prune::{get_calib_dataloader, run_prune_job, PruningStage};
use podar::{Error, LogLevel};
use std::path::Path;
use tempfile::TempDir;

const MODEL_YAML: &str = "\
name: megatron_gpt
hidden_size: 32
ffn_hidden_size: 64
num_attention_heads: 8
num_query_groups: 4
kv_channels: null
num_layers: 3
seq_length: 256
";

fn write_checkpoint(dir: &Path) {
    let config = ModelConfig::from_yaml(MODEL_YAML).unwrap();
    let model = GptModel::random(config, 64, 42, WeightDtype::F32).unwrap();
    let export = ExportSpec { decoder_type: "llama".to_string(), inference_tensor_parallel: 1, save_path: dir.to_path_buf() };
    model.save_to(dir, &export).unwrap();
}

/// Top-level JSON array with `count` records
fn write_dataset(path: &Path, count: usize) {
    let records: Vec<serde_json::Value> = (0..count)
        .map(|i| serde_json::json!({ "text": format!("Document {i}: {}", "lorem ipsum dolor ".repeat(i % 5 + 1)) }))
        .collect();
    std::fs::write(path, serde_json::to_string(&records).unwrap()).unwrap();
}

fn job(tmp: &Path, overrides: &[&str]) -> PruneJobSpec {
    write_checkpoint(&tmp.join("base"));
    write_dataset(&tmp.join("calib.json"), 10);
    let yaml = format!(
        "model:\n  restore_from_path: '{}'\n\
         trainer:\n  accelerator: cpu\n  precision: 32\n  num_threads: 3\n\
         prune:\n  calib_dataset: '{}'\n  num_calib_size: 6\n  ffn_hidden_size: 40\n  \
         num_attention_heads: 4\n  num_query_groups: 2\n\
         export:\n  save_path: '{}'\n\
         inference:\n  batch_size: 3\n  max_context_length: 48\n  add_BOS: true\n",
        tmp.join("base").display(),
        tmp.join("calib.json").display(),
        tmp.join("pruned").display(),
    );
    let overrides: Vec<String> = overrides.iter().map(|s| (*s).to_string()).collect();
    let spec = parse_spec(&yaml, &overrides).unwrap();
    validate_spec(&spec).unwrap();
    spec
}

#[test]
fn test_pruned_checkpoint_reloads_with_corrected_config() {
    let tmp = TempDir::new().unwrap();
    let spec = job(tmp.path(), &[]);

    let outcome = run_prune_job(&spec, LogLevel::Quiet).unwrap();
    assert_eq!(outcome.workers, 3);
    assert_eq!(outcome.metrics.calibration_batches, 2);
    assert_eq!(outcome.metrics.calibration_samples, 6);
    assert!(outcome.metrics.stage_duration(PruningStage::Pruning).is_some());

    let saved = load_config(&outcome.save_path).unwrap();
    assert_eq!(saved.name(), Some("modelopt"));
    assert_eq!(saved.usize_field("ffn_hidden_size").unwrap(), Some(40));
    assert_eq!(saved.usize_field("num_attention_heads").unwrap(), Some(4));
    assert_eq!(saved.usize_field("num_query_groups").unwrap(), Some(2));
    // 32 / 8 from the unpruned model, not 32 / 4
    assert_eq!(saved.usize_field("kv_channels").unwrap(), Some(4));
    assert_eq!(saved.usize_field("hidden_size").unwrap(), Some(32));
    assert_eq!(saved.usize_field("num_layers").unwrap(), Some(3));

    let model = GptModel::restore_from(&outcome.save_path, &saved, &spec.trainer).unwrap();
    let q = model.state_dict().into_iter().find(|p| p.name == "model.layers.2.self_attn.q_proj.weight").unwrap();
    assert_eq!(q.shape, vec![16, 32]);
    let k = model.state_dict().into_iter().find(|p| p.name == "model.layers.0.self_attn.k_proj.weight").unwrap();
    assert_eq!(k.shape, vec![8, 32]);
    let (logits, _) = model.forward(&[1, 5, 9, 2], false).unwrap();
    assert_eq!(logits.len(), 64);
    assert!(logits.iter().all(|v| v.is_finite()));

    let summary = inspect(&outcome.save_path).unwrap();
    assert_eq!(summary.num_parameters(), outcome.metrics.parameters_after);
    assert_eq!(summary.metadata.get("decoder_type").map(String::as_str), Some("llama"));
}

#[test]
fn test_prune_to_current_width_keeps_logits() {
    let tmp = TempDir::new().unwrap();
    let spec = job(
        tmp.path(),
        &["prune.ffn_hidden_size=64", "prune.num_attention_heads=8", "prune.num_query_groups=4"],
    );
    let outcome = run_prune_job(&spec, LogLevel::Quiet).unwrap();
    assert_eq!(outcome.metrics.parameters_removed(), 0);

    let base_config = load_config(&tmp.path().join("base")).unwrap();
    let base = GptModel::restore_from(&tmp.path().join("base"), &base_config, &spec.trainer).unwrap();
    let pruned_config = load_config(&outcome.save_path).unwrap();
    let pruned = GptModel::restore_from(&outcome.save_path, &pruned_config, &spec.trainer).unwrap();
    assert_eq!(base.forward(&[3, 1, 4], false).unwrap().0, pruned.forward(&[3, 1, 4], false).unwrap().0);
}

#[test]
fn test_model_overrides_reach_saved_config() {
    let tmp = TempDir::new().unwrap();
    let spec = job(tmp.path(), &["model.seq_length=1024", "model.activation=swiglu"]);
    let outcome = run_prune_job(&spec, LogLevel::Quiet).unwrap();
    let saved = load_config(&outcome.save_path).unwrap();
    assert_eq!(saved.usize_field("seq_length").unwrap(), Some(1024));
    assert_eq!(saved.get("activation").and_then(|v| v.as_str()), Some("swiglu"));
}

#[test]
fn test_unknown_dataset_file_fails() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("missing.jsonl");
    let spec = job(tmp.path(), &[&format!("prune.calib_dataset={}", missing.display())]);
    assert!(run_prune_job(&spec, LogLevel::Quiet).is_err());
    assert!(!tmp.path().join("pruned").exists());
}

#[test]
fn test_get_calib_dataloader_local_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("calib.json");
    write_dataset(&path, 10);

    let batches: Vec<Vec<String>> =
        get_calib_dataloader(&path.display().to_string(), 4, 3, 8).unwrap().collect();
    // E = max(min(10, 3), 4) = 4
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 4);
    assert!(batches[0].iter().all(|s| s.chars().count() <= 8));

    let err = get_calib_dataloader(&path.display().to_string(), 16, 512, 8).unwrap_err();
    assert!(matches!(err, Error::Dataset(_)));
}
