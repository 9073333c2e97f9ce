//! Tests for the reference model and checkpoint directory.

use super::*;
use crate::config::{ExportSpec, InferenceSettings, Precision, TrainerSpec};
use crate::error::Error;
use approx::assert_abs_diff_eq;
use std::path::Path;
use tempfile::TempDir;

/// 2 layers, hidden 16, 4 heads in 2 groups of width 4, ffn 24
pub(crate) fn tiny_config() -> ModelConfig {
    ModelConfig::from_yaml(
        "name: megatron_gpt\n\
         hidden_size: 16\n\
         ffn_hidden_size: 24\n\
         num_attention_heads: 4\n\
         num_query_groups: 2\n\
         kv_channels: null\n\
         num_layers: 2\n\
         seq_length: 64\n",
    )
    .unwrap()
}

pub(crate) const TINY_VOCAB: usize = 32;

pub(crate) fn tiny_model(seed: u64) -> GptModel {
    GptModel::random(tiny_config(), TINY_VOCAB, seed, WeightDtype::F32).unwrap()
}

pub(crate) fn export_to(dir: &Path) -> ExportSpec {
    ExportSpec {
        decoder_type: "llama".to_string(),
        inference_tensor_parallel: 1,
        save_path: dir.to_path_buf(),
    }
}

fn fp32_trainer() -> TrainerSpec {
    TrainerSpec { precision: Precision::Fp32, ..TrainerSpec::default() }
}

fn settings() -> InferenceSettings {
    InferenceSettings { batch_size: 2, max_context_length: 16, ..InferenceSettings::default() }
}

// =========================================================================
// Construction
// =========================================================================

#[test]
fn test_random_model_shape() {
    // TEST_ID: MDL-001
    let model = tiny_model(0);
    let dims = model.dims();
    assert_eq!(dims.kv_channels, 4, "MDL-001 FALSIFIED: kv_channels defaults to hidden/heads");
    assert_eq!(model.vocab_size(), TINY_VOCAB);

    let state = model.state_dict();
    assert_eq!(state.len(), expected_weight_count(2, true));
    assert_eq!(state.iter().map(ParamInfo::numel).sum::<usize>(), model.num_parameters());

    let q = state.iter().find(|p| p.name == "model.layers.0.self_attn.q_proj.weight").unwrap();
    assert_eq!(q.shape, vec![16, 16]);
    let k = state.iter().find(|p| p.name == "model.layers.1.self_attn.k_proj.weight").unwrap();
    assert_eq!(k.shape, vec![8, 16]);
    assert_eq!(q.to_string(), "model.layers.0.self_attn.q_proj.weight -> float32 [16, 16]");
}

#[test]
fn test_tied_embeddings_have_no_head() {
    let mut config = tiny_config();
    config.set("share_embeddings_and_output_weights", true);
    let model = GptModel::random(config, TINY_VOCAB, 1, WeightDtype::F32).unwrap();
    assert_eq!(model.state_dict().len(), expected_weight_count(2, false));
    assert!(model.state_dict().iter().all(|p| p.name != "lm_head.weight"));
}

#[test]
fn test_invalid_dims_rejected() {
    let mut config = tiny_config();
    config.set("num_query_groups", 3u64);
    let err = GptModel::random(config, TINY_VOCAB, 0, WeightDtype::F32).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig { .. }));
}

// =========================================================================
// Checkpoint round trip
// =========================================================================

#[test]
fn test_save_then_restore() {
    // TEST_ID: MDL-010
    let dir = TempDir::new().unwrap();
    let model = tiny_model(7);
    model.save_to(dir.path(), &export_to(dir.path())).unwrap();

    let stored = load_config(dir.path()).unwrap();
    assert_eq!(stored, tiny_config(), "MDL-010 FALSIFIED: config must be saved verbatim");

    let restored = GptModel::restore_from(dir.path(), &stored, &fp32_trainer()).unwrap();
    let ids = [1u32, 5, 9, 3];
    let (a, _) = model.forward(&ids, false).unwrap();
    let (b, _) = restored.forward(&ids, false).unwrap();
    for (x, y) in a.iter().zip(b.iter()) {
        assert_abs_diff_eq!(x, y, epsilon = 1e-6);
    }
    assert_eq!(restored.dtype(), WeightDtype::F32);
    assert!(restored.tokenizer().is_byte_level());
}

#[test]
fn test_inspect_reports_metadata() {
    let dir = TempDir::new().unwrap();
    let model = tiny_model(3);
    let export = ExportSpec { inference_tensor_parallel: 2, ..export_to(dir.path()) };
    model.save_to(dir.path(), &export).unwrap();

    let summary = inspect(dir.path()).unwrap();
    assert_eq!(summary.tensors.len(), expected_weight_count(2, true));
    assert_eq!(summary.num_parameters(), model.num_parameters());
    assert_eq!(summary.metadata.get("format").map(String::as_str), Some("pt"));
    assert_eq!(summary.metadata.get("decoder_type").map(String::as_str), Some("llama"));
    assert_eq!(summary.metadata.get("inference_tensor_parallel").map(String::as_str), Some("2"));
    assert!(!summary.has_tokenizer);
    assert!(summary.tensors.iter().all(|t| t.dtype == "F32"));
}

#[test]
fn test_restore_missing_weights() {
    let dir = TempDir::new().unwrap();
    let err = GptModel::restore_from(dir.path(), &tiny_config(), &fp32_trainer()).unwrap_err();
    assert!(matches!(err, Error::Checkpoint { .. }));
}

#[test]
fn test_restore_with_mismatched_config() {
    // TEST_ID: MDL-011
    let dir = TempDir::new().unwrap();
    tiny_model(0).save_to(dir.path(), &export_to(dir.path())).unwrap();

    let mut config = tiny_config();
    config.set("ffn_hidden_size", 32u64);
    let err = GptModel::restore_from(dir.path(), &config, &fp32_trainer()).unwrap_err();
    assert!(
        matches!(err, Error::ShapeMismatch { ref tensor, .. } if tensor.contains("mlp")),
        "MDL-011 FALSIFIED: wrong ffn size must be a shape mismatch, got {err}"
    );
}

#[test]
fn test_unexpected_tensor_rejected() {
    let dir = TempDir::new().unwrap();
    tiny_model(0).save_to(dir.path(), &export_to(dir.path())).unwrap();
    let path = dir.path().join(checkpoint::WEIGHTS_FILE);
    let mut tensors = load_tensors(&path).unwrap();

    tensors.insert(
        "model.layers.0.self_attn.rotary_emb.inv_freq".to_string(),
        LoadedTensor { shape: vec![2], values: vec![1.0, 0.01], dtype: WeightDtype::F32.safetensors_dtype() },
    );
    assert!(GptModel::from_tensors(tiny_config(), tensors.clone(), WeightDtype::F32).is_ok());

    tensors.insert(
        "model.extra.weight".to_string(),
        LoadedTensor { shape: vec![1], values: vec![0.0], dtype: WeightDtype::F32.safetensors_dtype() },
    );
    let err = GptModel::from_tensors(tiny_config(), tensors, WeightDtype::F32).unwrap_err();
    assert!(matches!(err, Error::Checkpoint { ref message, .. } if message.contains("model.extra.weight")));
}

// =========================================================================
// Forward and predict_step
// =========================================================================

#[test]
fn test_forward_rejects_bad_input() {
    let model = tiny_model(0);
    assert!(matches!(model.forward(&[], false), Err(Error::Runtime(_))));
    assert!(matches!(model.forward(&[TINY_VOCAB as u32], false), Err(Error::Tokenizer(_))));
}

#[test]
fn test_forward_capture_per_layer() {
    let model = tiny_model(0);
    let (logits, captures) = model.forward(&[1, 2, 3], true).unwrap();
    assert_eq!(logits.len(), TINY_VOCAB);
    let captures = captures.unwrap();
    assert_eq!(captures.len(), 2);
    assert_eq!(captures[0].ffn.count(), 3, "one row per token");
    assert_eq!(captures[0].heads.dim(), 4);
    assert!(model.forward(&[1], false).unwrap().1.is_none());
}

#[test]
fn test_predict_step_requires_freeze() {
    // TEST_ID: MDL-020
    let mut model = tiny_model(0);
    model.set_inference_config(&settings());
    let err = model.predict_step(&["hi".to_string()], 0).unwrap_err();
    assert!(matches!(err, Error::Runtime(_)), "MDL-020 FALSIFIED: unfrozen predict_step must fail");
}

#[test]
fn test_predict_step_requires_settings() {
    let mut model = tiny_model(0);
    model.freeze();
    assert!(model.is_frozen());
    assert!(model.predict_step(&["hi".to_string()], 0).is_err());
}

#[test]
fn test_predict_step_collects_activations() {
    // TEST_ID: MDL-021
    let mut model = tiny_model(0);
    model.freeze();
    model.set_inference_config(&InferenceSettings { tokens_to_generate: 2, ..settings() });
    model.start_capture();

    let batch = vec!["hello".to_string(), String::new()];
    let generated = model.predict_step(&batch, 0).unwrap();
    assert_eq!(generated.len(), 2);
    assert_eq!(generated[0].len(), 2, "MDL-021 FALSIFIED: greedy tokens per prompt");
    assert!(generated[1].is_empty(), "empty prompts are skipped");

    let collector = model.take_capture().unwrap();
    assert_eq!(collector.samples_processed(), 2);
    assert_eq!(collector.batches_processed(), 1);
    // prompt of 5 tokens, then 6 and 7 after generating
    assert_eq!(collector.layer(0).unwrap().ffn.count(), 5 + 6 + 7);
    assert!(model.take_capture().is_none());
}

#[test]
fn test_context_truncation() {
    let mut model = tiny_model(0);
    model.freeze();
    model.set_inference_config(&InferenceSettings { max_context_length: 3, ..settings() });
    model.start_capture();
    model.predict_step(&["a long prompt".to_string()], 0).unwrap();
    let collector = model.take_capture().unwrap();
    assert_eq!(collector.layer(1).unwrap().heads.count(), 3);
}

// =========================================================================
// Width surgery
// =========================================================================

fn keep_all() -> KeptChannels {
    KeptChannels { query_groups: vec![0, 1], heads: vec![0, 1, 2, 3], ffn_neurons: (0..24).collect() }
}

#[test]
fn test_retain_everything_is_identity() {
    // TEST_ID: MDL-030
    let mut model = tiny_model(11);
    let (before, _) = model.forward(&[4, 8, 15], false).unwrap();
    model.retain_width(&[keep_all(), keep_all()]).unwrap();
    let (after, _) = model.forward(&[4, 8, 15], false).unwrap();
    assert_eq!(before, after, "MDL-030 FALSIFIED: keeping every channel must not change logits");
}

#[test]
fn test_retain_updates_dims_not_config() {
    // TEST_ID: MDL-031
    let dir = TempDir::new().unwrap();
    let mut model = tiny_model(5);
    let kept = KeptChannels { query_groups: vec![1], heads: vec![2, 3], ffn_neurons: vec![0, 5, 9, 20] };
    model.retain_width(&[kept.clone(), kept]).unwrap();

    assert_eq!(model.dims().num_attention_heads, 2);
    assert_eq!(model.dims().num_query_groups, 1);
    assert_eq!(model.dims().ffn_hidden_size, 4);
    assert_eq!(model.config().usize_field("ffn_hidden_size").unwrap(), Some(24));

    let err = model.save_to(dir.path(), &export_to(dir.path())).unwrap_err();
    assert!(
        matches!(err, Error::ShapeMismatch { .. }),
        "MDL-031 FALSIFIED: stale config must block the save, got {err}"
    );
    assert!(!dir.path().join(checkpoint::WEIGHTS_FILE).exists());

    model.config_mut().set("ffn_hidden_size", 4u64);
    model.config_mut().set("num_attention_heads", 2u64);
    model.config_mut().set("num_query_groups", 1u64);
    model.config_mut().set("kv_channels", 4u64);
    model.save_to(dir.path(), &export_to(dir.path())).unwrap();
    model.check_config_matches_weights().unwrap();
    assert!(model.forward(&[1, 2], false).is_ok());
}

#[test]
fn test_save_after_retain_round_trips() {
    // TEST_ID: MDL-032
    let dir = TempDir::new().unwrap();
    let mut model = tiny_model(5);
    model.retain_width(&[keep_all(), keep_all()]).unwrap();
    model
        .save_to(dir.path(), &export_to(dir.path()))
        .expect("MDL-032 FALSIFIED: column-sliced weights must be saveable");

    let config = load_config(dir.path()).unwrap();
    let restored = GptModel::restore_from(dir.path(), &config, &fp32_trainer()).unwrap();
    assert_eq!(
        restored.state_dict(),
        model.state_dict(),
        "MDL-032 FALSIFIED: o_proj/down_proj must survive the save unchanged"
    );
    let (expected, _) = model.forward(&[2, 7, 1], false).unwrap();
    let (actual, _) = restored.forward(&[2, 7, 1], false).unwrap();
    for (x, y) in expected.iter().zip(actual.iter()) {
        assert_abs_diff_eq!(x, y, epsilon = 1e-6);
    }
}

#[test]
fn test_retain_rejects_ragged_selection() {
    let mut model = tiny_model(0);
    let narrow = KeptChannels { ffn_neurons: vec![0], ..keep_all() };
    assert!(matches!(model.retain_width(&[keep_all(), narrow]), Err(Error::Prune(_))));
    assert!(matches!(model.retain_width(&[keep_all()]), Err(Error::Prune(_))));
}
