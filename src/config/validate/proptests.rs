//! Property tests for job specification validation

use super::tests::create_valid_spec;
use super::validator::validate_spec;
use super::ValidationError;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_divisible_targets_validate(groups in 1usize..16, per_group in 1usize..8, ffn in 1usize..100_000) {
        let mut spec = create_valid_spec();
        spec.prune.num_query_groups = groups;
        spec.prune.num_attention_heads = groups * per_group;
        spec.prune.ffn_hidden_size = ffn;
        prop_assert!(validate_spec(&spec).is_ok());
    }

    #[test]
    fn prop_tensor_parallel_above_one_rejected(tp in 2usize..16) {
        let mut spec = create_valid_spec();
        spec.model.tensor_model_parallel_size = tp;
        prop_assert_eq!(validate_spec(&spec), Err(ValidationError::InvalidTensorParallel(tp)));
    }

    #[test]
    fn prop_world_size_rule(devices in 1usize..32, nodes in 1usize..4, pp in 1usize..8) {
        let mut spec = create_valid_spec();
        spec.trainer.devices = devices;
        spec.trainer.num_nodes = nodes;
        spec.model.pipeline_model_parallel_size = pp;
        let ok = validate_spec(&spec).is_ok();
        prop_assert_eq!(ok, (devices * nodes) % pp == 0);
    }
}
