//! Minitron width pruner

use super::constraints::ExportConstraints;
use super::importance::select_layer;
use super::mode::PruneMode;
use crate::error::{Error, Result};
use crate::model::{KeptChannels, PrunableModel};
use crate::prune::forward_loop::ForwardLoop;
use serde::{Deserialize, Serialize};

/// What a pruning run kept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PruneReport {
    pub mode: PruneMode,
    /// Width before pruning
    pub original: ExportConstraints,
    /// Width after pruning
    pub pruned: ExportConstraints,
    /// Kept channels per layer, ascending
    pub kept: Vec<KeptChannels>,
    /// Calibration samples seen by the importance estimate
    pub calibration_samples: usize,
    /// Tokens each layer's statistics are averaged over
    pub calibration_tokens: usize,
}

/// A structured pruning algorithm
pub trait StructuredPruner {
    fn mode(&self) -> PruneMode;

    /// Calibrate `model` through `forward_loop` and cut it to `constraints`
    fn prune_model<M: PrunableModel>(
        &self,
        model: &mut M,
        constraints: &ExportConstraints,
        forward_loop: &dyn ForwardLoop,
    ) -> Result<PruneReport>;
}

/// Importance-based width pruning of FFN neurons, heads and query groups
///
/// Runs the forward loop once with activation capture on, ranks channels
/// per layer and slices every layer to the same target width.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinitronPruner;

impl StructuredPruner for MinitronPruner {
    fn mode(&self) -> PruneMode {
        PruneMode::McoreGptMinitron
    }

    fn prune_model<M: PrunableModel>(
        &self,
        model: &mut M,
        constraints: &ExportConstraints,
        forward_loop: &dyn ForwardLoop,
    ) -> Result<PruneReport> {
        let dims = model.dims();
        constraints.check_against(&dims)?;

        model.start_capture();
        let outcome = forward_loop.run(&mut *model);
        let collector = model.take_capture();
        outcome?;

        let collector = collector
            .ok_or_else(|| Error::Runtime("activation capture was not active".into()))?;
        if collector.is_empty() {
            return Err(Error::Prune(
                "no activations recorded; every calibration sample was empty".into(),
            ));
        }

        let mut kept = Vec::with_capacity(collector.num_layers());
        for index in 0..collector.num_layers() {
            let capture = collector
                .layer(index)
                .ok_or_else(|| Error::Prune(format!("missing statistics for layer {index}")))?;
            kept.push(select_layer(capture, &dims, constraints));
        }
        model.retain_width(&kept)?;

        let calibration_tokens = collector.layer(0).map_or(0, |layer| layer.ffn.count());
        Ok(PruneReport {
            mode: self.mode(),
            original: ExportConstraints::of(&dims),
            pruned: ExportConstraints::of(&model.dims()),
            kept,
            calibration_samples: collector.samples_processed(),
            calibration_tokens,
        })
    }
}

/// Prune `model` with `mode`, returning the pruned model and what was kept
pub fn prune<M: PrunableModel>(
    mut model: M,
    mode: PruneMode,
    constraints: &ExportConstraints,
    forward_loop: &dyn ForwardLoop,
) -> Result<(M, PruneReport)> {
    let report = match mode {
        PruneMode::McoreGptMinitron => MinitronPruner.prune_model(&mut model, constraints, forward_loop)?,
    };
    Ok((model, report))
}
