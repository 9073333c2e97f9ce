//! Prune job orchestrator
//!
//! Runs one job from checkpoint restore through export and the final
//! worker barrier, on a worker pool built by the caller.

use super::metrics::PruningMetrics;
use super::stage::PruningStage;
use crate::cli::{log, LogLevel};
use crate::config::PruneJobSpec;
use crate::error::Result;
use crate::model::{load_config, merge_config, CalibratableModel, GptModel};
use crate::prune::correction::PostPruneCorrection;
use crate::prune::data_loader::{CalibrationDataConfig, CalibrationDataLoader};
use crate::prune::forward_loop::CalibrationLoop;
use crate::prune::minitron::{prune, ExportConstraints, PruneMode, PruneReport};
use crate::runtime::Runtime;
use std::path::PathBuf;
use std::time::Instant;

/// Result of a finished job
#[derive(Debug, Clone)]
pub struct PruneOutcome {
    pub metrics: PruningMetrics,
    pub report: PruneReport,
    /// Directory the pruned checkpoint was written to
    pub save_path: PathBuf,
    /// Worker threads that reached the final barrier
    pub workers: usize,
    /// Participants declared by the trainer config
    pub world_size: usize,
}

/// Single-job pruning pipeline
///
/// Stages advance strictly in order; any error moves the pipeline to
/// [`PruningStage::Failed`] and is returned unchanged.
#[derive(Debug)]
pub struct PrunePipeline<'a> {
    spec: &'a PruneJobSpec,
    level: LogLevel,
    stage: PruningStage,
    metrics: PruningMetrics,
    stage_started: Instant,
    error: Option<String>,
}

impl<'a> PrunePipeline<'a> {
    pub fn new(spec: &'a PruneJobSpec, level: LogLevel) -> Self {
        Self {
            spec,
            level,
            stage: PruningStage::Idle,
            metrics: PruningMetrics::new(),
            stage_started: Instant::now(),
            error: None,
        }
    }

    /// Get the current stage.
    pub fn stage(&self) -> PruningStage {
        self.stage
    }

    /// Get the collected metrics.
    pub fn metrics(&self) -> &PruningMetrics {
        &self.metrics
    }

    /// Get the error message if failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Close the current stage's timer and move to the next one.
    pub fn advance(&mut self) {
        if self.stage.is_active() {
            let elapsed = self.stage_started.elapsed().as_secs_f64();
            self.metrics.record_stage_duration(self.stage, elapsed);
        }
        self.stage = self.stage.next();
        self.stage_started = Instant::now();
        if self.stage.is_active() {
            log(self.level, LogLevel::Verbose, &format!("Stage: {}", self.stage.display_name()));
        }
    }

    /// Mark the pipeline as failed with an error message.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.stage = PruningStage::Failed;
    }

    /// Run the job to completion on an already built `runtime`
    ///
    /// The runtime is created at the entry point (see [`Runtime::for_job`]),
    /// so the accelerator has been checked before this is called.
    pub fn run(mut self, runtime: &Runtime) -> Result<PruneOutcome> {
        log(
            self.level,
            LogLevel::Normal,
            &format!(
                "Device: {} ({} worker threads, world size {})",
                runtime.device(),
                runtime.num_threads(),
                runtime.world_size()
            ),
        );

        let report = match runtime.install(|| self.execute()) {
            Ok(report) => report,
            Err(e) => {
                self.fail(e.to_string());
                return Err(e);
            }
        };

        let workers = runtime.barrier();
        Ok(PruneOutcome {
            metrics: self.metrics,
            report,
            save_path: self.spec.export.save_path.clone(),
            workers,
            world_size: runtime.world_size(),
        })
    }

    fn execute(&mut self) -> Result<PruneReport> {
        let spec = self.spec;

        self.advance();
        let restore_path = &spec.model.restore_from_path;
        log(self.level, LogLevel::Normal, &format!("Restoring model from {}", restore_path.display()));
        let merged = merge_config(load_config(restore_path)?, &spec.model.to_mapping());
        let mut model = GptModel::restore_from(restore_path, &merged, &spec.trainer)?;
        model.freeze();
        let parameters_before = model.num_parameters();

        self.advance();
        let batches: Vec<Vec<String>> =
            CalibrationDataLoader::new(CalibrationDataConfig::from_job(spec))?.load()?.collect();
        self.metrics.calibration_batches = batches.len();
        log(
            self.level,
            LogLevel::Normal,
            &format!(
                "Calibration data: {} ({} batches of {})",
                spec.prune.calib_dataset,
                batches.len(),
                spec.inference.batch_size
            ),
        );
        self.dump_state_dict("before pruning", &model);

        self.advance();
        let constraints = ExportConstraints::from_spec(&spec.prune);
        let forward_loop =
            CalibrationLoop::new(&batches, &spec.inference).with_progress(self.level != LogLevel::Quiet);
        let (mut model, report) = prune(model, PruneMode::McoreGptMinitron, &constraints, &forward_loop)?;
        self.dump_state_dict("after pruning", &model);

        self.advance();
        PostPruneCorrection::from_job(&merged, &constraints)?.apply(model.config_mut());

        self.advance();
        model.save_to(&spec.export.save_path, &spec.export)?;
        log(
            self.level,
            LogLevel::Normal,
            &format!("Pruned model saved to {}", spec.export.save_path.display()),
        );

        self.metrics.update_parameters(parameters_before, model.num_parameters());
        self.metrics.calibration_samples = report.calibration_samples;
        self.metrics.kept = report.kept.clone();
        self.advance();
        Ok(report)
    }

    fn dump_state_dict(&self, when: &str, model: &GptModel) {
        if self.level != LogLevel::Verbose {
            return;
        }
        log(self.level, LogLevel::Verbose, &format!("Model state dict {when}:"));
        for param in model.state_dict() {
            log(self.level, LogLevel::Verbose, &format!("  {param}"));
        }
    }
}

/// Run a validated job spec end to end
///
/// Library entry point: checks the accelerator and builds the worker pool
/// before anything else, then hands both to the pipeline.
pub fn run_prune_job(spec: &PruneJobSpec, level: LogLevel) -> Result<PruneOutcome> {
    let runtime = Runtime::for_job(&spec.trainer)?;
    PrunePipeline::new(spec, level).run(&runtime)
}
