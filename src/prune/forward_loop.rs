//! Calibration forward loop handed to the pruner

use crate::config::InferenceSettings;
use crate::error::Result;
use crate::model::CalibratableModel;
use indicatif::{ProgressBar, ProgressStyle};

const PROGRESS_TEMPLATE: &str = "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})";

/// Something the pruner can call to push calibration data through a model
pub trait ForwardLoop {
    fn run(&self, model: &mut dyn CalibratableModel) -> Result<()>;
}

/// Runs every calibration batch once, in order
///
/// Holds no state between runs: each `run` installs the inference settings
/// and walks the whole batch list again.
#[derive(Debug, Clone, Copy)]
pub struct CalibrationLoop<'a> {
    batches: &'a [Vec<String>],
    settings: &'a InferenceSettings,
    show_progress: bool,
}

impl<'a> CalibrationLoop<'a> {
    pub fn new(batches: &'a [Vec<String>], settings: &'a InferenceSettings) -> Self {
        Self { batches, settings, show_progress: false }
    }

    /// Draw a progress bar while running
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn num_batches(&self) -> usize {
        self.batches.len()
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(self.batches.len() as u64);
        let style = ProgressStyle::default_bar()
            .template(PROGRESS_TEMPLATE)
            .map(|style| style.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar
    }
}

impl ForwardLoop for CalibrationLoop<'_> {
    fn run(&self, model: &mut dyn CalibratableModel) -> Result<()> {
        model.set_inference_config(self.settings);
        let bar = self.progress_bar();
        for (index, batch) in self.batches.iter().enumerate() {
            model.predict_step(batch, index)?;
            bar.inc(1);
        }
        bar.finish_and_clear();
        Ok(())
    }
}
