//! Run preprocessing, front detection, and plotting in order.
//!
//! Every stage that writes an archive is skipped when its output already exists, so re-running
//! after a failure only redoes the missing work. A failing stage is logged and recorded in the
//! report, then the next stage runs anyway.

use crate::{
    archive::{mask_path, processed_path, ArchiveStore},
    error::Result,
    fronts::{identify_fronts, FrontDiagnostics, FRONT_LEVEL},
    plot::{plan_frames, render_frames, FrameRenderer, TimeRange},
    preprocess::{preprocess_variable, CoordRange, Variable},
};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Settings for a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    lat_range: CoordRange,
    lon_range: CoordRange,
    input_dir: PathBuf,
    output_dir: PathBuf,
    variables: Vec<Variable>,
    time_range: Option<TimeRange>,
    max_plots: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            lat_range: CoordRange::new(35.0, 45.0),
            lon_range: CoordRange::new(25.0, 45.0),
            input_dir: PathBuf::from("./raw_data"),
            output_dir: PathBuf::from("./outputs"),
            variables: vec![
                Variable::SpecificHumidity,
                Variable::Temperature,
                Variable::UWind,
                Variable::VWind,
            ],
            time_range: None,
            max_plots: 5,
        }
    }
}

impl PipelineConfig {
    /// Create a configuration reading raw files from `input_dir`, everything else at defaults.
    pub fn new<P: Into<PathBuf>>(input_dir: P) -> Self {
        PipelineConfig {
            input_dir: input_dir.into(),
            ..Self::default()
        }
    }

    /// Builder method to set the latitude bounds of the analysis domain.
    pub fn with_lat_range(self, a: f64, b: f64) -> Self {
        PipelineConfig {
            lat_range: CoordRange::new(a, b),
            ..self
        }
    }

    /// Builder method to set the longitude bounds of the analysis domain.
    pub fn with_lon_range(self, a: f64, b: f64) -> Self {
        PipelineConfig {
            lon_range: CoordRange::new(a, b),
            ..self
        }
    }

    /// Builder method to set where archives and plots are written.
    pub fn with_output_dir<P: Into<PathBuf>>(self, output_dir: P) -> Self {
        PipelineConfig {
            output_dir: output_dir.into(),
            ..self
        }
    }

    /// Builder method to set which variables are preprocessed.
    pub fn with_variables(self, variables: Vec<Variable>) -> Self {
        PipelineConfig { variables, ..self }
    }

    /// Builder method to restrict plotting to a time range.
    pub fn with_time_range(self, time_range: TimeRange) -> Self {
        PipelineConfig {
            time_range: Some(time_range),
            ..self
        }
    }

    /// Builder method to set the most images to make.
    pub fn with_max_plots(self, max_plots: usize) -> Self {
        PipelineConfig { max_plots, ..self }
    }

    /// Latitude bounds of the analysis domain.
    pub fn lat_range(&self) -> CoordRange {
        self.lat_range
    }

    /// Longitude bounds of the analysis domain.
    pub fn lon_range(&self) -> CoordRange {
        self.lon_range
    }

    /// Directory searched for raw files.
    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    /// Directory archives are written to. Plots go in its `plots` sub-directory.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Variables to preprocess.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Time range to plot, `None` for everything.
    pub fn time_range(&self) -> Option<&TimeRange> {
        self.time_range.as_ref()
    }

    /// The most images to make.
    pub fn max_plots(&self) -> usize {
        self.max_plots
    }

    /// Where plots are saved.
    pub fn plot_dir(&self) -> PathBuf {
        self.output_dir.join("plots")
    }
}

/// How a stage ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// The stage ran and wrote its output.
    Completed,
    /// Nothing needed doing, the output already existed or there was no input.
    Skipped,
    /// The stage failed with this message.
    Failed(String),
}

impl StageOutcome {
    /// Check if the stage failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, StageOutcome::Failed(_))
    }
}

impl<T> From<Result<T>> for StageOutcome {
    fn from(res: Result<T>) -> Self {
        match res {
            Ok(_) => StageOutcome::Completed,
            Err(err) => StageOutcome::Failed(err.to_string()),
        }
    }
}

/// What happened in each stage of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    /// Outcome of preprocessing for each variable, in the configured order.
    pub preprocess: Vec<(Variable, StageOutcome)>,
    /// Outcome of front detection.
    pub detection: StageOutcome,
    /// Diagnostics from front detection, if it ran successfully.
    pub diagnostics: Option<FrontDiagnostics>,
    /// Outcome of plotting.
    pub plotting: StageOutcome,
    /// Number of frames planned by the plotting stage.
    pub frames: usize,
    /// Paths of the images written. A renderer that only plans frames leaves this empty.
    pub plots: Vec<PathBuf>,
}

impl PipelineReport {
    /// Check if no stage failed.
    pub fn succeeded(&self) -> bool {
        !self.preprocess.iter().any(|(_, outcome)| outcome.is_failed())
            && !self.detection.is_failed()
            && !self.plotting.is_failed()
    }
}

/// The whole front analysis pipeline.
#[derive(Debug)]
pub struct Pipeline<A, R> {
    config: PipelineConfig,
    archive: A,
    renderer: R,
}

impl<A, R> Pipeline<A, R>
where
    A: ArchiveStore,
    R: FrameRenderer,
{
    /// Create a new pipeline.
    pub fn new(config: PipelineConfig, archive: A, renderer: R) -> Self {
        Pipeline {
            config,
            archive,
            renderer,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Get the archive store.
    pub fn archive(&self) -> &A {
        &self.archive
    }

    /// Get the renderer.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Run every stage and report how each went.
    pub fn run(&mut self) -> PipelineReport {
        info!("starting front analysis pipeline");

        let preprocess = self
            .config
            .variables
            .clone()
            .into_iter()
            .map(|var| (var, self.preprocess_stage(var)))
            .collect();

        let (detection, diagnostics) = match self.detection_stage() {
            Ok(Some(diagnostics)) => (StageOutcome::Completed, Some(diagnostics)),
            Ok(None) => (StageOutcome::Skipped, None),
            Err(err) => {
                error!(%err, "front identification failed");
                (StageOutcome::Failed(err.to_string()), None)
            }
        };

        let (plotting, frames, plots) = match self.plot_stage() {
            Ok((frames, plots)) => (StageOutcome::Completed, frames, plots),
            Err(err) => {
                error!(%err, "plotting failed");
                (StageOutcome::Failed(err.to_string()), 0, vec![])
            }
        };

        info!("pipeline finished");

        PipelineReport {
            preprocess,
            detection,
            diagnostics,
            plotting,
            frames,
            plots,
        }
    }

    fn preprocess_stage(&mut self, variable: Variable) -> StageOutcome {
        let out_path = processed_path(&self.config.output_dir, variable);
        if self.archive.exists(&out_path) {
            info!(path = %out_path.display(), "already exists, skipping preprocessing");
            return StageOutcome::Skipped;
        }

        info!(%variable, "preprocessing");
        let res = std::fs::create_dir_all(&self.config.output_dir)
            .map_err(Into::into)
            .and_then(|_| {
                preprocess_variable(
                    &self.archive,
                    &self.config.input_dir,
                    variable,
                    self.config.lat_range,
                    self.config.lon_range,
                )
            });

        match res {
            Ok(Some(merged)) => {
                let outcome = StageOutcome::from(self.archive.write_leveled(&out_path, &merged));
                if let StageOutcome::Failed(msg) = &outcome {
                    error!(%variable, %msg, "unable to save preprocessed archive");
                } else {
                    info!(path = %out_path.display(), "saved preprocessed archive");
                }
                outcome
            }
            Ok(None) => {
                warn!(
                    %variable,
                    dir = %self.config.input_dir.display(),
                    "no raw files found"
                );
                StageOutcome::Skipped
            }
            Err(err) => {
                error!(%variable, %err, "preprocessing failed");
                StageOutcome::Failed(err.to_string())
            }
        }
    }

    // Ok(None) when the mask already exists.
    fn detection_stage(&mut self) -> Result<Option<FrontDiagnostics>> {
        let out_path = mask_path(&self.config.output_dir, FRONT_LEVEL);
        if self.archive.exists(&out_path) {
            info!(path = %out_path.display(), "front mask already exists, skipping identification");
            return Ok(None);
        }

        info!("loading preprocessed archives for front identification");
        let t = self.archive.read_leveled(
            &processed_path(&self.config.output_dir, Variable::Temperature),
            Variable::Temperature.short_name(),
        )?;
        let q = self.archive.read_leveled(
            &processed_path(&self.config.output_dir, Variable::SpecificHumidity),
            Variable::SpecificHumidity.short_name(),
        )?;

        info!("calculating front masks");
        let detection = identify_fronts(&t, &q, None)?;
        let diagnostics = detection.diagnostics;

        self.archive.write_mask(&out_path, &detection.mask)?;
        info!(
            path = %out_path.display(),
            front_cells = diagnostics.total_front_cells(),
            max_gradient = ?diagnostics.max_gradient,
            undefined_cells = diagnostics.undefined_cells,
            "saved front mask"
        );

        Ok(Some(diagnostics))
    }

    fn plot_stage(&mut self) -> Result<(usize, Vec<PathBuf>)> {
        info!("starting plotting");

        let mask = self
            .archive
            .read_mask(&mask_path(&self.config.output_dir, FRONT_LEVEL))?;
        let t = self.archive.read_leveled(
            &processed_path(&self.config.output_dir, Variable::Temperature),
            Variable::Temperature.short_name(),
        )?;

        if let Some(range) = self.config.time_range() {
            info!(start = %range.start(), end = %range.end(), "filtering plots by time range");
        }

        let frames = plan_frames(&mask, &t, self.config.time_range(), self.config.max_plots)?;
        info!(count = frames.len(), "generating plots");

        let plot_dir = self.config.plot_dir();
        let plots = render_frames(&mut self.renderer, &frames, &plot_dir)?;
        info!(
            dir = %plot_dir.display(),
            planned = frames.len(),
            written = plots.len(),
            "plotting complete"
        );

        Ok((frames.len(), plots))
    }
}
