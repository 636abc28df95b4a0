use frontal_analysis::{
    archive::{mask_path, processed_path, ArchiveStore, MemoryArchive},
    pipeline::{Pipeline, PipelineConfig, StageOutcome},
    plot::{FrameOutput, FrameRenderer, LogRenderer, PlotFrame, TimeRange},
    preprocess::Variable,
    Result, FRONT_LEVEL,
};
use std::{fs::File, path::Path};

mod utils;

use crate::utils::{regular_grid, uniform_humidity, warm_corner_temperature};

// Raw downloads for t and q on a grid covering the default domain with one degree spacing.
fn raw_archive(raw_dir: &Path, t_levels: &[f64]) -> MemoryArchive {
    let grid = regular_grid(6, 46.0, 24.0, 1.0, 13, 23);
    let t_path = raw_dir.join("era5_t_202510.nc");
    let q_path = raw_dir.join("era5_q_202510.nc");

    File::create(&t_path).unwrap();
    File::create(&q_path).unwrap();

    MemoryArchive::new()
        .with_leveled(t_path, warm_corner_temperature(&grid, t_levels))
        .with_leveled(q_path, uniform_humidity(&grid, &[850.0]))
}

// Writes an empty file for every frame.
struct EmptyFileRenderer;

impl FrameRenderer for EmptyFileRenderer {
    fn render(&mut self, _frame: &PlotFrame, path: &Path) -> Result<FrameOutput> {
        File::create(path)?;
        Ok(FrameOutput::Written)
    }
}

#[test]
fn run_with_a_time_range() {
    let dir = tempfile::tempdir().unwrap();
    let raw_dir = dir.path().join("raw");
    let out_dir = dir.path().join("outputs");
    std::fs::create_dir(&raw_dir).unwrap();

    let config = PipelineConfig::new(&raw_dir)
        .with_output_dir(&out_dir)
        .with_variables(vec![Variable::SpecificHumidity, Variable::Temperature])
        .with_time_range(TimeRange::parse("2025-10-01 02:00", "2025-10-01").unwrap());

    let mut pipeline = Pipeline::new(config, raw_archive(&raw_dir, &[850.0]), EmptyFileRenderer);
    let report = pipeline.run();

    assert!(report.succeeded(), "{:?}", report);
    assert_eq!(report.detection, StageOutcome::Completed);
    assert_eq!(report.frames, 4);
    assert!(report.plots.iter().all(|p| p.is_file()));

    // Hours 02 through 05 are in range, only the first five are kept.
    let names: Vec<_> = report
        .plots
        .iter()
        .map(|p| p.file_name().unwrap().to_str().unwrap().to_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "front_map_2025-10-01_02.png",
            "front_map_2025-10-01_03.png",
            "front_map_2025-10-01_04.png",
            "front_map_2025-10-01_05.png",
        ]
    );

    // Preprocessing cut the raw grid down to [35, 45] x [25, 45].
    let t = pipeline
        .archive()
        .read_leveled(&processed_path(&out_dir, Variable::Temperature), "t")
        .unwrap();
    assert_eq!(t.grid().latitudes().len(), 11);
    assert_eq!(t.grid().longitudes().len(), 21);
    assert_eq!(t.grid().latitudes()[0], 45.0);
    assert_eq!(t.grid().longitudes()[0], 25.0);

    let mask = pipeline
        .archive()
        .read_mask(&mask_path(&out_dir, FRONT_LEVEL))
        .unwrap();
    assert_eq!(mask.grid(), t.grid());
}

#[test]
fn logged_frames_are_not_counted_as_plots() {
    let dir = tempfile::tempdir().unwrap();
    let raw_dir = dir.path().join("raw");
    let out_dir = dir.path().join("outputs");
    std::fs::create_dir(&raw_dir).unwrap();

    let config = PipelineConfig::new(&raw_dir)
        .with_output_dir(&out_dir)
        .with_variables(vec![Variable::SpecificHumidity, Variable::Temperature])
        .with_max_plots(3);

    let mut pipeline = Pipeline::new(config, raw_archive(&raw_dir, &[850.0]), LogRenderer);
    let report = pipeline.run();

    assert!(report.succeeded(), "{:?}", report);
    assert_eq!(report.frames, 3);
    assert!(report.plots.is_empty());
    assert!(!out_dir
        .join("plots")
        .join("front_map_2025-10-01_00.png")
        .exists());
}

#[test]
fn missing_level_writes_no_mask() {
    let dir = tempfile::tempdir().unwrap();
    let raw_dir = dir.path().join("raw");
    let out_dir = dir.path().join("outputs");
    std::fs::create_dir(&raw_dir).unwrap();

    let config = PipelineConfig::new(&raw_dir).with_output_dir(&out_dir);
    let mut pipeline = Pipeline::new(config, raw_archive(&raw_dir, &[700.0]), LogRenderer);
    let report = pipeline.run();

    // Preprocessing worked, the level is only needed for detection.
    assert!(pipeline
        .archive()
        .exists(&processed_path(&out_dir, Variable::Temperature)));

    assert!(report.detection.is_failed());
    assert!(!pipeline.archive().exists(&mask_path(&out_dir, FRONT_LEVEL)));
    assert!(report.plotting.is_failed());
}
