use std::path::PathBuf;

use viewprep_db::ProjectStore;
use viewprep_io::colmap::{self, ColmapImage};

use crate::{
    commands,
    config::PipelineConfig,
    error::{PipelineError, StageContext, StageError},
    layout::{RunLayout, SceneLayout},
    process::{run_checked, CommandRunner},
    reconcile,
    sampler::{self, ViewSplit},
    stage::Stage,
    staging::{self, CopyReport},
};

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    /// The training and holdout views.
    pub split: ViewSplit,
    /// What happened while staging the training images.
    pub copy: CopyReport,
    /// The pose records written to the manifest, in registration order.
    pub records: Vec<ColmapImage>,
    /// The fused point cloud.
    pub fused: PathBuf,
}

/// Drives a few-view reconstruction of one scene.
///
/// The stages run strictly in order and the first failure stops the run.
/// Outputs of finished stages are left in place; re-running reuses the
/// directories and skips images that are already staged.
pub struct Pipeline<R: CommandRunner> {
    config: PipelineConfig,
    scene: SceneLayout,
    run: RunLayout,
    runner: R,
}

impl<R: CommandRunner> Pipeline<R> {
    /// Create a pipeline for the scene at `scene_dir`.
    ///
    /// The run directory is `<scene_dir>/<n_views>_views`.
    pub fn new(scene_dir: impl Into<PathBuf>, config: PipelineConfig, runner: R) -> Self {
        let scene = SceneLayout::new(scene_dir);
        let run = scene.run(config.n_views);
        Self {
            config,
            scene,
            run,
            runner,
        }
    }

    /// The scene paths.
    pub fn scene(&self) -> &SceneLayout {
        &self.scene
    }

    /// The run paths.
    pub fn layout(&self) -> &RunLayout {
        &self.run
    }

    /// The configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Give back the command runner.
    pub fn into_runner(self) -> R {
        self.runner
    }

    /// Run every stage in order.
    ///
    /// # Errors
    ///
    /// The first failure, tagged with the stage that produced it.
    pub fn run(&mut self) -> Result<PipelineReport, StageError> {
        log::info!(
            "few-view run of {} with n_views={} in {}",
            self.scene.root().display(),
            self.config.n_views,
            self.run.root().display()
        );

        self.step(Stage::StageDirs, |p| p.stage_dirs())?;
        let (split, copy) = self.step(Stage::CopyTrainingImages, |p| p.copy_training_images())?;
        self.step(Stage::ExtractAndMatch, |p| p.extract_and_match())?;
        let records = self.step(Stage::ReconcileOrder, |p| p.reconcile_order())?;
        self.step(Stage::WritePoseManifest, |p| p.write_pose_manifest(&records))?;
        self.step(Stage::Triangulate, |p| p.triangulate())?;
        self.step(Stage::ConvertModel, |p| p.convert_model())?;
        self.step(Stage::Undistort, |p| p.undistort())?;
        self.step(Stage::DenseStereo, |p| p.dense_stereo())?;
        let fused = self.step(Stage::Fuse, |p| p.fuse())?;

        log::info!("fused point cloud written to {}", fused.display());
        Ok(PipelineReport {
            split,
            copy,
            records,
            fused,
        })
    }

    fn step<T>(
        &mut self,
        stage: Stage,
        f: impl FnOnce(&mut Self) -> Result<T, PipelineError>,
    ) -> Result<T, StageError> {
        log::info!("[{}/{}] {}", stage.step(), Stage::ALL.len(), stage);
        f(self).at(stage)
    }

    /// Create the run directories, reusing existing ones.
    pub fn stage_dirs(&self) -> Result<(), PipelineError> {
        self.run
            .directories()
            .iter()
            .try_for_each(|dir| staging::ensure_dir(dir))
    }

    /// Sample the training views and stage them with the reference cameras.
    ///
    /// Also seeds `created/` with the reference `cameras.txt` and an empty
    /// `points3D.txt`.
    pub fn copy_training_images(&self) -> Result<(ViewSplit, CopyReport), PipelineError> {
        staging::require_file(&self.scene.reference_images_txt())?;
        staging::require_file(&self.scene.reference_cameras_txt())?;

        let reference = colmap::read_images_txt(self.scene.reference_images_txt())?;
        let names = reference.iter().map(|image| image.name.as_str()).collect::<Vec<_>>();
        let split = sampler::select_views(&names, self.config.holdout_stride, self.config.n_views)?;
        log::info!(
            "{} reference views: {} for training, {} held out",
            names.len(),
            split.train.len(),
            split.holdout.len()
        );

        let copy = staging::copy_training_images(
            &split.train,
            &self.scene.images(),
            &self.run.images(),
            self.config.copy_workers,
        )?;

        std::fs::copy(self.scene.reference_cameras_txt(), self.run.cameras_txt())?;
        colmap::write_empty_points3d_txt(self.run.points3d_txt())?;

        Ok((split, copy))
    }

    /// Create the project database and fill it with features and matches.
    pub fn extract_and_match(&mut self) -> Result<(), PipelineError> {
        let database = self.run.database();
        let mut store = ProjectStore::open(&database)?;
        store.create_schema()?;
        store.close()?;

        let extract = commands::feature_extractor(&self.config, &database, &self.run.images());
        run_checked(&mut self.runner, &extract)?;
        let matcher = commands::exhaustive_matcher(&self.config, &database);
        run_checked(&mut self.runner, &matcher)?;
        Ok(())
    }

    /// Pair every registered image with its reference pose, renumbered 1..N
    /// in the database's registration order.
    pub fn reconcile_order(&self) -> Result<Vec<ColmapImage>, PipelineError> {
        let database = self.run.database();
        staging::require_file(&database)?;

        let store = ProjectStore::open(&database)?;
        let store_order = store.list_images()?;
        store.close()?;
        log::debug!("registration order: {store_order:?}");

        let reference = colmap::read_images_txt(self.scene.reference_images_txt())?;
        reconcile::reconcile_order(&store_order, &reference)
    }

    /// Write the pose manifest read by the triangulator.
    pub fn write_pose_manifest(&self, records: &[ColmapImage]) -> Result<(), PipelineError> {
        colmap::write_pose_manifest(self.run.manifest(), records)?;
        log::info!(
            "wrote {} poses to {}",
            records.len(),
            self.run.manifest().display()
        );
        Ok(())
    }

    /// Triangulate points with the manifest poses held fixed.
    pub fn triangulate(&mut self) -> Result<(), PipelineError> {
        staging::require_file(&self.run.manifest())?;
        staging::require_file(&self.run.cameras_txt())?;
        let cmd = commands::point_triangulator(
            &self.config,
            &self.run.database(),
            &self.run.images(),
            &self.run.created(),
            &self.run.triangulated(),
        );
        run_checked(&mut self.runner, &cmd)?;
        Ok(())
    }

    /// Convert the triangulated model to text in place.
    pub fn convert_model(&mut self) -> Result<(), PipelineError> {
        let triangulated = self.run.triangulated();
        let cmd = commands::model_converter(&self.config, &triangulated, &triangulated);
        run_checked(&mut self.runner, &cmd)?;
        Ok(())
    }

    /// Undistort the training images into the dense workspace.
    pub fn undistort(&mut self) -> Result<(), PipelineError> {
        self.check_free_space()?;
        let cmd = commands::image_undistorter(
            &self.config,
            &self.run.images(),
            &self.run.triangulated(),
            &self.run.dense(),
        );
        run_checked(&mut self.runner, &cmd)?;
        Ok(())
    }

    /// Compute depth and normal maps.
    pub fn dense_stereo(&mut self) -> Result<(), PipelineError> {
        self.check_free_space()?;
        let cmd = commands::patch_match_stereo(&self.config, &self.run.dense());
        run_checked(&mut self.runner, &cmd)?;
        Ok(())
    }

    /// Fuse the depth maps and return the path of the point cloud.
    pub fn fuse(&mut self) -> Result<PathBuf, PipelineError> {
        let fused = self.run.fused_ply();
        let cmd = commands::stereo_fusion(&self.config, &self.run.dense(), &fused);
        run_checked(&mut self.runner, &cmd)?;
        Ok(fused)
    }

    fn check_free_space(&self) -> Result<(), PipelineError> {
        match self.config.min_free_space_gb {
            Some(required_gb) => staging::check_free_space(self.run.root(), required_gb),
            None => Ok(()),
        }
    }
}

impl<R: CommandRunner> std::fmt::Debug for Pipeline<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("scene", &self.scene)
            .field("run", &self.run)
            .finish_non_exhaustive()
    }
}
