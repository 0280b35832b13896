use std::fmt;

/// The steps of a few-view reconstruction run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Create the run's working directories.
    StageDirs,
    /// Sample the training views and copy them into the run.
    CopyTrainingImages,
    /// Extract and match features into the project database.
    ExtractAndMatch,
    /// Renumber the reference poses in the database's registration order.
    ReconcileOrder,
    /// Write the renumbered poses for the triangulator.
    WritePoseManifest,
    /// Triangulate points with fixed poses.
    Triangulate,
    /// Convert the triangulated model to text.
    ConvertModel,
    /// Undistort the training images.
    Undistort,
    /// Compute depth and normal maps.
    DenseStereo,
    /// Fuse depth maps into a point cloud.
    Fuse,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 10] = [
        Stage::StageDirs,
        Stage::CopyTrainingImages,
        Stage::ExtractAndMatch,
        Stage::ReconcileOrder,
        Stage::WritePoseManifest,
        Stage::Triangulate,
        Stage::ConvertModel,
        Stage::Undistort,
        Stage::DenseStereo,
        Stage::Fuse,
    ];

    /// The snake case name of the stage.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::StageDirs => "stage_dirs",
            Stage::CopyTrainingImages => "copy_training_images",
            Stage::ExtractAndMatch => "extract_and_match",
            Stage::ReconcileOrder => "reconcile_order",
            Stage::WritePoseManifest => "write_pose_manifest",
            Stage::Triangulate => "triangulate",
            Stage::ConvertModel => "convert_model",
            Stage::Undistort => "undistort",
            Stage::DenseStereo => "dense_stereo",
            Stage::Fuse => "fuse",
        }
    }

    /// 1-based position of the stage in the run.
    pub fn step(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).unwrap_or(0) + 1
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
