use std::path::{Path, PathBuf};

/// Paths of a scene directory.
///
/// ```text
/// <scene>/
///   images/           source images
///   sparse/0/         reference model (images.txt, cameras.txt)
///   database.db       reference project database
///   <n>_views/        one run per view count
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneLayout {
    root: PathBuf,
}

impl SceneLayout {
    /// Create the layout of the scene rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The scene directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The source images.
    pub fn images(&self) -> PathBuf {
        self.root.join("images")
    }

    /// The output directory of the mapper.
    pub fn sparse(&self) -> PathBuf {
        self.root.join("sparse")
    }

    /// The reference model produced by the mapper.
    pub fn reference_model(&self) -> PathBuf {
        self.sparse().join("0")
    }

    /// The reference `images.txt`.
    pub fn reference_images_txt(&self) -> PathBuf {
        self.reference_model().join("images.txt")
    }

    /// The reference `cameras.txt`.
    pub fn reference_cameras_txt(&self) -> PathBuf {
        self.reference_model().join("cameras.txt")
    }

    /// The database used to build the reference model.
    pub fn database(&self) -> PathBuf {
        self.root.join("database.db")
    }

    /// The layout of the run with `n_views` training views.
    pub fn run(&self, n_views: usize) -> RunLayout {
        RunLayout {
            root: self.root.join(format!("{n_views}_views")),
        }
    }
}

/// Paths of a single few-view run, `<scene>/<n>_views/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    root: PathBuf,
}

impl RunLayout {
    /// The run directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The staged training images.
    pub fn images(&self) -> PathBuf {
        self.root.join("images")
    }

    /// The run's project database.
    pub fn database(&self) -> PathBuf {
        self.root.join("database.db")
    }

    /// The model with fixed poses fed to the triangulator.
    pub fn created(&self) -> PathBuf {
        self.root.join("created")
    }

    /// The pose manifest, `created/images.txt`.
    pub fn manifest(&self) -> PathBuf {
        self.created().join("images.txt")
    }

    /// `created/cameras.txt`.
    pub fn cameras_txt(&self) -> PathBuf {
        self.created().join("cameras.txt")
    }

    /// `created/points3D.txt`.
    pub fn points3d_txt(&self) -> PathBuf {
        self.created().join("points3D.txt")
    }

    /// The triangulated model.
    pub fn triangulated(&self) -> PathBuf {
        self.root.join("triangulated")
    }

    /// The dense workspace.
    pub fn dense(&self) -> PathBuf {
        self.root.join("dense")
    }

    /// The fused point cloud.
    pub fn fused_ply(&self) -> PathBuf {
        self.dense().join("fused.ply")
    }

    /// The directories created by the first stage.
    pub fn directories(&self) -> [PathBuf; 5] {
        [
            self.root.clone(),
            self.created(),
            self.triangulated(),
            self.images(),
            self.dense(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_layout() {
        let scene = SceneLayout::new("/data/llff/fern");
        assert_eq!(
            scene.reference_images_txt(),
            Path::new("/data/llff/fern/sparse/0/images.txt")
        );
        let run = scene.run(3);
        assert_eq!(run.root(), Path::new("/data/llff/fern/3_views"));
        assert_eq!(run.manifest(), Path::new("/data/llff/fern/3_views/created/images.txt"));
        assert_eq!(run.fused_ply(), Path::new("/data/llff/fern/3_views/dense/fused.ply"));
    }
}
