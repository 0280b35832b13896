use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{error::PipelineError, sampler::HOLDOUT_STRIDE};

/// Knobs of a reconstruction run.
///
/// Every field has a default, so a JSON file only needs to list the values
/// it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// The reconstruction engine executable.
    pub colmap_binary: String,
    /// Every n-th view by sorted name is held out.
    pub holdout_stride: usize,
    /// Number of training views, 0 uses every non-holdout view.
    pub n_views: usize,
    /// Worker threads used to stage the training images.
    pub copy_workers: usize,
    /// Maximum image size used by the feature extractor.
    pub max_image_size: u32,
    /// Maximum number of features per image.
    pub max_num_features: u32,
    /// Maximum number of matches per image pair.
    pub max_num_matches: u32,
    /// Estimate affine feature shapes.
    pub estimate_affine_shape: bool,
    /// Use domain size pooling for descriptors.
    pub domain_size_pooling: bool,
    /// Use guided matching.
    pub guided_matching: bool,
    /// Run feature extraction on the GPU when possible.
    pub use_gpu: bool,
    /// Threads used by the mapper for the reference model.
    pub mapper_num_threads: u32,
    /// Local bundle adjustment iterations during triangulation.
    pub ba_local_max_num_iterations: u32,
    /// Local bundle adjustment refinements during triangulation.
    pub ba_local_max_refinements: u32,
    /// Global bundle adjustment iterations during triangulation.
    pub ba_global_max_num_iterations: u32,
    /// Free space in GB required before the dense stages, unchecked if `None`.
    pub min_free_space_gb: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            colmap_binary: "colmap".to_string(),
            holdout_stride: HOLDOUT_STRIDE,
            n_views: 0,
            copy_workers: 4,
            max_image_size: 4032,
            max_num_features: 32768,
            max_num_matches: 32768,
            estimate_affine_shape: true,
            domain_size_pooling: true,
            guided_matching: true,
            use_gpu: true,
            mapper_num_threads: 16,
            ba_local_max_num_iterations: 40,
            ba_local_max_refinements: 3,
            ba_global_max_num_iterations: 100,
            min_free_space_gb: None,
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let file = std::fs::File::open(path)?;
        let config = serde_json::from_reader(std::io::BufReader::new(file))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let config: PipelineConfig =
            serde_json::from_str(r#"{ "n_views": 3, "colmap_binary": "/opt/colmap/bin/colmap" }"#)?;
        assert_eq!(config.n_views, 3);
        assert_eq!(config.colmap_binary, "/opt/colmap/bin/colmap");
        assert_eq!(config.holdout_stride, 8);
        assert_eq!(config.copy_workers, 4);
        assert_eq!(config.min_free_space_gb, None);
        Ok(())
    }

    #[test]
    fn test_from_json_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "use_gpu": false, "min_free_space_gb": 20 }"#)?;
        let config = PipelineConfig::from_json_file(&path)?;
        assert!(!config.use_gpu);
        assert_eq!(config.min_free_space_gb, Some(20));

        std::fs::write(&path, r#"{ "n_views": "three" }"#)?;
        assert!(matches!(
            PipelineConfig::from_json_file(&path),
            Err(PipelineError::Config(_))
        ));
        Ok(())
    }
}
