//! Command lines of the reconstruction engine.
//!
//! All paths are passed as given; callers pass absolute paths so that the
//! commands do not depend on the working directory.

use std::path::Path;

use crate::{config::PipelineConfig, process::StageCommand};

fn colmap(config: &PipelineConfig, subcommand: &str) -> StageCommand {
    StageCommand::new(config.colmap_binary.as_str()).arg(subcommand)
}

/// Create an empty project database.
pub fn database_creator(config: &PipelineConfig, database: &Path) -> StageCommand {
    colmap(config, "database_creator").path_opt("database_path", database)
}

/// Extract SIFT features of every image in `images` into `database`.
pub fn feature_extractor(config: &PipelineConfig, database: &Path, images: &Path) -> StageCommand {
    colmap(config, "feature_extractor")
        .path_opt("database_path", database)
        .path_opt("image_path", images)
        .opt("SiftExtraction.max_image_size", config.max_image_size)
        .opt("SiftExtraction.max_num_features", config.max_num_features)
        .flag_opt(
            "SiftExtraction.estimate_affine_shape",
            config.estimate_affine_shape,
        )
        .flag_opt(
            "SiftExtraction.domain_size_pooling",
            config.domain_size_pooling,
        )
        .flag_opt("SiftExtraction.use_gpu", config.use_gpu)
}

/// Match the features of every image pair in `database`.
pub fn exhaustive_matcher(config: &PipelineConfig, database: &Path) -> StageCommand {
    colmap(config, "exhaustive_matcher")
        .path_opt("database_path", database)
        .flag_opt("SiftMatching.guided_matching", config.guided_matching)
        .opt("SiftMatching.max_num_matches", config.max_num_matches)
}

/// Run incremental mapping into a single model under `output`.
pub fn mapper(config: &PipelineConfig, database: &Path, images: &Path, output: &Path) -> StageCommand {
    colmap(config, "mapper")
        .path_opt("database_path", database)
        .path_opt("image_path", images)
        .path_opt("output_path", output)
        .opt("Mapper.num_threads", config.mapper_num_threads)
        .opt("Mapper.init_min_tri_angle", 4)
        .opt("Mapper.multiple_models", 0)
        .opt("Mapper.extract_colors", 0)
}

/// Convert the model at `input` to text.
pub fn model_converter(config: &PipelineConfig, input: &Path, output: &Path) -> StageCommand {
    colmap(config, "model_converter")
        .path_opt("input_path", input)
        .path_opt("output_path", output)
        .opt("output_type", "TXT")
}

/// Triangulate points with the poses of the model at `input` held fixed.
pub fn point_triangulator(
    config: &PipelineConfig,
    database: &Path,
    images: &Path,
    input: &Path,
    output: &Path,
) -> StageCommand {
    colmap(config, "point_triangulator")
        .path_opt("database_path", database)
        .path_opt("image_path", images)
        .path_opt("input_path", input)
        .path_opt("output_path", output)
        .opt(
            "Mapper.ba_local_max_num_iterations",
            config.ba_local_max_num_iterations,
        )
        .opt(
            "Mapper.ba_local_max_refinements",
            config.ba_local_max_refinements,
        )
        .opt(
            "Mapper.ba_global_max_num_iterations",
            config.ba_global_max_num_iterations,
        )
}

/// Undistort `images` with the model at `input` into the dense workspace.
pub fn image_undistorter(
    config: &PipelineConfig,
    images: &Path,
    input: &Path,
    output: &Path,
) -> StageCommand {
    colmap(config, "image_undistorter")
        .path_opt("image_path", images)
        .path_opt("input_path", input)
        .path_opt("output_path", output)
}

/// Compute depth and normal maps in the dense workspace.
pub fn patch_match_stereo(config: &PipelineConfig, workspace: &Path) -> StageCommand {
    colmap(config, "patch_match_stereo").path_opt("workspace_path", workspace)
}

/// Fuse the depth maps of the dense workspace into `output`.
pub fn stereo_fusion(config: &PipelineConfig, workspace: &Path, output: &Path) -> StageCommand {
    colmap(config, "stereo_fusion")
        .path_opt("workspace_path", workspace)
        .path_opt("output_path", output)
}
