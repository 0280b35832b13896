use std::path::PathBuf;

use crate::{
    commands,
    config::PipelineConfig,
    error::PipelineError,
    layout::SceneLayout,
    process::{run_checked, CommandRunner},
    staging,
};

/// Build the reference model of a scene from all of its images.
///
/// Runs database creation, feature extraction, exhaustive matching and
/// single-model incremental mapping, then converts `sparse/0` to text. The
/// resulting `images.txt` and `cameras.txt` are what few-view runs sample
/// and renumber.
///
/// # Arguments
///
/// * `scene` - The scene to reconstruct. `images/` must hold at least one file.
/// * `config` - The engine binary and feature/matching knobs.
/// * `runner` - Executes the engine.
///
/// # Returns
///
/// The directory of the reference model.
pub fn build_reference_model<R: CommandRunner + ?Sized>(
    scene: &SceneLayout,
    config: &PipelineConfig,
    runner: &mut R,
) -> Result<PathBuf, PipelineError> {
    let images = scene.images();
    let num_images = walkdir::WalkDir::new(&images)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .count();
    if num_images == 0 {
        return Err(PipelineError::PreconditionFailed(format!(
            "no images found in {}",
            images.display()
        )));
    }
    log::info!("building reference model from {num_images} images");

    staging::ensure_dir(&scene.sparse())?;

    let database = scene.database();
    let model = scene.reference_model();
    let steps = [
        commands::database_creator(config, &database),
        commands::feature_extractor(config, &database, &images),
        commands::exhaustive_matcher(config, &database),
        commands::mapper(config, &database, &images, &scene.sparse()),
        commands::model_converter(config, &model, &model),
    ];
    for (i, cmd) in steps.iter().enumerate() {
        log::info!(
            "[{}/{}] {}",
            i + 1,
            steps.len(),
            cmd.subcommand().unwrap_or_default()
        );
        run_checked(&mut *runner, cmd)?;
    }

    staging::require_file(&scene.reference_images_txt())?;
    staging::require_file(&scene.reference_cameras_txt())?;
    Ok(model)
}
