#![allow(dead_code)]

use std::path::{Path, PathBuf};

use viewprep_db::{CameraModelId, ProjectStore};
use viewprep_pipeline::{CommandRunner, PipelineError, StageCommand, StageOutput};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Stands in for the reconstruction engine.
///
/// Records every command. `feature_extractor` registers the images of
/// `--image_path` in reverse name order, `mapper` writes a reference model
/// and `stereo_fusion` touches its output file. Everything else succeeds
/// without side effects unless it is the configured failing subcommand.
#[derive(Debug, Default)]
pub struct FakeColmap {
    pub commands: Vec<StageCommand>,
    pub fail_on: Option<String>,
}

impl FakeColmap {
    pub fn failing_on(subcommand: &str) -> Self {
        Self {
            fail_on: Some(subcommand.to_string()),
            ..Default::default()
        }
    }

    pub fn subcommands(&self) -> Vec<&str> {
        self.commands.iter().filter_map(|c| c.subcommand()).collect()
    }

    fn register_images(&self, command: &StageCommand) -> Result<(), PipelineError> {
        let database = required(command, "database_path")?;
        let images = required(command, "image_path")?;

        let mut store = ProjectStore::open(&database)?;
        store.create_schema()?;
        let camera_id = match store.cameras()?.first() {
            Some(camera) => camera.camera_id,
            None => store.add_camera(
                CameraModelId::SimpleRadial,
                1008,
                756,
                &[815.0, 504.0, 378.0, 0.01],
                false,
            )?,
        };

        let mut names = std::fs::read_dir(&images)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        names.sort();
        names.reverse();
        for name in names {
            if store.image_by_name(&name)?.is_none() {
                store.add_image(&name, camera_id, None)?;
            }
        }
        store.close()?;
        Ok(())
    }

    fn write_reference_model(&self, command: &StageCommand) -> Result<(), PipelineError> {
        let images = required(command, "image_path")?;
        let model = required(command, "output_path")?.join("0");
        std::fs::create_dir_all(&model)?;

        let mut names = std::fs::read_dir(&images)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        names.sort();
        write_reference(&model, &names)?;
        Ok(())
    }
}

impl CommandRunner for FakeColmap {
    fn run(&mut self, command: &StageCommand) -> Result<StageOutput, PipelineError> {
        self.commands.push(command.clone());
        let subcommand = command.subcommand().unwrap_or_default().to_string();

        if self.fail_on.as_deref() == Some(subcommand.as_str()) {
            return Ok(StageOutput {
                exit_code: Some(1),
                stderr: format!("{subcommand}: CUDA error: out of memory\n"),
            });
        }

        match subcommand.as_str() {
            "feature_extractor" => self.register_images(command)?,
            "mapper" => self.write_reference_model(command)?,
            "stereo_fusion" => {
                std::fs::write(required(command, "output_path")?, b"ply\n")?;
            }
            _ => {}
        }

        Ok(StageOutput {
            exit_code: Some(0),
            stderr: String::new(),
        })
    }
}

fn required(command: &StageCommand, name: &str) -> Result<PathBuf, PipelineError> {
    command
        .option(name)
        .map(PathBuf::from)
        .ok_or_else(|| PipelineError::PreconditionFailed(format!("missing --{name} in `{command}`")))
}

/// The pose of the reference image at sorted index `idx`.
pub fn reference_pose(idx: usize) -> ([f64; 4], [f64; 3]) {
    let x = idx as f64;
    ([1.0, 0.0, 0.0, 0.0], [x, -0.5 * x, 2.0])
}

/// Write `images.txt` and `cameras.txt` of a reference model holding `names`.
///
/// Image ids follow the sorted order starting at 1 and the pose of each image
/// is [`reference_pose`] of its index.
pub fn write_reference(model: &Path, names: &[String]) -> std::io::Result<()> {
    let mut images = String::from(
        "# Image list with two lines of data per image:\n\
         #   IMAGE_ID, QW, QX, QY, QZ, TX, TY, TZ, CAMERA_ID, NAME\n\
         #   POINTS2D[] as (X, Y, POINT3D_ID)\n",
    );
    for (idx, name) in names.iter().enumerate() {
        let ([qw, qx, qy, qz], [tx, ty, tz]) = reference_pose(idx);
        images.push_str(&format!(
            "{} {qw} {qx} {qy} {qz} {tx} {ty} {tz} 1 {name}\n",
            idx + 1
        ));
        images.push_str("12.5 40.25 -1 100.0 8.0 3\n");
    }
    std::fs::write(model.join("images.txt"), images)?;
    std::fs::write(
        model.join("cameras.txt"),
        "# Camera list with one line of data per camera:\n\
         1 SIMPLE_RADIAL 1008 756 815 504 378 0.01\n",
    )?;
    Ok(())
}

/// Create `<root>/scene` with `num_images` source images and, if
/// `with_reference`, a reference model over all of them.
pub fn make_scene(root: &Path, num_images: usize, with_reference: bool) -> std::io::Result<(PathBuf, Vec<String>)> {
    let scene = root.join("scene");
    let images = scene.join("images");
    std::fs::create_dir_all(&images)?;

    let names = (0..num_images)
        .map(|i| format!("DSC_{i:04}.JPG"))
        .collect::<Vec<_>>();
    for name in &names {
        std::fs::write(images.join(name), name.as_bytes())?;
    }

    if with_reference {
        let model = scene.join("sparse").join("0");
        std::fs::create_dir_all(&model)?;
        write_reference(&model, &names)?;
    }
    Ok((scene, names))
}
