use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use viewprep_db::CameraModelId;

use super::{ColmapCamera, ColmapImage};

/// Error types for the COLMAP module.
#[derive(Debug, thiserror::Error)]
pub enum ColmapError {
    /// Error reading or writing file
    #[error("error reading or writing file. {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid number of camera parameters
    #[error("Invalid number of camera parameters for {model}: expected {expected}, got {actual}")]
    InvalidNumCameraParams {
        /// Camera model
        model: CameraModelId,
        /// Parameter count implied by the model
        expected: usize,
        /// Parameter count found
        actual: usize,
    },

    /// Parse error
    #[error("Parse error {0}")]
    ParseError(String),
}

/// Read the cameras.txt file and return a vector of ColmapCamera structs.
///
/// Comment lines starting with `#` and blank lines are skipped.
///
/// # Arguments
///
/// * `path` - The path to the cameras.txt file.
pub fn read_cameras_txt(path: impl AsRef<Path>) -> Result<Vec<ColmapCamera>, ColmapError> {
    let reader = BufReader::new(File::open(path)?);

    let mut cameras = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if is_skippable(&line) {
            continue;
        }
        cameras.push(parse_camera_line(&line)?);
    }

    Ok(cameras)
}

/// Read the images.txt file and return a vector of ColmapImage structs.
///
/// Every image occupies two lines: the pose line and the (possibly empty)
/// points2D line that follows it.
///
/// # Arguments
///
/// * `path` - The path to the images.txt file.
pub fn read_images_txt(path: impl AsRef<Path>) -> Result<Vec<ColmapImage>, ColmapError> {
    let reader = BufReader::new(File::open(path)?);

    let mut images = Vec::new();
    let mut lines = reader.lines();
    while let Some(line) = lines.next() {
        let line = line?;
        if is_skippable(&line) {
            continue;
        }
        // the points2D line is mandatory in the format but may be empty or missing at EOF
        let points = lines.next().transpose()?.unwrap_or_default();
        images.push(parse_image_line(&line, &points)?);
    }

    Ok(images)
}

/// Write the pose manifest consumed by the point triangulator.
///
/// Each image is written as
/// `IMAGE_ID QW QX QY QZ TX TY TZ CAMERA_ID NAME` followed by an empty
/// points2D line. The points of the input images are not written.
///
/// # Arguments
///
/// * `path` - The path to the images.txt file to create.
/// * `images` - The records to write, in output order.
pub fn write_pose_manifest(
    path: impl AsRef<Path>,
    images: &[ColmapImage],
) -> Result<(), ColmapError> {
    let mut writer = BufWriter::new(File::create(path)?);

    for image in images {
        let [qw, qx, qy, qz] = image.rotation;
        let [tx, ty, tz] = image.translation;
        writeln!(
            writer,
            "{} {qw} {qx} {qy} {qz} {tx} {ty} {tz} {} {}",
            image.image_id, image.camera_id, image.name
        )?;
        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(())
}

/// Create an empty points3D.txt file, truncating any existing one.
pub fn write_empty_points3d_txt(path: impl AsRef<Path>) -> Result<(), ColmapError> {
    File::create(path)?;
    Ok(())
}

fn is_skippable(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Utility functions for parsing COLMAP text files
fn parse_part<T: std::str::FromStr>(s: &str) -> Result<T, ColmapError>
where
    T::Err: std::fmt::Display,
{
    s.parse::<T>()
        .map_err(|e| ColmapError::ParseError(format!("{}: {}", s, e)))
}

fn parse_array<const N: usize>(parts: &[&str], what: &str) -> Result<[f64; N], ColmapError> {
    parts
        .iter()
        .map(|s| parse_part(s))
        .collect::<Result<Vec<_>, _>>()?
        .try_into()
        .map_err(|_| ColmapError::ParseError(format!("Invalid number of {what} coordinates")))
}

/// Parse a camera line and return a ColmapCamera struct.
/// NOTE: The number of parameters depends on the camera model.
///       CAMERA_ID, MODEL, WIDTH, HEIGHT, PARAMS[0], PARAMS[1], ...
fn parse_camera_line(line: &str) -> Result<ColmapCamera, ColmapError> {
    let parts = line.split_whitespace().collect::<Vec<_>>();

    if parts.len() < 5 {
        return Err(ColmapError::ParseError(format!(
            "Invalid number of parts: {}",
            parts.len()
        )));
    }

    let model_id = parts[1]
        .parse::<CameraModelId>()
        .map_err(|e| ColmapError::ParseError(e.to_string()))?;

    let params = parts[4..]
        .iter()
        .map(|s| parse_part(s))
        .collect::<Result<Vec<f64>, _>>()?;

    if params.len() != model_id.num_params() {
        return Err(ColmapError::InvalidNumCameraParams {
            model: model_id,
            expected: model_id.num_params(),
            actual: params.len(),
        });
    }

    Ok(ColmapCamera {
        camera_id: parse_part(parts[0])?,
        model_id,
        width: parse_part(parts[2])?,
        height: parse_part(parts[3])?,
        params,
    })
}

/// Parse an image line and return a ColmapImage struct.
/// #   IMAGE_ID, QW, QX, QY, QZ, TX, TY, TZ, CAMERA_ID, NAME
/// #   POINTS2D[] as (X, Y, POINT3D_ID)
fn parse_image_line(line1: &str, line2: &str) -> Result<ColmapImage, ColmapError> {
    let parts1 = line1.split_whitespace().collect::<Vec<_>>();
    let parts2 = line2.split_whitespace().collect::<Vec<_>>();

    if parts1.len() < 10 {
        return Err(ColmapError::ParseError(format!(
            "Invalid number of parts: {}",
            parts1.len()
        )));
    }

    Ok(ColmapImage {
        image_id: parse_part(parts1[0])?,
        rotation: parse_array(&parts1[1..5], "rotation")?,
        translation: parse_array(&parts1[5..8], "translation")?,
        camera_id: parse_part(parts1[8])?,
        name: parts1[9].to_string(),
        points2d: parts2
            .chunks_exact(3)
            .map(|chunk| -> Result<(f64, f64, i64), ColmapError> {
                Ok((
                    parse_part(chunk[0])?,
                    parse_part(chunk[1])?,
                    parse_part(chunk[2])?,
                ))
            })
            .collect::<Result<Vec<_>, _>>()?,
    })
}
