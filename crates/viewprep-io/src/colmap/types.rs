use viewprep_db::{CameraId, CameraModelId, ImageId};

/// Represents a camera in a COLMAP text model.
#[derive(Debug, Clone, PartialEq)]
pub struct ColmapCamera {
    /// Camera id
    pub camera_id: CameraId,
    /// Camera model id
    pub model_id: CameraModelId,
    /// Image width
    pub width: usize,
    /// Image height
    pub height: usize,
    /// Camera parameters
    pub params: Vec<f64>,
}

/// Represents a registered image in a COLMAP text model.
#[derive(Debug, Clone, PartialEq)]
pub struct ColmapImage {
    /// Image id
    pub image_id: ImageId,
    /// Rotation
    pub rotation: [f64; 4], // qw, qx, qy, qz
    /// Translation
    pub translation: [f64; 3], // x, y, z
    /// Camera id
    pub camera_id: CameraId,
    /// Image name
    pub name: String,
    /// Points2d as (x, y, point3d_id)
    pub points2d: Vec<(f64, f64, i64)>,
}
