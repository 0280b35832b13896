use std::{fmt, str::FromStr};

/// Identifier of a camera row.
pub type CameraId = u32;

/// Identifier of an image row, always in `[0, 2^31)`.
pub type ImageId = u32;

/// Represents a COLMAP camera model id.
///
/// The discriminant is the integer tag stored in the `cameras.model` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraModelId {
    /// Simple pinhole camera model: `f, cx, cy`
    SimplePinhole = 0,
    /// Pinhole camera model: `fx, fy, cx, cy`
    Pinhole = 1,
    /// Simplified radial camera model: `f, cx, cy, k`
    SimpleRadial = 2,
    /// Radial camera model: `f, cx, cy, k1, k2`
    Radial = 3,
    /// OpenCV camera model: `fx, fy, cx, cy, k1, k2, p1, p2`
    OpenCV = 4,
    /// OpenCV fisheye camera model: `fx, fy, cx, cy, k1, k2, k3, k4`
    OpenCVFisheye = 5,
    /// Full OpenCV camera model
    FullOpenCV = 6,
    /// Field of view camera model: `fx, fy, cx, cy, omega`
    FOV = 7,
    /// Simple radial fisheye camera model: `f, cx, cy, k`
    SimpleRadialFisheye = 8,
    /// Radial fisheye camera model: `f, cx, cy, k1, k2`
    RadialFisheye = 9,
    /// Thin prism fisheye camera model
    ThinPrismFisheye = 10,
}

impl CameraModelId {
    /// All supported models, ordered by tag.
    pub const ALL: [CameraModelId; 11] = [
        Self::SimplePinhole,
        Self::Pinhole,
        Self::SimpleRadial,
        Self::Radial,
        Self::OpenCV,
        Self::OpenCVFisheye,
        Self::FullOpenCV,
        Self::FOV,
        Self::SimpleRadialFisheye,
        Self::RadialFisheye,
        Self::ThinPrismFisheye,
    ];

    /// Number of intrinsic parameters implied by the model.
    pub fn num_params(&self) -> usize {
        match self {
            Self::SimplePinhole => 3,
            Self::Pinhole => 4,
            Self::SimpleRadial => 4,
            Self::Radial => 5,
            Self::OpenCV => 8,
            Self::OpenCVFisheye => 8,
            Self::FullOpenCV => 12,
            Self::FOV => 5,
            Self::SimpleRadialFisheye => 4,
            Self::RadialFisheye => 5,
            Self::ThinPrismFisheye => 12,
        }
    }

    /// The integer tag stored in the database.
    pub fn tag(&self) -> i64 {
        *self as i64
    }

    /// Look up a model by its integer tag.
    pub fn from_tag(tag: i64) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.tag() == tag)
    }

    /// The model name used in the text model files.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SimplePinhole => "SIMPLE_PINHOLE",
            Self::Pinhole => "PINHOLE",
            Self::SimpleRadial => "SIMPLE_RADIAL",
            Self::Radial => "RADIAL",
            Self::OpenCV => "OPENCV",
            Self::OpenCVFisheye => "OPENCV_FISHEYE",
            Self::FullOpenCV => "FULL_OPENCV",
            Self::FOV => "FOV",
            Self::SimpleRadialFisheye => "SIMPLE_RADIAL_FISHEYE",
            Self::RadialFisheye => "RADIAL_FISHEYE",
            Self::ThinPrismFisheye => "THIN_PRISM_FISHEYE",
        }
    }
}

impl fmt::Display for CameraModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown camera model name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid camera model id: {0}")]
pub struct UnknownCameraModel(pub String);

impl FromStr for CameraModelId {
    type Err = UnknownCameraModel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.name() == s)
            .ok_or_else(|| UnknownCameraModel(s.to_string()))
    }
}

/// Represents a camera row.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Camera id
    pub camera_id: CameraId,
    /// Camera model id
    pub model: CameraModelId,
    /// Image width
    pub width: u64,
    /// Image height
    pub height: u64,
    /// Camera parameters
    pub params: Vec<f64>,
    /// Whether the focal length in `params` is a trusted prior
    pub prior_focal_length: bool,
}

/// A prior camera pose, world-to-camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorPose {
    /// Rotation as `qw, qx, qy, qz`
    pub qvec: [f64; 4],
    /// Translation as `tx, ty, tz`
    pub tvec: [f64; 3],
}

/// Represents an image row.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    /// Image id
    pub image_id: ImageId,
    /// Image name, unique within the project
    pub name: String,
    /// Camera id
    pub camera_id: CameraId,
    /// Prior pose, if known
    pub prior: Option<PriorPose>,
}

/// Geometric configuration of an image pair.
///
/// The discriminant is the integer tag stored in `two_view_geometries.config`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TwoViewGeometryConfig {
    /// Not yet estimated.
    #[default]
    Undefined = 0,
    /// Degenerate configuration.
    Degenerate = 1,
    /// Essential matrix.
    Calibrated = 2,
    /// Fundamental matrix.
    Uncalibrated = 3,
    /// Homography, planar scene.
    Planar = 4,
    /// Homography, pure rotation.
    Panoramic = 5,
    /// Homography, planar or pure rotation.
    PlanarOrPanoramic = 6,
    /// Watermark, pure 2D translation in image borders.
    Watermark = 7,
    /// Multi-model configuration.
    Multiple = 8,
}

impl TwoViewGeometryConfig {
    const ALL: [TwoViewGeometryConfig; 9] = [
        Self::Undefined,
        Self::Degenerate,
        Self::Calibrated,
        Self::Uncalibrated,
        Self::Planar,
        Self::Panoramic,
        Self::PlanarOrPanoramic,
        Self::Watermark,
        Self::Multiple,
    ];

    /// The integer tag stored in the database.
    pub fn tag(&self) -> i64 {
        *self as i64
    }

    /// Look up a configuration by its integer tag.
    pub fn from_tag(tag: i64) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.tag() == tag)
    }
}

/// Estimated two-view geometry of an image pair.
///
/// Matrices are 3x3 row-major. Every field except `config` may be absent
/// before estimation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TwoViewGeometry {
    /// Geometric configuration
    pub config: TwoViewGeometryConfig,
    /// Fundamental matrix
    pub f: Option<[f64; 9]>,
    /// Essential matrix
    pub e: Option<[f64; 9]>,
    /// Homography
    pub h: Option<[f64; 9]>,
    /// Relative rotation as `qw, qx, qy, qz`
    pub qvec: Option<[f64; 4]>,
    /// Relative translation
    pub tvec: Option<[f64; 3]>,
}
