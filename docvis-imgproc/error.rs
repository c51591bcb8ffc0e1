#[derive(Debug, Clone, PartialEq)]
pub enum ImgprocError {
    EmptyImage,
    InvalidKernelSize(usize),
    InvalidDistance(usize),
    RegionOutOfBounds { x: u32, y: u32, width: u32, height: u32 },
    SingularTransform,
}

impl std::fmt::Display for ImgprocError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImgprocError::EmptyImage => write!(f, "Image has no pixels"),
            ImgprocError::InvalidKernelSize(k) => {
                write!(f, "Invalid kernel size: {} (must be odd and > 0)", k)
            }
            ImgprocError::InvalidDistance(d) => {
                write!(f, "Invalid peak distance: {} (must be >= 1)", d)
            }
            ImgprocError::RegionOutOfBounds { x, y, width, height } => {
                write!(f, "Region {}x{} at ({}, {}) lies outside the image", width, height, x, y)
            }
            ImgprocError::SingularTransform => write!(f, "Transform matrix is not invertible"),
        }
    }
}

impl std::error::Error for ImgprocError {}

pub type ImgprocResult<T> = Result<T, ImgprocError>;
