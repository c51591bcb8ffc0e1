#[derive(Debug, Clone, PartialEq)]
pub enum HarrisError {
    InvalidImageSize { width: u32, height: u32 },
    ImageTooSmall { width: u32, height: u32, min_size: u32 },
    InvalidK(f64),
    InvalidThreshold(f64),
    InvalidOffset(usize),
    InvalidBlurSize(usize),
}

impl std::fmt::Display for HarrisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HarrisError::InvalidImageSize { width, height } => {
                write!(f, "Invalid image dimensions: {}x{} (must be > 0)", width, height)
            }
            HarrisError::ImageTooSmall { width, height, min_size } => {
                write!(f, "Image {}x{} too small (minimum {}x{})", width, height, min_size, min_size)
            }
            HarrisError::InvalidK(k) => {
                write!(f, "Invalid Harris k: {} (must be in (0, 0.25))", k)
            }
            HarrisError::InvalidThreshold(t) => {
                write!(f, "Invalid threshold: {} (must be in [0, 1])", t)
            }
            HarrisError::InvalidOffset(o) => {
                write!(f, "Invalid window offset: {} (must be >= 1)", o)
            }
            HarrisError::InvalidBlurSize(k) => {
                write!(f, "Invalid blur size: {} (must be odd and > 0)", k)
            }
        }
    }
}

impl std::error::Error for HarrisError {}

pub type HarrisResult<T> = Result<T, HarrisError>;
