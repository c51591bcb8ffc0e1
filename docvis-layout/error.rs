use docvis_imgproc::ImgprocError;

#[derive(Debug, Clone, PartialEq)]
pub enum LayoutError {
    Imgproc(ImgprocError),
    /// No line segment or text region survived filtering
    NoSkewEvidence,
    InvalidKernelSize(usize),
    InvalidPeakDistance(usize),
    InvalidWeights { serial: f64, estimate: f64 },
    InvalidSearchStep(u32),
    InvalidSearchWindow(u32),
    /// Glyph image produced no outer contour
    NoGlyphContour,
}

impl std::fmt::Display for LayoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutError::Imgproc(e) => write!(f, "Image processing failed: {}", e),
            LayoutError::NoSkewEvidence => {
                write!(f, "No skew evidence: nothing survived segment/region filtering")
            }
            LayoutError::InvalidKernelSize(k) => {
                write!(f, "Invalid smoothing size: {} (must be odd and > 0)", k)
            }
            LayoutError::InvalidPeakDistance(d) => {
                write!(f, "Invalid peak distance: {} (must be >= 1)", d)
            }
            LayoutError::InvalidWeights { serial, estimate } => {
                write!(f, "Invalid blend weights: {} + {} (sum must be > 0)", serial, estimate)
            }
            LayoutError::InvalidSearchStep(s) => {
                write!(f, "Invalid search step: {} (must be >= 1)", s)
            }
            LayoutError::InvalidSearchWindow(w) => {
                write!(f, "Invalid search half-width: {} (must be >= 1)", w)
            }
            LayoutError::NoGlyphContour => write!(f, "No glyph contour found"),
        }
    }
}

impl std::error::Error for LayoutError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LayoutError::Imgproc(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ImgprocError> for LayoutError {
    fn from(e: ImgprocError) -> Self {
        LayoutError::Imgproc(e)
    }
}

pub type LayoutResult<T> = Result<T, LayoutError>;
