#[derive(Debug, Clone, PartialEq)]
pub enum DescriptorError {
    InvalidRadii { rho_min: u32, rho_max: u32 },
    InvalidStep(u32),
    InvalidSampling(u32),
    LengthMismatch { expected: usize, actual: usize },
    InvalidRatio(f64),
}

impl std::fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DescriptorError::InvalidRadii { rho_min, rho_max } => {
                write!(f, "Invalid ring radii: {}..{} (min must be below max)", rho_min, rho_max)
            }
            DescriptorError::InvalidStep(s) => write!(f, "Invalid ring step: {} (must be >= 1)", s),
            DescriptorError::InvalidSampling(n) => {
                write!(f, "Invalid angular sampling: {} (must be >= 1)", n)
            }
            DescriptorError::LengthMismatch { expected, actual } => {
                write!(f, "Descriptor length mismatch: expected {}, got {}", expected, actual)
            }
            DescriptorError::InvalidRatio(r) => write!(f, "Invalid ratio: {} (must be > 0)", r),
        }
    }
}

impl std::error::Error for DescriptorError {}

pub type DescriptorResult<T> = Result<T, DescriptorError>;
