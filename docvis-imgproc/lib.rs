//! Shared preprocessing for the docvis pipelines.
//!
//! Everything here operates on `image::GrayImage` or on `docvis_core::Grid`
//! and is reused by the corner detector and the layout analysis crates.

pub mod error;
pub mod filter;
pub mod hough;
pub mod morphology;
pub mod peaks;
pub mod projection;
pub mod regions;
pub mod rotation;
pub mod spectrum;

pub use error::{ImgprocError, ImgprocResult};
pub use filter::{box_blur, gaussian_blur, gaussian_kernel, smooth_1d, sobel5};
pub use hough::{HoughParams, ProbabilisticHough};
pub use morphology::{connect_text, thin_glyphs, ConnectOptions, StructuringElement};
pub use peaks::{find_peaks, PeakOptions};
pub use projection::{column_sums, full_region, row_sums};
pub use regions::{external_regions, Region};
pub use rotation::{rotate_expand, rotated_canvas};
pub use spectrum::{magnitude_spectrum, spectrum_mask, threshold_mask};
