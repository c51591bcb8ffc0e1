//! Document layout analysis on grayscale pages.
//!
//! * [`segment`] splits a page into lines, words and letters with projection
//!   profiles.
//! * [`skew`] estimates the page skew from its spectrum or from text-region
//!   contours and rotates the page upright.
//! * [`signature`] describes single glyphs by the Fourier magnitudes of their
//!   contours.

pub mod boxes;
pub mod config;
pub mod error;
pub mod segment;
pub mod signature;
pub mod skew;

pub use boxes::contour_boxes;
pub use config::{CentralExclusion, LayoutConfig, LevelConfig, PeakKeep, SegmentationConfig, SkewConfig};
pub use error::{LayoutError, LayoutResult};
pub use segment::{LetterSpan, LineBand, PageLayout, Segmenter, TextLine, WordSpan};
pub use signature::{GlyphSignature, Tolerance};
pub use skew::{Deskewed, SkewEstimator, SkewMethod};
