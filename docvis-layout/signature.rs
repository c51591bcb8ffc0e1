use docvis_imgproc::thin_glyphs;
use image::GrayImage;
use imageproc::contours::find_contours;
use imageproc::point::Point;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::error::{LayoutError, LayoutResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Element-wise closeness test `|a - b| <= atol + rtol * |b|`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Tolerance {
    pub rtol: f64,
    pub atol: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self { rtol: 1.0, atol: 1.0 }
    }
}

impl Tolerance {
    pub fn all_close(&self, a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len()
            && a
                .iter()
                .zip(b)
                .all(|(x, y)| (x - y).abs() <= self.atol + self.rtol * y.abs())
    }
}

/// Fourier magnitude signature of a glyph's contours.
///
/// Outer contours and inner (hole) contours are each traced into one
/// complex sequence `x + iy`; the signature is `|FFT|` of the outer
/// sequence followed by that of the inner sequence, each without its DC
/// term.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GlyphSignature {
    values: Vec<f64>,
    outer_len: usize,
}

impl GlyphSignature {
    /// Signature of a dark glyph on a light background
    pub fn extract(gray: &GrayImage) -> LayoutResult<Self> {
        let thinned = thin_glyphs(gray);
        let mut outer = Vec::new();
        let mut inner = Vec::new();
        for contour in find_contours::<i32>(&thinned) {
            if contour.parent.is_none() {
                outer.extend(contour.points);
            } else {
                inner.extend(contour.points);
            }
        }
        Self::from_contours(&outer, &inner)
    }

    pub fn from_contours(outer: &[Point<i32>], inner: &[Point<i32>]) -> LayoutResult<Self> {
        if outer.is_empty() {
            return Err(LayoutError::NoGlyphContour);
        }
        let mut values = magnitudes(outer);
        let outer_len = values.len();
        if !inner.is_empty() {
            values.extend(magnitudes(inner));
        }
        log::trace!(
            "glyph signature: {} outer + {} inner terms",
            outer_len,
            values.len() - outer_len
        );
        Ok(Self { values, outer_len })
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Terms that come from the outer contours
    pub fn outer(&self) -> &[f64] {
        &self.values[..self.outer_len]
    }

    /// Terms that come from hole contours, empty for a glyph without holes
    pub fn inner(&self) -> &[f64] {
        &self.values[self.outer_len..]
    }

    /// Index of the first reference this signature is close to
    pub fn best_match(&self, references: &[GlyphSignature], tolerance: Tolerance) -> Option<usize> {
        references
            .iter()
            .position(|r| tolerance.all_close(&self.values, &r.values))
    }
}

/// `|FFT|` of the point sequence with the DC term dropped
fn magnitudes(points: &[Point<i32>]) -> Vec<f64> {
    let mut buffer: Vec<Complex<f64>> = points
        .iter()
        .map(|p| Complex::new(p.x as f64, p.y as f64))
        .collect();
    let fft = FftPlanner::<f64>::new().plan_fft_forward(buffer.len());
    fft.process(&mut buffer);
    buffer.iter().skip(1).map(|c| c.norm()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn square(size: u32, hole: bool) -> GrayImage {
        GrayImage::from_fn(80, 80, |x, y| {
            let lo = 20;
            let hi = 20 + size;
            let ink = (lo..hi).contains(&x) && (lo..hi).contains(&y);
            let c = 20 + size / 2;
            let in_hole = hole && x.abs_diff(c) < 5 && y.abs_diff(c) < 5;
            if ink && !in_hole {
                Luma([0])
            } else {
                Luma([255])
            }
        })
    }

    #[test]
    fn test_unit_square_magnitudes() {
        let outer = [Point::new(0, 0), Point::new(1, 0), Point::new(1, 1), Point::new(0, 1)];
        let sig = GlyphSignature::from_contours(&outer, &[]).unwrap();
        assert_eq!(sig.len(), 3);
        assert!((sig.as_slice()[0] - 8f64.sqrt()).abs() < 1e-9);
        assert!(sig.as_slice()[1].abs() < 1e-9);
        assert!(sig.as_slice()[2].abs() < 1e-9);
        assert!(sig.inner().is_empty());
    }

    #[test]
    fn test_inner_terms_follow_outer() {
        let outer = [Point::new(0, 0), Point::new(4, 0), Point::new(4, 4), Point::new(0, 4)];
        let inner = [Point::new(1, 1), Point::new(2, 1), Point::new(2, 2)];
        let sig = GlyphSignature::from_contours(&outer, &inner).unwrap();
        assert_eq!(sig.outer().len(), 3);
        assert_eq!(sig.inner().len(), 2);
    }

    #[test]
    fn test_no_outer_contour_is_error() {
        assert_eq!(
            GlyphSignature::from_contours(&[], &[Point::new(1, 1)]),
            Err(LayoutError::NoGlyphContour)
        );
    }

    #[test]
    fn test_tolerance() {
        let tol = Tolerance::default();
        assert!(tol.all_close(&[1.0, 10.0], &[2.5, 6.0]));
        assert!(!tol.all_close(&[1.0, 20.0], &[2.5, 6.0]));
        assert!(!tol.all_close(&[1.0], &[1.0, 1.0]));
        let strict = Tolerance { rtol: 0.0, atol: 0.1 };
        assert!(!strict.all_close(&[1.0], &[1.2]));
    }

    #[test]
    fn test_glyph_with_hole_has_inner_terms() {
        let sig = GlyphSignature::extract(&square(30, true)).unwrap();
        assert!(!sig.outer().is_empty());
        assert!(!sig.inner().is_empty());
        let solid = GlyphSignature::extract(&square(30, false)).unwrap();
        assert!(solid.inner().is_empty());
    }

    #[test]
    fn test_best_match_finds_same_glyph() {
        let query = GlyphSignature::extract(&square(30, true)).unwrap();
        let references = vec![
            GlyphSignature::extract(&square(12, false)).unwrap(),
            GlyphSignature::extract(&square(30, true)).unwrap(),
        ];
        assert_eq!(query.best_match(&references, Tolerance::default()), Some(1));
        assert_eq!(query.best_match(&references[..1], Tolerance::default()), None);
    }
}
