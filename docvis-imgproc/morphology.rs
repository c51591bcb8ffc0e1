use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::morphology::{grayscale_close, grayscale_dilate, grayscale_erode, Mask};

/// Structuring element used by the grayscale morphology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuringElement {
    /// 3x3 cross, the discrete 3x3 ellipse
    Cross3,
    /// Square of side `2 * radius + 1`
    Square(u8),
    /// Horizontal run of `len` pixels, anchored at its centre
    HorizontalLine(u8),
}

impl StructuringElement {
    pub fn mask(&self) -> Mask {
        match *self {
            StructuringElement::Cross3 => Mask::diamond(1),
            StructuringElement::Square(r) => Mask::square(r),
            StructuringElement::HorizontalLine(len) => {
                let len = len.max(1);
                let run = GrayImage::from_pixel(len as u32, 1, Luma([255]));
                Mask::from_image(&run, len / 2, 0)
            }
        }
    }
}

/// Neighbours outside the image are ignored
pub fn dilate(img: &GrayImage, element: StructuringElement) -> GrayImage {
    grayscale_dilate(img, &element.mask())
}

pub fn erode(img: &GrayImage, element: StructuringElement) -> GrayImage {
    grayscale_erode(img, &element.mask())
}

/// Dilation followed by erosion
pub fn close(img: &GrayImage, element: StructuringElement) -> GrayImage {
    grayscale_close(img, &element.mask())
}

/// Dilation minus erosion
pub fn gradient(img: &GrayImage, element: StructuringElement) -> GrayImage {
    let mask = element.mask();
    let dilated = grayscale_dilate(img, &mask);
    let eroded = grayscale_erode(img, &mask);
    saturating_sub(&dilated, &eroded)
}

/// Pixel-wise `a - b`, clamped at zero
pub fn saturating_sub(a: &GrayImage, b: &GrayImage) -> GrayImage {
    let (w, h) = a.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        Luma([a.get_pixel(x, y)[0].saturating_sub(b.get_pixel(x, y)[0])])
    })
}

pub fn invert(img: &GrayImage) -> GrayImage {
    let mut out = img.clone();
    image::imageops::invert(&mut out);
    out
}

/// Values strictly above `level` become 255, the rest 0
pub fn threshold_above(img: &GrayImage, level: u8) -> GrayImage {
    let (w, h) = img.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        if img.get_pixel(x, y)[0] > level {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Global binarization at the Otsu level
pub fn otsu_binarize(img: &GrayImage) -> GrayImage {
    let level = otsu_level(img);
    log::debug!("otsu level {}", level);
    threshold_above(img, level)
}

/// Parameters for turning a page into connected text blobs
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConnectOptions {
    /// Width of the horizontal closing element
    pub close_width: u8,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self { close_width: 9 }
    }
}

/// Text-region preprocessing.
///
/// Morphological gradient with the 3x3 cross, Otsu binarization of the
/// gradient, then a horizontal closing that merges letters into blobs.
/// Returns `(connected, binary)`.
pub fn connect_text(gray: &GrayImage, options: &ConnectOptions) -> (GrayImage, GrayImage) {
    let grad = gradient(gray, StructuringElement::Cross3);
    let binary = otsu_binarize(&grad);
    let connected = close(&binary, StructuringElement::HorizontalLine(options.close_width));
    (connected, binary)
}

/// Glyph preprocessing: thin dark strokes out of a light page.
///
/// The inverted Otsu mask is dilated and subtracted from the grayscale page,
/// the result is inverted back and eroded with a 3x3 square.
pub fn thin_glyphs(gray: &GrayImage) -> GrayImage {
    let square = StructuringElement::Square(1);
    let binary = otsu_binarize(gray);
    let ink = dilate(&invert(&binary), square);
    let removed = saturating_sub(gray, &ink);
    erode(&invert(&removed), square)
}
