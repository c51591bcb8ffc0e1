use image::{GrayImage, Luma};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};

use crate::error::{ImgprocError, ImgprocResult};

/// Canvas size that holds a `width` x `height` image rotated by `degrees`
pub fn rotated_canvas(width: u32, height: u32, degrees: f64) -> (u32, u32) {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let (sin, cos) = (sin.abs(), cos.abs());
    let (w, h) = (width as f64, height as f64);
    let new_w = (h * sin + w * cos) as u32;
    let new_h = (h * cos + w * sin) as u32;
    (new_w.max(1), new_h.max(1))
}

/// 2x3 affine matrix rotating about the image centre and recentring the
/// content on the expanded canvas. Positive angles turn counter-clockwise
/// on screen.
pub fn rotation_matrix(width: u32, height: u32, degrees: f64) -> [f64; 6] {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let cx = (width / 2) as f64;
    let cy = (height / 2) as f64;
    let (new_w, new_h) = rotated_canvas(width, height, degrees);

    let tx = (1.0 - cos) * cx - sin * cy + new_w as f64 / 2.0 - cx;
    let ty = sin * cx + (1.0 - cos) * cy + new_h as f64 / 2.0 - cy;
    [cos, sin, tx, -sin, cos, ty]
}

/// Rotate `img` by `degrees` onto a canvas large enough to keep every
/// corner, filling uncovered pixels with `fill`
pub fn rotate_expand(img: &GrayImage, degrees: f64, fill: u8) -> ImgprocResult<GrayImage> {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return Err(ImgprocError::EmptyImage);
    }

    let m = rotation_matrix(w, h, degrees);
    let projection = Projection::from_matrix([
        m[0] as f32,
        m[1] as f32,
        m[2] as f32,
        m[3] as f32,
        m[4] as f32,
        m[5] as f32,
        0.0,
        0.0,
        1.0,
    ])
    .ok_or(ImgprocError::SingularTransform)?;

    let (new_w, new_h) = rotated_canvas(w, h, degrees);
    let mut out = GrayImage::from_pixel(new_w, new_h, Luma([fill]));
    warp_into(img, &projection, Interpolation::Bilinear, Luma([fill]), &mut out);
    Ok(out)
}
