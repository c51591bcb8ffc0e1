use docvis_core::Rect;
use docvis_imgproc::{external_regions, ImgprocError};
use image::GrayImage;

use crate::error::{LayoutError, LayoutResult};

/// Bounding boxes of the outer contours of `binary` inside `region`, in page
/// coordinates and sorted left to right.
///
/// An alternative to profile peaks for splitting a line band into words or
/// letters.
pub fn contour_boxes(binary: &GrayImage, region: Rect) -> LayoutResult<Vec<Rect>> {
    let (w, h) = binary.dimensions();
    let area = region
        .clamp_to(w, h)
        .filter(|r| *r == region)
        .ok_or(LayoutError::Imgproc(ImgprocError::RegionOutOfBounds {
            x: region.x,
            y: region.y,
            width: region.width,
            height: region.height,
        }))?;

    let crop = image::imageops::crop_imm(binary, area.x, area.y, area.width, area.height).to_image();
    let mut boxes: Vec<Rect> = external_regions(&crop)
        .into_iter()
        .map(|r| Rect::new(r.bounds.x + area.x, r.bounds.y + area.y, r.bounds.width, r.bounds.height))
        .collect();
    boxes.sort_by_key(|b| b.x);
    log::debug!("{} contour boxes in {:?}", boxes.len(), area);
    Ok(boxes)
}
