use docvis_core::Rect;
use image::GrayImage;

use crate::error::{ImgprocError, ImgprocResult};

fn checked_region(img: &GrayImage, region: Rect) -> ImgprocResult<Rect> {
    let (w, h) = img.dimensions();
    if region.width == 0
        || region.height == 0
        || region.right() > w
        || region.bottom() > h
    {
        return Err(ImgprocError::RegionOutOfBounds {
            x: region.x,
            y: region.y,
            width: region.width,
            height: region.height,
        });
    }
    Ok(region)
}

/// Whole-image rectangle
pub fn full_region(img: &GrayImage) -> Rect {
    let (w, h) = img.dimensions();
    Rect::new(0, 0, w, h)
}

/// Sum of every row inside `region`, top to bottom
pub fn row_sums(img: &GrayImage, region: Rect) -> ImgprocResult<Vec<f64>> {
    let r = checked_region(img, region)?;
    Ok((r.y..r.bottom())
        .map(|y| {
            (r.x..r.right())
                .map(|x| img.get_pixel(x, y)[0] as f64)
                .sum()
        })
        .collect())
}

/// Sum of every column inside `region`, left to right
pub fn column_sums(img: &GrayImage, region: Rect) -> ImgprocResult<Vec<f64>> {
    let r = checked_region(img, region)?;
    let mut sums = vec![0.0; r.width as usize];
    for y in r.y..r.bottom() {
        for (i, x) in (r.x..r.right()).enumerate() {
            sums[i] += img.get_pixel(x, y)[0] as f64;
        }
    }
    Ok(sums)
}

/// First difference `s[i+1] - s[i]`
pub fn diff(signal: &[f64]) -> Vec<f64> {
    signal.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Population variance, zero for an empty signal
pub fn variance(signal: &[f64]) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }
    let n = signal.len() as f64;
    let mean = signal.iter().sum::<f64>() / n;
    signal.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_row_and_column_sums() {
        let img = GrayImage::from_fn(4, 3, |x, y| Luma([(x + 10 * y) as u8]));
        let rows = row_sums(&img, full_region(&img)).unwrap();
        assert_eq!(rows, vec![6.0, 46.0, 86.0]);
        let cols = column_sums(&img, Rect::new(1, 1, 2, 2)).unwrap();
        assert_eq!(cols, vec![11.0 + 21.0, 12.0 + 22.0]);
    }

    #[test]
    fn test_region_outside_image_is_error() {
        let img = GrayImage::new(10, 10);
        assert!(matches!(
            row_sums(&img, Rect::new(5, 5, 10, 2)),
            Err(ImgprocError::RegionOutOfBounds { .. })
        ));
        assert!(column_sums(&img, Rect::new(0, 0, 0, 3)).is_err());
    }

    #[test]
    fn test_diff_and_variance() {
        assert_eq!(diff(&[1.0, 4.0, 2.0]), vec![3.0, -2.0]);
        assert_eq!(variance(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 4.0);
        assert_eq!(variance(&[]), 0.0);
    }
}
