use docvis_core::Rect;
use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::drawing::draw_polygon_mut;
use imageproc::geometry::min_area_rect;
use imageproc::point::Point;

/// One outer contour of a binary mask with its box statistics
#[derive(Debug, Clone)]
pub struct Region {
    pub points: Vec<Point<i32>>,
    pub bounds: Rect,
    /// Filled contour area over bounding box area
    pub fill_ratio: f64,
}

impl Region {
    fn from_points(points: Vec<Point<i32>>) -> Option<Self> {
        let bounds = bounding_rect(&points)?;
        let fill_ratio = fill_ratio(&points, bounds);
        Some(Self {
            points,
            bounds,
            fill_ratio,
        })
    }

    /// Corners of the minimum-area enclosing rectangle
    pub fn min_area_rect(&self) -> [Point<i32>; 4] {
        min_area_rect(&self.points)
    }

    /// Orientation of the longer side of the minimum-area rectangle, in
    /// degrees within (-90, 90], measured in image coordinates
    pub fn orientation(&self) -> f64 {
        dominant_edge_angle(&self.min_area_rect())
    }
}

/// Axis-aligned bounding box of a point set
pub fn bounding_rect(points: &[Point<i32>]) -> Option<Rect> {
    let first = points.first()?;
    let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
    for p in points {
        x0 = x0.min(p.x);
        y0 = y0.min(p.y);
        x1 = x1.max(p.x);
        y1 = y1.max(p.y);
    }
    if x0 < 0 || y0 < 0 {
        return None;
    }
    Some(Rect::new(
        x0 as u32,
        y0 as u32,
        (x1 - x0 + 1) as u32,
        (y1 - y0 + 1) as u32,
    ))
}

/// Share of the bounding box covered by the filled contour
pub fn fill_ratio(points: &[Point<i32>], bounds: Rect) -> f64 {
    if bounds.area() == 0 {
        return 0.0;
    }
    let mut mask = GrayImage::new(bounds.width, bounds.height);
    let local: Vec<Point<i32>> = points
        .iter()
        .map(|p| Point::new(p.x - bounds.x as i32, p.y - bounds.y as i32))
        .collect();

    let mut polygon = local.clone();
    polygon.dedup();
    if polygon.len() > 1 && polygon.first() == polygon.last() {
        polygon.pop();
    }
    if polygon.len() >= 3 {
        draw_polygon_mut(&mut mask, &polygon, Luma([255]));
    }
    for p in &local {
        mask.put_pixel(p.x as u32, p.y as u32, Luma([255]));
    }

    let filled = mask.pixels().filter(|p| p[0] != 0).count();
    filled as f64 / bounds.area() as f64
}

/// Angle of the longer edge of a rectangle given by its four corners
pub fn dominant_edge_angle(corners: &[Point<i32>; 4]) -> f64 {
    let edge = |a: Point<i32>, b: Point<i32>| ((b.x - a.x) as f64, (b.y - a.y) as f64);
    let e1 = edge(corners[0], corners[1]);
    let e2 = edge(corners[1], corners[2]);
    let (dx, dy) = if e1.0.hypot(e1.1) >= e2.0.hypot(e2.1) {
        e1
    } else {
        e2
    };
    if dx == 0.0 && dy == 0.0 {
        return 0.0;
    }
    let mut angle = dy.atan2(dx).to_degrees();
    if angle > 90.0 {
        angle -= 180.0;
    } else if angle <= -90.0 {
        angle += 180.0;
    }
    angle
}

fn is_external(contour: &Contour<i32>) -> bool {
    matches!(contour.border_type, BorderType::Outer) && contour.parent.is_none()
}

/// Outermost contours of the non-zero pixels of `binary`
pub fn external_regions(binary: &GrayImage) -> Vec<Region> {
    find_contours::<i32>(binary)
        .into_iter()
        .filter(is_external)
        .filter_map(|c| Region::from_points(c.points))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks() -> GrayImage {
        GrayImage::from_fn(60, 40, |x, y| {
            let a = (5..25).contains(&x) && (5..15).contains(&y);
            let b = (35..55).contains(&x) && (20..35).contains(&y);
            // hole inside b does not create a second external region
            let hole = (40..45).contains(&x) && (25..28).contains(&y);
            if (a || b) && !hole {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    #[test]
    fn test_external_regions_bounds() {
        let mut regions = external_regions(&blocks());
        regions.sort_by_key(|r| r.bounds.x);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].bounds, Rect::new(5, 5, 20, 10));
        assert_eq!(regions[1].bounds, Rect::new(35, 20, 20, 15));
    }

    #[test]
    fn test_solid_block_fill_ratio_is_one() {
        let regions = external_regions(&blocks());
        for r in regions {
            assert!(r.fill_ratio > 0.99, "{}", r.fill_ratio);
        }
    }

    #[test]
    fn test_diagonal_line_fill_ratio_is_low() {
        let mut img = GrayImage::new(40, 40);
        for i in 2..38 {
            img.put_pixel(i, i, Luma([255]));
        }
        let regions = external_regions(&img);
        assert_eq!(regions.len(), 1);
        assert!(regions[0].fill_ratio < 0.2);
    }

    #[test]
    fn test_axis_aligned_orientation_is_zero() {
        let regions = external_regions(&blocks());
        for r in regions {
            let a = r.orientation();
            assert!(a.abs() < 1e-9 || (a - 90.0).abs() < 1e-9, "{}", a);
        }
    }

    #[test]
    fn test_dominant_edge_angle_normalized() {
        let rect = [
            Point::new(0, 10),
            Point::new(100, 0),
            Point::new(102, 20),
            Point::new(2, 30),
        ];
        let a = dominant_edge_angle(&rect);
        assert!((a - (-10.0f64 / 100.0).atan().to_degrees()).abs() < 1e-9);
    }
}
