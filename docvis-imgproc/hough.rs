use docvis_core::LineSegment;
use image::GrayImage;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Fixed-point precision used while walking along a candidate line
const SHIFT: u32 = 16;

/// Parameters of the progressive probabilistic Hough transform
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HoughParams {
    /// Distance resolution in pixels
    pub rho: f64,
    /// Angle resolution in radians
    pub theta: f64,
    /// Minimum accumulator votes before a line is traced
    pub threshold: u32,
    pub min_line_length: u32,
    /// Largest run of empty pixels bridged inside one segment
    pub max_line_gap: u32,
    /// Seed for the point visiting order
    pub seed: u64,
}

impl Default for HoughParams {
    fn default() -> Self {
        Self {
            rho: 1.0,
            theta: std::f64::consts::PI / 180.0,
            threshold: 5,
            min_line_length: 20,
            max_line_gap: 2,
            seed: 0x5eed,
        }
    }
}

struct Accumulator {
    votes: Vec<i32>,
    numrho: usize,
    trig: Vec<(f64, f64)>,
}

impl Accumulator {
    fn new(width: usize, height: usize, params: &HoughParams) -> Self {
        let numangle = ((std::f64::consts::PI / params.theta).round() as usize).max(1);
        let numrho = ((((width + height) * 2 + 1) as f64) / params.rho).round() as usize;
        let irho = 1.0 / params.rho;
        let trig = (0..numangle)
            .map(|n| {
                let a = n as f64 * params.theta;
                (a.cos() * irho, a.sin() * irho)
            })
            .collect();
        Self {
            votes: vec![0; numangle * numrho],
            numrho,
            trig,
        }
    }

    fn bin(&self, n: usize, x: i64, y: i64) -> usize {
        let (c, s) = self.trig[n];
        let r = (x as f64 * c + y as f64 * s).round() as i64 + (self.numrho as i64 - 1) / 2;
        n * self.numrho + r.clamp(0, self.numrho as i64 - 1) as usize
    }

    /// Adds one vote per angle; returns the strongest (angle, votes)
    fn vote(&mut self, x: i64, y: i64, floor: i32) -> (usize, i32) {
        let mut best = (0, floor);
        for n in 0..self.trig.len() {
            let idx = self.bin(n, x, y);
            self.votes[idx] += 1;
            if self.votes[idx] > best.1 {
                best = (n, self.votes[idx]);
            }
        }
        best
    }

    fn unvote(&mut self, x: i64, y: i64) {
        for n in 0..self.trig.len() {
            let idx = self.bin(n, x, y);
            self.votes[idx] -= 1;
        }
    }
}

/// Fixed-point walker along one direction of a line
#[derive(Clone, Copy)]
struct Walk {
    x0: i64,
    y0: i64,
    dx: i64,
    dy: i64,
    x_major: bool,
}

impl Walk {
    fn new(x: i64, y: i64, a: f64, b: f64) -> Self {
        let one = (1i64 << SHIFT) as f64;
        let half = 1i64 << (SHIFT - 1);
        if a.abs() > b.abs() {
            Self {
                x0: x,
                y0: (y << SHIFT) + half,
                dx: if a > 0.0 { 1 } else { -1 },
                dy: (b * one / a.abs()).round() as i64,
                x_major: true,
            }
        } else {
            Self {
                x0: (x << SHIFT) + half,
                y0: y,
                dx: (a * one / b.abs()).round() as i64,
                dy: if b > 0.0 { 1 } else { -1 },
                x_major: false,
            }
        }
    }

    fn pixel(&self, x: i64, y: i64) -> (i64, i64) {
        if self.x_major {
            (x, y >> SHIFT)
        } else {
            (x >> SHIFT, y)
        }
    }

    fn step(&self, reverse: bool) -> (i64, i64) {
        if reverse {
            (-self.dx, -self.dy)
        } else {
            (self.dx, self.dy)
        }
    }
}

/// Progressive probabilistic Hough line detector over a binary edge map
#[derive(Debug, Clone)]
pub struct ProbabilisticHough {
    params: HoughParams,
}

impl ProbabilisticHough {
    pub fn new(params: HoughParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &HoughParams {
        &self.params
    }

    /// Line segments supported by the non-zero pixels of `edges`.
    ///
    /// Points are visited in a seeded random order. Each point votes; once a
    /// bin passes the threshold the line is walked in both directions,
    /// bridging gaps up to `max_line_gap`, and its pixels are consumed.
    pub fn detect(&self, edges: &GrayImage) -> Vec<LineSegment> {
        let (w, h) = (edges.width() as usize, edges.height() as usize);
        let mut segments = Vec::new();
        if w == 0 || h == 0 {
            return segments;
        }

        let mut mask: Vec<bool> = edges.as_raw().iter().map(|&v| v != 0).collect();
        let mut points: Vec<(i64, i64)> = mask
            .iter()
            .enumerate()
            .filter_map(|(i, &on)| on.then_some(((i % w) as i64, (i / w) as i64)))
            .collect();
        let mut rng = StdRng::seed_from_u64(self.params.seed);
        points.shuffle(&mut rng);

        let mut acc = Accumulator::new(w, h, &self.params);
        let threshold = self.params.threshold as i32;
        let gap_limit = self.params.max_line_gap as i64;
        let min_len = self.params.min_line_length as i64;
        let inside = |x: i64, y: i64| x >= 0 && y >= 0 && x < w as i64 && y < h as i64;

        for &(px, py) in &points {
            if !mask[py as usize * w + px as usize] {
                continue;
            }
            let (best_n, best_votes) = acc.vote(px, py, threshold - 1);
            if best_votes < threshold {
                continue;
            }

            let (cos_t, sin_t) = acc.trig[best_n];
            let walk = Walk::new(px, py, -sin_t, cos_t);

            let mut ends = [(px, py); 2];
            for (k, end) in ends.iter_mut().enumerate() {
                let (dx, dy) = walk.step(k > 0);
                let (mut x, mut y) = (walk.x0, walk.y0);
                let mut gap = 0;
                loop {
                    let (j, i) = walk.pixel(x, y);
                    if !inside(j, i) {
                        break;
                    }
                    if mask[i as usize * w + j as usize] {
                        gap = 0;
                        *end = (j, i);
                    } else {
                        gap += 1;
                        if gap > gap_limit {
                            break;
                        }
                    }
                    x += dx;
                    y += dy;
                }
            }

            let good = (ends[1].0 - ends[0].0).abs() >= min_len
                || (ends[1].1 - ends[0].1).abs() >= min_len;

            for (k, end) in ends.iter().enumerate() {
                let (dx, dy) = walk.step(k > 0);
                let (mut x, mut y) = (walk.x0, walk.y0);
                loop {
                    let (j, i) = walk.pixel(x, y);
                    if !inside(j, i) {
                        break;
                    }
                    let idx = i as usize * w + j as usize;
                    if mask[idx] {
                        if good {
                            acc.unvote(j, i);
                        }
                        mask[idx] = false;
                    }
                    if (j, i) == *end {
                        break;
                    }
                    x += dx;
                    y += dy;
                }
            }

            if good {
                segments.push(LineSegment::new(
                    ends[0].0 as i32,
                    ends[0].1 as i32,
                    ends[1].0 as i32,
                    ends[1].1 as i32,
                ));
            }
        }

        log::debug!(
            "hough: {} edge points, {} segments",
            points.len(),
            segments.len()
        );
        segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_blank_image_has_no_segments() {
        let hough = ProbabilisticHough::new(HoughParams::default());
        assert!(hough.detect(&GrayImage::new(32, 32)).is_empty());
        assert!(hough.detect(&GrayImage::new(0, 0)).is_empty());
    }

    #[test]
    fn test_finds_horizontal_line() {
        let mut img = GrayImage::new(128, 64);
        for x in 10..110 {
            img.put_pixel(x, 30, Luma([255]));
        }
        let hough = ProbabilisticHough::new(HoughParams::default());
        let segments = hough.detect(&img);
        assert!(!segments.is_empty());
        for s in &segments {
            assert!((s.y1 - s.y2).abs() <= 1, "{:?}", s);
            assert!(s.length() >= 20.0, "{:?}", s);
        }
    }

    #[test]
    fn test_same_seed_same_segments() {
        let mut img = GrayImage::new(80, 80);
        for i in 5..75 {
            img.put_pixel(i, i, Luma([255]));
            img.put_pixel(i, 40, Luma([255]));
        }
        let hough = ProbabilisticHough::new(HoughParams::default());
        assert_eq!(hough.detect(&img), hough.detect(&img));
    }
}
