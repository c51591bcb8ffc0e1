use docvis_core::{DebugOutput, Rect};
use docvis_imgproc::{
    box_blur, column_sums, connect_text, find_peaks, full_region, row_sums, smooth_1d,
};
use image::{GrayImage, Luma};
use imageproc::drawing::draw_line_segment_mut;
use rayon::prelude::*;

use crate::config::{LevelConfig, SegmentationConfig};
use crate::error::LayoutResult;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Column span of one word, spanning the rows of its word band
pub type WordSpan = Rect;
/// Column span of one letter, spanning the rows of its letter band
pub type LetterSpan = Rect;

/// Horizontal strip of the page holding one text line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LineBand {
    /// Row of the line centre
    pub center: u32,
    /// First row of the band
    pub top: u32,
    /// One past the last row of the band
    pub bottom: u32,
}

impl LineBand {
    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    /// Band as a rectangle across a page of `width` columns
    pub fn rect(&self, width: u32) -> Rect {
        Rect::new(0, self.top, width, self.height())
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TextLine {
    pub band: LineBand,
    pub words: Vec<WordSpan>,
    pub letters: Vec<LetterSpan>,
}

/// Lines of a page top to bottom, each with its words and letters left to right
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PageLayout {
    pub lines: Vec<TextLine>,
}

impl PageLayout {
    pub fn word_count(&self) -> usize {
        self.lines.iter().map(|l| l.words.len()).sum()
    }

    pub fn letter_count(&self) -> usize {
        self.lines.iter().map(|l| l.letters.len()).sum()
    }
}

/// Projection-profile segmentation of a page into lines, words and letters.
///
/// Lines come from the row profile of the binarised page. Words and letters
/// come from column profiles of the grayscale page inside each line band; on
/// a light page their peaks are the bright gaps between glyphs, so spans run
/// between consecutive peaks.
#[derive(Debug, Clone)]
pub struct Segmenter {
    cfg: SegmentationConfig,
    debug: DebugOutput,
}

impl Segmenter {
    pub fn new(cfg: SegmentationConfig) -> LayoutResult<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            debug: DebugOutput::disabled(),
        })
    }

    pub fn with_debug(mut self, debug: DebugOutput) -> Self {
        self.debug = debug;
        self
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.cfg
    }

    /// Line bands from a binary text mask
    pub fn detect_lines(&self, binary: &GrayImage) -> LayoutResult<Vec<LineBand>> {
        let level = &self.cfg.lines;
        let profile = row_sums(binary, full_region(binary))?;
        let smoothed = smooth_1d(&profile, level.smoothing_ksize)?;
        let peaks = find_peaks(&smoothed, &level.peaks)?;
        let kept = self.cfg.keep.apply(&peaks);

        let height = binary.height() as i64;
        let bands: Vec<LineBand> = kept
            .iter()
            .filter_map(|&p| {
                let center = p as i64 + self.cfg.line_offset as i64;
                if center < 0 || center >= height {
                    return None;
                }
                let top = (center - level.band_above as i64).max(0);
                let bottom = (center + level.band_below as i64).min(height);
                (bottom > top).then_some(LineBand {
                    center: center as u32,
                    top: top as u32,
                    bottom: bottom as u32,
                })
            })
            .collect();

        log::debug!(
            "lines: {} peaks, {} kept by {:?}",
            peaks.len(),
            bands.len(),
            self.cfg.keep
        );
        Ok(bands)
    }

    /// Word spans of every line, in line order
    pub fn detect_words(
        &self,
        gray: &GrayImage,
        lines: &[LineBand],
    ) -> LayoutResult<Vec<Vec<WordSpan>>> {
        lines
            .par_iter()
            .map(|line| level_spans(gray, line.center, &self.cfg.words))
            .collect()
    }

    /// Letter spans of every line, in line order
    pub fn detect_letters(
        &self,
        gray: &GrayImage,
        lines: &[LineBand],
    ) -> LayoutResult<Vec<Vec<LetterSpan>>> {
        lines
            .par_iter()
            .map(|line| level_spans(gray, line.center, &self.cfg.letters))
            .collect()
    }

    /// Full page segmentation of a grayscale page
    pub fn segment(&self, gray: &GrayImage) -> LayoutResult<PageLayout> {
        let (_, binary) = connect_text(gray, &self.cfg.connect);
        self.debug.emit("segment_binary", &binary);

        let bands = self.detect_lines(&binary)?;
        let words = self.detect_words(gray, &bands)?;
        let letters = self.detect_letters(gray, &bands)?;

        if self.debug.is_enabled() {
            self.debug.emit("segment_lines", &overlay_lines(gray, &bands));
        }

        let layout = PageLayout {
            lines: bands
                .into_iter()
                .zip(words)
                .zip(letters)
                .map(|((band, words), letters)| TextLine {
                    band,
                    words,
                    letters,
                })
                .collect(),
        };
        log::info!(
            "segmented {} lines, {} words, {} letters",
            layout.lines.len(),
            layout.word_count(),
            layout.letter_count()
        );
        Ok(layout)
    }
}

/// Spans of one granularity inside the band around `center`
fn level_spans(gray: &GrayImage, center: u32, level: &LevelConfig) -> LayoutResult<Vec<Rect>> {
    let (w, h) = gray.dimensions();
    let top = center.saturating_sub(level.band_above);
    let bottom = center.saturating_add(level.band_below).min(h);
    let left = level.inset_left;
    let right = w.saturating_sub(level.inset_right);
    if bottom <= top || right <= left {
        return Ok(Vec::new());
    }
    let band = Rect::new(left, top, right - left, bottom - top);

    let profile = if level.blur_radius > 0 {
        let crop = image::imageops::crop_imm(gray, band.x, band.y, band.width, band.height).to_image();
        let blurred = box_blur(&crop, level.blur_radius);
        column_sums(&blurred, full_region(&blurred))?
    } else {
        column_sums(gray, band)?
    };
    let smoothed = smooth_1d(&profile, level.smoothing_ksize)?;
    let peaks = find_peaks(&smoothed, &level.peaks)?;

    Ok(spans_from_peaks(&peaks, band, level))
}

/// Spans between consecutive boundaries of `band`, where the boundaries are
/// the profile peaks plus the edges the level asks for
fn spans_from_peaks(peaks: &[usize], band: Rect, level: &LevelConfig) -> Vec<Rect> {
    let mut bounds: Vec<u32> = Vec::with_capacity(peaks.len() + 2);
    if level.leading_edge {
        bounds.push(0);
    }
    bounds.extend(peaks.iter().map(|&p| p as u32));
    if level.trailing_edge {
        bounds.push(band.width);
    }

    let mut pairs: Vec<&[u32]> = bounds.windows(2).collect();
    if level.drop_final_span && pairs.len() > 1 {
        pairs.pop();
    }
    pairs
        .into_iter()
        .filter(|pair| pair[1] > pair[0])
        .map(|pair| Rect::new(band.x + pair[0], band.y, pair[1] - pair[0], band.height))
        .collect()
}

fn overlay_lines(gray: &GrayImage, bands: &[LineBand]) -> GrayImage {
    let mut out = gray.clone();
    let right = gray.width().saturating_sub(1) as f32;
    for band in bands {
        let y = band.center as f32;
        draw_line_segment_mut(&mut out, (0.0, y), (right, y), Luma([0]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PeakKeep;

    /// White bars ten rows high centred on `centers`
    fn bar_mask(centers: &[u32]) -> GrayImage {
        GrayImage::from_fn(100, 240, |x, y| {
            let on_bar = centers.iter().any(|&c| y + 5 > c && y < c + 5);
            if on_bar && (10..90).contains(&x) {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    /// Light page with dark blocks in rows 50..70 at the given column ranges
    fn page(blocks: &[(u32, u32)]) -> GrayImage {
        GrayImage::from_fn(400, 140, |x, y| {
            let ink = (50..70).contains(&y) && blocks.iter().any(|&(a, b)| (a..b).contains(&x));
            if ink {
                Luma([0])
            } else {
                Luma([255])
            }
        })
    }

    fn segmenter(keep: PeakKeep) -> Segmenter {
        Segmenter::new(SegmentationConfig {
            keep,
            ..SegmentationConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_every_bar_is_a_line() {
        let centers = [30, 70, 110, 150, 190];
        let bands = segmenter(PeakKeep::All).detect_lines(&bar_mask(&centers)).unwrap();
        assert_eq!(bands.len(), 5);
        for (band, c) in bands.iter().zip(centers) {
            let expected = c as i64 + 10;
            assert!((band.center as i64 - expected).abs() <= 2, "{:?}", band);
            assert!(band.top < band.center && band.center < band.bottom);
            assert!(band.bottom <= 240);
        }
    }

    #[test]
    fn test_odd_policy_keeps_every_other_line() {
        let centers = [30, 70, 110, 150, 190];
        let all = segmenter(PeakKeep::All).detect_lines(&bar_mask(&centers)).unwrap();
        let odd = segmenter(PeakKeep::Odd).detect_lines(&bar_mask(&centers)).unwrap();
        assert_eq!(odd, vec![all[1], all[3]]);
    }

    #[test]
    fn test_band_clamped_to_page() {
        let bands = segmenter(PeakKeep::All).detect_lines(&bar_mask(&[12])).unwrap();
        assert_eq!(bands.len(), 1);
        assert_eq!(bands[0].top, 0);
    }

    #[test]
    fn test_blank_mask_has_no_lines() {
        let bands = segmenter(PeakKeep::All).detect_lines(&GrayImage::new(50, 80)).unwrap();
        assert!(bands.is_empty());
    }

    #[test]
    fn test_words_split_at_wide_gaps() {
        let gray = page(&[(40, 120), (180, 260), (320, 380)]);
        let line = LineBand {
            center: 60,
            top: 30,
            bottom: 85,
        };
        let words = segmenter(PeakKeep::All).detect_words(&gray, &[line]).unwrap();
        assert_eq!(words.len(), 1);
        let words = &words[0];
        assert_eq!(words.len(), 3);
        assert_eq!(words[0].x, 15);
        assert_eq!(words[2].right(), 395);
        for (span, mid) in words.iter().zip([80, 220, 350]) {
            assert!(span.x < mid && mid < span.right(), "{:?}", span);
            assert_eq!((span.y, span.height), (25, 60));
        }
        for pair in words.windows(2) {
            assert_eq!(pair[0].right(), pair[1].x);
        }
    }

    #[test]
    fn test_letter_spans_skip_final_peak() {
        let band = Rect::new(15, 25, 380, 70);
        let letters = LevelConfig::letters();
        let spans = spans_from_peaks(&[54, 94], band, &letters);
        assert_eq!(spans, vec![Rect::new(15, 25, 54, 70)]);

        let spans = spans_from_peaks(&[20, 54, 94], band, &letters);
        assert_eq!(spans, vec![Rect::new(15, 25, 20, 70), Rect::new(35, 25, 34, 70)]);

        let single = spans_from_peaks(&[54], band, &letters);
        assert_eq!(single, vec![Rect::new(15, 25, 54, 70)]);
        assert!(spans_from_peaks(&[], band, &letters).is_empty());
    }

    #[test]
    fn test_word_spans_keep_every_gap() {
        let band = Rect::new(15, 25, 380, 60);
        let spans = spans_from_peaks(&[100, 250], band, &LevelConfig::words());
        assert_eq!(
            spans,
            vec![
                Rect::new(15, 25, 100, 60),
                Rect::new(115, 25, 150, 60),
                Rect::new(265, 25, 130, 60),
            ]
        );
    }

    #[test]
    fn test_letters_end_before_last_gap() {
        let gray = page(&[(40, 60), (80, 100), (120, 140)]);
        let line = LineBand {
            center: 60,
            top: 30,
            bottom: 85,
        };
        let letters = segmenter(PeakKeep::All).detect_letters(&gray, &[line]).unwrap();
        let letters = &letters[0];
        assert_eq!(letters.len(), 1);
        assert_eq!(letters[0].x, 15);
        assert!((letters[0].right() as i64 - 69).abs() <= 2);
        assert_eq!((letters[0].y, letters[0].height), (25, 70));
    }

    #[test]
    fn test_narrow_page_has_no_spans() {
        let gray = GrayImage::from_pixel(18, 100, Luma([255]));
        let line = LineBand {
            center: 50,
            top: 20,
            bottom: 75,
        };
        let words = segmenter(PeakKeep::All).detect_words(&gray, &[line]).unwrap();
        assert!(words[0].is_empty());
    }

    #[test]
    fn test_blank_page_segments_to_nothing() {
        let gray = GrayImage::from_pixel(120, 90, Luma([255]));
        let layout = segmenter(PeakKeep::Odd).segment(&gray).unwrap();
        assert!(layout.lines.is_empty());
        assert_eq!(layout.word_count(), 0);
    }
}
