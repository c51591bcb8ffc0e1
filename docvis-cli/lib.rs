use std::path::Path;

use docvis_core::{init_thread_pool, DescribedCorner, Rect};
use docvis_descriptor::{CircularDescriptor, DescriptorConfig, DescriptorError, Match, RatioMatcher};
use docvis_harris::{HarrisConfig, HarrisDetector, HarrisError};
use docvis_imgproc::morphology::{invert, otsu_binarize};
use docvis_imgproc::ImgprocError;
use docvis_layout::{contour_boxes, GlyphSignature, LayoutConfig, LayoutError, Tolerance};
use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};
use serde::{Deserialize, Serialize};

pub use docvis_core::{self, Corner, DebugOutput, Descriptor, RuntimeConfig};
pub use docvis_descriptor;
pub use docvis_harris;
pub use docvis_imgproc;
pub use docvis_layout;

#[derive(Debug)]
pub enum DocvisError {
    Harris(HarrisError),
    Descriptor(DescriptorError),
    Imgproc(ImgprocError),
    Layout(LayoutError),
    Image(image::ImageError),
    Io(std::io::Error),
    Config(String),
    ThreadPool(rayon::ThreadPoolBuildError),
}

impl std::fmt::Display for DocvisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocvisError::Harris(e) => write!(f, "Harris error: {}", e),
            DocvisError::Descriptor(e) => write!(f, "Descriptor error: {}", e),
            DocvisError::Imgproc(e) => write!(f, "Image processing error: {}", e),
            DocvisError::Layout(e) => write!(f, "Layout error: {}", e),
            DocvisError::Image(e) => write!(f, "Image I/O error: {}", e),
            DocvisError::Io(e) => write!(f, "I/O error: {}", e),
            DocvisError::Config(msg) => write!(f, "Config error: {}", msg),
            DocvisError::ThreadPool(e) => write!(f, "Thread pool error: {}", e),
        }
    }
}

impl std::error::Error for DocvisError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DocvisError::Harris(e) => Some(e),
            DocvisError::Descriptor(e) => Some(e),
            DocvisError::Imgproc(e) => Some(e),
            DocvisError::Layout(e) => Some(e),
            DocvisError::Image(e) => Some(e),
            DocvisError::Io(e) => Some(e),
            DocvisError::ThreadPool(e) => Some(e),
            DocvisError::Config(_) => None,
        }
    }
}

impl From<HarrisError> for DocvisError {
    fn from(err: HarrisError) -> Self {
        DocvisError::Harris(err)
    }
}

impl From<DescriptorError> for DocvisError {
    fn from(err: DescriptorError) -> Self {
        DocvisError::Descriptor(err)
    }
}

impl From<ImgprocError> for DocvisError {
    fn from(err: ImgprocError) -> Self {
        DocvisError::Imgproc(err)
    }
}

impl From<LayoutError> for DocvisError {
    fn from(err: LayoutError) -> Self {
        DocvisError::Layout(err)
    }
}

impl From<image::ImageError> for DocvisError {
    fn from(err: image::ImageError) -> Self {
        DocvisError::Image(err)
    }
}

impl From<std::io::Error> for DocvisError {
    fn from(err: std::io::Error) -> Self {
        DocvisError::Io(err)
    }
}

impl From<rayon::ThreadPoolBuildError> for DocvisError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        DocvisError::ThreadPool(err)
    }
}

pub type DocvisResult<T> = Result<T, DocvisError>;

fn default_ratio() -> f64 {
    0.05
}

/// Every tunable of every pipeline, loadable from one JSON or TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub harris: HarrisConfig,
    #[serde(default)]
    pub descriptor: DescriptorConfig,
    /// Ratio-test cut-off for matching
    #[serde(default = "default_ratio")]
    pub ratio: f64,
    #[serde(default)]
    pub layout: LayoutConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            harris: HarrisConfig::default(),
            descriptor: DescriptorConfig::default(),
            ratio: default_ratio(),
            layout: LayoutConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> DocvisResult<()> {
        self.harris.validate()?;
        self.descriptor.validate()?;
        RatioMatcher::new(self.ratio)?;
        self.layout.validate()?;
        Ok(())
    }

    /// Load from `.json` or `.toml`, chosen by extension
    pub fn load<P: AsRef<Path>>(path: P) -> DocvisResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let config: Self = match ext.as_deref() {
            Some("json") => {
                serde_json::from_str(&content).map_err(|e| DocvisError::Config(e.to_string()))?
            }
            Some("toml") => toml::from_str(&content).map_err(|e| DocvisError::Config(e.to_string()))?,
            _ => {
                return Err(DocvisError::Config(format!(
                    "unsupported config format: {}",
                    path.display()
                )))
            }
        };
        config.validate()?;
        log::info!("loaded pipeline config from {}", path.display());
        Ok(config)
    }

    pub fn to_toml(&self) -> DocvisResult<String> {
        toml::to_string_pretty(self).map_err(|e| DocvisError::Config(e.to_string()))
    }
}

/// High-level corner pipeline: Harris detection, circular descriptors and
/// ratio-test matching
pub struct FeaturePipeline {
    detector: HarrisDetector,
    descriptor: CircularDescriptor,
    matcher: RatioMatcher,
}

impl FeaturePipeline {
    pub fn new(cfg: &PipelineConfig) -> DocvisResult<Self> {
        Ok(Self {
            detector: HarrisDetector::new(cfg.harris.clone())?,
            descriptor: CircularDescriptor::new(cfg.descriptor.clone())?,
            matcher: RatioMatcher::new(cfg.ratio)?,
        })
    }

    /// Configure the global thread pool and build the pipeline
    pub fn with_runtime(cfg: &PipelineConfig, runtime: &RuntimeConfig) -> DocvisResult<Self> {
        init_thread_pool(runtime.n_threads)?;
        Self::new(cfg)
    }

    pub fn detect(&self, img: &GrayImage) -> DocvisResult<Vec<Corner>> {
        Ok(self.detector.detect(img)?)
    }

    /// Detect corners and describe each of them, in raster order
    pub fn detect_and_describe(&self, img: &GrayImage) -> DocvisResult<Vec<DescribedCorner>> {
        let corners = self.detect(img)?;
        Ok(self.descriptor.describe_all(img, &corners))
    }

    /// Ratio-test matches from `query` features to `train` features
    pub fn match_features(
        &self,
        query: &[DescribedCorner],
        train: &[DescribedCorner],
    ) -> DocvisResult<Vec<Match>> {
        let q: Vec<Descriptor> = query.iter().map(|d| d.descriptor.clone()).collect();
        let t: Vec<Descriptor> = train.iter().map(|d| d.descriptor.clone()).collect();
        Ok(self.matcher.match_descriptors(&q, &t)?)
    }

    pub fn harris_config(&self) -> &HarrisConfig {
        self.detector.config()
    }
}

/// Decode any supported image file as 8-bit grayscale
pub fn load_gray<P: AsRef<Path>>(path: P) -> DocvisResult<GrayImage> {
    Ok(image::open(path)?.to_luma8())
}

pub fn crop(img: &GrayImage, rect: Rect) -> GrayImage {
    image::imageops::crop_imm(img, rect.x, rect.y, rect.width, rect.height).to_image()
}

/// A glyph box found on a line band and the reference it resembles
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlyphMatch {
    /// Index of the band the box was found in
    pub line: usize,
    pub rect: Rect,
    pub reference: Option<usize>,
}

const GLYPH_MARGIN: u32 = 2;

/// Contour boxes of the ink inside each band, each compared against
/// `references` by glyph signature.
///
/// Boxes whose crop yields no contour get `reference: None`.
pub fn match_glyphs(
    gray: &GrayImage,
    bands: &[Rect],
    references: &[GlyphSignature],
    tolerance: Tolerance,
) -> DocvisResult<Vec<GlyphMatch>> {
    let ink = invert(&otsu_binarize(gray));
    let (w, h) = gray.dimensions();
    let mut matches = Vec::new();
    for (line, band) in bands.iter().enumerate() {
        for rect in contour_boxes(&ink, *band)? {
            let padded = Rect::new(
                rect.x.saturating_sub(GLYPH_MARGIN),
                rect.y.saturating_sub(GLYPH_MARGIN),
                rect.width + 2 * GLYPH_MARGIN,
                rect.height + 2 * GLYPH_MARGIN,
            );
            let Some(area) = padded.clamp_to(w, h) else {
                continue;
            };
            let reference = match GlyphSignature::extract(&crop(gray, area)) {
                Ok(sig) => sig.best_match(references, tolerance),
                Err(LayoutError::NoGlyphContour) => {
                    log::debug!("no glyph contour in {:?}", rect);
                    None
                }
                Err(e) => return Err(e.into()),
            };
            matches.push(GlyphMatch { line, rect, reference });
        }
    }
    Ok(matches)
}

const PALETTE: [Rgb<u8>; 6] = [
    Rgb([255, 0, 0]),
    Rgb([0, 200, 0]),
    Rgb([0, 0, 255]),
    Rgb([255, 160, 0]),
    Rgb([200, 0, 200]),
    Rgb([0, 200, 200]),
];

/// Grayscale page with a red circle at every corner
pub fn draw_corners(img: &GrayImage, corners: &[Corner]) -> RgbImage {
    let mut out = DynamicImage::ImageLuma8(img.clone()).into_rgb8();
    for c in corners {
        draw_hollow_circle_mut(&mut out, (c.x as i32, c.y as i32), 3, PALETTE[0]);
    }
    out
}

/// Both images side by side with a line per match
pub fn draw_matches(
    a: &GrayImage,
    b: &GrayImage,
    features_a: &[DescribedCorner],
    features_b: &[DescribedCorner],
    matches: &[Match],
) -> RgbImage {
    let (wa, ha) = a.dimensions();
    let (wb, hb) = b.dimensions();
    let mut out = RgbImage::new(wa + wb, ha.max(hb));
    image::imageops::replace(&mut out, &DynamicImage::ImageLuma8(a.clone()).into_rgb8(), 0, 0);
    image::imageops::replace(
        &mut out,
        &DynamicImage::ImageLuma8(b.clone()).into_rgb8(),
        wa as i64,
        0,
    );

    for (i, m) in matches.iter().enumerate() {
        let (Some(pa), Some(pb)) = (features_a.get(m.query_idx), features_b.get(m.train_idx)) else {
            continue;
        };
        let color = PALETTE[i % PALETTE.len()];
        let start = (pa.corner.x as f32, pa.corner.y as f32);
        let end = ((pb.corner.x + wa) as f32, pb.corner.y as f32);
        draw_line_segment_mut(&mut out, start, end, color);
        draw_hollow_circle_mut(&mut out, (start.0 as i32, start.1 as i32), 3, color);
        draw_hollow_circle_mut(&mut out, (end.0 as i32, end.1 as i32), 3, color);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_default_pipeline_config_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: PipelineConfig = toml::from_str("ratio = 0.5\n[harris]\nk = 0.05\nthreshold = 0.2\noffset = 4\nblur_ksize = 3\n").unwrap();
        assert_eq!(cfg.ratio, 0.5);
        assert_eq!(cfg.harris.offset, 4);
        assert_eq!(cfg.descriptor, DescriptorConfig::default());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_invalid_ratio_rejected() {
        let cfg = PipelineConfig {
            ratio: 0.0,
            ..PipelineConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(DocvisError::Descriptor(_))));
    }

    #[test]
    fn test_pipeline_matches_image_with_itself() {
        let img = GrayImage::from_fn(96, 96, |x, y| {
            let a = (30..50).contains(&x) && (30..50).contains(&y);
            let b = (55..70).contains(&x) && (40..75).contains(&y);
            if a || b {
                Luma([230])
            } else {
                Luma([20])
            }
        });
        let pipeline = FeaturePipeline::new(&PipelineConfig::default()).unwrap();
        let features = pipeline.detect_and_describe(&img).unwrap();
        assert!(!features.is_empty());
        for m in pipeline.match_features(&features, &features).unwrap() {
            assert!(m.distance < 1e-9);
        }
    }

    fn glyph_square(img: &mut GrayImage, x0: u32, y0: u32, size: u32, hole: bool) {
        let c = size / 2;
        for y in 0..size {
            for x in 0..size {
                if !(hole && x.abs_diff(c) < 5 && y.abs_diff(c) < 5) {
                    img.put_pixel(x0 + x, y0 + y, Luma([0]));
                }
            }
        }
    }

    fn reference(size: u32, hole: bool) -> GlyphSignature {
        let mut img = GrayImage::from_pixel(80, 80, Luma([255]));
        glyph_square(&mut img, 20, 20, size, hole);
        GlyphSignature::extract(&img).unwrap()
    }

    #[test]
    fn test_glyphs_matched_against_references() {
        let mut page = GrayImage::from_pixel(200, 80, Luma([255]));
        glyph_square(&mut page, 20, 20, 30, true);
        glyph_square(&mut page, 100, 30, 12, false);
        for y in 35..43 {
            for x in 150..170 {
                page.put_pixel(x, y, Luma([0]));
            }
        }
        let references = vec![reference(12, false), reference(30, true)];
        let band = Rect::new(0, 10, 200, 50);
        let found = match_glyphs(&page, &[band], &references, Tolerance::default()).unwrap();

        let rects: Vec<Rect> = found.iter().map(|g| g.rect).collect();
        assert_eq!(
            rects,
            vec![
                Rect::new(20, 20, 30, 30),
                Rect::new(100, 30, 12, 12),
                Rect::new(150, 35, 20, 8),
            ]
        );
        let refs: Vec<Option<usize>> = found.iter().map(|g| g.reference).collect();
        assert_eq!(refs, vec![Some(1), Some(0), None]);
        assert!(found.iter().all(|g| g.line == 0));
    }

    #[test]
    fn test_glyphs_outside_bands_ignored() {
        let mut page = GrayImage::from_pixel(100, 100, Luma([255]));
        glyph_square(&mut page, 10, 60, 12, false);
        let found = match_glyphs(&page, &[Rect::new(0, 0, 100, 40)], &[], Tolerance::default()).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_draw_matches_canvas() {
        let a = GrayImage::new(10, 8);
        let b = GrayImage::new(6, 12);
        let out = draw_matches(&a, &b, &[], &[], &[]);
        assert_eq!(out.dimensions(), (16, 12));
    }
}
