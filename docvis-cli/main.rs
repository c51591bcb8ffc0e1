use std::path::{Path, PathBuf};
use std::time::Instant;

use argh::FromArgs;
use docvis_cli::docvis_core::{init_thread_pool, Rect};
use docvis_cli::docvis_layout::{GlyphSignature, Segmenter, SkewEstimator, SkewMethod, Tolerance};
use docvis_cli::{
    crop, draw_corners, draw_matches, load_gray, match_glyphs, DebugOutput, DocvisError,
    DocvisResult, FeaturePipeline, PipelineConfig, RuntimeConfig,
};
use image::GrayImage;

#[derive(FromArgs)]
/// Corner matching and document layout analysis
struct Args {
    /// pipeline configuration file (.json or .toml)
    #[argh(option)]
    config: Option<PathBuf>,

    /// directory for intermediate debug images
    #[argh(option)]
    debug_dir: Option<PathBuf>,

    /// worker threads (default: all cores)
    #[argh(option)]
    threads: Option<usize>,

    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Corners(CornersArgs),
    Match(MatchArgs),
    Deskew(DeskewArgs),
    Segment(SegmentArgs),
    Glyphs(GlyphsArgs),
}

#[derive(FromArgs)]
/// detect Harris corners and draw them
#[argh(subcommand, name = "corners")]
struct CornersArgs {
    /// input image
    #[argh(positional)]
    image: PathBuf,

    /// structure-tensor window half-width
    #[argh(option)]
    offset: Option<usize>,

    /// trace weight k of the Harris response
    #[argh(option)]
    k: Option<f64>,

    /// normalised response threshold (0-1)
    #[argh(option)]
    threshold: Option<f64>,

    /// annotated output image
    #[argh(option, default = "PathBuf::from(\"corners.png\")")]
    out: PathBuf,

    /// write corners and descriptors to this JSON file
    #[argh(option)]
    dump: Option<PathBuf>,
}

#[derive(FromArgs)]
/// match corners between two images with the ratio test
#[argh(subcommand, name = "match")]
struct MatchArgs {
    /// query image
    #[argh(positional)]
    image_a: PathBuf,

    /// train image
    #[argh(positional)]
    image_b: PathBuf,

    /// ratio-test cut-off
    #[argh(option)]
    ratio: Option<f64>,

    /// side-by-side output image
    #[argh(option, default = "PathBuf::from(\"matches.png\")")]
    out: PathBuf,
}

#[derive(FromArgs)]
/// estimate the page skew and rotate the page upright
#[argh(subcommand, name = "deskew")]
struct DeskewArgs {
    /// input page
    #[argh(positional)]
    image: PathBuf,

    /// estimator: spectral or contour (default: spectral)
    #[argh(option, default = "SkewMethod::Spectral")]
    method: SkewMethod,

    /// corrected output image
    #[argh(option, default = "PathBuf::from(\"deskewed.png\")")]
    out: PathBuf,
}

#[derive(FromArgs)]
/// split a page into lines, words and letters and write the crops
#[argh(subcommand, name = "segment")]
struct SegmentArgs {
    /// input page
    #[argh(positional)]
    image: PathBuf,

    /// output directory for crops and layout.json
    #[argh(option, default = "PathBuf::from(\"segments\")")]
    out_dir: PathBuf,
}

#[derive(FromArgs)]
/// read each line's glyphs by comparing them with reference glyph images
#[argh(subcommand, name = "glyphs")]
struct GlyphsArgs {
    /// input page
    #[argh(positional)]
    image: PathBuf,

    /// reference glyph images, one glyph each; the file stem names the glyph
    #[argh(positional)]
    references: Vec<PathBuf>,

    /// relative tolerance of the signature comparison
    #[argh(option, default = "1.0")]
    rtol: f64,

    /// absolute tolerance of the signature comparison
    #[argh(option, default = "1.0")]
    atol: f64,

    /// write every glyph box and its match to this JSON file
    #[argh(option)]
    dump: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    let mut runtime = RuntimeConfig::default();
    if let Some(n) = args.threads {
        runtime.n_threads = n.max(1);
    }
    if let Some(dir) = &args.debug_dir {
        runtime.debug = DebugOutput::to_dir(dir);
    }

    match args.command {
        Command::Corners(cmd) => {
            if let Some(offset) = cmd.offset {
                config.harris.offset = offset;
            }
            if let Some(k) = cmd.k {
                config.harris.k = k;
            }
            if let Some(threshold) = cmd.threshold {
                config.harris.threshold = threshold;
            }
            run_corners(&config, &runtime, &cmd)?;
        }
        Command::Match(cmd) => {
            if let Some(ratio) = cmd.ratio {
                config.ratio = ratio;
            }
            run_match(&config, &runtime, &cmd)?;
        }
        Command::Deskew(cmd) => run_deskew(&config, &runtime, &cmd)?,
        Command::Segment(cmd) => run_segment(&config, &runtime, &cmd)?,
        Command::Glyphs(cmd) => run_glyphs(&config, &runtime, &cmd)?,
    }
    Ok(())
}

fn run_corners(config: &PipelineConfig, runtime: &RuntimeConfig, cmd: &CornersArgs) -> DocvisResult<()> {
    let img = load_gray(&cmd.image)?;
    let pipeline = FeaturePipeline::with_runtime(config, runtime)?;

    let t0 = Instant::now();
    let features = pipeline.detect_and_describe(&img)?;
    println!("Detected {} corners in {:.2?}", features.len(), t0.elapsed());

    let corners: Vec<_> = features.iter().map(|f| f.corner).collect();
    draw_corners(&img, &corners).save(&cmd.out)?;
    println!("Saved {}", cmd.out.display());

    if let Some(path) = &cmd.dump {
        let json = serde_json::to_string_pretty(&features)
            .map_err(|e| DocvisError::Config(e.to_string()))?;
        std::fs::write(path, json)?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn run_match(config: &PipelineConfig, runtime: &RuntimeConfig, cmd: &MatchArgs) -> DocvisResult<()> {
    let a = load_gray(&cmd.image_a)?;
    let b = load_gray(&cmd.image_b)?;
    let pipeline = FeaturePipeline::with_runtime(config, runtime)?;

    let t0 = Instant::now();
    let fa = pipeline.detect_and_describe(&a)?;
    let fb = pipeline.detect_and_describe(&b)?;
    let matches = pipeline.match_features(&fa, &fb)?;
    println!(
        "{} / {} corners, {} matches in {:.2?}",
        fa.len(),
        fb.len(),
        matches.len(),
        t0.elapsed()
    );

    draw_matches(&a, &b, &fa, &fb, &matches).save(&cmd.out)?;
    println!("Saved {}", cmd.out.display());
    Ok(())
}

fn run_deskew(config: &PipelineConfig, runtime: &RuntimeConfig, cmd: &DeskewArgs) -> DocvisResult<()> {
    init_thread_pool(runtime.n_threads)?;
    let img = load_gray(&cmd.image)?;
    let estimator = SkewEstimator::new(config.layout.skew.clone())?.with_debug(runtime.debug.clone());

    let deskewed = estimator.deskew(&img, cmd.method)?;
    println!("Rotated by {:.2} deg ({:?})", deskewed.angle, cmd.method);
    deskewed.image.save(&cmd.out)?;
    println!("Saved {}", cmd.out.display());
    Ok(())
}

fn run_segment(config: &PipelineConfig, runtime: &RuntimeConfig, cmd: &SegmentArgs) -> DocvisResult<()> {
    init_thread_pool(runtime.n_threads)?;
    let img = load_gray(&cmd.image)?;
    let segmenter =
        Segmenter::new(config.layout.segmentation.clone())?.with_debug(runtime.debug.clone());
    let layout = segmenter.segment(&img)?;

    std::fs::create_dir_all(&cmd.out_dir)?;
    let width = img.width();
    for (i, line) in layout.lines.iter().enumerate() {
        save_crop(&img, line.band.rect(width), &cmd.out_dir, &format!("line{}", i + 1))?;
        for (j, word) in line.words.iter().enumerate() {
            let name = format!("line{}_word{}", i + 1, j + 1);
            save_crop(&img, *word, &cmd.out_dir, &name)?;
        }
        for (j, letter) in line.letters.iter().enumerate() {
            let name = format!("line{}_letter{}", i + 1, j + 1);
            save_crop(&img, *letter, &cmd.out_dir, &name)?;
        }
    }

    let json = serde_json::to_string_pretty(&layout)
        .map_err(|e| DocvisError::Config(e.to_string()))?;
    std::fs::write(cmd.out_dir.join("layout.json"), json)?;
    println!(
        "{} lines, {} words, {} letters written to {}",
        layout.lines.len(),
        layout.word_count(),
        layout.letter_count(),
        cmd.out_dir.display()
    );
    Ok(())
}

fn run_glyphs(config: &PipelineConfig, runtime: &RuntimeConfig, cmd: &GlyphsArgs) -> DocvisResult<()> {
    if cmd.references.is_empty() {
        return Err(DocvisError::Config("at least one reference glyph is required".into()));
    }
    init_thread_pool(runtime.n_threads)?;
    let mut names = Vec::with_capacity(cmd.references.len());
    let mut references = Vec::with_capacity(cmd.references.len());
    for path in &cmd.references {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        references.push(GlyphSignature::extract(&load_gray(path)?)?);
        names.push(name);
    }

    let img = load_gray(&cmd.image)?;
    let segmenter =
        Segmenter::new(config.layout.segmentation.clone())?.with_debug(runtime.debug.clone());
    let layout = segmenter.segment(&img)?;
    let bands: Vec<Rect> = layout.lines.iter().map(|l| l.band.rect(img.width())).collect();

    let t0 = Instant::now();
    let tolerance = Tolerance { rtol: cmd.rtol, atol: cmd.atol };
    let glyphs = match_glyphs(&img, &bands, &references, tolerance)?;
    let known = glyphs.iter().filter(|g| g.reference.is_some()).count();
    println!(
        "{} glyphs on {} lines, {} recognised in {:.2?}",
        glyphs.len(),
        bands.len(),
        known,
        t0.elapsed()
    );
    for line in 0..bands.len() {
        let text: Vec<&str> = glyphs
            .iter()
            .filter(|g| g.line == line)
            .map(|g| g.reference.map_or("?", |r| names[r].as_str()))
            .collect();
        println!("line {}: {}", line + 1, text.join(" "));
    }

    if let Some(path) = &cmd.dump {
        let json = serde_json::to_string_pretty(&glyphs)
            .map_err(|e| DocvisError::Config(e.to_string()))?;
        std::fs::write(path, json)?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn save_crop(img: &GrayImage, rect: Rect, dir: &Path, name: &str) -> DocvisResult<()> {
    let Some(area) = rect.clamp_to(img.width(), img.height()) else {
        log::warn!("skipping empty crop {}", name);
        return Ok(());
    };
    crop(img, area).save(dir.join(format!("{name}.png")))?;
    Ok(())
}
