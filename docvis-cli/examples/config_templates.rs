use docvis_cli::docvis_harris::HarrisConfig;
use docvis_cli::docvis_layout::{CentralExclusion, LayoutConfig, PeakKeep};
use docvis_cli::PipelineConfig;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔧 docvis configuration templates");
    println!("=================================\n");

    // Harris presets
    let presets = vec![
        ("default", HarrisConfig::default().with_metadata("Default", "Balanced window and threshold")),
        ("sensitive", HarrisConfig::sensitive_preset()),
        ("strict", HarrisConfig::strict_preset()),
    ];
    for (name, cfg) in &presets {
        let path = format!("harris_{}.toml", name);
        cfg.save_toml(&path)?;
        println!("   • {} -> {}", cfg.summary(), path);
    }

    // Layout config with the alternate policies switched on
    let mut layout = LayoutConfig::default();
    layout.segmentation.keep = PeakKeep::All;
    layout.skew.exclusion = CentralExclusion::Disk;
    layout.save_json("layout_all_lines.json")?;
    let reloaded = LayoutConfig::load_json("layout_all_lines.json")?;
    assert_eq!(reloaded, layout);
    println!("\n   ✅ layout_all_lines.json round-trips");

    // One file for every pipeline, as read by `docvis --config`
    let pipeline = PipelineConfig {
        harris: HarrisConfig::sensitive_preset(),
        layout,
        ..PipelineConfig::default()
    };
    std::fs::write("docvis.toml", pipeline.to_toml()?)?;
    let loaded = PipelineConfig::load("docvis.toml")?;
    assert_eq!(loaded, pipeline);
    println!("   ✅ docvis.toml round-trips");

    Ok(())
}
