mod playback;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lyrica_core::hash::hash_frame;
use lyrica_core::{LyricaConfig, Viewport};
use lyrica_ir::LyricDocument;
use lyrica_render::{
    compute_layout, FontdueMeasurer, HeuristicMeasurer, LyricsEngine, ManualScheduler,
    RasterSurface, RecordingSurface, TextMeasure,
};

#[derive(Parser)]
#[command(
    name = "lyrica",
    version,
    about = "Lyrica: synchronized lyrics layout and rendering",
    long_about = "Lyrica lays out syllable-timed lyrics, animates them against a playback\nposition and renders the result frame by frame."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate a lyrics document
    Check {
        /// Path to the JSON lyrics document
        #[arg()]
        file: PathBuf,
    },

    /// Lay out a document and print the geometry as JSON
    Layout {
        #[arg()]
        file: PathBuf,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Render frames at given playback positions to PNG
    Render {
        #[arg()]
        file: PathBuf,

        /// Playback positions in milliseconds
        #[arg(long = "at", required = true, num_args = 1..)]
        at: Vec<f64>,

        /// Frame rate of the simulated display clock
        #[arg(long, default_value_t = 60.0)]
        fps: f64,

        /// Output directory (default: output/)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write each frame's draw commands as JSON
        #[arg(long)]
        dump_commands: bool,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Display version and the default configuration
    Info,
}

#[derive(clap::Args)]
struct ViewArgs {
    /// Viewport width in pixels
    #[arg(long, default_value_t = 1280.0)]
    width: f64,

    /// Viewport height in pixels
    #[arg(long, default_value_t = 720.0)]
    height: f64,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// TTF/OTF font used for measurement and glyphs
    #[arg(long)]
    font: Option<PathBuf>,
}

impl ViewArgs {
    fn viewport(&self) -> Result<Viewport> {
        let viewport = Viewport::new(self.width, self.height);
        if viewport.is_empty() || !self.width.is_finite() || !self.height.is_finite() {
            anyhow::bail!("viewport must be positive, got {}x{}", self.width, self.height);
        }
        Ok(viewport)
    }

    fn load_config(&self) -> Result<LyricaConfig> {
        match &self.config {
            Some(path) => LyricaConfig::load_from_file(path)
                .with_context(|| format!("failed to load config: {}", path.display())),
            None => Ok(LyricaConfig::default()),
        }
    }

    fn load_font(&self) -> Result<Option<FontdueMeasurer>> {
        self.font
            .as_deref()
            .map(|path| {
                FontdueMeasurer::load(path)
                    .with_context(|| format!("failed to load font: {}", path.display()))
            })
            .transpose()
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Check { file } => cmd_check(&file),
        Commands::Layout { file, view } => cmd_layout(&file, &view),
        Commands::Render {
            file,
            at,
            fps,
            output,
            dump_commands,
            view,
        } => cmd_render(&file, &at, fps, output, dump_commands, &view),
        Commands::Info => cmd_info(),
    }
}

fn load_document(file: &Path) -> Result<LyricDocument> {
    LyricDocument::load_from_file(file)
        .with_context(|| format!("failed to read lyrics: {}", file.display()))
}

fn cmd_check(file: &Path) -> Result<()> {
    println!("Checking {}", file.display());
    let document = load_document(file)?;
    println!("   ✓ Parse OK ({} blocks)", document.content.len());

    match lyrica_ir::validate_document(&document) {
        Ok(()) => println!("   ✓ Validate OK"),
        Err(errors) => {
            for e in &errors {
                println!("   ⚠ skipped: {}", e);
            }
            if errors.len() == document.content.len() {
                anyhow::bail!("no valid blocks in {}", file.display());
            }
            println!(
                "   ✓ {} of {} blocks usable",
                document.content.len() - errors.len(),
                document.content.len()
            );
        }
    }
    Ok(())
}

fn cmd_layout(file: &Path, view: &ViewArgs) -> Result<()> {
    let document = load_document(file)?;
    let config = view.load_config()?;
    let viewport = view.viewport()?;
    let font = view.load_font()?;
    let heuristic = HeuristicMeasurer::new(config.layout.average_char_width_ratio);
    let measurer: &dyn TextMeasure = match &font {
        Some(f) => f,
        None => &heuristic,
    };

    let layout = compute_layout(&document, &config, viewport, measurer);
    let json = layout.to_json().context("failed to serialize layout")?;
    println!("{}", json);
    Ok(())
}

fn cmd_render(
    file: &Path,
    at: &[f64],
    fps: f64,
    output: Option<PathBuf>,
    dump_commands: bool,
    view: &ViewArgs,
) -> Result<()> {
    let document = load_document(file)?;
    let config = view.load_config()?;
    let viewport = view.viewport()?;
    if !(fps.is_finite() && fps > 0.0) {
        anyhow::bail!("fps must be positive, got {}", fps);
    }

    let font = view.load_font()?;
    let glyphs = font.as_ref().map(|f| f.font().clone());
    let measurer: Box<dyn TextMeasure> = match font {
        Some(f) => Box::new(f),
        None => Box::new(HeuristicMeasurer::new(config.layout.average_char_width_ratio)),
    };

    let out_dir = output.unwrap_or_else(|| PathBuf::from("output"));
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create output directory: {}", out_dir.display()))?;

    let char_width_ratio = config.layout.average_char_width_ratio;
    let mut engine = LyricsEngine::new(config, viewport, measurer, ManualScheduler::new(fps));
    engine.set_document(document);
    engine.start();
    let mut surface = RasterSurface::new(glyphs).with_char_width_ratio(char_width_ratio);

    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "lyrics".to_string());
    println!("Rendering {} ({}x{} @ {} fps)", file.display(), viewport.width, viewport.height, fps);

    let start = Instant::now();
    for target in playback::sorted_targets(at) {
        let frames = playback::advance_to(&mut engine, target);
        if !engine.paint(&mut surface) {
            anyhow::bail!("surface rejected the frame at {}ms", target);
        }
        let hash = hash_frame(surface.frame());
        let path = out_dir.join(format!("{}_{}ms.png", stem, target.round() as i64));
        surface
            .save_png(&path)
            .with_context(|| format!("failed to write frame: {}", path.display()))?;

        if dump_commands {
            let mut recorder = RecordingSurface::new();
            engine.paint(&mut recorder);
            let json_path = path.with_extension("json");
            std::fs::write(&json_path, recorder.to_json()?)
                .with_context(|| format!("failed to write commands: {}", json_path.display()))?;
        }

        println!(
            "   ✓ {:>8.0}ms  {} frames  {}  {}",
            target,
            frames,
            &hash.to_hex()[..16],
            path.display()
        );
    }
    tracing::info!("rendered {} frames in {:.2?}", at.len(), start.elapsed());
    Ok(())
}

fn cmd_info() -> Result<()> {
    println!("Lyrica");
    println!("   Version:   {}", env!("CARGO_PKG_VERSION"));
    println!("   Renderer:  CPU (single-threaded)");
    println!();
    println!("Default configuration:");
    println!();
    let toml = LyricaConfig::default()
        .to_toml_string()
        .context("failed to serialize default config")?;
    println!("{}", toml);
    Ok(())
}
