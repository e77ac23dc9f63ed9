use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use glitch_terminal_core::{
    audio,
    loader::{LoaderEvent, LOADER_DURATION_MS, NOISE_INTERVAL_MS},
    AppConfig, ColorRequest, ColorResolver, CueAnalysis, GlitchProfile, GlitchSurface,
    HighlightColor, LoaderSequence, PixelText, Rasterizer, Result, Rgb, ScrambleAnimator,
    ScrambleOptions, SimulatedClock, SoundEvent, Theme, ThemeState,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::RenderText {
            text,
            output,
            pixel_size,
            bold,
            theme,
            highlight,
            color,
        } => run_render_text(
            &config,
            &text,
            &output,
            RenderArgs {
                pixel_size,
                bold,
                theme,
                highlight,
                color,
            },
        ),
        Commands::Scramble { text, preset, seed } => run_scramble(&config, &text, preset, seed),
        Commands::Sound {
            event,
            output,
            volume,
        } => run_sound(&config, &event, &output, volume),
        Commands::Glitch { profile, seed } => run_glitch(profile, seed),
        Commands::Loader { seed } => run_loader(seed),
    }
}

struct RenderArgs {
    pixel_size: Option<u32>,
    bold: bool,
    theme: Option<String>,
    highlight: Option<String>,
    color: Option<String>,
}

fn theme_state(config: &AppConfig, theme: Option<&str>) -> Result<ThemeState> {
    let theme = match theme {
        Some(name) => name.parse::<Theme>()?,
        None => config.render.theme,
    };
    Ok(ThemeState::new(theme))
}

fn run_render_text(config: &AppConfig, text: &str, output: &Path, args: RenderArgs) -> Result<()> {
    let state = theme_state(config, args.theme.as_deref())?;
    if let Some(name) = args.highlight.as_deref() {
        state.highlight.set(Some(name.parse::<HighlightColor>()?));
    }

    let mut request = config.render.request(text).bold(args.bold || config.render.bold);
    if let Some(pixel_size) = args.pixel_size {
        request = request.pixel_size(pixel_size);
    }
    if let Some(hex) = args.color.as_deref() {
        request = request.color(ColorRequest::Literal(hex.parse::<Rgb>()?));
    }

    let rasterizer = Rasterizer::new(ColorResolver::new(state, config.render.palette.clone()));
    let raster = rasterizer.render(&request);
    raster.to_rgba_image().save(output)?;
    tracing::info!(
        path = %output.display(),
        width = raster.width,
        height = raster.height,
        pixels = raster.rects.len(),
        color = %raster.color,
        "text rasterized"
    );
    Ok(())
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScramblePreset {
    /// Options from the configuration file.
    Config,
    Back,
    Nav,
    Logo,
    Card,
}

fn run_scramble(
    config: &AppConfig,
    text: &str,
    preset: ScramblePreset,
    seed: Option<u64>,
) -> Result<()> {
    let mut options = match preset {
        ScramblePreset::Config => config.scramble,
        ScramblePreset::Back => ScrambleOptions::back_button(),
        ScramblePreset::Nav => ScrambleOptions::nav_label(),
        ScramblePreset::Logo => ScrambleOptions::logo(text.chars().count()),
        ScramblePreset::Card => ScrambleOptions::card_field(0),
    };
    if let Some(seed) = seed {
        options = options.with_seed(seed);
    }

    let state = theme_state(config, None)?;
    let rasterizer = Rasterizer::new(ColorResolver::new(state, config.render.palette.clone()));
    let mut element = PixelText::new(rasterizer, config.render.request(text));

    let mut clock = SimulatedClock::new();
    let mut animator = ScrambleAnimator::new();
    let initial = animator.start("label", text, options, clock.time_ms);
    element.set_text(&initial);
    println!("{:>6}  {}", clock.time_ms, initial);

    while animator.is_running(&"label") {
        let now = clock.advance(options.interval_ms());
        for (_, timed) in animator.advance(now) {
            element.set_text(&timed.frame.text);
            let lit = element.frame().rects.len();
            println!("{:>6}  {:<24} {lit:>4} px", timed.at_ms, timed.frame.text);
        }
    }
    tracing::debug!(renders = element.render_count(), "scramble finished");
    Ok(())
}

fn run_sound(config: &AppConfig, event: &str, output: &Path, volume: Option<f32>) -> Result<()> {
    let event = event.parse::<SoundEvent>()?;
    let mut settings = config.audio.settings();
    if let Some(volume) = volume {
        settings = settings.with_volume(volume);
    }

    let samples = audio::render_event_to_wav(event, settings, config.audio.sample_rate, output)?;
    if samples.len() < 2 {
        println!("{event}: audio disabled, wrote an empty file");
        return Ok(());
    }

    let analysis = CueAnalysis::of(&samples, config.audio.sample_rate)?;
    println!(
        "{event}: {:.3}s  peak {:.3}  rms {:.4}  centroid {:.0} Hz",
        analysis.duration_seconds, analysis.peak, analysis.rms, analysis.centroid_hz
    );
    Ok(())
}

fn run_glitch(profile: GlitchProfileArg, seed: Option<u64>) -> Result<()> {
    let mut surface = match seed {
        Some(seed) => GlitchSurface::with_seed(seed),
        None => GlitchSurface::new(),
    };
    let mut clock = SimulatedClock::new();

    let profile = match profile {
        GlitchProfileArg::In => {
            surface.enter(clock.time_ms);
            GlitchProfile::In
        }
        GlitchProfileArg::Out => {
            // Settle at rest first so the burst starts from a visible image.
            surface.enter(clock.time_ms);
            surface.advance(clock.advance(10_000));
            surface.leave(clock.time_ms);
            GlitchProfile::Out
        }
    };

    let interval = profile.interval_ms();
    while surface.active_profile().is_some() {
        clock.advance(interval);
        if surface.advance(clock.time_ms) > 0 {
            let transform = surface.transform();
            println!(
                "{:>6}  opacity {:.3}  {}  {}",
                clock.time_ms,
                transform.opacity,
                transform.css_transform(),
                transform.css_filter()
            );
        }
    }
    Ok(())
}

fn run_loader(seed: Option<u64>) -> Result<()> {
    let mut clock = SimulatedClock::new();
    let mut loader = LoaderSequence::with_duration(clock.time_ms, LOADER_DURATION_MS, seed);

    while !loader.is_complete() {
        let now = clock.advance(NOISE_INTERVAL_MS);
        for event in loader.advance(now) {
            if let LoaderEvent::Noise(_) | LoaderEvent::Complete = event.frame {
                let view = loader.view();
                println!(
                    "{:>6}  {:>3}%  {}  {}",
                    event.at_ms, view.percent, view.binary, view.noise
                );
            }
        }
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GlitchProfileArg {
    In,
    Out,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Glitch terminal text, motion and sound effects", long_about = None)]
struct Cli {
    /// Optional JSON configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rasterize text in the pixel font and save it as a PNG.
    RenderText {
        text: String,
        /// Output PNG path.
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        pixel_size: Option<u32>,
        #[arg(long)]
        bold: bool,
        /// `light` or `dark`; defaults to the configured theme.
        #[arg(long)]
        theme: Option<String>,
        /// Active highlight color name, e.g. `pink`.
        #[arg(long)]
        highlight: Option<String>,
        /// Literal `#RRGGBB` color, overriding theme and highlight.
        #[arg(long)]
        color: Option<String>,
    },
    /// Print every frame of a scramble on a simulated clock.
    Scramble {
        text: String,
        #[arg(long, value_enum, default_value = "config")]
        preset: ScramblePreset,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Render a sound cue to WAV and print its analysis.
    Sound {
        /// Cue name, e.g. `hover` or `page-transition`.
        event: String,
        /// Output WAV path.
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        volume: Option<f32>,
    },
    /// Print the transforms of a glitch burst.
    Glitch {
        #[arg(long, value_enum, default_value = "in")]
        profile: GlitchProfileArg,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print the boot overlay sequence.
    Loader {
        #[arg(long)]
        seed: Option<u64>,
    },
}
