mod aperture;
mod canvas;
mod colors;
mod config;
mod disc;
mod easing;
mod error;
mod lines;
mod particles;
mod settings;
mod snapshot;
mod terminal;
mod tunnel;
mod viz;

use clap::{Args, Parser, Subcommand};
use colors::parse_hex_color;
use config::{
    InspectConfig, RecycleMode, RunConfig, SnapshotConfig, TunnelConfig, DEFAULT_BACKGROUND,
};
use error::Result;
use settings::Settings;
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "termhole")]
#[command(version = "0.1.0")]
#[command(about = "A particle tunnel falling into the terminal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Animate the tunnel in the terminal
    Run {
        /// Animation speed (seconds per frame)
        #[arg(short, long)]
        time: Option<f32>,

        /// Random seed for reproducibility
        #[arg(short, long)]
        seed: Option<u64>,

        /// Raster pixels per half-block pixel
        #[arg(long)]
        supersample: Option<u32>,

        /// Color scheme (0 = configured colors, 1-9 = presets)
        #[arg(long)]
        scheme: Option<u8>,

        /// Write log output here instead of stderr
        #[arg(long)]
        log_file: Option<PathBuf>,

        #[command(flatten)]
        tunnel: TunnelArgs,
    },

    /// Render a number of frames offscreen and save the last one as PNG
    Snapshot {
        #[arg(long, default_value = "800")]
        width: f32,

        #[arg(long, default_value = "600")]
        height: f32,

        /// Raster pixels per logical unit
        #[arg(long, default_value = "1")]
        scale: f32,

        /// Frames to run before saving
        #[arg(long, default_value = "120")]
        frames: u32,

        #[arg(short, long)]
        seed: Option<u64>,

        /// Output file (default: termhole-<timestamp>.png)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        tunnel: TunnelArgs,
    },

    /// Print the derived geometry for a viewport as JSON
    Inspect {
        #[arg(long, default_value = "800")]
        width: f32,

        #[arg(long, default_value = "600")]
        height: f32,

        #[arg(short, long)]
        seed: Option<u64>,

        #[command(flatten)]
        tunnel: TunnelArgs,
    },
}

/// Tunnel options shared by every subcommand
#[derive(Args)]
struct TunnelArgs {
    /// Number of discs in the stack
    #[arg(long)]
    discs: Option<usize>,

    /// Number of grid lines
    #[arg(long)]
    lines: Option<usize>,

    /// Number of particles
    #[arg(long)]
    particles: Option<usize>,

    /// Progress added to each disc per frame
    #[arg(long)]
    step: Option<f32>,

    /// What happens to a particle that reaches the top
    #[arg(long, value_enum)]
    recycle: Option<RecycleMode>,

    /// Stroke color for discs and lines (#rgb, #rrggbb, #rrggbbaa)
    #[arg(long)]
    stroke: Option<String>,

    /// Settings file (default: ~/.config/termhole/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

impl TunnelArgs {
    fn settings(&self) -> Result<Settings> {
        match &self.config {
            Some(path) => Settings::load_from(path),
            None => Ok(Settings::load()),
        }
    }

    /// Defaults, then the settings file, then flags
    fn resolve(&self, settings: &Settings) -> Result<TunnelConfig> {
        let mut config = TunnelConfig::default();
        settings.apply(&mut config)?;

        if let Some(v) = self.discs {
            config.total_discs = v;
        }
        if let Some(v) = self.lines {
            config.total_lines = v;
        }
        if let Some(v) = self.particles {
            config.total_particles = v;
        }
        if let Some(v) = self.step {
            config.progress_step = v;
        }
        if let Some(v) = self.recycle {
            config.recycle = v;
        }
        if let Some(s) = &self.stroke {
            config.stroke_color = parse_hex_color(s)?;
        }
        Ok(config)
    }
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(path) = log_file {
        let file = File::create(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn default_output() -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    PathBuf::from(format!("termhole-{}.png", stamp))
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run {
            time,
            seed,
            supersample,
            scheme,
            log_file,
            tunnel,
        } => {
            init_logging(log_file.as_deref())?;
            let settings = tunnel.settings()?;
            let file = &settings.run;
            let config = RunConfig {
                tunnel: tunnel.resolve(&settings)?,
                time_step: time
                    .or(file.time)
                    .unwrap_or(0.016)
                    .clamp(0.0, viz::tunnel::MAX_FRAME_SECONDS),
                seed,
                supersample: supersample.or(file.supersample).unwrap_or(4).clamp(1, 16),
                scheme: scheme.or(file.scheme).unwrap_or(0).min(9),
                background: settings.background()?.unwrap_or(DEFAULT_BACKGROUND),
            };
            viz::tunnel::run(config)
        }
        Commands::Snapshot {
            width,
            height,
            scale,
            frames,
            seed,
            output,
            tunnel,
        } => {
            init_logging(None)?;
            let settings = tunnel.settings()?;
            let config = SnapshotConfig {
                tunnel: tunnel.resolve(&settings)?,
                width,
                height,
                scale,
                frames,
                seed,
                output: output.unwrap_or_else(default_output),
                background: settings.background()?.unwrap_or(DEFAULT_BACKGROUND),
            };
            snapshot::snapshot(config)
        }
        Commands::Inspect {
            width,
            height,
            seed,
            tunnel,
        } => {
            init_logging(None)?;
            let settings = tunnel.settings()?;
            let config = InspectConfig {
                tunnel: tunnel.resolve(&settings)?,
                width,
                height,
                seed,
            };
            snapshot::inspect(config)
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("termhole: {}", e);
        std::process::exit(1);
    }
}
