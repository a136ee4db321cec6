use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ryxscript::engine::{load_all, DirectorySource, LoadReport, Runtime, Scheduler};
use ryxscript::input::SharedKeyQueue;
use ryxscript::settings::{self, RuntimeConfig};

// ── CLI argument parsing ─────────────────────────────────────────

#[derive(Parser)]
#[command(name = "ryx", about = "RyxScript headless runner", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON runtime config; missing file means defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load every unit and report which ones translate
    Check {
        /// Script files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Load units, run main, then drive the frame loop
    Run {
        /// Script files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Run this many fixed-step frames instead of real time
        #[arg(long)]
        frames: Option<u64>,
        /// Seconds per fixed step
        #[arg(long, default_value_t = 1.0 / 60.0)]
        dt: f64,
        /// Key held down for the whole run (repeatable)
        #[arg(long = "hold")]
        hold: Vec<String>,
        /// Write recorded draw commands as JSON
        #[arg(long)]
        dump_draws: Option<PathBuf>,
        /// Override the surface width
        #[arg(long)]
        width: Option<u32>,
        /// Override the surface height
        #[arg(long)]
        height: Option<u32>,
        /// Override the real-time frame rate
        #[arg(long)]
        fps: Option<u32>,
        /// Abort on the first entity failure instead of logging it
        #[arg(long)]
        strict: bool,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

fn load_config(path: Option<&Path>) -> RuntimeConfig {
    let Some(path) = path else {
        return RuntimeConfig::default();
    };
    settings::load_config(path).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        process::exit(2);
    })
}

fn print_report(report: &LoadReport) {
    for unit in &report.loaded {
        println!("ok    {unit}");
    }
    for err in &report.failed {
        println!("FAIL  {err}");
    }
    println!(
        "{} loaded, {} failed",
        report.loaded.len(),
        report.failed.len()
    );
}

// ── Commands ─────────────────────────────────────────────────────

fn check(config: RuntimeConfig, paths: &[PathBuf]) -> i32 {
    let mut source = DirectorySource::new(paths, &config.script_extension);
    let (rt, _log) = Runtime::headless(config, None);
    let report = load_all(&rt, &mut source);
    print_report(&report);
    i32::from(!report.all_ok())
}

struct RunOptions {
    frames: Option<u64>,
    dt: f64,
    hold: Vec<String>,
    dump_draws: Option<PathBuf>,
}

fn run(config: RuntimeConfig, paths: &[PathBuf], opts: RunOptions) -> i32 {
    let keys = SharedKeyQueue::new();
    for key in &opts.hold {
        keys.key_down(key);
    }

    let mut source = DirectorySource::new(paths, &config.script_extension);
    let (rt, log) = Runtime::headless(config, Some(Box::new(keys)));
    let report = load_all(&rt, &mut source);
    if !report.all_ok() {
        print_report(&report);
    }

    if let Err(e) = rt.run_main() {
        error!(error = %e, "main failed");
        return 1;
    }

    let mut scheduler = Scheduler::new();
    let result = match opts.frames {
        Some(frames) => scheduler.run_fixed(&rt, frames, opts.dt),
        None => run_real_time(&rt, &mut scheduler),
    };
    if let Err(e) = result {
        error!(frames = scheduler.frames(), error = %e, "frame loop stopped");
        return 1;
    }
    info!(frames = scheduler.frames(), entities = rt.entity_count(), "run finished");

    if let Some(path) = opts.dump_draws {
        let json = match serde_json::to_string_pretty(&log.snapshot()) {
            Ok(json) => json,
            Err(e) => {
                eprintln!("Error: {e}");
                return 1;
            }
        };
        if let Err(e) = std::fs::write(&path, json) {
            eprintln!("Error writing {}: {e}", path.display());
            return 1;
        }
    }

    i32::from(!report.all_ok())
}

fn run_real_time(rt: &Runtime, scheduler: &mut Scheduler) -> Result<(), ryxscript::error::RuntimeError> {
    let tokio_rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {e}");
            process::exit(1);
        }
    };
    tokio_rt
        .block_on(scheduler.run_until(rt, async {
            tokio::signal::ctrl_c().await.ok();
        }))
        .map(|_| ())
}

// ── Main ─────────────────────────────────────────────────────────

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref());

    let code = match cli.command {
        Commands::Check { paths } => check(config, &paths),
        Commands::Run {
            paths,
            frames,
            dt,
            hold,
            dump_draws,
            width,
            height,
            fps,
            strict,
        } => {
            if let Some(w) = width {
                config.width = w;
            }
            if let Some(h) = height {
                config.height = h;
            }
            if let Some(f) = fps {
                config.target_fps = f;
            }
            if strict {
                config.isolate_entity_errors = false;
            }
            run(
                config,
                &paths,
                RunOptions {
                    frames,
                    dt,
                    hold,
                    dump_draws,
                },
            )
        }
    };
    process::exit(code);
}
