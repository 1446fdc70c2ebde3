//! ringtrack CLI: run one ring detector over a sequence of frames.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{info, warn};
use ringtrack::detect;
use ringtrack::detector::{FrameReport, RingDetectConfig, RingDetectReport};
use ringtrack::{OverlayMode, RingDetector, RingPolarity};

#[cfg(feature = "tracing")]
use tracing_log::LogTracer;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser, Debug)]
#[command(name = "ringtrack")]
#[command(about = "Detect and track a concentric ring marker across image frames")]
#[command(version)]
struct Cli {
    /// JSON config with frames, detector params and outputs.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write the JSON report (overrides the config).
    #[arg(long)]
    report: Option<PathBuf>,

    /// Directory for per-frame overlay PNGs (overrides the config).
    #[arg(long)]
    overlay_dir: Option<PathBuf>,

    /// Paint every grown region in overlays, not only the marker.
    #[arg(long)]
    all_regions: bool,

    /// The marker is a bright annulus around a dark core.
    #[arg(long)]
    light_ring: bool,

    /// Inner over outer diameter of the marker.
    #[arg(long)]
    diameter_ratio: Option<f32>,

    /// Search every frame from scratch instead of tracking.
    #[arg(long)]
    no_tracking: bool,

    /// Also print the report to stdout.
    #[arg(long)]
    json: bool,

    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Frames to process, in order, after those listed in the config.
    frames: Vec<PathBuf>,
}

fn init_logging(verbose: u8) -> CliResult<()> {
    let level = match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    #[cfg(feature = "tracing")]
    {
        let _ = level;
        let _ = LogTracer::init();
        ringtrack::core::init_tracing(false);
    }
    #[cfg(not(feature = "tracing"))]
    ringtrack::core::init_with_level(level)?;
    Ok(())
}

fn build_config(cli: &Cli) -> CliResult<RingDetectConfig> {
    let mut cfg = match &cli.config {
        Some(path) => RingDetectConfig::load_json(path)?,
        None => RingDetectConfig::new(Vec::new(), Default::default()),
    };
    cfg.frames
        .extend(cli.frames.iter().map(|p| p.to_string_lossy().into_owned()));
    if let Some(report) = &cli.report {
        cfg.report_path = Some(report.to_string_lossy().into_owned());
    }
    if let Some(dir) = &cli.overlay_dir {
        cfg.overlay_dir = Some(dir.to_string_lossy().into_owned());
    }
    if cli.all_regions {
        cfg.overlay_mode = OverlayMode::AllRegions;
    }
    if cli.light_ring {
        cfg.params.polarity = RingPolarity::LightRing;
    }
    if let Some(ratio) = cli.diameter_ratio {
        cfg.params.diameter_ratio = ratio;
    }
    if cli.no_tracking {
        cfg.params.tracking = false;
    }
    cfg.params.validate()?;
    if cfg.frames.is_empty() {
        return Err("no frames given: pass image paths or a config listing them".into());
    }
    Ok(cfg)
}

fn process_frame(
    cfg: &RingDetectConfig,
    detector: &mut Option<RingDetector>,
    index: usize,
    path: &str,
) -> CliResult<FrameReport> {
    let img = detect::load_rgb(path)?;
    let det = match detector {
        Some(det) => det,
        None => detector.insert(detect::detector_for(&img, cfg.params.clone())?),
    };
    let ring = detect::detect_image(det, &img)?;
    if ring.valid {
        let [r0, r1] = ring.radii();
        info!(
            "{path}: ring at ({:.2}, {:.2}), radii ({r0:.2}, {r1:.2}), threshold {}",
            ring.center.x, ring.center.y, ring.threshold
        );
    } else {
        info!(
            "{path}: no ring ({} regions, {} failures)",
            det.last_stats().regions,
            det.failures()
        );
    }

    let mut report = FrameReport::from_detector(path, det);
    if let Some(out) = cfg.overlay_path(index, path) {
        detect::overlay_image(det, &img, cfg.overlay_mode)?.save(&out)?;
        report.overlay_path = Some(out.to_string_lossy().into_owned());
    }
    Ok(report)
}

fn run(cli: &Cli) -> CliResult<()> {
    let cfg = build_config(cli)?;
    if let Some(dir) = &cfg.overlay_dir {
        fs::create_dir_all(dir)?;
    }

    let mut report = RingDetectReport::new(&cfg, cli.config.as_deref());
    let mut detector = None;
    for (index, path) in cfg.frames.iter().enumerate() {
        let frame = match process_frame(&cfg, &mut detector, index, path) {
            Ok(frame) => frame,
            Err(err) => {
                warn!("{path}: {err}");
                FrameReport::failed(path, err)
            }
        };
        report.push(frame);
    }

    let report_path = cfg.report_path();
    report.write_json(&report_path)?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    println!(
        "{}/{} frames with a ring, report written to {}",
        report.detected,
        report.frames.len(),
        report_path.display()
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match init_logging(cli.verbose).and_then(|()| run(&cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
