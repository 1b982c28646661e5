use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use facesift::{config, events::LogSink, output, FaceFilter, FileDecoder, YuNetDetector};
use log::info;

#[derive(Parser)]
#[command(name = "facesift")]
#[command(
    version,
    about = "Copy images whose largest face covers more than a given share of the frame"
)]
struct Cli {
    /// Folder with the images to scan (with --output_folder_path, skips params.json)
    #[arg(long = "image_folder_path")]
    image_folder_path: Option<PathBuf>,

    /// Folder that receives images with a dominant face
    #[arg(long = "output_folder_path")]
    output_folder_path: Option<PathBuf>,

    /// Face to image area ratio threshold
    #[arg(long = "face_ratio", default_value_t = config::DEFAULT_FACE_RATIO)]
    face_ratio: f64,

    /// YuNet ONNX model used for detection
    #[arg(long = "detector_model")]
    detector_model: Option<PathBuf>,

    /// Event log, opened in append mode
    #[arg(long = "log_file", default_value = config::DEFAULT_LOG_FILE)]
    log_file: PathBuf,
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();

    let sink = LogSink::open(&cli.log_file)?;

    let cfg = config::resolve(
        cli.image_folder_path,
        cli.output_folder_path,
        cli.face_ratio,
        Path::new(config::PARAMS_FILE),
    )?;

    output::prepare_output_dir(&cfg.output_folder_path)?;

    let model_path = cli
        .detector_model
        .unwrap_or_else(|| config::DETECTOR_MODEL_PATH.to_path_buf());
    info!("Loading detector: {}", model_path.display());
    let detector =
        YuNetDetector::from_file(&model_path).context("Failed to initialize face detector")?;

    info!(
        "Scanning {} (threshold {})",
        cfg.image_folder_path.display(),
        cfg.face_ratio_threshold
    );
    let summary = FaceFilter::new(&cfg, FileDecoder, detector, sink).run()?;

    info!(
        "Done: {} image(s) scanned, {} kept, {} low-ratio face(s), {} without faces, {} undecodable",
        summary.scanned, summary.kept, summary.low_ratio_events, summary.no_face, summary.decode_failures
    );
    Ok(())
}
