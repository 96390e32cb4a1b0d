//! Mirage: verify an image caption against a detection model.
//!
//! Prints three sections - the objects extracted from the caption, the
//! objects detected in the image, and the reconciliation report. Exits
//! non-zero on configuration errors, a missing image, or any pipeline
//! failure.

mod assets;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use mirage_core::{Caption, ImageRef};
use mirage_runtime::{
    ApiCredential, GroqExtractor, PipelineError, RuntimeConfig, VerificationOrchestratorBuilder,
    YoloDetector, GROQ_API_KEY_ENV,
};

#[derive(Parser, Debug)]
#[command(
    name = "mirage",
    version,
    about = "Verify objects in an image caption against a detection model"
)]
struct Args {
    /// Path to the image file
    #[arg(long, default_value = assets::DEFAULT_IMAGE_PATH)]
    image: PathBuf,

    /// The caption to verify
    #[arg(long)]
    caption: String,

    /// Path to the ONNX detection model (overrides config)
    #[arg(long)]
    model: Option<PathBuf>,

    /// Path to a JSON runtime configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = match &args.config {
        Some(path) => RuntimeConfig::from_json_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => RuntimeConfig::default(),
    };
    if let Some(model) = &args.model {
        config.detector.model_path = model.clone();
    }

    // Required before any pipeline step runs; absence is fatal here, not
    // on the first request.
    let credential = ApiCredential::from_env(GROQ_API_KEY_ENV, "Groq API key")?;

    if args.image == PathBuf::from(assets::DEFAULT_IMAGE_PATH) {
        assets::ensure_sample_image(&args.image).await?;
    }
    if !args.image.exists() {
        bail!("image file not found at {}", args.image.display());
    }

    let caption = Caption::new(args.caption.as_str())?;

    let extractor = GroqExtractor::new(credential, config.extractor.clone());
    let detector = YoloDetector::new(config.detector.clone())?;
    let orchestrator = VerificationOrchestratorBuilder::new()
        .extractor(Arc::new(extractor))
        .detector(Arc::new(detector))
        .config(config)
        .build()?;

    println!("--- Verifying Caption ---");
    println!("IMAGE: {}", args.image.display());
    println!("CAPTION: \"{caption}\"");
    println!();

    let image = ImageRef::from_path(&args.image);
    let run = match orchestrator.verify(&image, &caption).await {
        Ok(run) => run,
        Err(PipelineError::NoCaptionObjects) => {
            bail!("no objects could be extracted from the caption")
        }
        Err(PipelineError::NoDetections) => {
            bail!("no objects were detected in the image")
        }
        Err(e) => return Err(e).context("verification pipeline failed"),
    };

    println!("Caption objects:  {}", run.caption_objects);
    println!("Detected objects: {}", run.detected_objects);
    println!();

    println!("--- Verification Report ---");
    if run.report.verified().is_empty() {
        println!("No objects from the caption were verified in the image.");
    } else {
        println!("Verified objects: {}", run.report.verified());
    }
    if run.report.is_clean() {
        println!("No object hallucinations detected.");
    } else {
        println!("Potential hallucinations: {}", run.report.hallucinated());
    }

    let usage = orchestrator.usage();
    tracing::debug!(
        llm_calls = usage.llm_calls,
        total_tokens = usage.total_tokens,
        "llm usage"
    );

    Ok(())
}

fn init_tracing(verbosity: u8) {
    use tracing_subscriber::EnvFilter;

    let default_filter = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
