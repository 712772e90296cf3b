//! Command-line host for the shrinkray pipeline.
//!
//! Validates the given files, runs them through the queue, and writes the
//! resized output plus a thumbnail next to each other in the output
//! directory. Everything interesting happens in the worker and processing
//! crates; this binary is glue.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use shrinkray_core::{
    CropAspectRatio, CropSettings, ItemStatus, OutputFormat, PresetSize, ResizeSettings, SizeMode,
};
use shrinkray_processing::FileValidator;
use shrinkray_worker::{IncomingFile, LogTelemetry, QueueConfig, QueueCoordinator};

#[derive(Parser, Debug)]
#[command(name = "shrinkray", version, about = "Batch image resize and compression")]
struct Args {
    /// Image files to process (jpeg, png, webp, gif)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Target long edge in pixels (10-3840)
    #[arg(long, default_value_t = 720, conflicts_with = "preset")]
    max_size: u32,

    /// Fixed preset size: sd, hd, fhd, qhd, uhd
    #[arg(long)]
    preset: Option<String>,

    /// Keep the source dimensions
    #[arg(long)]
    no_resize: bool,

    /// Quality 50-100. Compression effort for png, visual quality otherwise
    #[arg(long, default_value_t = 80)]
    quality: u8,

    /// Output format: jpeg, png, avif
    #[arg(long, default_value = "jpeg")]
    format: String,

    /// Center-crop to an aspect ratio (16:9, 4:3, 1:1, 9:16); requires --preset
    #[arg(long, requires = "preset")]
    crop: Option<String>,

    /// Concurrent worker count
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// Directory for the generated files
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

fn build_settings(args: &Args) -> Result<ResizeSettings> {
    let (size_mode, max_size) = match &args.preset {
        Some(preset) => (SizeMode::Preset, PresetSize::parse(preset)?.long_edge()),
        None => (SizeMode::Slider, args.max_size),
    };
    let crop = match &args.crop {
        Some(ratio) => CropSettings {
            enabled: true,
            aspect_ratio: CropAspectRatio::parse(ratio)?,
        },
        None => CropSettings::default(),
    };

    let settings = ResizeSettings {
        resize_enabled: !args.no_resize,
        max_size,
        quality: args.quality,
        output_format: OutputFormat::parse(&args.format)?,
        size_mode,
        crop,
    };
    settings
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid settings: {}", e))?;
    Ok(settings)
}

fn media_type_for(path: &Path) -> Option<&'static str> {
    match path.extension()?.to_str()?.to_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let settings = build_settings(&args)?;

    let validator = FileValidator::default();
    let mut files = Vec::new();
    let mut skipped = 0usize;
    for path in &args.inputs {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_string())
            .unwrap_or_else(|| path.display().to_string());
        let media_type = media_type_for(path).unwrap_or("application/octet-stream");
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;

        if let Err(e) = validator.validate(&name, media_type, data.len() as u64) {
            eprintln!("skipping {}: {}", name, e);
            skipped += 1;
            continue;
        }
        files.push(IncomingFile {
            name,
            media_type: media_type.to_string(),
            data: data.into(),
        });
    }

    if files.is_empty() {
        anyhow::bail!("no valid input files");
    }
    tracing::info!(
        count = files.len(),
        format = %settings.output_format,
        max_size = settings.max_size,
        "processing batch"
    );

    tokio::fs::create_dir_all(&args.out_dir)
        .await
        .with_context(|| format!("failed to create {}", args.out_dir.display()))?;

    let mut queue = QueueCoordinator::new(QueueConfig {
        max_workers: args.workers.max(1),
        ..QueueConfig::default()
    })
    .with_telemetry(Arc::new(LogTelemetry));

    queue.submit(files, &settings).await;
    queue.run_until_drained().await;

    let mut failed = 0usize;
    for item in queue.items() {
        match item.status {
            ItemStatus::Completed => {}
            ItemStatus::Error => {
                failed += 1;
                eprintln!(
                    "{}: {}",
                    item.name,
                    item.error.as_deref().unwrap_or("processing failed")
                );
            }
            status => {
                failed += 1;
                eprintln!("{}: stuck in status {}", item.name, status);
            }
        }
    }

    for result in queue.results() {
        let output_path = args.out_dir.join(result.output_file_name());
        let thumb_path = args.out_dir.join(result.thumbnail_file_name());
        tokio::fs::write(&output_path, &result.resized)
            .await
            .with_context(|| format!("failed to write {}", output_path.display()))?;
        tokio::fs::write(&thumb_path, &result.thumbnail)
            .await
            .with_context(|| format!("failed to write {}", thumb_path.display()))?;
        println!(
            "{} -> {} ({}x{}, {} -> {} bytes)",
            result.source_name,
            output_path.display(),
            result.width,
            result.height,
            result.original_bytes,
            result.resized.len()
        );
    }

    queue.shutdown().await;

    if failed > 0 || skipped > 0 {
        eprintln!("{} failed, {} skipped", failed, skipped);
        std::process::exit(1);
    }
    Ok(())
}
