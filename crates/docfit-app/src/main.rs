// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Docfit — command-line front end.
//
// Reads one file, runs it through the transformation pipeline, and writes the
// result next to it (or to --output). Exit status: 0 ready, 1 failed,
// 2 mandatory review pending (the preview is still written).

mod cli;

use std::path::Path;
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::Parser;
use tracing::{info, warn};

use docfit_core::error::{DocfitError, Result};
use docfit_core::human_errors::{format_size, humanize_error};
use docfit_core::{Artifact, MediaType, PipelineConfig, TransformOutcome, TransformationRecord};
use docfit_pipeline::Transformer;

use cli::Cli;

const EXIT_FAILED: u8 = 1;
const EXIT_REVIEW_REQUIRED: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli).await {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            ExitCode::from(EXIT_FAILED)
        }
    }
}

async fn run(cli: &Cli) -> Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    let transformer = Transformer::new(config)?;
    let artifact = load_artifact(&cli.input).await?;
    let input_digest = artifact.digest();
    info!(
        input = %cli.input.display(),
        media_type = %artifact.media_type(),
        size = artifact.size_bytes(),
        "Loaded input"
    );

    let requirement = cli.requirement();
    let outcome = transformer
        .transform(artifact, &requirement, cli.name.as_deref())
        .await;

    if let Some(path) = &cli.report {
        write_report(path, outcome.record()).await?;
    }

    match outcome {
        TransformOutcome::Ready { artifact, record } => {
            if cli.output.is_none() && artifact.digest() == input_digest {
                println!("Ready: {} already meets the requirement", cli.input.display());
                return Ok(ExitCode::SUCCESS);
            }
            let path = cli.output_path(artifact.display_name());
            write_output(&path, &artifact).await?;
            println!(
                "Ready: {} ({}, limit {})",
                path.display(),
                format_size(artifact.size_bytes()),
                format_size(record.max_size_bytes)
            );
            for warning in &record.warnings {
                println!("  note: {warning}");
            }
            Ok(ExitCode::SUCCESS)
        }
        TransformOutcome::NeedsReview { disclosure, .. } => {
            let path = cli.output_path(disclosure.preview.display_name());
            write_output(&path, &disclosure.preview).await?;
            println!("Review: {}", path.display());
            println!("  {}", disclosure.message);
            if disclosure.mandatory_review() && !cli.accept_review {
                println!("  Open the file and check it, then rerun with --accept-review to accept it.");
                Ok(ExitCode::from(EXIT_REVIEW_REQUIRED))
            } else {
                warn!(quality = disclosure.quality_percent, "Accepted a reduced-quality result");
                Ok(ExitCode::SUCCESS)
            }
        }
        TransformOutcome::Failed(failure) => {
            report_error(&failure.error);
            Ok(ExitCode::from(EXIT_FAILED))
        }
    }
}

async fn load_artifact(path: &Path) -> Result<Artifact> {
    let bytes = tokio::fs::read(path).await?;
    let modified: DateTime<Utc> = tokio::fs::metadata(path)
        .await?
        .modified()
        .map(DateTime::from)
        .unwrap_or_else(|_| Utc::now());
    let media_type = MediaType::sniff(&bytes)
        .or_else(|| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .and_then(MediaType::from_extension)
        })
        .ok_or_else(|| {
            DocfitError::UnsupportedFormat(format!(
                "{} is not a JPEG, PNG, WebP or PDF file",
                path.display()
            ))
        })?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());
    Ok(Artifact::with_timestamp(bytes, media_type, name, modified))
}

async fn write_output(path: &Path, artifact: &Artifact) -> Result<()> {
    tokio::fs::write(path, artifact.bytes()).await?;
    info!(path = %path.display(), size = artifact.size_bytes(), "Wrote output");
    Ok(())
}

async fn write_report(path: &Path, record: &TransformationRecord) -> Result<()> {
    let json = serde_json::to_string_pretty(record)?;
    tokio::fs::write(path, json).await?;
    info!(path = %path.display(), "Wrote transformation record");
    Ok(())
}

fn report_error(err: &DocfitError) {
    let human = humanize_error(err);
    eprintln!("Failed: {}", human.message);
    eprintln!("  {}", human.suggestion);
}
