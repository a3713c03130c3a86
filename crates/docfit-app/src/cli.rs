// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line arguments.

use std::path::{Path, PathBuf};

use clap::Parser;

use docfit_core::{Dimensions, Requirement};

/// Make a photo, signature or scan fit an upload portal's requirements.
#[derive(Debug, Parser)]
#[command(name = "docfit", version, about)]
pub struct Cli {
    /// Image or document to transform.
    pub input: PathBuf,

    /// Required format, as the portal words it ("jpg only", "PDF", "image/png").
    /// Keeps the input format when omitted.
    #[arg(short, long)]
    pub format: Option<String>,

    /// Maximum file size: plain bytes, or with a unit ("200KB", "1.5MB").
    #[arg(short = 's', long, value_parser = parse_size)]
    pub max_size: u64,

    /// Exact pixel size the portal requires, e.g. 600x800.
    #[arg(short, long)]
    pub dimensions: Option<Dimensions>,

    /// What the upload is ("photograph", "signature", "caste certificate").
    #[arg(short = 't', long, default_value = "document")]
    pub document_type: String,

    /// Base name for the output file, instead of the document type.
    #[arg(short, long)]
    pub name: Option<String>,

    /// Where to write the result. Defaults to the input's directory.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// JSON pipeline configuration.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Accept a result that needs a mandatory quality review.
    #[arg(long)]
    pub accept_review: bool,

    /// Write the transformation record as JSON to this path.
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl Cli {
    pub fn requirement(&self) -> Requirement {
        let mut requirement = Requirement::new(self.document_type.clone(), self.max_size);
        requirement.target_format = self.format.clone();
        requirement.target_dimensions = self.dimensions;
        requirement
    }

    /// Destination for an artifact named `display_name`.
    ///
    /// Without `--output` the result lands beside the input, and never on
    /// top of it: a clashing name gets a `-1` suffix.
    pub fn output_path(&self, display_name: &str) -> PathBuf {
        match &self.output {
            Some(path) if path.is_dir() => path.join(display_name),
            Some(path) => path.clone(),
            None => {
                let dir = self.input.parent().unwrap_or_else(|| Path::new("."));
                let path = dir.join(display_name);
                if path == self.input {
                    dir.join(suffixed(display_name))
                } else {
                    path
                }
            }
        }
    }
}

/// `photograph.jpg` -> `photograph-1.jpg`.
fn suffixed(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}-1.{ext}"),
        _ => format!("{name}-1"),
    }
}

/// Parse a size limit the way portals state them. Units are binary
/// (1 KB = 1024 bytes).
pub fn parse_size(text: &str) -> Result<u64, String> {
    let trimmed = text.trim();
    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);
    let value: f64 = number
        .parse()
        .map_err(|_| format!("'{text}' is not a size; try 200KB, 1.5MB or 51200"))?;
    let multiplier = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" | "bytes" => 1.0,
        "k" | "kb" | "kib" => 1024.0,
        "m" | "mb" | "mib" => 1024.0 * 1024.0,
        other => return Err(format!("unknown size unit '{other}'; use B, KB or MB")),
    };
    let bytes = (value * multiplier).floor();
    if bytes < 1.0 {
        return Err(format!("size '{text}' must be at least one byte"));
    }
    Ok(bytes as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_with_units() {
        assert_eq!(parse_size("200KB"), Ok(204_800));
        assert_eq!(parse_size("200 kb"), Ok(204_800));
        assert_eq!(parse_size("1.5MB"), Ok(1_572_864));
        assert_eq!(parse_size("51200"), Ok(51_200));
        assert_eq!(parse_size("20k"), Ok(20_480));
        assert_eq!(parse_size("300 bytes"), Ok(300));
    }

    #[test]
    fn bad_sizes() {
        assert!(parse_size("").is_err());
        assert!(parse_size("KB").is_err());
        assert!(parse_size("12GB").is_err());
        assert!(parse_size("0").is_err());
        assert!(parse_size("0.0001KB").is_err());
    }

    #[test]
    fn parses_full_command_line() {
        let cli = Cli::try_parse_from([
            "docfit",
            "scan.png",
            "--format",
            "pdf",
            "--max-size",
            "200KB",
            "--dimensions",
            "600x800",
            "--document-type",
            "Caste Certificate",
            "--accept-review",
        ])
        .unwrap();

        let requirement = cli.requirement();
        assert_eq!(requirement.max_size_bytes, 204_800);
        assert_eq!(requirement.target_format.as_deref(), Some("pdf"));
        assert_eq!(requirement.target_dimensions, Some(Dimensions::new(600, 800)));
        assert_eq!(requirement.document_type, "Caste Certificate");
        assert!(cli.accept_review);
        assert_eq!(cli.output_path("caste-certificate.pdf"), PathBuf::from("caste-certificate.pdf"));
    }

    #[test]
    fn max_size_is_required() {
        assert!(Cli::try_parse_from(["docfit", "photo.jpg"]).is_err());
    }

    #[test]
    fn explicit_output_file_wins() {
        let cli = Cli::try_parse_from(["docfit", "in/photo.jpg", "-s", "50KB", "-o", "out.jpg"]).unwrap();
        assert_eq!(cli.output_path("photo.jpg"), PathBuf::from("out.jpg"));
        let cli = Cli::try_parse_from(["docfit", "in/photo.jpg", "-s", "50KB", "-o", "in/photo.jpg"]).unwrap();
        assert_eq!(cli.output_path("photo.jpg"), PathBuf::from("in/photo.jpg"));
    }

    #[test]
    fn default_output_never_replaces_input() {
        let cli = Cli::try_parse_from([
            "docfit",
            "uploads/photograph.jpg",
            "-s",
            "50KB",
            "-t",
            "photograph",
        ])
        .unwrap();
        let out = cli.output_path("photograph.jpg");
        assert_ne!(out, cli.input);
        assert_eq!(out, PathBuf::from("uploads/photograph-1.jpg"));
        assert_eq!(cli.output_path("photograph.pdf"), PathBuf::from("uploads/photograph.pdf"));

        let cli = Cli::try_parse_from(["docfit", "photo", "-s", "50KB"]).unwrap();
        assert_eq!(cli.output_path("photo"), PathBuf::from("photo-1"));
    }
}
