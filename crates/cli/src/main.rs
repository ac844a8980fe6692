use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

use bucketvis_aws::{AwsProvider, DEFAULT_REGION};
use bucketvis_core::{parse_bucket_list, parse_switch, BucketId};

mod report;
use report::{Report, Status};

#[derive(Parser, Debug)]
#[command(
    name = "check-s3-bucket-visibility",
    author,
    version,
    about = "Alerts when S3 buckets are exposed via website hosting or a bucket policy granting Get/List"
)]
struct Cli {
    /// A comma separated list of S3 buckets to check
    #[arg(short = 'b', long, value_name = "BUCKET_NAMES")]
    bucket_names: Option<String>,

    /// AWS region (defaults to us-east-1)
    #[arg(short = 'r', long, value_name = "REGION")]
    aws_region: Option<String>,

    /// Fail with CRITICAL rather than WARNING when a bucket is not found
    #[arg(short = 'm', long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    critical_on_missing: Option<String>,

    /// YAML config file; command line values take precedence
    #[arg(short = 'f', long)]
    file: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[derive(Deserialize, Debug, Default)]
struct CheckFile {
    #[serde(default)] bucket_names: Option<BucketNames>,
    #[serde(default)] aws_region: Option<String>,
    #[serde(default)] critical_on_missing: Option<bool>,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum BucketNames { List(Vec<String>), Joined(String) }

impl BucketNames {
    fn resolve(&self) -> Vec<BucketId> {
        match self {
            BucketNames::Joined(s) => parse_bucket_list(s),
            BucketNames::List(v) => v.iter().flat_map(|s| parse_bucket_list(s)).collect(),
        }
    }
}

#[derive(Debug, PartialEq)]
struct Settings { buckets: Vec<BucketId>, region: String, critical_on_missing: bool }

fn load_file(path: &Path) -> Result<CheckFile> {
    let raw = std::fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    serde_yaml::from_slice(&raw).with_context(|| format!("parse config {}", path.display()))
}

fn settings(cli: &Cli) -> Result<Settings> {
    let file = match &cli.file {
        Some(p) => load_file(p)?,
        None => CheckFile::default(),
    };
    let buckets = match (&cli.bucket_names, &file.bucket_names) {
        (Some(raw), _) => parse_bucket_list(raw),
        (None, Some(names)) => names.resolve(),
        (None, None) => anyhow::bail!("no buckets given; pass --bucket-names"),
    };
    if buckets.is_empty() {
        anyhow::bail!("bucket list is empty");
    }
    let region = cli.aws_region.clone()
        .or(file.aws_region)
        .unwrap_or_else(|| DEFAULT_REGION.to_string());
    let critical_on_missing = match &cli.critical_on_missing {
        Some(v) => parse_switch(v),
        None => file.critical_on_missing.unwrap_or(false),
    };
    Ok(Settings { buckets, region, critical_on_missing })
}

async fn run(cli: &Cli) -> Result<Report> {
    let s = settings(cli)?;
    tracing::debug!(buckets = s.buckets.len(), region = %s.region, critical_on_missing = s.critical_on_missing, "settings resolved");
    let store = AwsProvider::new(s.region).connect().await;
    let outcome = bucketvis_core::aggregate(&store, &s.buckets, s.critical_on_missing).await?;
    Ok(outcome.into())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            return Report { status: Status::Unknown, message: "invalid arguments".into() }.emit();
        }
    };
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .json()
        .with_span_events(FmtSpan::CLOSE)
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli).await {
        Ok(report) => report.emit(),
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "check aborted");
            Report::unknown(&e).emit()
        }
    }
}
