use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use stampede::model::{RampPolicy, StageOptions};

#[derive(Parser, Debug)]
#[command(version, about = "Concurrent HTTP load generator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a load test.
    Run(RunArgs),
    /// Validate a script and the given overrides without sending any request.
    Validate(RunArgs),
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// YAML script describing the request, checks and load options.
    pub script: Option<PathBuf>,

    /// Target url, overrides `request.url`.
    #[arg(short, long)]
    pub url: Option<String>,

    /// HTTP method, overrides `request.method`.
    #[arg(short = 'X', long)]
    pub method: Option<String>,

    /// Extra request header as `name:value`. Repeatable.
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Number of virtual users for a constant profile.
    #[arg(long, allow_negative_numbers = true)]
    pub vus: Option<i64>,

    /// Duration of a constant profile, e.g. `30s` or `3m`.
    #[arg(short, long)]
    pub duration: Option<String>,

    /// Ramp stage as `DURATION:TARGET`, e.g. `30s:1000`. Repeatable; replaces the profile.
    #[arg(short, long = "stage", value_parser = parse_stage)]
    pub stages: Vec<StageOptions>,

    /// Pause between iterations of each virtual user.
    #[arg(long)]
    pub sleep: Option<String>,

    /// Cap on requests per second across all virtual users.
    #[arg(long, allow_negative_numbers = true)]
    pub max_rps: Option<i64>,

    /// Per-request timeout.
    #[arg(long)]
    pub timeout: Option<String>,

    #[arg(long, value_enum)]
    pub ramp: Option<Ramp>,

    /// Print the summary as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum Ramp {
    Linear,
    Immediate,
}

impl From<Ramp> for RampPolicy {
    fn from(ramp: Ramp) -> Self {
        match ramp {
            Ramp::Linear => RampPolicy::Linear,
            Ramp::Immediate => RampPolicy::Immediate,
        }
    }
}

fn parse_stage(value: &str) -> Result<StageOptions, String> {
    let (duration, target) = value
        .rsplit_once(':')
        .ok_or_else(|| format!("expected DURATION:TARGET, got `{value}`"))?;
    let target = target
        .trim()
        .parse()
        .map_err(|err| format!("invalid stage target `{target}`: {err}"))?;

    Ok(StageOptions {
        duration: duration.trim().to_string(),
        target,
    })
}

fn parse_header(value: &str) -> Result<(String, String), String> {
    let (name, value) = value
        .split_once(':')
        .ok_or_else(|| format!("expected NAME:VALUE, got `{value}`"))?;
    Ok((name.trim().to_string(), value.trim().to_string()))
}
