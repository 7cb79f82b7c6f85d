use anyhow::Context;
use clap::Parser;
use stampede::prelude::*;
use std::process::ExitCode;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::EnvFilter;

mod args;
mod script;

use args::{Cli, Command, RunArgs};
use script::{Plan, Script};

#[tokio::main]
async fn main() -> ExitCode {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stampede=info")),
        )
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("failed to install the tracing subscriber");
    }

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Run(args) => run(args).await,
        Command::Validate(args) => plan(&args).map(|plan| {
            println!(
                "ok: {} {} for {}",
                plan.spec.method,
                plan.spec.url,
                humantime::format_duration(plan.profile.total_duration())
            );
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

/// 2 for configuration rejected by validation, 1 for anything else.
fn exit_code(err: &anyhow::Error) -> u8 {
    if err.downcast_ref::<ConfigError>().is_some() {
        2
    } else {
        1
    }
}

fn plan(args: &RunArgs) -> anyhow::Result<Plan> {
    let script = match &args.script {
        Some(path) => Script::load(path)?,
        None => Script::default(),
    };
    Ok(script.with_overrides(args).plan()?)
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let Plan {
        profile,
        spec,
        checks,
        options,
    } = plan(&args)?;

    let client = ReqwestClient::new(options.timeout).context("failed to build the http client")?;
    let mut handle = LoadRunner::new(client)
        .checks(checks)
        .options(options)
        .start(profile, spec)?;

    let finished = tokio::select! {
        summary = handle.wait() => Some(summary),
        _ = tokio::signal::ctrl_c() => None,
    };
    let summary = match finished {
        Some(summary) => summary,
        None => {
            warn!("Interrupted, waiting for in-flight requests");
            handle.stop().await
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{summary}");
    }
    Ok(())
}
