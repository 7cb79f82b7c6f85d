//! Script loading and flag overrides.
use crate::args::RunArgs;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use stampede::model::{
    default_checks, Check, CheckOptions, ConfigError, LoadProfile, ProfileOptions,
    RequestOptions, RequestSpec, RunOptions, ScriptOptions,
};
use std::path::Path;

/// A load test script as written on disk.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    #[serde(default)]
    pub request: RequestOptions,
    #[serde(default)]
    pub checks: Vec<CheckOptions>,
    #[serde(default)]
    pub options: ScriptOptions,
}

impl Script {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse script {}", path.display()))
    }

    /// Apply command line overrides on top of the script.
    pub fn with_overrides(mut self, args: &RunArgs) -> Self {
        if let Some(url) = &args.url {
            self.request.url = Some(url.clone());
        }
        if let Some(method) = &args.method {
            self.request.method = Some(method.clone());
        }
        for (name, value) in &args.headers {
            self.request.headers.insert(name.clone(), value.clone());
        }

        let options = &mut self.options;
        if !args.stages.is_empty() {
            options.profile = ProfileOptions {
                vus: args.vus,
                duration: args.duration.clone(),
                stages: Some(args.stages.clone()),
            };
        } else if args.vus.is_some() || args.duration.is_some() {
            // Constant profile flags replace whatever profile the script declared.
            options.profile.stages = None;
            if args.vus.is_some() {
                options.profile.vus = args.vus;
            }
            if args.duration.is_some() {
                options.profile.duration = args.duration.clone();
            }
        }

        if args.sleep.is_some() {
            options.sleep = args.sleep.clone();
        }
        if args.max_rps.is_some() {
            options.max_rps = args.max_rps;
        }
        if args.timeout.is_some() {
            options.timeout = args.timeout.clone();
        }
        if let Some(ramp) = args.ramp {
            options.ramp = Some(ramp.into());
        }
        self
    }

    pub fn plan(&self) -> Result<Plan, ConfigError> {
        let checks = if self.checks.is_empty() {
            default_checks()
        } else {
            self.checks
                .iter()
                .map(Check::try_from)
                .collect::<Result<_, _>>()?
        };

        Ok(Plan {
            profile: LoadProfile::try_from(&self.options.profile)?,
            spec: RequestSpec::try_from(&self.request)?,
            checks,
            options: RunOptions::try_from(&self.options)?,
        })
    }
}

/// Everything needed to start a run, fully validated.
#[derive(Clone, Debug, PartialEq)]
pub struct Plan {
    pub profile: LoadProfile,
    pub spec: RequestSpec,
    pub checks: Vec<Check>,
    pub options: RunOptions,
}
