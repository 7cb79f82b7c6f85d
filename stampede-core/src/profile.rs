use crate::{ConfigError, RAMP_TICK};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One segment of a staged profile: move towards `target` virtual users over `duration`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Stage {
    pub duration: Duration,
    pub target: usize,
}

impl Stage {
    pub fn new(duration: Duration, target: usize) -> Self {
        Self { duration, target }
    }
}

/// How the virtual user count moves between stage targets.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RampPolicy {
    /// Interpolate from the previous target over the stage duration.
    #[default]
    Linear,
    /// Jump to the stage target as soon as the stage begins.
    Immediate,
}

/// The shape of the load over time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadProfile {
    Constant {
        virtual_users: usize,
        duration: Duration,
    },
    Staged {
        stages: Vec<Stage>,
    },
}

impl LoadProfile {
    pub fn constant(virtual_users: usize, duration: Duration) -> Self {
        Self::Constant {
            virtual_users,
            duration,
        }
    }

    pub fn staged(stages: Vec<Stage>) -> Self {
        Self::Staged { stages }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Constant { .. } => Ok(()),
            Self::Staged { stages } if stages.is_empty() => Err(ConfigError::EmptyStages),
            Self::Staged { .. } => Ok(()),
        }
    }

    /// Length of the run's active window. Saturates at `Duration::MAX`.
    pub fn total_duration(&self) -> Duration {
        match self {
            Self::Constant { duration, .. } => *duration,
            Self::Staged { stages } => stages
                .iter()
                .fold(Duration::ZERO, |total, s| total.saturating_add(s.duration)),
        }
    }

    /// Highest virtual user count the profile ever asks for.
    pub fn max_virtual_users(&self) -> usize {
        match self {
            Self::Constant { virtual_users, .. } => *virtual_users,
            Self::Staged { stages } => stages.iter().map(|s| s.target).max().unwrap_or(0),
        }
    }

    /// Index of the stage active at `elapsed`, or `None` for constant profiles and once the
    /// profile has run out.
    pub fn stage_at(&self, elapsed: Duration) -> Option<usize> {
        match self {
            Self::Constant { .. } => None,
            Self::Staged { stages } => locate(stages, elapsed).map(|(idx, ..)| idx),
        }
    }

    /// Number of virtual users that should be live at `elapsed`.
    pub fn target_at(&self, elapsed: Duration, ramp: RampPolicy) -> usize {
        match self {
            Self::Constant { virtual_users, .. } => *virtual_users,
            Self::Staged { stages } => {
                let Some((idx, stage_start, from)) = locate(stages, elapsed) else {
                    return stages.last().map(|s| s.target).unwrap_or(0);
                };
                let stage = stages[idx];

                match ramp {
                    RampPolicy::Immediate => stage.target,
                    RampPolicy::Linear => {
                        let frac = (elapsed - stage_start).as_secs_f64()
                            / stage.duration.as_secs_f64();
                        let value =
                            from as f64 + (stage.target as f64 - from as f64) * frac.min(1.);
                        let (low, high) = (from.min(stage.target), from.max(stage.target));
                        (value.round() as usize).clamp(low, high)
                    }
                }
            }
        }
    }

    /// Offset (from the start of the run) at which the target may next change. Always strictly
    /// greater than `elapsed` while the run is active.
    pub fn next_change(&self, elapsed: Duration, ramp: RampPolicy) -> Duration {
        match self {
            Self::Constant { duration, .. } => *duration,
            Self::Staged { stages } => {
                let Some((idx, stage_start, from)) = locate(stages, elapsed) else {
                    return self.total_duration();
                };
                let stage = stages[idx];
                let stage_end = stage_start.saturating_add(stage.duration);

                if ramp == RampPolicy::Linear && stage.target != from {
                    elapsed.saturating_add(RAMP_TICK).min(stage_end)
                } else {
                    stage_end
                }
            }
        }
    }
}

/// Find the stage containing `elapsed`: `(index, stage start offset, previous stage target)`.
fn locate(stages: &[Stage], elapsed: Duration) -> Option<(usize, Duration, usize)> {
    let mut start = Duration::ZERO;
    let mut from = 0;
    for (idx, stage) in stages.iter().enumerate() {
        let end = start.saturating_add(stage.duration);
        if elapsed < end {
            return Some((idx, start, from));
        }
        start = end;
        from = stage.target;
    }
    None
}
