//! Achievement & health evaluator.
//!
//! Derives the achievement rate and the coarse health signal from the
//! monthly target and the live sum of active recurring donations.

use serde::Serialize;

use crate::target::resolve_monthly_target;
use crate::types::{Money, Project, ProjectAlerts};

/// Coarse classification of the achievement rate against the owner's
/// thresholds.
///
/// `Ok` is the implicit band between the warning threshold and 100%: the
/// project is neither flagged nor fully funded, and no alert is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthSignal {
    Reached,
    Ok,
    Warning,
    Critical,
}

/// Evaluation result surfaced on project views.
///
/// `signal` is `None` when the project has no target: the UI hides every
/// achievement display rather than rendering "0%". `reached` is the binary
/// navigation mark (`current >= target`, only meaningful with a target).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Achievement {
    pub rate: u32,
    pub signal: Option<HealthSignal>,
    pub reached: bool,
}

/// Evaluate `current_monthly` against `target`.
///
/// Never divides by zero: a zero (or negative) target yields rate 0 and no
/// signal regardless of the current total.
pub fn evaluate(target: Money, current_monthly: Money, alerts: &ProjectAlerts) -> Achievement {
    if target <= 0 {
        return Achievement {
            rate: 0,
            signal: None,
            reached: false,
        };
    }

    let rate = rate_percent(target, current_monthly);
    let reached = current_monthly >= target;
    let signal = if reached || rate >= 100 {
        HealthSignal::Reached
    } else if rate < alerts.critical_threshold as u32 {
        HealthSignal::Critical
    } else if rate < alerts.warning_threshold as u32 {
        HealthSignal::Warning
    } else {
        HealthSignal::Ok
    };

    Achievement {
        rate,
        signal: Some(signal),
        reached,
    }
}

/// Evaluate a project, recomputing the target from its current pledge
/// inputs rather than trusting the persisted cache.
pub fn evaluate_for_project(project: &Project, current_monthly: Money) -> Achievement {
    evaluate(
        resolve_monthly_target(&project.pledge),
        current_monthly,
        &project.alerts_or_default(),
    )
}

/// Integer achievement percentage, rounded half-up. `target` must be > 0.
fn rate_percent(target: Money, current: Money) -> u32 {
    if current <= 0 {
        return 0;
    }
    let scaled = (current as i128 * 100 + target as i128 / 2) / target as i128;
    scaled.min(u32::MAX as i128) as u32
}
