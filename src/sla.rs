//! SLA evaluator (§4.7): a pure function comparing an `Aggregate`
//! snapshot against a set of optional thresholds, producing a `Verdict`.
//! Carries no state and performs no I/O — every caller (load-test exit
//! code, stress-phase breach check) shares this one implementation.

use crate::config::{ScenarioConfig, StressConfig};
use crate::domain::{Aggregate, Verdict, Violation};

/// The thresholds an `Aggregate` is judged against. All four are
/// optional because a load test's `ScenarioConfig` may configure none,
/// some, or all of them (§6); a stress test's `StressConfig` always
/// configures all four.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Thresholds {
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
    pub error_rate_pct: Option<f64>,
    pub timeout_rate_pct: Option<f64>,
}

impl From<&ScenarioConfig> for Thresholds {
    fn from(config: &ScenarioConfig) -> Self {
        Self {
            p95_ms: config.sla_p95_ms,
            p99_ms: config.sla_p99_ms,
            error_rate_pct: config.sla_error_rate_pct,
            timeout_rate_pct: None,
        }
    }
}

impl From<&StressConfig> for Thresholds {
    fn from(config: &StressConfig) -> Self {
        Self {
            p95_ms: Some(config.sla_p95_ms),
            p99_ms: Some(config.sla_p99_ms),
            error_rate_pct: Some(config.sla_error_rate_pct),
            timeout_rate_pct: Some(config.sla_timeout_rate_pct),
        }
    }
}

/// Compare `aggregate` against `thresholds` and report every breach
/// (§4.7). A threshold left unset by the caller is never checked —
/// absence is "not configured", not "pass at zero".
#[must_use]
pub fn evaluate(aggregate: &Aggregate, thresholds: &Thresholds) -> Verdict {
    let mut violations = Vec::new();

    check(
        thresholds.p95_ms,
        aggregate.p95_latency_ms,
        "p95_ms",
        &mut violations,
    );
    check(
        thresholds.p99_ms,
        aggregate.p99_latency_ms,
        "p99_ms",
        &mut violations,
    );
    check(
        thresholds.error_rate_pct,
        aggregate.error_rate_pct,
        "error_rate_pct",
        &mut violations,
    );
    check(
        thresholds.timeout_rate_pct,
        aggregate.timeout_rate_pct,
        "timeout_rate_pct",
        &mut violations,
    );

    if violations.is_empty() {
        Verdict::passing()
    } else {
        Verdict {
            pass: false,
            violations,
        }
    }
}

fn check(threshold: Option<f64>, observed: f64, metric_name: &str, violations: &mut Vec<Violation>) {
    if let Some(threshold) = threshold {
        if observed > threshold {
            violations.push(Violation {
                metric_name: metric_name.to_owned(),
                observed,
                threshold,
            });
        }
    }
}
