//! Threshold rules over the correlation matrix.
//!
//! Rules are evaluated in declaration order and every rule is checked, so the
//! output order follows the rule list rather than the order findings appear.
//! A rule whose pair is undefined (or absent from the matrix) does not fire.

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    correlation::{Coefficient, CorrelationMatrix},
    schema::{
        HRV, INJURY_RISK_SCORE, PERCEIVED_STRESS, PERFORMANCE_SCORE, RESTING_HEART_RATE,
        SLEEP_HOURS, TRAINING_HOURS,
    },
};

pub const DEFAULT_POSITIVE_THRESHOLD: f64 = 0.3;
pub const DEFAULT_NEGATIVE_THRESHOLD: f64 = -0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Positive,
    Warning,
}

impl Severity {
    pub fn marker(&self) -> &'static str {
        match self {
            Severity::Positive => "✅",
            Severity::Warning => "⚠️",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Positive => write!(f, "positive"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    GreaterThan,
    LessThan,
}

impl Comparison {
    pub fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::GreaterThan => value > threshold,
            Comparison::LessThan => value < threshold,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Comparison::GreaterThan => ">",
            Comparison::LessThan => "<",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightRule {
    pub name: &'static str,
    pub columns: (&'static str, &'static str),
    pub comparison: Comparison,
    pub threshold: f64,
    pub severity: Severity,
    pub message: &'static str,
}

impl InsightRule {
    /// `Some(true)` when the rule fires, `None` when its pair is undefined.
    pub fn evaluate(&self, matrix: &CorrelationMatrix) -> Option<bool> {
        let (a, b) = self.columns;
        match matrix.get(a, b) {
            Some(Coefficient::Defined(value)) => Some(self.comparison.holds(value, self.threshold)),
            Some(Coefficient::Undefined) | None => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Insight {
    pub rule: &'static str,
    pub severity: Severity,
    pub text: String,
}

impl fmt::Display for Insight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.severity.marker(), self.text)
    }
}

/// The five athlete rules in evaluation order.
pub fn default_rules(positive_threshold: f64, negative_threshold: f64) -> Vec<InsightRule> {
    vec![
        InsightRule {
            name: "sleep_performance",
            columns: (SLEEP_HOURS, PERFORMANCE_SCORE),
            comparison: Comparison::GreaterThan,
            threshold: positive_threshold,
            severity: Severity::Positive,
            message: "Athletes with more sleep hours tend to have better performance. Encourage 7–9 hours of sleep.",
        },
        InsightRule {
            name: "training_performance",
            columns: (TRAINING_HOURS, PERFORMANCE_SCORE),
            comparison: Comparison::GreaterThan,
            threshold: positive_threshold,
            severity: Severity::Positive,
            message: "More training hours are generally associated with better performance. Monitor for overtraining.",
        },
        InsightRule {
            name: "stress_performance",
            columns: (PERCEIVED_STRESS, PERFORMANCE_SCORE),
            comparison: Comparison::LessThan,
            threshold: negative_threshold,
            severity: Severity::Warning,
            message: "High perceived stress correlates with lower performance. Recommend stress reduction strategies.",
        },
        InsightRule {
            name: "hrv_injury_risk",
            columns: (HRV, INJURY_RISK_SCORE),
            comparison: Comparison::LessThan,
            threshold: negative_threshold,
            severity: Severity::Warning,
            message: "Lower HRV is associated with higher injury risk. Use HRV as an early warning metric.",
        },
        InsightRule {
            name: "resting_heart_rate_injury_risk",
            columns: (RESTING_HEART_RATE, INJURY_RISK_SCORE),
            comparison: Comparison::GreaterThan,
            threshold: positive_threshold,
            severity: Severity::Warning,
            message: "Higher resting heart rate may indicate higher injury risk. Monitor recovery readiness.",
        },
    ]
}

pub fn evaluate_rules(matrix: &CorrelationMatrix, rules: &[InsightRule]) -> Vec<Insight> {
    let mut insights = Vec::new();
    for rule in rules {
        match rule.evaluate(matrix) {
            Some(true) => insights.push(Insight {
                rule: rule.name,
                severity: rule.severity,
                text: rule.message.to_string(),
            }),
            Some(false) => debug!(
                "Rule '{}' did not fire (threshold {} {})",
                rule.name,
                rule.comparison.symbol(),
                rule.threshold
            ),
            None => debug!(
                "Rule '{}' skipped: corr({}, {}) is undefined",
                rule.name, rule.columns.0, rule.columns.1
            ),
        }
    }
    insights
}
