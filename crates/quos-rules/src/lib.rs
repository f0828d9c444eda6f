//! Rule-evaluation semantics: the comparison table that turns a metric
//! sample into a verdict, and the message attached to the incident a
//! violated rule opens.
//!
//! Evaluation is pure in `(operator, threshold, value)` — no clock, no
//! storage — so the whole contract is testable as a table. Thresholds are
//! stored as fixed-point NUMERIC(12,2) and converted to f64 before they
//! reach this crate; comparison happens in 64-bit floating point.

use quos_common::types::{CompareOp, MetricType};

/// True when `value` violates a rule with the given operator and threshold.
pub fn violated(op: CompareOp, value: f64, threshold: f64) -> bool {
    match op {
        CompareOp::GreaterThan => value > threshold,
        CompareOp::GreaterEqual => value >= threshold,
        CompareOp::LessThan => value < threshold,
        CompareOp::LessEqual => value <= threshold,
        CompareOp::Equal => value == threshold,
        CompareOp::NotEqual => value != threshold,
    }
}

/// Message recorded on an incident opened by a rule violation.
pub fn violation_message(
    metric_type: MetricType,
    value: f64,
    threshold: f64,
    op: CompareOp,
) -> String {
    format!("{metric_type} threshold exceeded: {value:.2} (threshold: {threshold:.2}, operator: {op})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluation_table() {
        let threshold = 100.0;
        let cases = [
            (CompareOp::GreaterThan, 150.0, true),
            (CompareOp::GreaterThan, 50.0, false),
            (CompareOp::GreaterEqual, 100.0, true),
            (CompareOp::LessThan, 50.0, true),
            (CompareOp::LessEqual, 100.0, true),
            (CompareOp::Equal, 100.0, true),
            (CompareOp::NotEqual, 100.0, false),
        ];
        for (op, value, expected) in cases {
            assert_eq!(
                violated(op, value, threshold),
                expected,
                "op={op} value={value}"
            );
        }
    }

    #[test]
    fn value_equal_to_threshold_only_fires_inclusive_operators() {
        let threshold = 100.0;
        let value = 100.0;
        assert!(violated(CompareOp::GreaterEqual, value, threshold));
        assert!(violated(CompareOp::LessEqual, value, threshold));
        assert!(violated(CompareOp::Equal, value, threshold));
        assert!(!violated(CompareOp::GreaterThan, value, threshold));
        assert!(!violated(CompareOp::LessThan, value, threshold));
        assert!(!violated(CompareOp::NotEqual, value, threshold));
    }

    #[test]
    fn evaluation_is_deterministic() {
        for _ in 0..3 {
            assert!(violated(CompareOp::GreaterThan, 150.0, 100.0));
            assert!(!violated(CompareOp::GreaterThan, 99.99, 100.0));
        }
    }

    #[test]
    fn message_includes_value_threshold_and_operator() {
        let msg = violation_message(MetricType::LatencyMs, 150.0, 100.0, CompareOp::GreaterThan);
        assert_eq!(
            msg,
            "LATENCY_MS threshold exceeded: 150.00 (threshold: 100.00, operator: >)"
        );
    }
}
