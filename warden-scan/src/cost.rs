//! Static monthly cost table used for savings estimation.
//!
//! Built once per process; unknown size classes contribute zero.

use std::collections::HashMap;
use std::sync::OnceLock;

fn cost_table() -> &'static HashMap<&'static str, f64> {
    static TABLE: OnceLock<HashMap<&'static str, f64>> = OnceLock::new();
    TABLE.get_or_init(|| {
        HashMap::from([
            ("t3.nano", 4.38),
            ("t3.micro", 8.76),
            ("t3.small", 17.52),
            ("t3.medium", 35.04),
            ("t3.large", 70.08),
            ("t3.xlarge", 140.16),
            ("t3.2xlarge", 280.32),
            ("m5.large", 70.08),
            ("m5.xlarge", 140.16),
            ("m5.2xlarge", 280.32),
            ("db.t3.micro", 12.41),
            ("db.t3.small", 24.82),
            ("db.t3.medium", 49.64),
            ("db.m5.large", 124.83),
        ])
    })
}

/// Returns the estimated monthly cost for a resource size class, or zero for
/// classes outside the table.
#[must_use]
pub fn monthly_cost(size_class: &str) -> f64 {
    cost_table().get(size_class).copied().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_classes_resolve() {
        assert!((monthly_cost("t3.micro") - 8.76).abs() < f64::EPSILON);
        assert!((monthly_cost("t3.small") - 17.52).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_classes_contribute_zero() {
        assert!(monthly_cost("quantum.9xlarge").abs() < f64::EPSILON);
    }
}
