use proptest::prelude::*;
use remedy_model::{ErrorSeverity, ImpactSeverity};

proptest! {
    #[test]
    fn prop_severity_is_monotonic(a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(ErrorSeverity::from_score(hi).rank() >= ErrorSeverity::from_score(lo).rank());
    }

    #[test]
    fn prop_scores_below_threshold_are_unknown(score in -10.0f64..0.2) {
        prop_assert_eq!(ErrorSeverity::from_score(score), ErrorSeverity::Unknown);
    }

    #[test]
    fn prop_scores_at_or_above_point_eight_are_critical(score in 0.8f64..100.0) {
        prop_assert_eq!(ErrorSeverity::from_score(score), ErrorSeverity::Critical);
    }

    #[test]
    fn prop_impact_severity_is_monotonic(a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(ImpactSeverity::from_score(hi) >= ImpactSeverity::from_score(lo));
    }
}
