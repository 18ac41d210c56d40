//! Aggregation properties

use chrono::{Duration, Utc};
use proptest::prelude::*;
use remedy_metrics::MetricsCollector;
use remedy_model::{ImpactLevel, RemediationMetrics, TimeRange};

fn level(i: u8) -> ImpactLevel {
    match i % 5 {
        0 => ImpactLevel::None,
        1 => ImpactLevel::Low,
        2 => ImpactLevel::Medium,
        3 => ImpactLevel::High,
        _ => ImpactLevel::Critical,
    }
}

proptest! {
    #[test]
    fn aggregate_stays_within_inputs(
        samples in prop::collection::vec((0.0f64..600.0, 0.0f64..=1.0, 0u8..5), 1..20)
    ) {
        let collector = MetricsCollector::new();
        let now = Utc::now();
        for (i, (duration, rate, impact)) in samples.iter().enumerate() {
            collector.record_remediation(
                RemediationMetrics::new(format!("rem-{i}"))
                    .with_duration_secs(*duration)
                    .with_success_rate(*rate)
                    .with_impact(level(*impact), level(*impact))
                    .with_step("step", "value", 1.0)
                    .at(now),
            );
        }

        let agg = collector.get_aggregated_metrics(TimeRange::new(now - Duration::seconds(1), now));

        let max_d = samples.iter().map(|s| s.0).fold(f64::MIN, f64::max);
        let min_d = samples.iter().map(|s| s.0).fold(f64::MAX, f64::min);
        prop_assert!(agg.duration_secs >= min_d - 1e-9 && agg.duration_secs <= max_d + 1e-9);
        prop_assert!((0.0..=1.0 + 1e-9).contains(&agg.success_rate));
        prop_assert_eq!(agg.impact, samples.iter().map(|s| level(s.2)).max().unwrap());
        prop_assert_eq!(agg.steps.len(), samples.len());
        prop_assert!(MetricsCollector::validate_metrics(&agg).success);
    }
}
