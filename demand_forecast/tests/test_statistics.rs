use approx::assert_relative_eq;
use chrono::{Datelike, Duration, NaiveDate};
use demand_forecast::statistics::{BoundMethod, DEFAULT_BASELINE, DEFAULT_STD_DEV};
use demand_forecast::{compute_statistics, DailyAggregate, Degradation, EngineConfig};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn history(counts: &[u32]) -> Vec<DailyAggregate> {
    let start = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
    counts
        .iter()
        .enumerate()
        .map(|(i, &count)| DailyAggregate::with_orders(start + Duration::days(i as i64), count))
        .collect()
}

#[test]
fn test_empty_input_returns_documented_fallback() {
    let report = compute_statistics(&[], &EngineConfig::default());

    assert_eq!(report.filtered.median, DEFAULT_BASELINE);
    assert_eq!(report.filtered.std_dev, DEFAULT_STD_DEV);
    assert_eq!(
        report.degradations,
        vec![Degradation::InsufficientData {
            observed: 0,
            required: 3
        }]
    );
    assert!(report.anomalies.is_empty());
}

#[rstest]
#[case(&[7], 7.0)]
#[case(&[4, 6], 5.0)]
fn test_short_history_uses_observed_baseline(#[case] counts: &[u32], #[case] baseline: f64) {
    let report = compute_statistics(&history(counts), &EngineConfig::default());

    assert_eq!(report.baseline(), baseline);
    assert!(report.filtered.mean.is_finite());
    assert!(report.filtered.std_dev.is_finite());
    assert!(report.is_insufficient());
    assert!(report.bounds.is_none());
}

#[test]
fn test_spike_is_flagged_and_excluded() {
    let mut counts: Vec<u32> = (0..40).map(|i| 8 + (i % 5)).collect();
    counts[20] = 1000;
    let days = history(&counts);

    let report = compute_statistics(&days, &EngineConfig::default());

    assert_eq!(report.anomalies, vec![days[20].date]);
    assert!(report.raw.mean > 30.0);
    assert!(report.filtered.mean < 11.0);
    assert_eq!(report.baseline(), 10.0);
    assert_eq!(report.bounds.map(|b| b.method), Some(BoundMethod::Percentile));
}

#[test]
fn test_weekly_dip_is_not_anomalous() {
    let counts: Vec<u32> = (0..56).map(|i| if i % 7 == 5 { 5 } else { 10 }).collect();
    let report = compute_statistics(&history(&counts), &EngineConfig::default());

    assert!(report.anomalies.is_empty());
    assert_relative_eq!(report.filtered.mean, 65.0 / 7.0, epsilon = 1e-9);
}

#[test]
fn test_all_zero_history_degrades_without_nan() {
    let report = compute_statistics(&history(&[0; 10]), &EngineConfig::default());

    assert_eq!(report.baseline(), 0.0);
    assert!(report.degradations.contains(&Degradation::ZeroMean));
    assert!(report.degradations.contains(&Degradation::ZeroVariance));
    assert_eq!(report.filtered.coefficient_of_variation(), None);
}

#[test]
fn test_anomaly_pattern_matches_day_of_year() {
    let mut counts = vec![10; 30];
    counts[3] = 400;
    let days = history(&counts);
    let report = compute_statistics(&days, &EngineConfig::default());

    let anomaly = days[3].date;
    let next_year = anomaly.with_year(2025).unwrap();
    assert!(report.matches_anomaly_pattern(next_year));
    assert!(!report.matches_anomaly_pattern(days[4].date));
}
