use chrono::{Duration, NaiveDate};
use demand_forecast::utils::{synthetic_events, SyntheticProfile};
use demand_forecast::{
    aggregate, compute_factors, compute_statistics, forecast, forecast_horizon, DailyAggregate,
    EngineConfig, FactorDimension, HorizonDirection, Preset,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn constant_history(days: i64, count: u32) -> Vec<DailyAggregate> {
    (0..days)
        .map(|i| DailyAggregate::with_orders(date(2024, 1, 2) + Duration::days(i), count))
        .collect()
}

#[rstest]
#[case(date(2024, 4, 15))]
#[case(date(2024, 6, 1))]
#[case(date(2024, 8, 20))]
#[case(date(2025, 2, 11))]
fn test_constant_history_forecasts_constant(#[case] target: NaiveDate) {
    let history = constant_history(90, 10);
    let config = EngineConfig::default();
    let statistics = compute_statistics(&history, &config);
    let factors = compute_factors(&history, &[], &config);

    let result = forecast(target, None, &statistics, &factors, &config);

    assert_eq!(result.point_estimate, 10);
    assert!(result.factor_breakdown.iter().all(|(_, m)| *m == 1.0));
    assert_eq!(result.interval.low, 10.0);
    assert_eq!(result.interval.high, 10.0);
    assert_eq!(result.confidence_percent, 95);
}

#[test]
fn test_breakdown_order() {
    let history = constant_history(90, 10);
    let config = EngineConfig::preset(Preset::Conservative);
    let statistics = compute_statistics(&history, &config);
    let factors = compute_factors(&history, &[], &config);

    let result = forecast(date(2024, 9, 18), Some("vip"), &statistics, &factors, &config);
    let dimensions: Vec<FactorDimension> =
        result.factor_breakdown.iter().map(|(d, _)| *d).collect();

    assert_eq!(
        dimensions,
        vec![
            FactorDimension::DayOfWeek,
            FactorDimension::Month,
            FactorDimension::Trend,
            FactorDimension::ClientSegment,
            FactorDimension::CalendarEvent,
            FactorDimension::Safety,
        ]
    );
    // 10 * 1.2 * 0.9
    assert_eq!(result.point_estimate, 11);
}

#[test]
fn test_season_fallback_for_unseen_month() {
    let history: Vec<DailyAggregate> = (0..60)
        .map(|i| {
            let day = date(2024, 1, 1) + Duration::days(i);
            DailyAggregate::with_orders(day, if i < 31 { 12 } else { 8 })
        })
        .collect();

    let advanced = EngineConfig::preset(Preset::Advanced);
    let statistics = compute_statistics(&history, &advanced);
    let factors = compute_factors(&history, &[], &advanced);

    let result = forecast(date(2024, 12, 10), None, &statistics, &factors, &advanced);
    assert!(result.multiplier(FactorDimension::Season).is_some());
    assert!(result.multiplier(FactorDimension::Month).is_none());
    assert!(result.multiplier(FactorDimension::WeekOfMonth).is_some());

    let standard = EngineConfig::default();
    let result = forecast(date(2024, 12, 10), None, &statistics, &factors, &standard);
    assert_eq!(result.multiplier(FactorDimension::Month), Some(1.0));
}

#[rstest]
#[case(Vec::new())]
#[case(constant_history(30, 0))]
#[case(constant_history(2, 5))]
#[case({
    let mut h = constant_history(40, 10);
    h[12].order_count = 1000;
    h
})]
fn test_forecasts_are_never_negative(#[case] history: Vec<DailyAggregate>) {
    let config = EngineConfig::preset(Preset::Conservative);
    let statistics = compute_statistics(&history, &config);
    let factors = compute_factors(&history, &[], &config);

    for offset in 0..14 {
        let target = date(2024, 12, 20) + Duration::days(offset);
        let result = forecast(target, Some("regular"), &statistics, &factors, &config);

        assert!(result.interval.low >= 0.0);
        assert!(result.interval.high >= result.interval.low);
        assert!(result.interval.low <= f64::from(result.point_estimate));
        assert!(result.confidence_percent <= 100);
    }
}

#[test]
fn test_degraded_statistics_cap_confidence() {
    let history = constant_history(2, 10);
    let config = EngineConfig::default();
    let statistics = compute_statistics(&history, &config);
    let factors = compute_factors(&history, &[], &config);

    let result = forecast(date(2024, 3, 5), None, &statistics, &factors, &config);
    assert!(result.confidence_percent <= 50);
}

#[test]
fn test_noisy_history_lowers_confidence() {
    let profile = SyntheticProfile::constant(10.0).with_noise(4.0);
    let events = synthetic_events(date(2024, 1, 1), 60, &profile, 9).unwrap();
    let history = aggregate(&events, None);
    let config = EngineConfig::default();
    let statistics = compute_statistics(&history, &config);
    let factors = compute_factors(&history, &events, &config);

    let result = forecast(date(2024, 3, 12), None, &statistics, &factors, &config);
    assert!(result.confidence_percent < 95);
    assert!(result.interval.high > result.interval.low);
}

#[test]
fn test_horizon_summary() {
    let history = constant_history(90, 10);
    let config = EngineConfig::default();
    let statistics = compute_statistics(&history, &config);
    let factors = compute_factors(&history, &[], &config);

    let flat = forecast_horizon(date(2024, 4, 10), 7, None, &statistics, &factors, &config).unwrap();
    assert_eq!(flat.forecasts.len(), 7);
    assert_eq!(flat.mean_point_estimate, 10.0);
    assert_eq!(flat.direction, HorizonDirection::Flat);

    // Ends on New Year's Day
    let falling =
        forecast_horizon(date(2024, 12, 29), 4, None, &statistics, &factors, &config).unwrap();
    assert_eq!(falling.direction, HorizonDirection::Falling);
    assert_eq!(falling.forecasts[3].target_date, date(2025, 1, 1));
}
