use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use demand_forecast::utils::{synthetic_events, SyntheticProfile};
use demand_forecast::{CacheState, EngineConfig, OrderEvent, RecalibrationCache};
use rstest::rstest;
use std::sync::Arc;
use std::thread;

fn computed_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

fn events() -> Vec<OrderEvent> {
    let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    synthetic_events(start, 90, &SyntheticProfile::constant(8.0), 1).unwrap()
}

#[test]
fn test_same_calibration_within_interval() {
    let cache = RecalibrationCache::new(EngineConfig::default());
    let history = events();

    let first = cache.get_or_refresh(&history, computed_at());
    let second = cache.get_or_refresh(&history, computed_at() + Duration::hours(11));

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.refresh_count(), 1);
}

#[test]
fn test_recomputes_after_interval() {
    let cache = RecalibrationCache::new(EngineConfig::default());
    let history = events();

    let first = cache.get_or_refresh(&history, computed_at());
    let later = computed_at() + Duration::hours(12) + Duration::seconds(1);
    let second = cache.get_or_refresh(&history, later);

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(first.factors, second.factors);
    assert_eq!(cache.refresh_count(), 2);
    assert_eq!(cache.entry().unwrap().computed_at, later);
}

#[rstest]
#[case(Duration::zero(), CacheState::Fresh)]
#[case(Duration::hours(6), CacheState::Fresh)]
#[case(Duration::hours(12), CacheState::Fresh)]
#[case(Duration::hours(12) + Duration::milliseconds(1), CacheState::Stale)]
#[case(Duration::days(3), CacheState::Stale)]
fn test_staleness_is_monotonic(#[case] elapsed: Duration, #[case] expected: CacheState) {
    let cache = RecalibrationCache::new(EngineConfig::default());
    cache.refresh(&events(), computed_at());

    assert_eq!(cache.state(computed_at() + elapsed), expected);
}

#[test]
fn test_refresh_interval_is_configurable() {
    let config = EngineConfig {
        refresh_interval_hours: 1,
        ..EngineConfig::default()
    };
    let cache = RecalibrationCache::new(config);
    cache.refresh(&events(), computed_at());

    assert_eq!(cache.state(computed_at() + Duration::minutes(59)), CacheState::Fresh);
    assert_eq!(cache.state(computed_at() + Duration::minutes(61)), CacheState::Stale);
}

#[test]
fn test_refresh_replaces_wholesale() {
    let cache = RecalibrationCache::new(EngineConfig::default());
    let before = cache.get_or_refresh(&events(), computed_at());

    let mut grown = events();
    let extra_day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    for i in 0..8 {
        grown.push(OrderEvent::new(&format!("late-{}", i), extra_day, None));
    }
    let after = cache.refresh(&grown, computed_at());

    assert_eq!(before.window.unwrap().end, NaiveDate::from_ymd_opt(2024, 5, 29).unwrap());
    assert_eq!(after.window.unwrap().end, extra_day);
    assert!(Arc::ptr_eq(&cache.get_or_refresh(&grown, computed_at()), &after));
}

#[test]
fn test_concurrent_requests_recompute_once() {
    let cache = Arc::new(RecalibrationCache::new(EngineConfig::default()));
    let history = Arc::new(events());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let history = Arc::clone(&history);
            thread::spawn(move || cache.get_or_refresh(&history, computed_at()))
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(cache.refresh_count(), 1);
    assert!(results.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
}

#[test]
fn test_extreme_unvalidated_durations_do_not_overflow() {
    let config = EngineConfig {
        refresh_interval_hours: i64::MAX,
        trailing_window_days: 100_000_000,
        ..EngineConfig::default()
    };
    let cache = RecalibrationCache::new(config);
    let history = events();

    let first = cache.get_or_refresh(&history, computed_at());
    let second = cache.get_or_refresh(&history, computed_at() + Duration::hours(1));

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.aggregates.len(), 90);
    assert_eq!(first.window.unwrap().start, NaiveDate::MIN);
}
