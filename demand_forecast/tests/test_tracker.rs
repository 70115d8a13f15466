use chrono::{Duration, NaiveDate};
use demand_forecast::composer::ForecastInterval;
use demand_forecast::{Advisory, ForecastResult, PredictionTracker, QualityBucket};
use pretty_assertions::assert_eq;

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 7, day).unwrap()
}

fn prediction(target_date: NaiveDate, point_estimate: u32, segment: Option<&str>) -> ForecastResult {
    ForecastResult {
        target_date,
        segment: segment.map(str::to_string),
        baseline: 10.0,
        point_estimate,
        interval: ForecastInterval {
            low: f64::from(point_estimate) - 2.0,
            high: f64::from(point_estimate) + 2.0,
        },
        confidence_percent: 85,
        factor_breakdown: Vec::new(),
        calendar_event: None,
    }
}

#[test]
fn test_prediction_for_same_date_and_segment_is_replaced() {
    let mut tracker = PredictionTracker::new();
    tracker.record_prediction(&prediction(date(1), 10, None));
    tracker.record_prediction(&prediction(date(1), 12, None));
    tracker.record_prediction(&prediction(date(1), 4, Some("vip")));

    assert_eq!(tracker.predictions().len(), 2);
    assert_eq!(tracker.predictions()[0].predicted, 12);
}

#[test]
fn test_actuals_verify_predictions() {
    let mut tracker = PredictionTracker::new();
    tracker.record_prediction(&prediction(date(1), 10, None));
    tracker.record_prediction(&prediction(date(1), 5, Some("vip")));
    tracker.record_prediction(&prediction(date(2), 10, None));

    assert_eq!(tracker.record_actual(date(1), 10), 2);
    assert_eq!(tracker.record_actual(date(9), 10), 0);

    let first = &tracker.predictions()[0];
    assert_eq!(first.quality, Some(QualityBucket::Excellent));
    assert_eq!(first.effectiveness, Some(100.0));
    assert_eq!(tracker.predictions()[1].quality, Some(QualityBucket::Acceptable));

    let metrics = tracker.metrics();
    assert_eq!(metrics.total, 3);
    assert_eq!(metrics.verified, 2);
    assert_eq!(metrics.pending, 1);
    assert_eq!(metrics.mean_error_percent, Some(25.0));
    assert_eq!(metrics.mean_effectiveness, Some(75.0));
    assert_eq!(metrics.percent_by_quality[&QualityBucket::Excellent], 50.0);
}

#[test]
fn test_recent_is_newest_first() {
    let mut tracker = PredictionTracker::new();
    for day in [3, 1, 7, 5] {
        tracker.record_prediction(&prediction(date(day), 10, None));
    }

    let dates: Vec<NaiveDate> = tracker.recent(2).iter().map(|p| p.date).collect();
    assert_eq!(dates, vec![date(7), date(5)]);
}

#[test]
fn test_advisories() {
    let mut tracker = PredictionTracker::new();
    assert_eq!(tracker.advisories(), vec![Advisory::NeedMoreData]);

    let start = date(1);
    for offset in 0..12 {
        let day = start + Duration::days(offset);
        tracker.record_prediction(&prediction(day, 10, None));
        tracker.record_actual(day, 10);
    }
    assert_eq!(tracker.advisories(), vec![Advisory::PerformingWell]);

    for offset in 12..24 {
        let day = start + Duration::days(offset);
        tracker.record_prediction(&prediction(day, 30, None));
        tracker.record_actual(day, 10);
    }
    let advisories = tracker.advisories();
    assert!(advisories.contains(&Advisory::ManyPoorPredictions));
    assert!(!advisories.contains(&Advisory::PerformingWell));
}

#[test]
fn test_tracker_survives_json() {
    let mut tracker = PredictionTracker::new();
    tracker.record_prediction(&prediction(date(4), 9, Some("regular")));
    tracker.record_actual(date(4), 12);

    let json = tracker.to_json_string().unwrap();
    let restored = PredictionTracker::from_json_str(&json).unwrap();

    assert_eq!(restored, tracker);
}
