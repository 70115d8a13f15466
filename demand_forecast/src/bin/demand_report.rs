use chrono::{Duration, NaiveDate, Utc, Weekday};
use demand_forecast::utils::{synthetic_events, SyntheticProfile};
use demand_forecast::{
    events::parse_date, DemandEngine, EngineConfig, ForecastError, RecordLoader,
};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: demand_report <records.csv|records.json> [target-date] [segment]\n       demand_report --synthetic";

/// Days held out by the backtest printed at the end
const BACKTEST_DAYS: usize = 7;

fn load_config() -> Result<EngineConfig, ForecastError> {
    match std::env::var("DEMAND_CONFIG") {
        Ok(path) => EngineConfig::from_json_file(path),
        Err(_) => Ok(EngineConfig::default()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(source) = args.first() else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };

    let mut engine = DemandEngine::new(load_config()?)?;

    if source == "--synthetic" {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).ok_or("invalid start date")?;
        let profile = SyntheticProfile::constant(10.0)
            .with_weekday(Weekday::Sat, 0.5)
            .with_noise(1.5);
        engine.replace_events(synthetic_events(start, 90, &profile, 42)?);
    } else {
        let records = RecordLoader::from_path(source)?;
        let report = engine.ingest(&records);
        println!(
            "Loaded {} orders ({} skipped, {} duplicates dropped)",
            report.events.len(),
            report.skipped.len(),
            report.duplicates_dropped
        );
        for skipped in report.skipped.iter().take(5) {
            println!("  skipped record {}: {}", skipped.index, skipped.reason);
        }
    }

    let now = Utc::now();
    let latest = engine
        .events()
        .iter()
        .map(|e| e.date)
        .max()
        .unwrap_or_else(|| now.date_naive());
    let target = match args.get(1) {
        Some(text) => parse_date(text)?.0,
        None => latest + Duration::days(1),
    };
    let segment = args.get(2).map(String::as_str);

    println!("Demand Forecast Report");
    println!("======================");

    let statistics = engine.statistics(now);
    println!("Baseline (filtered median): {:.2}", statistics.baseline());
    println!(
        "Filtered mean {:.2}, std dev {:.2} over {} days",
        statistics.filtered.mean, statistics.filtered.std_dev, statistics.filtered.count
    );
    println!("Anomalous days: {}", statistics.anomalies.len());
    for degradation in &statistics.degradations {
        println!("  degraded: {:?}", degradation);
    }

    let forecast = engine.forecast(target, segment, now);
    println!("\nForecast for {}", forecast.target_date);
    println!("  Orders:     {}", forecast.point_estimate);
    println!(
        "  Interval:   {:.1} - {:.1}",
        forecast.interval.low, forecast.interval.high
    );
    println!("  Confidence: {}%", forecast.confidence_percent);
    if let Some(event) = &forecast.calendar_event {
        println!("  Calendar:   {}", event);
    }
    println!("  Factors:");
    for (dimension, multiplier) in &forecast.factor_breakdown {
        println!("    {:<15} {:.3}", dimension, multiplier);
    }

    let horizon = engine.forecast_horizon(target, 7, segment, now)?;
    println!(
        "\nNext 7 days: mean {:.1} orders/day, {:?}",
        horizon.mean_point_estimate, horizon.direction
    );

    match engine.validate(BACKTEST_DAYS) {
        Ok(report) => {
            println!("\nBacktest over the last {} days", BACKTEST_DAYS);
            for day in &report.per_day {
                println!(
                    "  {}  predicted {:>4}  actual {:>4}  error {:>6.1}%  {}",
                    day.date, day.predicted, day.actual, day.error_percent, day.quality
                );
            }
            println!(
                "  Effectiveness: {:.1}%  (mean error {:.1}%)",
                report.overall_effectiveness_percent, report.mean_error_percent
            );
            print!("{}", report.accuracy);
        }
        Err(e) => println!("\nBacktest skipped: {}", e),
    }

    Ok(())
}
