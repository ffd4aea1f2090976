use std::env;
use std::process;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use log::info;

use pipeline_engine::backend::PostgresBackend;
use pipeline_engine::credentials::EnvCredentialProvider;
use pipeline_engine::engine::RunContext;
use pipeline_engine::etl::{self, WarehouseEtlConfig};

/// Usage: pipeline-engine [RUN_ID] [LOGICAL_DATE]
///
/// LOGICAL_DATE accepts YYYY-MM-DD or RFC 3339; it defaults to now, and the
/// run id defaults to a timestamped `manual_*` value. The warehouse is
/// reached through DATABASE_URL; pipeline settings come from `WAREHOUSE_*`
/// variables where set.
#[tokio::main]
async fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let run_id = args
        .get(1)
        .cloned()
        .unwrap_or_else(|| format!("manual_{}", Utc::now().format("%Y%m%dT%H%M%SZ")));
    let logical_date = match args.get(2) {
        Some(raw) => match parse_logical_date(raw) {
            Ok(date) => date,
            Err(e) => {
                eprintln!("Invalid logical date '{}': {}", raw, e);
                process::exit(2);
            }
        },
        None => Utc::now(),
    };

    // Step 1: Connect to the warehouse.
    let database_url = match env::var("DATABASE_URL") {
        Ok(value) => value,
        Err(_) => {
            eprintln!("DATABASE_URL must be set");
            process::exit(2);
        }
    };
    let backend = match PostgresBackend::new(&database_url).await {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            eprintln!("Failed to connect to the warehouse: {}", e);
            process::exit(2);
        }
    };

    // Step 2: Make sure the star schema exists.
    if let Err(e) = etl::bootstrap_schema(backend.as_ref()).await {
        eprintln!("Schema bootstrap failed: {}", e);
        process::exit(2);
    }

    // Step 3: Build the pipeline.
    let config = WarehouseEtlConfig::from_env();
    let credentials = Arc::new(EnvCredentialProvider::new());
    let graph = match etl::music_pipeline(backend, credentials, &config) {
        Ok(graph) => graph,
        Err(e) => {
            eprintln!("Invalid pipeline definition: {}", e);
            process::exit(2);
        }
    };

    // Step 4: Execute one run.
    info!("Starting run '{}' (logical date {})", run_id, logical_date);
    let context = RunContext::new(run_id, logical_date);
    let result = match graph.run(context).await {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Run aborted: {}", e);
            process::exit(2);
        }
    };

    // Step 5: Report the outcome.
    println!("Run '{}' finished: {}", result.run_id, result.status);
    for (task_id, report) in &result.tasks {
        println!(
            "  Task {}: {} after {} attempt(s)",
            task_id, report.status, report.attempts
        );
    }
    match serde_json::to_string_pretty(&result) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to render the run report: {}", e),
    }

    if !result.is_success() {
        process::exit(1);
    }
}

fn parse_logical_date(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(date_time) = DateTime::parse_from_rfc3339(raw) {
        return Ok(date_time.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| e.to_string())?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| "not a valid date".to_string())?;
    Ok(Utc.from_utc_datetime(&midnight))
}

#[cfg(test)]
mod tests {
    use super::parse_logical_date;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parses_plain_date_as_utc_midnight() {
        let date = parse_logical_date("2019-01-12").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2019, 1, 12));
        assert_eq!(date.hour(), 0);
    }

    #[test]
    fn test_parses_rfc3339() {
        let date = parse_logical_date("2019-01-12T06:30:00Z").unwrap();
        assert_eq!(date.hour(), 6);
        assert_eq!(date.minute(), 30);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_logical_date("yesterday").is_err());
    }
}
