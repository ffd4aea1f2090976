//! The music streaming warehouse pipeline.
//!
//! Assembles the staging, fact, dimension and quality-check tasks into one
//! [`PipelineGraph`] shaped like the original daily load: two staging
//! branches fan into the fact table, the dimensions fan out from it, and a
//! row-count check gates the finish marker.

pub mod statements;

use log::info;
use std::env;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::SqlBackend;
use crate::credentials::CredentialProvider;
use crate::engine::{PipelineDefaults, PipelineGraph, RunOptions};
use crate::error::{BackendError, GraphError};
use crate::ops::{
    LoadDimensionTask, LoadFactTask, LoadMode, NoopTask, QualityCheckTask, SqlTask, StageTask,
};
use crate::task::RetryPolicy;

/// Configuration for the music streaming warehouse pipeline.
#[derive(Debug, Clone)]
pub struct WarehouseEtlConfig {
    pub s3_bucket: String,
    /// Object key of the event logs. May contain `{placeholder}` segments.
    pub log_data_key: String,
    /// Object key of the song catalog dumps.
    pub song_data_key: String,
    /// JSONPaths file for the event logs; the song catalog uses the auto
    /// sentinel because its layout matches the table.
    pub log_json_paths: String,
    pub region: String,
    pub credential_id: String,
    /// Expected songplays row count for the quality gate.
    pub expected_songplay_count: String,
    pub defaults: PipelineDefaults,
    pub options: RunOptions,
}

impl Default for WarehouseEtlConfig {
    fn default() -> Self {
        Self {
            s3_bucket: "music-events-lake".to_string(),
            log_data_key: "log_data".to_string(),
            song_data_key: "song_data".to_string(),
            log_json_paths: "log_json_path.json".to_string(),
            region: "us-west-2".to_string(),
            credential_id: "aws_credentials".to_string(),
            expected_songplay_count: "320".to_string(),
            defaults: PipelineDefaults::new()
                .with_retry_policy(RetryPolicy::new(1, Duration::from_secs(60))),
            options: RunOptions::new(),
        }
    }
}

impl WarehouseEtlConfig {
    /// Defaults overridden by `WAREHOUSE_*` environment variables where set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(value) = env::var("WAREHOUSE_S3_BUCKET") {
            config.s3_bucket = value;
        }
        if let Ok(value) = env::var("WAREHOUSE_LOG_DATA_KEY") {
            config.log_data_key = value;
        }
        if let Ok(value) = env::var("WAREHOUSE_SONG_DATA_KEY") {
            config.song_data_key = value;
        }
        if let Ok(value) = env::var("WAREHOUSE_LOG_JSON_PATHS") {
            config.log_json_paths = value;
        }
        if let Ok(value) = env::var("WAREHOUSE_REGION") {
            config.region = value;
        }
        if let Ok(value) = env::var("WAREHOUSE_CREDENTIAL_ID") {
            config.credential_id = value;
        }
        if let Ok(value) = env::var("WAREHOUSE_EXPECTED_SONGPLAY_COUNT") {
            config.expected_songplay_count = value;
        }
        config
    }
}

/// Create every table of the star schema. Runs outside the pipeline proper
/// so a run never depends on whether the schema already existed.
pub async fn bootstrap_schema(backend: &dyn SqlBackend) -> Result<(), BackendError> {
    for statement in statements::CREATE_TABLE_STATEMENTS {
        backend.execute(statement).await?;
    }
    info!("Star schema bootstrap complete");
    Ok(())
}

/// Build the finalized music warehouse pipeline.
///
/// Task ids, in dependency order: `begin`, `create_staging_events` and
/// `create_staging_songs`, `stage_events` and `stage_songs`,
/// `load_songplays`, the four `load_*_dim` tasks, `quality_check_songplays`,
/// `end`. The returned graph is already finalized and ready to run.
pub fn music_pipeline(
    backend: Arc<dyn SqlBackend>,
    credentials: Arc<dyn CredentialProvider>,
    config: &WarehouseEtlConfig,
) -> Result<PipelineGraph, GraphError> {
    let mut graph = PipelineGraph::new("music_warehouse")
        .with_defaults(config.defaults.clone())
        .with_options(config.options.clone());

    graph.add_task("begin", NoopTask, None)?;

    graph.add_task(
        "create_staging_events",
        SqlTask::new(backend.clone(), statements::CREATE_STAGING_EVENTS),
        None,
    )?;
    graph.add_task(
        "create_staging_songs",
        SqlTask::new(backend.clone(), statements::CREATE_STAGING_SONGS),
        None,
    )?;

    graph.add_task(
        "stage_events",
        StageTask::new(
            backend.clone(),
            credentials.clone(),
            "staging_events",
            &config.s3_bucket,
            &config.log_data_key,
        )
        .with_json_paths(&config.log_json_paths)
        .with_region(&config.region)
        .with_credential_id(&config.credential_id),
        None,
    )?;
    graph.add_task(
        "stage_songs",
        StageTask::new(
            backend.clone(),
            credentials,
            "staging_songs",
            &config.s3_bucket,
            &config.song_data_key,
        )
        .with_region(&config.region)
        .with_credential_id(&config.credential_id),
        None,
    )?;

    graph.add_task(
        "load_songplays",
        LoadFactTask::new(
            backend.clone(),
            "songplays",
            statements::SONGPLAY_COLUMNS,
            statements::SONGPLAY_INSERT_SELECT,
        ),
        None,
    )?;

    let dimensions = [
        ("load_users_dim", "users", statements::USER_INSERT_SELECT),
        ("load_songs_dim", "songs", statements::SONG_INSERT_SELECT),
        (
            "load_artists_dim",
            "artists",
            statements::ARTIST_INSERT_SELECT,
        ),
        ("load_time_dim", "time", statements::TIME_INSERT_SELECT),
    ];
    for (task_id, table, select_sql) in dimensions {
        graph.add_task(
            task_id,
            LoadDimensionTask::new(backend.clone(), table, select_sql, LoadMode::Append),
            None,
        )?;
    }

    graph.add_task(
        "quality_check_songplays",
        QualityCheckTask::new(
            backend,
            statements::SONGPLAYS_COUNT_CHECK,
            &config.expected_songplay_count,
            "songplays fact table row count",
        ),
        None,
    )?;

    graph.add_task("end", NoopTask, None)?;

    graph.add_edge("begin", "create_staging_events")?;
    graph.add_edge("begin", "create_staging_songs")?;
    graph.add_edge("create_staging_events", "stage_events")?;
    graph.add_edge("create_staging_songs", "stage_songs")?;
    graph.add_edge("stage_events", "load_songplays")?;
    graph.add_edge("stage_songs", "load_songplays")?;
    for (task_id, _, _) in dimensions {
        graph.add_edge("load_songplays", task_id)?;
        graph.add_edge(task_id, "quality_check_songplays")?;
    }
    graph.add_edge("quality_check_songplays", "end")?;

    graph.finalize()?;
    Ok(graph)
}
