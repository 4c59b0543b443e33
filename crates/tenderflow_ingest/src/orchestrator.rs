//! Ties the pipeline components together: discovery, inference, schema
//! realization, then per-file streaming ingestion.

use crate::batch_sizer::AdaptiveBatchSizer;
use crate::cancel::CancellationToken;
use crate::discover::{self, DiscoveredFile};
use crate::loader::BatchLoader;
use crate::router::{RoutedRecord, Router};
use crate::schema_manager::SchemaManager;
use crate::tracker::ProgressTracker;
use serde_json::Value;
use std::collections::HashMap;
use std::io::BufRead;
use std::time::Duration;
use tenderflow_db::{ddl, ConnectionPool, FileStatus, TenderflowDbError};
use tenderflow_infer::{CorpusStats, Inferencer};
use tenderflow_schema::{Record, RunContext, Schema};
use tracing::{error, info, warn};

const MAX_CONNECTION_RETRIES: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_secs(2);

pub struct IngestSummary {
    pub files_completed: usize,
    pub files_failed: usize,
    pub total_records: u64,
}

pub async fn run(
    ctx: &RunContext,
    pool: &ConnectionPool,
    token: &CancellationToken,
) -> anyhow::Result<IngestSummary> {
    let files = discover::discover_files(&ctx.json_base_path);
    info!(count = files.len(), "discovered input files");

    let schema = infer_corpus_schema(&files, token);
    realize_schema(pool, &schema).await?;

    let schema_manager = SchemaManager::new(schema);
    let router = Router::new();
    let loader = BatchLoader::new(pool);
    let sizer = AdaptiveBatchSizer::new();
    let tracker = ProgressTracker::new();

    let mut summary = IngestSummary { files_completed: 0, files_failed: 0, total_records: 0 };

    for (index, file) in files.iter().enumerate() {
        if token.is_cancelled() {
            info!("cancellation requested, stopping before next file");
            break;
        }

        let file_name = file.path.display().to_string();
        if !tracker.should_process(pool, &file_name).await? {
            info!(file = %file_name, "skipping already-completed file");
            continue;
        }

        let progress = tracker.start_file();
        let batch_id_prefix = format!("{}_{}", unix_timestamp(), index);

        match process_file(
            file,
            &batch_id_prefix,
            &schema_manager,
            &router,
            &loader,
            &sizer,
            pool,
            token,
        )
        .await
        {
            Ok(record_count) => {
                tracker.record_speed(&progress, record_count as usize);
                tracker
                    .complete_file(pool, &file_name, record_count, FileStatus::Completed, None)
                    .await?;
                summary.files_completed += 1;
                summary.total_records += record_count as u64;
            }
            Err(err) => {
                error!(file = %file_name, error = %err, "file failed");
                tracker
                    .complete_file(pool, &file_name, 0, FileStatus::Failed, Some(&err.to_string()))
                    .await?;
                summary.files_failed += 1;
            }
        }
    }

    Ok(summary)
}

fn infer_corpus_schema(files: &[DiscoveredFile], token: &CancellationToken) -> Schema {
    let inferencer = Inferencer::new();
    let mut stats = CorpusStats::new();
    for file in files {
        if token.is_cancelled() {
            break;
        }
        if let Err(err) = inferencer.sample_file(&file.path, &mut stats) {
            warn!(file = %file.path.display(), error = %err, "failed to sample file for inference");
        }
    }
    inferencer.resolve_schema(stats)
}

async fn realize_schema(pool: &ConnectionPool, schema: &Schema) -> Result<(), TenderflowDbError> {
    ddl::create_bookkeeping_tables(pool.raw()).await?;
    ddl::create_main_table(pool.raw(), schema).await?;
    for field in schema.json_fields() {
        ddl::create_auxiliary_table(pool.raw(), field).await?;
    }
    for field in &schema.fields {
        ddl::upsert_field_mapping(pool.raw(), &field.original_name, &field.sanitized_name, field.declared_type)
            .await?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn process_file(
    file: &DiscoveredFile,
    batch_id_prefix: &str,
    schema_manager: &SchemaManager,
    router: &Router,
    loader: &BatchLoader<'_>,
    sizer: &AdaptiveBatchSizer,
    pool: &ConnectionPool,
    token: &CancellationToken,
) -> anyhow::Result<i64> {
    let file_handle = std::fs::File::open(&file.path)?;
    let reader = std::io::BufReader::new(file_handle);

    let mut batch: Vec<RoutedRecord> = Vec::new();
    let mut total_records: i64 = 0;
    let batch_id = format!("{batch_id_prefix}");

    for (line_no, line) in reader.lines().enumerate() {
        if token.is_cancelled() {
            break;
        }
        let line = match line {
            Ok(l) => l,
            Err(err) => {
                warn!(file = %file.path.display(), line_no, error = %err, "failed to read line");
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let value: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(err) => {
                warn!(file = %file.path.display(), line_no, error = %err, "skipping malformed record");
                continue;
            }
        };
        let record = match Record::from_value(value) {
            Some(r) => r,
            None => continue,
        };

        if let Some(routed) = router.route(&record, schema_manager, pool, &file.path.display().to_string(), &batch_id).await? {
            batch.push(routed);
        }

        let current_batch_size = sizer.revise();
        if batch.len() >= current_batch_size {
            total_records += flush_batch(&mut batch, schema_manager, loader).await?;
        }
    }

    total_records += flush_batch(&mut batch, schema_manager, loader).await?;
    Ok(total_records)
}

async fn flush_batch(
    batch: &mut Vec<RoutedRecord>,
    schema_manager: &SchemaManager,
    loader: &BatchLoader<'_>,
) -> anyhow::Result<i64> {
    if batch.is_empty() {
        return Ok(0);
    }
    let schema = schema_manager.snapshot().await;
    let rows = std::mem::take(batch);

    let inserted = with_connection_retry(|| loader.load_primary(&schema, &rows, rows.len())).await?;

    let mut aux_buffers: HashMap<String, Vec<(String, Value, String, String)>> = HashMap::new();
    for routed in &rows {
        for (field_name, value) in &routed.json_values {
            aux_buffers.entry(field_name.clone()).or_default().push((
                routed.cig.clone(),
                value.clone(),
                routed.source_file.clone(),
                routed.batch_id.clone(),
            ));
        }
    }
    for (field_name, entries) in aux_buffers {
        let len = entries.len();
        with_connection_retry(|| loader.load_auxiliary(&field_name, &entries, len)).await?;
    }

    Ok(inserted as i64)
}

/// Retries an operation up to [`MAX_CONNECTION_RETRIES`] times with doubling
/// backoff starting at [`INITIAL_BACKOFF`] when it fails with
/// `ConnectionLost`. Any other error is returned immediately.
async fn with_connection_retry<F, Fut, T>(mut op: F) -> Result<T, TenderflowDbError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, TenderflowDbError>>,
{
    let mut attempt = 0u32;
    let mut backoff = INITIAL_BACKOFF;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(TenderflowDbError::ConnectionLost(msg)) if attempt + 1 < MAX_CONNECTION_RETRIES => {
                attempt += 1;
                warn!(attempt, error = %msg, "retrying after connection loss");
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
            Err(err) => return Err(err),
        }
    }
}

fn unix_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
