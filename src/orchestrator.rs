use futures::StreamExt;
use futures::stream::FuturesUnordered;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::config::FetchConfig;
use crate::error::PipelineError;
use crate::pipeline::fetcher::Fetcher;
use crate::pipeline::materializer::Materializer;
use crate::pipeline::parser::TitlePattern;
use crate::pipeline::{PipelineContext, process_id};
use crate::report::RunReport;
use crate::utils::worker_pool::WorkerPool;

type Outcome = Result<PathBuf, PipelineError>;

struct Progress {
    advance: Option<Box<dyn FnMut(usize)>>,
}

impl Progress {
    fn new(total: u64, enabled: bool) -> Self {
        let advance = (enabled && total > 0).then(|| {
            let mut bar = tqdm::pbar(Some(total as usize));
            Box::new(move |n: usize| {
                if let Err(err) = bar.update(n) {
                    tracing::debug!("progress bar update failed: {}", err);
                }
            }) as Box<dyn FnMut(usize)>
        });
        Progress { advance }
    }

    fn advance(&mut self, n: u64) {
        if let Some(advance) = self.advance.as_mut() {
            advance(n as usize);
        }
    }
}

async fn track(id: u64, handle: JoinHandle<Outcome>) -> (u64, Result<Outcome, JoinError>) {
    (id, handle.await)
}

fn settle(report: &mut RunReport, id: u64, joined: Result<Outcome, JoinError>) {
    match joined {
        Ok(Ok(path)) => {
            tracing::debug!(id, "saved {}", path.display());
            report.record_success();
        }
        Ok(Err(err)) => {
            tracing::warn!(id, kind = %err.kind(), "skipping image {}: {}", id, err);
            report.record_failure(id, &err);
        }
        Err(err) => {
            tracing::error!(id, "pipeline task for image {} died: {}", id, err);
            report.record_panic(id, err.to_string());
        }
    }
}

pub fn build_context(config: &FetchConfig) -> Result<PipelineContext, reqwest::Error> {
    let client = Fetcher::build_client(config.request_timeout())?;
    Ok(PipelineContext {
        fetcher: Fetcher::new(client, config.page_url_template.as_str()),
        title_pattern: TitlePattern::default(),
        materializer: Materializer::new(&config.output_dir, config.extension.as_str()),
        asset_meta_name: config.asset_meta_name.clone(),
    })
}

/// Runs the pipeline for every identifier in `[start, end)`. Identifiers are
/// dispatched in ascending order; per-identifier failures are recorded in the
/// report and never stop the batch. After `cancel` fires the remaining
/// identifiers are counted as skipped.
pub async fn run(
    config: &FetchConfig,
    cancel: CancellationToken,
    show_progress: bool,
) -> Result<RunReport, reqwest::Error> {
    let ctx = Arc::new(build_context(config)?);
    let ids = config.start..config.end;
    Ok(run_with_context(ctx, ids, config.workers, cancel, show_progress).await)
}

pub async fn run_with_context(
    ctx: Arc<PipelineContext>,
    ids: std::ops::Range<u64>,
    workers: usize,
    cancel: CancellationToken,
    show_progress: bool,
) -> RunReport {
    let total = ids.end.saturating_sub(ids.start);
    let mut report = RunReport::new(total);
    let mut progress = Progress::new(total, show_progress);
    let pool = WorkerPool::new(workers, cancel);

    tracing::info!(
        start = ids.start,
        end = ids.end,
        workers,
        "processing {} images into {}",
        total,
        ctx.materializer.output_dir().display()
    );

    let end = ids.end;
    let mut ids = ids;
    let mut pending = ids.next();
    let mut running = FuturesUnordered::new();

    loop {
        let next_id = pending.unwrap_or_default();
        let task_ctx = Arc::clone(&ctx);
        let task = async move { process_id(&task_ctx, next_id).await };
        tokio::select! {
            biased;
            Some((id, joined)) = running.next(), if !running.is_empty() => {
                settle(&mut report, id, joined);
                progress.advance(1);
            }
            spawned = pool.spawn(task), if pending.is_some() => {
                match spawned {
                    Ok(handle) => {
                        running.push(track(next_id, handle));
                        pending = ids.next();
                    }
                    Err(_) => {
                        let skipped = end - next_id;
                        tracing::warn!(
                            first = next_id,
                            "cancelled, skipping {} remaining images",
                            skipped
                        );
                        report.record_skipped(skipped);
                        progress.advance(skipped);
                        pending = None;
                    }
                }
            }
            else => break,
        }
    }

    tracing::info!("{}", report);
    report
}
