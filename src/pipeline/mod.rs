pub mod fetcher;
pub mod materializer;
pub mod parser;
mod sanitize;

use std::path::PathBuf;

use crate::error::PipelineError;
use fetcher::Fetcher;
use materializer::Materializer;
use parser::{TitlePattern, parse_page};

/// Everything one identifier's pipeline needs; shared read-only by workers.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub fetcher: Fetcher,
    pub title_pattern: TitlePattern,
    pub materializer: Materializer,
    pub asset_meta_name: String,
}

/// Fetch the metadata page, parse it, then materialize its asset.
pub async fn process_id(ctx: &PipelineContext, id: u64) -> Result<PathBuf, PipelineError> {
    let html = ctx.fetcher.fetch_page(id).await?;
    let page = parse_page(&html, &ctx.asset_meta_name)?;
    let record = ctx.title_pattern.extract(id, page)?;
    ctx.materializer.materialize(&ctx.fetcher, &record).await
}
