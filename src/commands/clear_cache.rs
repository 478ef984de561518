use anyhow::Result;
use tracing::info;

use crate::cache::ReportCache;
use crate::cli::ClearCacheArgs;

pub fn run(args: ClearCacheArgs) -> Result<()> {
    let removed = ReportCache::new(&args.cache_root).clear()?;
    info!(
        cache_root = %args.cache_root.display(),
        removed,
        "cleared cached agreement reports"
    );
    Ok(())
}
