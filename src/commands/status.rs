use anyhow::Result;
use tracing::{info, warn};

use crate::cache::ReportCache;
use crate::cli::StatusArgs;
use crate::store::{open_store_read_only, store_counts};

pub fn run(args: StatusArgs) -> Result<()> {
    let db_path = args.store.db_path();

    info!(cache_root = %args.store.cache_root.display(), "status requested");

    if db_path.exists() {
        let connection = open_store_read_only(&db_path)?;
        let counts = store_counts(&connection)?;

        info!(
            path = %db_path.display(),
            rows = counts.rows,
            annotators = counts.annotators,
            incidents = counts.incidents,
            sessions = counts.sessions,
            latest_datetime = %counts.latest_datetime.unwrap_or_default(),
            "annotation store status"
        );
    } else {
        warn!(path = %db_path.display(), "annotation store missing");
    }

    let cached_reports = ReportCache::new(&args.store.cache_root).cached_count()?;
    info!(cached_reports, "report cache status");

    Ok(())
}
