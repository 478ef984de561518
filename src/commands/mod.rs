pub mod agreement;
pub mod clear_cache;
pub mod import;
pub mod matrix;
pub mod record;
pub mod status;
pub mod summary;

mod snapshot;
