mod migration;
mod models;
mod schema;

pub use migration::run_migrations;
pub use models::{CacheEntry, FRESHNESS_WINDOW_HOURS};
pub use schema::geo_cache;
