use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;

use super::geo_cache;
use crate::{DbConn, Error};

/// Maximum age a cached payload may have while still being served.
pub const FRESHNESS_WINDOW_HOURS: i64 = 24;

/// One cached upstream response, keyed by the looked-up address. The
/// payload column holds the raw response body verbatim; it is opaque here.
#[derive(Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name = geo_cache)]
pub struct CacheEntry {
    pub ip: String,
    pub payload: String,
    pub time: NaiveDateTime,
}

impl CacheEntry {
    /// Return the stored payload for `ip` if the row is younger than the
    /// freshness window. Stale rows are ignored, not removed.
    pub async fn lookup(conn: &DbConn, ip: &str) -> Result<Option<String>, Error> {
        let ip = ip.to_owned();
        let cutoff = Utc::now().naive_utc() - chrono::Duration::hours(FRESHNESS_WINDOW_HOURS);
        conn.interact(move |conn| {
            geo_cache::table
                .filter(geo_cache::ip.eq(ip))
                .filter(geo_cache::time.gt(cutoff))
                .select(geo_cache::payload)
                .first(conn)
                .optional()
        })
        .await?
        .map_err(|e| e.into())
    }

    /// Store `payload` for `ip`, replacing any previous row. Last writer
    /// wins; the timestamp is always reset to now.
    pub async fn upsert(conn: &DbConn, ip: &str, payload: &str) -> Result<(), Error> {
        let entry = CacheEntry {
            ip: ip.to_owned(),
            payload: payload.to_owned(),
            time: Utc::now().naive_utc(),
        };
        conn.interact(|conn| {
            diesel::replace_into(geo_cache::table)
                .values(entry)
                .execute(conn)
        })
        .await??;
        Ok(())
    }
}
