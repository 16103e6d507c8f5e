mod ipapi;
mod ipgeolocation;

use async_trait::async_trait;
use serde::Serialize;

use crate::{DbPool, Error, db::CacheEntry};

pub use ipapi::IpApi;
pub use ipgeolocation::IpGeolocation;

/// Geohash length, matching the encoder default the payloads were
/// historically produced with.
const GEOHASH_LEN: usize = 12;

/// Everything we resolve about an address. All three fields are populated
/// together; a lookup never yields a partial payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Payload {
    pub country_code: String,
    pub geo_hash: String,
    pub isp: String,
}

/// A geolocation backend. Variants are stateless apart from their injected
/// cache pool and HTTP client.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Registry name, for logging.
    fn name(&self) -> &'static str;

    /// Resolve `ip` to its location payload.
    async fn lookup(&self, ip: &str) -> Result<Payload, Error>;
}

/// Construct the provider registered under `name`. Construction performs
/// no I/O; the pool is handed through to the variant untouched.
pub fn new(name: &str, pool: DbPool) -> Result<Box<dyn Provider>, Error> {
    match name {
        "ipgeolocation" => Ok(Box::new(IpGeolocation::new(pool)?)),
        "ipapi" => Ok(Box::new(IpApi::new(pool)?)),
        _ => Err(Error::NoSuchProvider(name.to_owned())),
    }
}

/// Fresh cached payload for `ip`, if any. A cache failure here only costs
/// us the shortcut, so it is logged and degraded to a miss.
async fn cached(pool: &DbPool, ip: &str) -> Option<String> {
    let result = async {
        let conn = pool.get().await?;
        CacheEntry::lookup(&conn, ip).await
    }
    .await;

    match result {
        Ok(Some(payload)) => {
            debug!("cache hit for {}", ip);
            Some(payload)
        }
        Ok(None) => None,
        Err(err) => {
            warn!("cache read for {} failed, treating as miss: {}", ip, err);
            None
        }
    }
}

/// Store a fetched body for `ip`. Caching is an optimization; failures are
/// logged, never surfaced to the caller.
async fn write_back(pool: &DbPool, ip: &str, payload: &str) {
    let result = async {
        let conn = pool.get().await?;
        CacheEntry::upsert(&conn, ip, payload).await
    }
    .await;

    if let Err(err) = result {
        warn!("cache write-back for {} failed: {}", ip, err);
    }
}

fn parse_coord(value: &str) -> Result<f64, Error> {
    value
        .parse()
        .map_err(|_err| Error::coord_parse_error(value))
}

fn encode_geohash(lat: f64, lng: f64) -> Result<String, Error> {
    Ok(geohash::encode(
        geohash::Coord { x: lng, y: lat },
        GEOHASH_LEN,
    )?)
}
