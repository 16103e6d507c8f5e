use std::{path::PathBuf, time::Duration};

use async_trait::async_trait;
use isahc::{HttpClient, config::Configurable, prelude::AsyncReadResponseExt};
use serde::Deserialize;
use tokio::fs;

use crate::{CONFIG, DbPool, Error};

use super::{Payload, Provider, cached, encode_geohash, parse_coord, write_back};

// server url
const ENDPOINT: &str = "https://api.ipgeolocation.io/ipgeo";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The subset of the api.ipgeolocation.io response we consume. The API
/// encodes coordinates as JSON strings.
#[derive(Debug, Deserialize)]
struct ApiPayload {
    country_code2: String,
    latitude: String,
    longitude: String,
    isp: String,
}

/// Provider backed by api.ipgeolocation.io, with the cache pool in front
/// of every fetch.
pub struct IpGeolocation {
    pool: DbPool,
    client: HttpClient,
    endpoint: String,
    keyfile: PathBuf,
}

impl IpGeolocation {
    pub fn new(pool: DbPool) -> Result<Self, Error> {
        Self::with_endpoint(pool, ENDPOINT, CONFIG.keyfile.as_str())
    }

    fn with_endpoint(
        pool: DbPool,
        endpoint: impl Into<String>,
        keyfile: impl Into<PathBuf>,
    ) -> Result<Self, Error> {
        let client = HttpClient::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_header(
                "user-agent",
                format!("ipgeo/{}", env!("CARGO_PKG_VERSION")),
            )
            .build()?;

        Ok(Self {
            pool,
            client,
            endpoint: endpoint.into(),
            keyfile: keyfile.into(),
        })
    }

    async fn api_key(&self) -> Result<String, Error> {
        let key = fs::read_to_string(&self.keyfile).await?;
        Ok(key.trim_end().to_owned())
    }

    async fn fetch(&self, ip: &str) -> Result<String, Error> {
        let key = self.api_key().await?;
        let url = format!("{}?apiKey={}&ip={}", self.endpoint, key, ip);

        debug!("fetching geolocation for {}", ip);
        let mut response = self.client.get_async(url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::UpstreamStatus(status));
        }
        Ok(response.text().await?)
    }

    fn parse(raw: &str) -> Result<Payload, Error> {
        let data: ApiPayload = serde_json::from_str(raw)?;
        let lat = parse_coord(&data.latitude)?;
        let lng = parse_coord(&data.longitude)?;

        Ok(Payload {
            country_code: data.country_code2,
            geo_hash: encode_geohash(lat, lng)?,
            isp: data.isp,
        })
    }
}

#[async_trait]
impl Provider for IpGeolocation {
    fn name(&self) -> &'static str {
        "ipgeolocation"
    }

    async fn lookup(&self, ip: &str) -> Result<Payload, Error> {
        let raw = match cached(&self.pool, ip).await {
            Some(raw) => raw,
            None => {
                let raw = self.fetch(ip).await?;
                write_back(&self.pool, ip, &raw).await;
                raw
            }
        };
        Self::parse(&raw)
    }
}
