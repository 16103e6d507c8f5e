use std::time::Duration;

use async_trait::async_trait;
use isahc::{HttpClient, config::Configurable, prelude::AsyncReadResponseExt};
use serde::Deserialize;

use crate::{DbPool, Error};

use super::{Payload, Provider, cached, encode_geohash, write_back};

// server url; the endpoint is keyless
const ENDPOINT: &str = "http://ip-api.com/json";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The subset of the ip-api.com response we consume. Unlike
/// api.ipgeolocation.io this API encodes coordinates as JSON numbers.
#[derive(Debug, Deserialize)]
struct ApiPayload {
    #[serde(rename = "countryCode")]
    country_code: String,
    lat: f64,
    lon: f64,
    isp: String,
}

/// Provider backed by ip-api.com, sharing the cache flow of the other
/// variants.
pub struct IpApi {
    pool: DbPool,
    client: HttpClient,
    endpoint: String,
}

impl IpApi {
    pub fn new(pool: DbPool) -> Result<Self, Error> {
        Self::with_endpoint(pool, ENDPOINT)
    }

    fn with_endpoint(pool: DbPool, endpoint: impl Into<String>) -> Result<Self, Error> {
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
        })
    }

    async fn fetch(&self, ip: &str) -> Result<String, Error> {
        let url = format!("{}/{}", self.endpoint, ip);

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

        Ok(Payload {
            country_code: data.country_code,
            geo_hash: encode_geohash(data.lat, data.lon)?,
            isp: data.isp,
        })
    }
}

#[async_trait]
impl Provider for IpApi {
    fn name(&self) -> &'static str {
        "ipapi"
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

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::db::CacheEntry;
    use crate::db::testing::temp_pool;

    const BODY: &str =
        r#"{"countryCode":"AU","lat":-33.494,"lon":143.2104,"isp":"Cloudflare, Inc"}"#;

    #[tokio::test]
    async fn lookup_fetches_parses_and_caches() {
        let (_dir, pool) = temp_pool();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/1.1.1.1"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(BODY, "application/json"))
            .expect(1)
            .mount(&server)
            .await;

        let provider =
            IpApi::with_endpoint(pool.clone(), format!("{}/json", server.uri())).unwrap();

        let payload = provider.lookup("1.1.1.1").await.unwrap();

        assert_eq!(payload.country_code, "AU");
        assert_eq!(payload.isp, "Cloudflare, Inc");
        let expected = geohash::encode(geohash::Coord { x: 143.2104, y: -33.494 }, 12).unwrap();
        assert_eq!(payload.geo_hash, expected);

        let conn = pool.get().await.unwrap();
        let cached = CacheEntry::lookup(&conn, "1.1.1.1").await.unwrap();
        assert_eq!(cached.as_deref(), Some(BODY));
    }

    #[tokio::test]
    async fn fresh_cache_entry_skips_the_network() {
        let (_dir, pool) = temp_pool();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(BODY, "application/json"))
            .expect(0)
            .mount(&server)
            .await;

        let conn = pool.get().await.unwrap();
        CacheEntry::upsert(&conn, "1.1.1.1", BODY).await.unwrap();
        drop(conn);

        let provider = IpApi::with_endpoint(pool, format!("{}/json", server.uri())).unwrap();

        let payload = provider.lookup("1.1.1.1").await.unwrap();
        assert_eq!(payload.country_code, "AU");
    }

    #[tokio::test]
    async fn missing_fields_are_a_parse_error() {
        let (_dir, pool) = temp_pool();
        let server = MockServer::start().await;
        // ip-api.com reports failures in-band with a 200 status
        Mock::given(method("GET"))
            .and(path("/json/bad-query"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"status":"fail","message":"invalid query"}"#,
                "application/json",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let provider = IpApi::with_endpoint(pool, format!("{}/json", server.uri())).unwrap();

        let err = provider.lookup("bad-query").await.err().unwrap();
        assert_eq!(err.code(), "parse_error");
    }
}
