use deadpool_diesel::{InteractError, PoolError};
use diesel::result::Error as DieselError;
use geohash::GeohashError;
use isahc::http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("DeadPoolError: {0}")]
    DeadPool(DeadPoolError),
    #[error("DieselError: {0}")]
    Diesel(#[from] DieselError),
    #[error("Isahc Error: {0}")]
    Isahc(#[from] isahc::Error),
    #[error("{0}")]
    IOError(#[from] std::io::Error),
    #[error("JsonError: {0}")]
    Json(#[from] serde_json::Error),
    #[error("GeohashError: {0}")]
    Geohash(#[from] GeohashError),
    #[error("Failed to parse coordinate : {0}")]
    CoordParseError(String),
    #[error("upstream answered with status {0}")]
    UpstreamStatus(StatusCode),
    #[error("geo cache unavailable: {0}")]
    Storage(String),
    #[error("no such provider: {0}")]
    NoSuchProvider(String),
}

impl Error {
    pub fn coord_parse_error(value: impl Into<String>) -> Self {
        Self::CoordParseError(value.into())
    }

    pub fn storage(err: impl ToString) -> Self {
        Self::Storage(err.to_string())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Error::DeadPool(_) => "storage_error",
            Error::Diesel(_) => "storage_error",
            Error::Storage(_) => "storage_error",
            Error::Isahc(_) => "network_error",
            Error::UpstreamStatus(_) => "network_error",
            Error::IOError(_) => "io_error",
            Error::Json(_) => "parse_error",
            Error::Geohash(_) => "parse_error",
            Error::CoordParseError(_) => "parse_error",
            Error::NoSuchProvider(_) => "no_such_provider",
        }
    }
}

impl<E> From<E> for Error
where
    E: Into<DeadPoolError>,
{
    fn from(e: E) -> Self {
        Self::DeadPool(e.into())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeadPoolError {
    #[error("InteractError: {0}")]
    Interact(#[from] InteractError),
    #[error("PoolError: {0}")]
    Pool(#[from] PoolError),
}
