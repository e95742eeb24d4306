//! HTTP clients for the third-party data sources: Open-Meteo weather,
//! OpenEI utility rates and EIA natural gas prices.
//!
//! Response bodies are handed to the pure parsers in `weather`, `rates` and
//! `gas`; the clients only build requests and check status codes.

pub mod eia;
pub mod open_meteo;
pub mod openei;
pub mod traits;

pub use eia::EiaClient;
pub use open_meteo::OpenMeteoClient;
pub use openei::OpenEiClient;
pub use traits::ApiService;

use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::error::ApiError;

/// Longest response excerpt carried in a status error.
const ERROR_BODY_LIMIT: usize = 300;

/// Thin wrapper around the OS keyring for credential storage.
pub mod keyring_store {
    use crate::error::ApiError;

    const SERVICE: &str = "joule";

    pub fn get(key: &str) -> Result<Option<String>, ApiError> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        match entry.get_password() {
            Ok(pw) => Ok(Some(pw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set(key: &str, value: &str) -> Result<(), ApiError> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        entry.set_password(value)?;
        Ok(())
    }

    pub fn delete(key: &str) -> Result<(), ApiError> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Build `base?k=v&...`, rejecting an unparsable base URL.
pub(crate) fn build_url(service: &str, base: &str, params: &[(&str, String)]) -> Result<Url, ApiError> {
    let mut url = Url::parse(base)
        .map_err(|e| ApiError::malformed(service, format!("bad base URL '{base}': {e}")))?;
    url.query_pairs_mut()
        .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
    Ok(url)
}

/// GET `url` and return the body of a 2xx response.
pub(crate) async fn get_text(client: &Client, service: &str, url: Url) -> Result<String, ApiError> {
    debug!(service, host = url.host_str().unwrap_or_default(), path = url.path(), "GET");
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| ApiError::request(service, e))?;
    let status = resp.status();
    let body = resp.text().await.map_err(|e| ApiError::request(service, e))?;
    if !status.is_success() {
        let body: String = body.chars().take(ERROR_BODY_LIMIT).collect();
        return Err(ApiError::Status {
            service: service.to_string(),
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}
