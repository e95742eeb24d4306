//! OpenEI Utility Rate Database client.

use reqwest::Client;
use tracing::info;

use super::traits::ApiService;
use super::{build_url, get_text, keyring_store};
use crate::error::{ApiError, CoreError};
use crate::rates::{self, RateSchedule};

const SERVICE: &str = "openei";
const CREDENTIAL_KEY: &str = "openei_api_key";

pub const DEFAULT_BASE_URL: &str = "https://api.openei.org/utility_rates";

pub struct OpenEiClient {
    base_url: String,
    api_key: Option<String>,
    http_client: Client,
}

impl Default for OpenEiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenEiClient {
    /// Load the stored key from the OS keyring (none if absent).
    pub fn new() -> Self {
        let api_key = keyring_store::get(CREDENTIAL_KEY).ok().flatten();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            http_client: Client::new(),
        }
    }

    /// Client with an explicit key that never touches the keyring.
    pub fn with_api_key(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            api_key: Some(api_key.to_string()),
            http_client: Client::new(),
        }
    }

    pub fn base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    /// Most relevant approved residential schedule for a location.
    pub async fn fetch_residential(&self, lat: f64, lon: f64) -> Result<RateSchedule, CoreError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ApiError::NotAuthenticated {
                service: SERVICE.to_string(),
            })?;
        let url = build_url(
            SERVICE,
            &self.base_url,
            &[
                ("version", "3".to_string()),
                ("format", "json".to_string()),
                ("api_key", api_key.to_string()),
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("sector", "Residential".to_string()),
                ("detail", "full".to_string()),
                ("approved", "true".to_string()),
                ("limit", "1".to_string()),
            ],
        )?;
        let body = get_text(&self.http_client, SERVICE, url).await?;
        let schedule = rates::parse_openei_rate(&body)?;
        info!(name = %schedule.name, utility = %schedule.utility, "fetched rate schedule");
        Ok(schedule)
    }
}

impl ApiService for OpenEiClient {
    fn name(&self) -> &str {
        SERVICE
    }

    fn display_name(&self) -> &str {
        "OpenEI Utility Rates"
    }

    fn credential_key(&self) -> Option<&str> {
        Some(CREDENTIAL_KEY)
    }

    fn is_authenticated(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    fn set_credentials(&mut self, api_key: &str) -> Result<(), ApiError> {
        keyring_store::set(CREDENTIAL_KEY, api_key)?;
        self.api_key = Some(api_key.to_string());
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), ApiError> {
        keyring_store::delete(CREDENTIAL_KEY)?;
        self.api_key = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn response() -> String {
        let weekday = vec![vec![0u32; 24]; 12];
        let weekend = weekday.clone();
        json!({
            "items": [{
                "name": "Residential Service",
                "utility": "Acme Power",
                "fixedchargefirstmeter": 12.0,
                "fixedchargeunits": "$/month",
                "energyratestructure": [[{"rate": 0.11, "adj": 0.01}]],
                "energyweekdayschedule": weekday,
                "energyweekendschedule": weekend
            }]
        })
        .to_string()
    }

    #[tokio::test]
    async fn fetches_with_key_and_location() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/utility_rates")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("api_key".into(), "k123".into()),
                Matcher::UrlEncoded("sector".into(), "Residential".into()),
                Matcher::UrlEncoded("version".into(), "3".into()),
                Matcher::UrlEncoded("limit".into(), "1".into()),
            ]))
            .with_body(response())
            .create_async()
            .await;

        let client = OpenEiClient::with_api_key(&format!("{}/utility_rates", server.url()), "k123");
        assert!(client.is_authenticated());
        let schedule = client.fetch_residential(40.0, -105.0).await.unwrap();
        assert_eq!(schedule.utility, "Acme Power");
        assert_eq!(schedule.fixed_monthly_charge, 12.0);
        assert!((schedule.rate_at(1, 12, false, 0.0) - 0.12).abs() < 1e-9);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_key_is_not_authenticated() {
        let client = OpenEiClient::with_api_key("http://127.0.0.1:9/utility_rates", "");
        assert!(!client.is_authenticated());
        let err = client.fetch_residential(40.0, -105.0).await.unwrap_err();
        assert!(matches!(err, CoreError::Api(ApiError::NotAuthenticated { .. })));
    }

    #[tokio::test]
    async fn empty_item_list_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/utility_rates")
            .match_query(Matcher::Any)
            .with_body(r#"{"items": []}"#)
            .create_async()
            .await;

        let client = OpenEiClient::with_api_key(&format!("{}/utility_rates", server.url()), "k");
        let err = client.fetch_residential(40.0, -105.0).await.unwrap_err();
        assert!(matches!(err, CoreError::Api(ApiError::Malformed { .. })));
    }
}
