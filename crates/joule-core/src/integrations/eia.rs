//! EIA Open Data v2 client for residential natural gas prices.

use reqwest::Client;
use tracing::info;

use super::traits::ApiService;
use super::{build_url, get_text, keyring_store};
use crate::error::{ApiError, CoreError, ValidationError};
use crate::gas::{self, GasPrice};

const SERVICE: &str = "eia";
const CREDENTIAL_KEY: &str = "eia_api_key";

pub const DEFAULT_BASE_URL: &str = "https://api.eia.gov/v2/natural-gas/pri/sum/data/";
/// Monthly rows requested; the newest one with a value is used.
const HISTORY_MONTHS: u32 = 12;

pub struct EiaClient {
    base_url: String,
    api_key: Option<String>,
    http_client: Client,
}

impl Default for EiaClient {
    fn default() -> Self {
        Self::new()
    }
}

impl EiaClient {
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

    /// Latest monthly residential price for a two-letter state code.
    pub async fn residential_price(&self, state: &str) -> Result<GasPrice, CoreError> {
        let state = state.trim().to_uppercase();
        if state.len() != 2 || !state.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidValue {
                field: "state".to_string(),
                message: format!("expected a two-letter state code, got '{state}'"),
            }
            .into());
        }
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
                ("api_key", api_key.to_string()),
                ("frequency", "monthly".to_string()),
                ("data[0]", "value".to_string()),
                ("facets[duoarea][]", format!("S{state}")),
                ("facets[process][]", "PRS".to_string()),
                ("sort[0][column]", "period".to_string()),
                ("sort[0][direction]", "desc".to_string()),
                ("length", HISTORY_MONTHS.to_string()),
            ],
        )?;
        let body = get_text(&self.http_client, SERVICE, url).await?;
        let price = gas::parse_eia_price_response(&body)?;
        info!(state = %state, period = %price.period, per_therm = price.dollars_per_therm, "fetched gas price");
        Ok(price)
    }
}

impl ApiService for EiaClient {
    fn name(&self) -> &str {
        SERVICE
    }

    fn display_name(&self) -> &str {
        "EIA Natural Gas Prices"
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
    use indoc::indoc;
    use mockito::Matcher;

    const BODY: &str = indoc! {r#"
        {"response": {"data": [
          {"period": "2024-02", "duoarea": "SCO", "value": null},
          {"period": "2024-01", "duoarea": "SCO", "value": "10.37"},
          {"period": "2023-12", "duoarea": "SCO", "value": 9.8}
        ]}}
    "#};

    #[tokio::test]
    async fn fetches_state_price() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v2/natural-gas/pri/sum/data/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("facets[duoarea][]".into(), "SCO".into()),
                Matcher::UrlEncoded("facets[process][]".into(), "PRS".into()),
                Matcher::UrlEncoded("api_key".into(), "abc".into()),
            ]))
            .with_body(BODY)
            .create_async()
            .await;

        let client = EiaClient::with_api_key(
            &format!("{}/v2/natural-gas/pri/sum/data/", server.url()),
            "abc",
        );
        let price = client.residential_price("co").await.unwrap();
        assert_eq!(price.period, "2024-01");
        assert_eq!(price.dollars_per_therm, 1.0);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejects_bad_state_before_request() {
        let client = EiaClient::with_api_key("http://127.0.0.1:9/", "abc");
        let err = client.residential_price("Colorado").await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn unauthorized_status_surfaces() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/data/")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body("invalid api_key")
            .create_async()
            .await;

        let client = EiaClient::with_api_key(&format!("{}/data/", server.url()), "bad");
        let err = client.residential_price("TX").await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Api(ApiError::Status { status: 403, .. })
        ));
    }
}
