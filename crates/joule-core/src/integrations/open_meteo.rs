//! Open-Meteo forecast and historical archive client. No API key needed.

use chrono::{Datelike, Duration, NaiveDate};
use reqwest::Client;
use tracing::{debug, warn};

use super::traits::ApiService;
use super::{build_url, get_text};
use crate::error::{ApiError, CoreError, ValidationError};
use crate::weather::{self, DailyWeather};

const SERVICE: &str = "open-meteo";

pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_ARCHIVE_URL: &str = "https://archive-api.open-meteo.com/v1/archive";
/// Days returned by the forecast endpoint.
pub const FORECAST_DAYS: u32 = 15;

pub struct OpenMeteoClient {
    forecast_url: String,
    archive_url: String,
    http_client: Client,
}

impl Default for OpenMeteoClient {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenMeteoClient {
    pub fn new() -> Self {
        Self::with_base_urls(DEFAULT_FORECAST_URL, DEFAULT_ARCHIVE_URL)
    }

    pub fn with_base_urls(forecast_url: &str, archive_url: &str) -> Self {
        Self {
            forecast_url: forecast_url.to_string(),
            archive_url: archive_url.to_string(),
            http_client: Client::new(),
        }
    }

    /// Daily highs/lows and mean humidity for the next 15 days.
    pub async fn forecast(&self, lat: f64, lon: f64) -> Result<Vec<DailyWeather>, CoreError> {
        let url = build_url(
            SERVICE,
            &self.forecast_url,
            &[
                ("latitude", lat.to_string()),
                ("longitude", lon.to_string()),
                ("daily", "temperature_2m_max,temperature_2m_min".to_string()),
                ("hourly", "relativehumidity_2m".to_string()),
                ("temperature_unit", "fahrenheit".to_string()),
                ("timezone", "auto".to_string()),
                ("forecast_days", FORECAST_DAYS.to_string()),
            ],
        )?;
        let body = get_text(&self.http_client, SERVICE, url).await?;
        Ok(weather::parse_forecast_response(&body)?)
    }

    /// Observed daily highs/lows for `start..=end`.
    pub async fn archive(
        &self,
        lat: f64,
        lon: f64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyWeather>, CoreError> {
        if end < start {
            return Err(ValidationError::InvalidValue {
                field: "end_date".to_string(),
                message: format!("{end} is before {start}"),
            }
            .into());
        }
        let url = build_url(
            SERVICE,
            &self.archive_url,
            &[
                ("latitude", lat.to_string()),
                ("longitude", lon.to_string()),
                ("start_date", start.format("%Y-%m-%d").to_string()),
                ("end_date", end.format("%Y-%m-%d").to_string()),
                ("daily", "temperature_2m_max,temperature_2m_min".to_string()),
                ("temperature_unit", "fahrenheit".to_string()),
                ("timezone", "auto".to_string()),
            ],
        )?;
        let body = get_text(&self.http_client, SERVICE, url).await?;
        Ok(weather::parse_archive_response(&body)?)
    }

    /// Every day of `year-month`. The forecast supplies upcoming days; when
    /// the month is the current one, the archive supplies the days before
    /// `today` and wins over forecast values for the same date. Days neither
    /// source covers get the placeholder weather.
    pub async fn fetch_month(
        &self,
        lat: f64,
        lon: f64,
        year: i32,
        month: u32,
        today: NaiveDate,
    ) -> Result<Vec<DailyWeather>, CoreError> {
        weather::days_in_month(year, month)?;
        let mut days = self.forecast(lat, lon).await?;

        let is_current = today.year() == year && today.month() == month;
        if is_current && today.day() > 1 {
            let first = today.with_day(1).unwrap_or(today);
            let yesterday = today - Duration::days(1);
            match self.archive(lat, lon, first, yesterday).await {
                Ok(observed) => {
                    debug!(days = observed.len(), "merged archive weather");
                    days.extend(observed);
                }
                Err(e) => warn!(error = %e, "archive weather unavailable, using forecast only"),
            }
        }

        Ok(weather::complete_month(year, month, &days)?)
    }
}

impl ApiService for OpenMeteoClient {
    fn name(&self) -> &str {
        SERVICE
    }

    fn display_name(&self) -> &str {
        "Open-Meteo"
    }

    fn set_credentials(&mut self, _api_key: &str) -> Result<(), ApiError> {
        Err(ApiError::Keyring(format!(
            "{} does not use an API key",
            self.display_name()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use mockito::Matcher;

    const FORECAST: &str = indoc! {r#"
        {
          "daily": {
            "time": ["2024-01-10", "2024-01-11"],
            "temperature_2m_max": [40.0, 44.0],
            "temperature_2m_min": [20.0, 24.0]
          },
          "hourly": {
            "time": ["2024-01-10T00:00", "2024-01-10T12:00", "2024-01-11T00:00"],
            "relativehumidity_2m": [70, 80, 50]
          }
        }
    "#};

    const ARCHIVE: &str = indoc! {r#"
        {
          "daily": {
            "time": ["2024-01-01", "2024-01-10"],
            "temperature_2m_max": [30.0, 36.0],
            "temperature_2m_min": [10.0, 16.0]
          }
        }
    "#};

    fn client(server: &mockito::Server) -> OpenMeteoClient {
        OpenMeteoClient::with_base_urls(
            &format!("{}/v1/forecast", server.url()),
            &format!("{}/v1/archive", server.url()),
        )
    }

    #[test]
    fn keyless_service_refuses_credentials() {
        let mut client = OpenMeteoClient::new();
        assert!(client.is_authenticated());
        assert!(matches!(
            client.set_credentials("abc"),
            Err(ApiError::Keyring(_))
        ));
        assert!(client.disconnect().is_ok());
    }

    #[tokio::test]
    async fn forecast_sends_fahrenheit_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/forecast")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("temperature_unit".into(), "fahrenheit".into()),
                Matcher::UrlEncoded("forecast_days".into(), "15".into()),
                Matcher::UrlEncoded("latitude".into(), "39.7".into()),
            ]))
            .with_status(200)
            .with_body(FORECAST)
            .create_async()
            .await;

        let days = client(&server).forecast(39.7, -105.0).await.unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].humidity_pct, 75.0);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn current_month_merges_archive() {
        let mut server = mockito::Server::new_async().await;
        let _f = server
            .mock("GET", "/v1/forecast")
            .match_query(Matcher::Any)
            .with_body(FORECAST)
            .create_async()
            .await;
        let archive = server
            .mock("GET", "/v1/archive")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("start_date".into(), "2024-01-01".into()),
                Matcher::UrlEncoded("end_date".into(), "2024-01-10".into()),
            ]))
            .with_body(ARCHIVE)
            .create_async()
            .await;

        let today = NaiveDate::from_ymd_opt(2024, 1, 11).unwrap();
        let days = client(&server)
            .fetch_month(39.7, -105.0, 2024, 1, today)
            .await
            .unwrap();
        archive.assert_async().await;

        assert_eq!(days.len(), 31);
        assert_eq!(days[0].high_f, 30.0);
        // archive overrides the forecast for the 10th
        assert_eq!(days[9].high_f, 36.0);
        assert_eq!(days[10].high_f, 44.0);
        assert_eq!(days[20].avg_f, weather::FALLBACK_AVG_F);
    }

    #[tokio::test]
    async fn archive_failure_is_tolerated() {
        let mut server = mockito::Server::new_async().await;
        let _f = server
            .mock("GET", "/v1/forecast")
            .match_query(Matcher::Any)
            .with_body(FORECAST)
            .create_async()
            .await;
        let _a = server
            .mock("GET", "/v1/archive")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let today = NaiveDate::from_ymd_opt(2024, 1, 11).unwrap();
        let days = client(&server)
            .fetch_month(39.7, -105.0, 2024, 1, today)
            .await
            .unwrap();
        assert_eq!(days.len(), 31);
        assert_eq!(days[0].avg_f, weather::FALLBACK_AVG_F);
        assert_eq!(days[9].high_f, 40.0);
    }

    #[tokio::test]
    async fn forecast_failure_propagates() {
        let mut server = mockito::Server::new_async().await;
        let _f = server
            .mock("GET", "/v1/forecast")
            .match_query(Matcher::Any)
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;

        let today = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let err = client(&server)
            .fetch_month(39.7, -105.0, 2024, 2, today)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("429"));
    }
}
