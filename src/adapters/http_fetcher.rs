use crate::domain::model::{FetchOutcome, ReportTarget};
use crate::domain::ports::ReportSource;
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// 從靜態檔案主機（GitHub raw）抓取每日報告
#[derive(Debug, Clone)]
pub struct HttpReportFetcher {
    client: Client,
}

impl HttpReportFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("vigilintel-connector/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReportSource for HttpReportFetcher {
    async fn fetch(&self, target: &ReportTarget) -> FetchOutcome {
        tracing::debug!("Fetching {}", target.url);

        let response = match self.client.get(&target.url).send().await {
            Ok(response) => response,
            Err(e) => return FetchOutcome::TransportError(e.to_string()),
        };

        let status = response.status();
        tracing::debug!("Report host responded {} for {}", status, target.url);

        if status == StatusCode::NOT_FOUND {
            return FetchOutcome::NotFound;
        }
        if !status.is_success() {
            return FetchOutcome::TransportError(format!("unexpected HTTP status {}", status));
        }

        match response.bytes().await {
            Ok(body) => FetchOutcome::Payload(body.to_vec()),
            Err(e) => FetchOutcome::TransportError(format!("failed to read body: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{report_url_template, Language};
    use chrono::NaiveDate;
    use httpmock::prelude::*;

    fn target_for(server: &MockServer, language: Language) -> ReportTarget {
        let template = report_url_template(&server.base_url());
        ReportTarget::new(NaiveDate::from_ymd_opt(2026, 2, 8).unwrap(), language, &template)
    }

    fn fetcher() -> HttpReportFetcher {
        HttpReportFetcher::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_payload() {
        let server = MockServer::start();
        let body = r#"{"type":"bundle","objects":[{"type":"report"}]}"#;
        let report_mock = server.mock(|when, then| {
            when.method(GET).path("/2026/02/2026-02-08-report.stix_fr.json");
            then.status(200).body(body);
        });

        let outcome = fetcher().fetch(&target_for(&server, Language::French)).await;

        report_mock.assert();
        assert_eq!(outcome, FetchOutcome::Payload(body.as_bytes().to_vec()));
    }

    #[tokio::test]
    async fn test_fetch_not_found() {
        let server = MockServer::start();
        let report_mock = server.mock(|when, then| {
            when.method(GET).path("/2026/02/2026-02-08-report.stix_en.json");
            then.status(404).body("404: Not Found");
        });

        let outcome = fetcher().fetch(&target_for(&server, Language::English)).await;

        report_mock.assert();
        assert_eq!(outcome, FetchOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_fetch_server_error_is_transport_error() {
        let server = MockServer::start();
        let report_mock = server.mock(|when, then| {
            when.method(GET).path("/2026/02/2026-02-08-report.stix_fr.json");
            then.status(503);
        });

        let outcome = fetcher().fetch(&target_for(&server, Language::French)).await;

        report_mock.assert();
        match outcome {
            FetchOutcome::TransportError(cause) => assert!(cause.contains("503")),
            other => panic!("expected transport error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_transport_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET);
            then.status(200).delay(Duration::from_millis(500)).body("{}");
        });

        let fetcher = HttpReportFetcher::new(Duration::from_millis(50)).unwrap();
        let outcome = fetcher.fetch(&target_for(&server, Language::French)).await;

        assert!(matches!(outcome, FetchOutcome::TransportError(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let template = report_url_template("http://127.0.0.1:9");
        let target = ReportTarget::new(
            NaiveDate::from_ymd_opt(2026, 2, 8).unwrap(),
            Language::French,
            &template,
        );

        let outcome = fetcher().fetch(&target).await;
        assert!(matches!(outcome, FetchOutcome::TransportError(_)));
    }
}
