//! End-to-end tests for the report pipeline against a mock Google backend.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use browser_report::report::read_report;
use browser_report::{
    oauth2_config, query_config, AnalyticsClientConfig, AnalyticsError, AuthEvent, AuthState,
    BrowserReportClient, InMemoryEventSink, PollPolicy, QueryConfig,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REPORTING_PATH: &str = "/analytics/v3/data/ga";

struct Fixture {
    server: MockServer,
    dir: TempDir,
    events: Arc<InMemoryEventSink>,
}

impl Fixture {
    async fn new() -> Self {
        Self {
            server: MockServer::start().await,
            dir: tempfile::tempdir().expect("tempdir"),
            events: Arc::new(InMemoryEventSink::new()),
        }
    }

    fn token_file(&self) -> PathBuf {
        self.dir.path().join("tokens.json")
    }

    fn output_file(&self) -> PathBuf {
        self.dir.path().join("reports/browsers.json")
    }

    fn write_tokens(&self, access: &str, refresh: &str) {
        let body = json!({"access_token": access, "refresh_token": refresh});
        std::fs::write(self.token_file(), body.to_string()).expect("write tokens");
    }

    fn read_tokens(&self) -> serde_json::Value {
        let contents = std::fs::read_to_string(self.token_file()).expect("read tokens");
        serde_json::from_str(&contents).expect("token json")
    }

    fn query(&self) -> QueryConfig {
        query_config()
            .view_id("42124519")
            .metric("ga:sessions")
            .days(30)
            .threshold(0.0)
            .output_file(self.output_file())
            .build()
            .expect("query config")
    }

    fn client(&self) -> BrowserReportClient {
        let oauth = oauth2_config()
            .client_id("test-client")
            .client_secret("test-secret")
            .device_authorization_endpoint(format!("{}/device/code", self.server.uri()))
            .token_endpoint(format!("{}/token", self.server.uri()))
            .poll_policy(PollPolicy {
                initial_backoff: Duration::ZERO,
                max_backoff: Duration::ZERO,
                ..Default::default()
            })
            .build()
            .expect("oauth config");
        let analytics = AnalyticsClientConfig {
            reporting_endpoint: format!("{}{}", self.server.uri(), REPORTING_PATH),
            ..Default::default()
        };

        BrowserReportClient::new(oauth, analytics, self.token_file())
            .expect("client")
            .with_event_sink(self.events.clone())
    }

    async fn mount_device_flow(&self, access: &str, refresh: &str) {
        Mock::given(method("POST"))
            .and(path("/device/code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "device_code": "dev-code",
                "user_code": "GQVQ-JKEC",
                "verification_url": "https://www.google.com/device",
                "expires_in": 1800,
                "interval": 0
            })))
            .expect(1)
            .mount(&self.server)
            .await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("device_code=dev-code"))
            .respond_with(
                ResponseTemplate::new(428).set_body_json(json!({"error": "authorization_pending"})),
            )
            .up_to_n_times(1)
            .mount(&self.server)
            .await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("device_code=dev-code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": access,
                "refresh_token": refresh,
                "expires_in": 3600,
                "token_type": "Bearer"
            })))
            .mount(&self.server)
            .await;
    }

    async fn mount_report(&self, access: &str) {
        Mock::given(method("GET"))
            .and(path(REPORTING_PATH))
            .and(query_param("access_token", access))
            .and(query_param("ids", "ga:42124519"))
            .and(query_param("dimensions", "ga:browser,ga:browserVersion"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "rows": [
                    ["Chrome", "50.0.2661.102", "60"],
                    ["Chrome", "50.0.2661.94", "10"],
                    ["Firefox", "46.0", "20"],
                    ["Safari", "601.1.56", "10"]
                ],
                "totalsForAllResults": {"ga:sessions": "100"}
            })))
            .expect(1)
            .mount(&self.server)
            .await;
    }
}

fn assert_no_report(path: &Path) {
    assert!(!path.exists(), "report must not be written: {}", path.display());
}

#[tokio::test]
async fn test_first_run_authorizes_and_writes_report() {
    // Arrange
    let fixture = Fixture::new().await;
    fixture.mount_device_flow("ya29.first", "1//first").await;
    fixture.mount_report("ya29.first").await;
    let mut client = fixture.client();

    // Act
    let report = client.run(&fixture.query()).await.expect("run");

    // Assert
    assert_eq!(client.auth_state(), AuthState::Authenticated);
    assert_eq!(
        fixture.read_tokens(),
        json!({"access_token": "ya29.first", "refresh_token": "1//first"})
    );
    assert_eq!(report.total, 100);
    assert_eq!(report.metric, "sessions");
    assert_eq!(report.view_id, "42124519");
    assert_eq!(report.browsers[0].name, "Chrome");
    assert_eq!(report.browsers[0].count, 70);
    assert_eq!(report.versions[0].version, "50.0");
    assert_eq!(report.versions[0].percent_of_browser, 100.0);

    let written = read_report(&fixture.output_file()).await.expect("report file");
    assert_eq!(written, report);

    let events = fixture.events.events();
    assert!(events.contains(&AuthEvent::DeviceCodeIssued {
        user_code: "GQVQ-JKEC".to_string(),
        verification_url: "https://www.google.com/device".to_string(),
    }));
    assert!(events.contains(&AuthEvent::AuthorizationPending { attempt: 1 }));
}

#[tokio::test]
async fn test_expired_access_token_triggers_exactly_one_refresh() {
    // Arrange
    let fixture = Fixture::new().await;
    fixture.write_tokens("ya29.stale", "1//keep");

    Mock::given(method("GET"))
        .and(path(REPORTING_PATH))
        .and(query_param("access_token", "ya29.stale"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"code": 401, "message": "Invalid Credentials"}
        })))
        .expect(1)
        .mount(&fixture.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=1%2F%2Fkeep"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.fresh",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&fixture.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/device/code"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&fixture.server)
        .await;

    fixture.mount_report("ya29.fresh").await;
    let mut client = fixture.client();

    // Act
    client.run(&fixture.query()).await.expect("run");

    // Assert
    assert_eq!(
        fixture.read_tokens(),
        json!({"access_token": "ya29.fresh", "refresh_token": "1//keep"})
    );
    assert_eq!(fixture.events.count(|e| *e == AuthEvent::Refreshed), 1);
    assert!(fixture.output_file().exists());
}

#[tokio::test]
async fn test_rejected_refresh_falls_back_to_device_flow() {
    // Arrange
    let fixture = Fixture::new().await;
    fixture.write_tokens("ya29.stale", "1//revoked");

    Mock::given(method("GET"))
        .and(path(REPORTING_PATH))
        .and(query_param("access_token", "ya29.stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&fixture.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked."
        })))
        .expect(1)
        .mount(&fixture.server)
        .await;

    fixture.mount_device_flow("ya29.new", "1//new").await;
    fixture.mount_report("ya29.new").await;
    let mut client = fixture.client();

    // Act
    client.run(&fixture.query()).await.expect("run");

    // Assert
    assert_eq!(
        fixture.read_tokens(),
        json!({"access_token": "ya29.new", "refresh_token": "1//new"})
    );
    assert_eq!(
        fixture.events.count(|e| *e == AuthEvent::RefreshRejected { status: 400 }),
        1
    );
}

#[tokio::test]
async fn test_unexpected_reporting_status_reauthorizes_once() {
    // Arrange
    let fixture = Fixture::new().await;
    fixture.write_tokens("ya29.old", "1//old");

    Mock::given(method("GET"))
        .and(path(REPORTING_PATH))
        .and(query_param("access_token", "ya29.old"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&fixture.server)
        .await;

    fixture.mount_device_flow("ya29.re", "1//re").await;
    fixture.mount_report("ya29.re").await;
    let mut client = fixture.client();

    // Act
    client.run(&fixture.query()).await.expect("run");

    // Assert
    assert_eq!(
        fixture
            .events
            .count(|e| matches!(e, AuthEvent::Reauthorizing { .. })),
        1
    );
}

#[tokio::test]
async fn test_persistent_unexpected_status_is_fatal() {
    // Arrange
    let fixture = Fixture::new().await;
    fixture.write_tokens("ya29.old", "1//old");

    Mock::given(method("GET"))
        .and(path(REPORTING_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&fixture.server)
        .await;

    fixture.mount_device_flow("ya29.re", "1//re").await;
    let mut client = fixture.client();

    // Act
    let err = client.run(&fixture.query()).await.unwrap_err();

    // Assert
    assert_eq!(err.error_code(), "REPORT_PROTOCOL");
    assert_no_report(&fixture.output_file());
}

#[tokio::test]
async fn test_api_error_body_is_fatal_and_writes_nothing() {
    // Arrange
    let fixture = Fixture::new().await;
    fixture.write_tokens("ya29.ok", "1//ok");

    Mock::given(method("GET"))
        .and(path(REPORTING_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {"code": 403, "message": "User does not have any Google Analytics account."}
        })))
        .expect(1)
        .mount(&fixture.server)
        .await;
    let mut client = fixture.client();

    // Act
    let err = client.run(&fixture.query()).await.unwrap_err();

    // Assert
    assert!(matches!(err, AnalyticsError::Api { code: 403, .. }));
    assert_no_report(&fixture.output_file());
}

#[tokio::test]
async fn test_malformed_report_body_is_fatal_without_reauthorization() {
    // Arrange
    let fixture = Fixture::new().await;
    fixture.write_tokens("ya29.ok", "1//ok");

    Mock::given(method("GET"))
        .and(path(REPORTING_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rows": [["Chrome", "50.0", "1"]]
        })))
        .expect(1)
        .mount(&fixture.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/device/code"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&fixture.server)
        .await;
    let mut client = fixture.client();

    // Act
    let err = client.run(&fixture.query()).await.unwrap_err();

    // Assert
    assert!(matches!(err, AnalyticsError::Protocol(_)));
    assert_eq!(
        fixture
            .events
            .count(|e| matches!(e, AuthEvent::Reauthorizing { .. })),
        0
    );
    assert_eq!(fixture.read_tokens(), json!({"access_token": "ya29.ok", "refresh_token": "1//ok"}));
    assert_no_report(&fixture.output_file());
}

#[tokio::test]
async fn test_partial_token_file_runs_device_flow() {
    // Arrange
    let fixture = Fixture::new().await;
    std::fs::write(fixture.token_file(), r#"{"access_token":"only-access"}"#).unwrap();
    fixture.mount_device_flow("ya29.full", "1//full").await;
    fixture.mount_report("ya29.full").await;
    let mut client = fixture.client();

    // Act
    client.run(&fixture.query()).await.expect("run");

    // Assert
    assert_eq!(
        fixture.read_tokens(),
        json!({"access_token": "ya29.full", "refresh_token": "1//full"})
    );
}

#[tokio::test]
async fn test_access_denied_is_fatal() {
    // Arrange
    let fixture = Fixture::new().await;

    Mock::given(method("POST"))
        .and(path("/device/code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "device_code": "dev-code",
            "user_code": "GQVQ-JKEC",
            "verification_url": "https://www.google.com/device",
            "expires_in": 1800,
            "interval": 0
        })))
        .mount(&fixture.server)
        .await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": "access_denied",
            "error_description": "Forbidden"
        })))
        .expect(1)
        .mount(&fixture.server)
        .await;
    let mut client = fixture.client();

    // Act
    let err = client.run(&fixture.query()).await.unwrap_err();

    // Assert
    assert!(matches!(
        err,
        AnalyticsError::DeviceFlow(browser_report::DeviceFlowError::AccessDenied { .. })
    ));
    assert_eq!(client.auth_state(), AuthState::Unauthenticated);
    assert!(!fixture.token_file().exists());
    assert_no_report(&fixture.output_file());
}
