//! Browser Report Client
//!
//! High-level client that authorizes, runs the reporting query and writes the
//! report, recovering once from an expired access token and once from an
//! unexpected reporting status.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::{HttpTransport, ReqwestHttpTransport};
use crate::error::{AnalyticsError, ProtocolError};
use crate::flows::{AuthFlow, AuthState};
use crate::report::{JsonFileReportWriter, ReportGenerator, ReportWriter};
use crate::reporting::{AnalyticsDataFetcher, DataFetcher};
use crate::telemetry::{AuthEvent, EventSink};
use crate::token::{FileTokenStore, TokenStore};
use crate::types::{AnalyticsClientConfig, OAuth2Config, QueryConfig, RawResult, Report, Tokens};

/// Client for producing browser usage reports.
pub struct BrowserReportClient<
    T: HttpTransport = ReqwestHttpTransport,
    S: TokenStore = FileTokenStore,
    F: DataFetcher = AnalyticsDataFetcher<ReqwestHttpTransport>,
    W: ReportWriter = JsonFileReportWriter,
> {
    auth: AuthFlow<T, S>,
    fetcher: F,
    generator: ReportGenerator<W>,
}

impl
    BrowserReportClient<
        ReqwestHttpTransport,
        FileTokenStore,
        AnalyticsDataFetcher<ReqwestHttpTransport>,
        JsonFileReportWriter,
    >
{
    /// Create a client with the reqwest transport, a token file and JSON output.
    pub fn new(
        oauth: OAuth2Config,
        analytics: AnalyticsClientConfig,
        token_file: impl Into<PathBuf>,
    ) -> Result<Self, AnalyticsError> {
        let transport = Arc::new(ReqwestHttpTransport::with_options(
            oauth.timeout.max(analytics.timeout),
            crate::core::DEFAULT_MAX_RESPONSE_SIZE,
        )?);
        let store = Arc::new(FileTokenStore::new(token_file));
        let fetcher = AnalyticsDataFetcher::new(analytics, Arc::clone(&transport));

        Ok(Self::with_components(
            AuthFlow::new(oauth, transport, store),
            fetcher,
            JsonFileReportWriter::new(),
        ))
    }
}

impl<T: HttpTransport, S: TokenStore, F: DataFetcher, W: ReportWriter> BrowserReportClient<T, S, F, W> {
    /// Create a client with custom implementations.
    pub fn with_components(auth: AuthFlow<T, S>, fetcher: F, writer: W) -> Self {
        Self {
            auth,
            fetcher,
            generator: ReportGenerator::new(writer),
        }
    }

    /// Replace the event sink used for authorization events.
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.auth = self.auth.with_event_sink(events);
        self
    }

    pub fn auth_state(&self) -> AuthState {
        self.auth.state()
    }

    pub fn writer(&self) -> &W {
        self.generator.writer()
    }

    /// Authorize, query and write the report.
    ///
    /// Nothing is written unless the query succeeds.
    pub async fn run(&mut self, config: &QueryConfig) -> Result<Report, AnalyticsError> {
        let tokens = self.auth.authorize().await?;
        let result = self.query_with_recovery(config, tokens).await?;
        let report = self.generator.generate(config, &result).await?;
        info!(path = %config.output_file.display(), "Success! Report saved");
        Ok(report)
    }

    async fn query_with_recovery(
        &mut self,
        config: &QueryConfig,
        mut tokens: Tokens,
    ) -> Result<RawResult, AnalyticsError> {
        let mut refreshed = false;
        let mut reauthorized = false;

        loop {
            match self.fetcher.query(config, &tokens.access_token).await {
                Ok(result) => return Ok(result),
                Err(AnalyticsError::AuthExpired) if !refreshed => {
                    refreshed = true;
                    self.auth.events().record(&AuthEvent::AccessTokenExpired);
                    tokens = self.auth.refresh_access_token(&tokens.refresh_token).await?;
                }
                Err(AnalyticsError::Protocol(e @ ProtocolError::UnexpectedStatus { .. }))
                    if !reauthorized =>
                {
                    reauthorized = true;
                    warn!(error = %e, "Reporting query failed, re-authorizing");
                    tokens = self.auth.reauthorize(e.to_string()).await?;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
