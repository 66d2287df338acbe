//! browser-report CLI
//!
//! Authorize against Google with the device flow and write a browser usage
//! report for one Analytics view.
//!
//! # Usage
//!
//! ```bash
//! GA_CLIENT_ID=... GA_CLIENT_SECRET=... browser-report --view-id 42124519 --threshold 0.5
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use browser_report::token::DEFAULT_TOKEN_FILE;
use browser_report::{
    get_user_message, oauth2_config, query_config, AnalyticsClientConfig, AnalyticsError,
    OAuth2Config,
    AuthEvent, BrowserReportClient, EventSink, TracingEventSink,
};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "browser-report")]
#[command(version)]
#[command(about = "Browser usage report for a Google Analytics view")]
struct Cli {
    /// Analytics view id (with or without the `ga:` prefix)
    #[arg(long, env = "GA_VIEW_ID")]
    view_id: String,

    /// Metric to report on
    #[arg(long, default_value = browser_report::builders::DEFAULT_METRIC)]
    metric: String,

    /// Number of days, ending yesterday
    #[arg(long, default_value_t = browser_report::builders::DEFAULT_DAYS)]
    days: u32,

    /// Drop entries whose percent of total is not above this value
    #[arg(long, default_value_t = 0.0)]
    threshold: f64,

    /// Report file
    #[arg(short, long, default_value = browser_report::builders::DEFAULT_OUTPUT_FILE)]
    output: PathBuf,

    /// Token pair file
    #[arg(long, default_value = DEFAULT_TOKEN_FILE)]
    token_file: PathBuf,

    /// OAuth client id
    #[arg(long, env = "GA_CLIENT_ID")]
    client_id: String,

    /// OAuth client secret
    #[arg(long, env = "GA_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,

    /// Use the pre-RFC 8628 device grant (`code=` parameter)
    #[arg(long)]
    legacy_device_grant: bool,

    /// Enable debug output
    #[arg(short, long)]
    verbose: bool,
}

/// Shows the device code to the user, then logs like the default sink.
struct PromptingEventSink;

impl EventSink for PromptingEventSink {
    fn record(&self, event: &AuthEvent) {
        if let AuthEvent::DeviceCodeIssued {
            user_code,
            verification_url,
        } = event
        {
            eprintln!("To authorize, visit {} and enter the code: {}", verification_url, user_code);
        }
        TracingEventSink.record(event);
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "browser_report=debug"
    } else {
        "browser_report=info"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn oauth_config(cli: &Cli) -> Result<OAuth2Config> {
    let mut builder = oauth2_config().client_id(cli.client_id.clone());
    if let Some(secret) = &cli.client_secret {
        builder = builder.client_secret(secret.clone());
    }
    if cli.legacy_device_grant {
        builder = builder.legacy_device_grant();
    }
    builder.build().context("invalid OAuth configuration")
}

async fn run(cli: Cli) -> Result<()> {
    let oauth = oauth_config(&cli)?;

    let query = query_config()
        .view_id(cli.view_id)
        .metric(cli.metric)
        .days(cli.days)
        .threshold(cli.threshold)
        .output_file(cli.output)
        .build()
        .context("invalid query")?;

    let mut client = BrowserReportClient::new(oauth, AnalyticsClientConfig::default(), cli.token_file)?
        .with_event_sink(Arc::new(PromptingEventSink));

    let report = client.run(&query).await?;
    println!(
        "Success! Report saved to \"{}\" ({} browsers, {} versions)",
        query.output_file.display(),
        report.browsers.len(),
        report.versions.len()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<AnalyticsError>() {
                Some(error) => eprintln!("Error: {}", get_user_message(error)),
                None => eprintln!("Error: {:#}", e),
            }
            tracing::debug!(error = ?e, "Run failed");
            ExitCode::FAILURE
        }
    }
}
