//! Webex Forwarder - Realtime Event Relay
//!
//! Authenticates with an access token, listens to realtime platform events
//! and POSTs each one as JSON to `http://{target}:{port}/`. Meant as a
//! stand-in for webhooks on machines that are not reachable from the
//! internet.
//!
//! # Usage
//!
//! ```bash
//! # Interactive: prompts for token, port, resource and event
//! webex-forwarder
//!
//! # Ask for the target host as well
//! webex-forwarder --prompt-target
//!
//! # Firehose: every resource, every event, no prompts
//! TOKEN=... PORT=8080 webex-forwarder
//!
//! # Firehose to another host
//! TOKEN=... PORT=8080 TARGET=10.0.0.5 webex-forwarder
//! ```
//!
//! Ctrl+C stops every listener and exits once none is left running.

mod console;
mod prompt;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::Parser;
use tokio::{
    io::BufReader,
    signal::unix::{SignalKind, signal},
};
use tracing_subscriber::EnvFilter;
use webex_common::{
    ConfigBuilder, EventSource, ForwardConfig, HttpForwarder, ListenerRegistry, WebexClient,
    config::{parse_port, parse_target},
    platform::{DEFAULT_API_URL, DEFAULT_DEVICE_URL},
    verify_credential,
};

use prompt::{Gathered, Prompter};

/// Relays realtime Webex events to an HTTP endpoint.
#[derive(Parser, Debug, Clone)]
#[command(name = "webex-forwarder")]
#[command(about = "Relays realtime Webex events to an HTTP endpoint")]
struct Args {
    /// Access token. Together with the port, skips the prompts and forwards every event.
    #[arg(long, env = "TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Port events are forwarded to.
    #[arg(short, long, env = "PORT")]
    port: Option<String>,

    /// Host events are forwarded to.
    #[arg(short, long, env = "TARGET")]
    target: Option<String>,

    /// Ask for the target host interactively.
    #[arg(long)]
    prompt_target: bool,

    /// Base URL of the platform REST API.
    #[arg(long, env = "WEBEX_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Device registration endpoint used to open the realtime connection.
    #[arg(long, env = "WEBEX_DEVICE_URL", default_value = DEFAULT_DEVICE_URL)]
    device_url: String,

    /// Skip the welcome banner.
    #[arg(long)]
    no_banner: bool,
}

impl Args {
    fn client(&self, token: &str) -> Arc<dyn EventSource> {
        Arc::new(WebexClient::with_urls(
            token,
            self.api_url.as_str(),
            self.device_url.as_str(),
        ))
    }
}

/// Initializes logging on stderr so prompts keep stdout to themselves.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// TOKEN and PORT from the environment: forward everything, ask nothing.
///
/// `connect` builds the platform client for the token.
async fn firehose(
    token: &str,
    port: &str,
    target: Option<&str>,
    connect: impl FnOnce(&str) -> Arc<dyn EventSource>,
) -> anyhow::Result<(ForwardConfig, Arc<dyn EventSource>)> {
    let port = parse_port(port).map_err(|e| anyhow!("invalid PORT {port:?}: {e}"))?;
    let source = connect(token);

    verify_credential(source.as_ref()).await?;

    let mut builder = ConfigBuilder::new().credential(token).port(port).firehose();
    if let Some(target) = target {
        let target = parse_target(target).map_err(|e| anyhow!("invalid TARGET: {e}"))?;
        builder = builder.target(target);
    }

    Ok((builder.build()?, source))
}

async fn interactive(args: &Args) -> anyhow::Result<(ForwardConfig, Arc<dyn EventSource>)> {
    if !args.no_banner {
        println!("{}", console::banner());
    }

    let mut prompter = Prompter::new(BufReader::new(tokio::io::stdin()), std::io::stdout());
    let Gathered {
        config,
        source,
        person,
    } = prompt::gather(
        &mut prompter,
        |token| args.client(token),
        args.prompt_target,
        args.target.clone(),
    )
    .await?;
    tracing::debug!(id = %person.id, emails = ?person.emails, "operator identified");

    Ok((config, source))
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() -> std::io::Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = sigterm.recv() => Ok(()),
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let (config, source) = match (&args.token, &args.port) {
        (Some(token), Some(port)) => {
            firehose(token, port, args.target.as_deref(), |t| args.client(t)).await?
        }
        _ => interactive(&args).await?,
    };
    tracing::debug!(?config, "configuration complete");

    let forwarder = Arc::new(HttpForwarder::new(&config));
    let mut registry = ListenerRegistry::new(source, forwarder);

    if let Err(e) = registry.start_all(&config.selection).await {
        registry.shutdown().await;
        return Err(e).context("failed to start listeners");
    }
    tracing::info!(
        "{} listener(s) forwarding to {}",
        registry.active(),
        config.forward_url()
    );

    shutdown_signal()
        .await
        .context("failed to install signal handler")?;

    let remaining = registry.shutdown().await;
    if remaining != 0 {
        return Err(anyhow!("{remaining} listener(s) still running"));
    }

    tracing::info!("all listeners stopped");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            // -1 as seen by the parent shell
            ExitCode::from(255)
        }
    }
}
