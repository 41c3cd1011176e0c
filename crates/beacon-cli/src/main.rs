use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::info;

use beacon_agent::sanitize::quote;
use beacon_agent::util::{format_timestamp, now_millis};
use beacon_agent::{AgentConfig, ChannelSink, DeliveryTask, DeviceIdentityStore, fingerprint};
use beacon_db::SqlitePreferences;
use beacon_types::{EnvironmentSnapshot, RequestParameters};

const USAGE: &str = "usage: beacon-send <path> [key=value ...]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "beacon=debug,beacon_agent=debug".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((path, pairs)) = args.split_first() else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };
    let mut params = parse_params(pairs)?;

    // Config
    let config = Arc::new(AgentConfig::from_env());
    let prefs_path: PathBuf = std::env::var("BEACON_PREFS_PATH")
        .unwrap_or_else(|_| "beacon-prefs.db".into())
        .into();
    let snapshot = match std::env::var("BEACON_SNAPSHOT_PATH") {
        Ok(snapshot_path) => load_snapshot(&snapshot_path)?,
        Err(_) => EnvironmentSnapshot::default(),
    };

    // Identity and signature
    let prefs = SqlitePreferences::open(&prefs_path, &config.prefs_namespace)?;
    let identity = DeviceIdentityStore::new(prefs);
    identity.sign(&mut params);
    if params.get("created_at").is_none() {
        params.insert("created_at", format_timestamp(now_millis()));
    }
    let user_agent = fingerprint::build(&snapshot);

    info!(
        "Sending {} to {} as {}",
        path,
        config.base_url,
        quote(Some(user_agent.as_str())).unwrap_or_default()
    );

    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = DeliveryTask::new(config, path.clone())
        .success_message(format!("Sent {}", path))
        .failure_message(format!("Failed to send {}", path))
        .user_agent(user_agent)
        .dispatch(&Handle::current(), params, Arc::new(ChannelSink(tx)));

    let report = rx
        .recv()
        .await
        .context("delivery task ended without a report")?;
    let _ = handle.finished().await;

    println!("{}", report.message);
    if !report.outcome.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn parse_params(pairs: &[String]) -> anyhow::Result<RequestParameters> {
    let mut params = RequestParameters::new();
    for pair in pairs {
        let Some((name, value)) = pair.split_once('=') else {
            bail!("expected key=value, got '{}'\n{}", pair, USAGE);
        };
        if name.is_empty() {
            bail!("empty parameter name in '{}'", pair);
        }
        params.insert(name, Some(value));
    }
    Ok(params)
}

fn load_snapshot(path: &str) -> anyhow::Result<EnvironmentSnapshot> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read snapshot {}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid snapshot {}", path))
}
