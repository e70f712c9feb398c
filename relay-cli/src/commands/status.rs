//! Show relay statistics.

use anyhow::{Context, Result};
use reqwest::Url;
use serde::Deserialize;

/// Body of the relay's `/stats` endpoint.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct RelayStats {
    total_rooms: usize,
    active_connections: usize,
    #[serde(default)]
    open_sockets: usize,
    #[serde(default)]
    uptime_seconds: u64,
}

/// Run the status command.
pub async fn run(base: &str) -> Result<()> {
    let url = stats_url(base)?;
    let stats: RelayStats = reqwest::get(url.clone())
        .await
        .with_context(|| format!("Failed to reach {}", url))?
        .error_for_status()?
        .json()
        .await
        .context("Invalid stats response")?;

    println!("=== relay-cli status ===");
    println!();
    println!("Relay:   {}", url);
    println!("Rooms:   {}", stats.total_rooms);
    println!("Peers:   {}", stats.active_connections);
    println!("Sockets: {}", stats.open_sockets);
    println!("Uptime:  {}", format_uptime(stats.uptime_seconds));

    Ok(())
}

/// `/stats` on the same host as `base`, which may be the ws:// endpoint.
fn stats_url(base: &str) -> Result<Url> {
    let mut url = Url::parse(base).with_context(|| format!("Invalid relay URL: {}", base))?;
    let scheme = match url.scheme() {
        "ws" => "http",
        "wss" => "https",
        other => other,
    }
    .to_string();
    url.set_scheme(&scheme)
        .map_err(|()| anyhow::anyhow!("Unsupported URL scheme: {}", scheme))?;
    url.set_path("/stats");
    url.set_query(None);
    Ok(url)
}

fn format_uptime(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}
