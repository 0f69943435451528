//! check subcommand
//!
//! Probes every configured site once without touching the database.

use crate::config::{load_sites, MonitorSettings};
use crate::health::Prober;
use crate::types::{Endpoint, StatusRecord};
use anyhow::Context;
use clap::Args;
use futures::future::join_all;
use serde::Serialize;
use std::path::PathBuf;

/// Arguments for the check subcommand
#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Sites config file
    #[arg(short, long, default_value = "config.json", env = "SENTINEL_CONFIG")]
    pub config: PathBuf,

    /// Print results as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

/// One probed site
#[derive(Debug, Serialize)]
pub struct CheckResult {
    /// Probed endpoint
    pub endpoint: Endpoint,
    /// Observation, or `None` when the URL cannot be probed
    pub record: Option<StatusRecord>,
    /// Why the site was not probed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckResult {
    /// Whether the site answered with a 2xx status
    pub fn is_reachable(&self) -> bool {
        self.record.as_ref().is_some_and(|r| r.reachable)
    }
}

/// Execute the check command
///
/// Returns `Ok(true)` when every site is reachable.
pub async fn execute(args: &CheckArgs) -> Result<bool, anyhow::Error> {
    let settings = MonitorSettings::from_env().context("Invalid monitor settings")?;
    let endpoints = load_sites(&args.config)
        .with_context(|| format!("Failed to load sites from {}", args.config.display()))?;
    let prober = Prober::new(settings.probe_timeout)?;

    let results = probe_all(&prober, endpoints).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print!("{}", render_table(&results));
    }

    Ok(results.iter().all(CheckResult::is_reachable))
}

/// Probe all endpoints concurrently
pub async fn probe_all(prober: &Prober, endpoints: Vec<Endpoint>) -> Vec<CheckResult> {
    join_all(endpoints.into_iter().map(|endpoint| async move {
        match prober.probe(&endpoint).await {
            Ok(record) => CheckResult {
                endpoint,
                record: Some(record),
                error: None,
            },
            Err(e) => CheckResult {
                endpoint,
                record: None,
                error: Some(e.to_string()),
            },
        }
    }))
    .await
}

fn render_table(results: &[CheckResult]) -> String {
    let mut out = String::from("ID\tSTATUS\tLATENCY\tMESSAGE\n");
    for result in results {
        let (status, latency, message) = match (&result.record, &result.error) {
            (Some(record), _) => (
                if record.reachable { "UP" } else { "DOWN" },
                format!("{}ms", record.latency_ms),
                record.message.clone(),
            ),
            (None, error) => ("SKIP", "-".to_string(), error.clone().unwrap_or_default()),
        };
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\n",
            result.endpoint.id, status, latency, message
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_probe_all_reports_each_site() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let prober = Prober::new(Duration::from_secs(2)).unwrap();
        let results = probe_all(
            &prober,
            vec![
                Endpoint::new("up", "Up", server.uri()),
                Endpoint::new("bad", "Bad", "mailto:ops@example.com"),
            ],
        )
        .await;

        assert_eq!(results.len(), 2);
        assert!(results[0].is_reachable());
        assert!(!results[1].is_reachable());
        assert!(results[1].error.is_some());

        let table = render_table(&results);
        assert!(table.contains("up\tUP"));
        assert!(table.contains("bad\tSKIP"));
    }
}
