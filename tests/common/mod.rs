use std::time::Duration;

use liveconf::FieldSpec;
use liveconf::LiveRecord;
use liveconf::RecordSchema;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::timeout;

pub const PREFIX: &str = "/apps/billing";

pub const WAIT_FOR_CALLBACK: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub url: String,
    pub pool_size: u32,
    pub replicas: Vec<String>,
}

impl LiveRecord for Database {
    fn schema() -> RecordSchema {
        RecordSchema::new("Database")
            // shorthand: json name and key segment in one tag
            .field(FieldSpec::value("url", |d: &mut Database| &mut d.url).json("url,dsn"))
            .field(
                FieldSpec::value("pool_size", |d: &mut Database| &mut d.pool_size)
                    .tags("pool_size", "pool"),
            )
            .field(
                FieldSpec::value("replicas", |d: &mut Database| &mut d.replicas)
                    .tags("replicas", "replicas"),
            )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BillingConfig {
    pub region: String,
    pub dry_run: bool,
    pub retry_limit: i16,
    pub database: Database,
    /// Process-local, never synchronized
    pub hostname: String,
}

impl LiveRecord for BillingConfig {
    fn schema() -> RecordSchema {
        RecordSchema::new("BillingConfig")
            .field(
                FieldSpec::value("region", |b: &mut BillingConfig| &mut b.region)
                    .tags("region", "region"),
            )
            .field(
                FieldSpec::value("dry_run", |b: &mut BillingConfig| &mut b.dry_run)
                    .tags("dry_run", "dry_run"),
            )
            .field(
                FieldSpec::value("retry_limit", |b: &mut BillingConfig| &mut b.retry_limit)
                    .tags("retry_limit", "retry_limit"),
            )
            .field(
                FieldSpec::record("database", |b: &mut BillingConfig| &mut b.database)
                    .tags("database", "db"),
            )
            .field(
                FieldSpec::value("hostname", |b: &mut BillingConfig| &mut b.hostname)
                    .json("hostname"),
            )
    }
}

pub fn billing_config() -> BillingConfig {
    BillingConfig {
        region: "us-east".to_string(),
        dry_run: false,
        retry_limit: 3,
        database: Database {
            url: "postgres://localhost/billing".to_string(),
            pool_size: 10,
            replicas: vec![],
        },
        hostname: "node-1".to_string(),
    }
}

pub fn key(relative: &str) -> String {
    format!("{PREFIX}/{relative}")
}

/// Callback forwarding the reloaded key into a channel
pub fn key_channel() -> (impl Fn(&str) + Send + Sync + 'static, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        move |key: &str| {
            let _ = tx.send(key.to_string());
        },
        rx,
    )
}

pub async fn next_key(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
    timeout(WAIT_FOR_CALLBACK, rx.recv())
        .await
        .expect("callback within deadline")
        .expect("callback channel open")
}
