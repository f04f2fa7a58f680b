use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;

use crate::FieldSpec;
use crate::LiveRecord;
use crate::RecordSchema;

pub const TEST_PREFIX: &str = "/svc/config";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: String,
    pub filepath: String,
    pub max_files: u32,
    pub rotation: bool,
    pub sample_ratio: f64,
    pub backlog: i32,
    pub outputs: Vec<String>,
    pub fields: HashMap<String, String>,
}

impl LiveRecord for LogConfig {
    fn schema() -> RecordSchema {
        RecordSchema::new("LogConfig")
            .field(
                FieldSpec::value("level", |c: &mut LogConfig| &mut c.level)
                    .tags("level", "level"),
            )
            // json only: not synchronized
            .field(
                FieldSpec::value("filepath", |c: &mut LogConfig| &mut c.filepath)
                    .json("filepath"),
            )
            .field(
                FieldSpec::value("max_files", |c: &mut LogConfig| &mut c.max_files)
                    .tags("max_files", "max_files"),
            )
            .field(
                FieldSpec::value("rotation", |c: &mut LogConfig| &mut c.rotation)
                    .tags("rotation", "log_rotation"),
            )
            .field(
                FieldSpec::value("sample_ratio", |c: &mut LogConfig| &mut c.sample_ratio)
                    .tags("sample_ratio", "sample_ratio"),
            )
            .field(
                FieldSpec::value("backlog", |c: &mut LogConfig| &mut c.backlog)
                    .tags("backlog", "backlog"),
            )
            .field(
                FieldSpec::value("outputs", |c: &mut LogConfig| &mut c.outputs)
                    .tags("outputs", "outputs"),
            )
            .field(
                FieldSpec::value("fields", |c: &mut LogConfig| &mut c.fields)
                    .tags("fields", "fields"),
            )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub timeout_ms: u64,
    pub load_factor: f32,
    pub workers: i8,
}

impl LiveRecord for ServerConfig {
    fn schema() -> RecordSchema {
        RecordSchema::new("ServerConfig")
            .field(
                FieldSpec::value("port", |c: &mut ServerConfig| &mut c.port)
                    .tags("port", "port"),
            )
            .field(
                FieldSpec::value("timeout_ms", |c: &mut ServerConfig| &mut c.timeout_ms)
                    .tags("timeout_ms", "timeout_ms"),
            )
            .field(
                FieldSpec::value("load_factor", |c: &mut ServerConfig| &mut c.load_factor)
                    .tags("load_factor", "load_factor"),
            )
            .field(
                FieldSpec::value("workers", |c: &mut ServerConfig| &mut c.workers)
                    .tags("workers", "workers"),
            )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub name: String,
    pub log: LogConfig,
    pub server: ServerConfig,
    pub owner: Option<String>,
}

impl LiveRecord for GeneralConfig {
    fn schema() -> RecordSchema {
        RecordSchema::new("GeneralConfig")
            .field(
                FieldSpec::value("name", |c: &mut GeneralConfig| &mut c.name)
                    .tags("name", "name"),
            )
            .field(FieldSpec::record("log", |c: &mut GeneralConfig| &mut c.log).tags("log", "log"))
            .field(
                FieldSpec::record("server", |c: &mut GeneralConfig| &mut c.server)
                    .tags("server", "server"),
            )
            .field(
                FieldSpec::value("owner", |c: &mut GeneralConfig| &mut c.owner)
                    .tags("owner", "owner"),
            )
    }
}

pub fn general_config() -> GeneralConfig {
    GeneralConfig {
        name: "default".to_string(),
        log: LogConfig {
            level: "info".to_string(),
            filepath: "/var/log/svc.log".to_string(),
            max_files: 3,
            ..LogConfig::default()
        },
        server: ServerConfig {
            port: 8080,
            timeout_ms: 500,
            load_factor: 0.75,
            workers: 4,
        },
        owner: None,
    }
}

/// Store keys of every synchronized field of [`GeneralConfig`]
pub fn general_config_keys() -> Vec<String> {
    [
        "name",
        "log/level",
        "log/max_files",
        "log/log_rotation",
        "log/sample_ratio",
        "log/backlog",
        "log/outputs",
        "log/fields",
        "server/port",
        "server/timeout_ms",
        "server/load_factor",
        "server/workers",
        "owner",
    ]
    .iter()
    .map(|k| format!("{TEST_PREFIX}/{k}"))
    .collect()
}
