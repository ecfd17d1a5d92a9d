//! Purpose: Define a stable, structured schema for non-fatal stderr notices.
//! Exports: `Notice`, `notice_json`, `link_notice`.
//! Role: Shared contract helper for CLI diagnostics (non-error events).
//! Invariants: Notices are non-fatal and never alter stdout payloads.
//! Invariants: JSON schema is stable once published; fields are additive-only.
use serde_json::{Map, Value, json};

use crate::core::database::{LinkReport, LinkStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: String,
    pub time: String,
    pub cmd: String,
    pub database: String,
    pub message: String,
    pub details: Map<String, Value>,
}

pub fn notice_json(notice: &Notice) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(notice.kind));
    inner.insert("time".to_string(), json!(notice.time));
    inner.insert("cmd".to_string(), json!(notice.cmd));
    inner.insert("database".to_string(), json!(notice.database));
    inner.insert("message".to_string(), json!(notice.message));
    inner.insert("details".to_string(), Value::Object(notice.details.clone()));

    let mut outer = Map::new();
    outer.insert("notice".to_string(), Value::Object(inner));
    Value::Object(outer)
}

/// Notice for a relationship that did not fully link.
pub fn link_notice(report: &LinkReport, cmd: &str, database: &str, time: String) -> Notice {
    let rel = &report.relationship;
    let mut details = Map::new();
    details.insert("table".to_string(), json!(rel.table));
    details.insert("column".to_string(), json!(rel.foreign_key.foreign_key_column));
    details.insert("primary_table".to_string(), json!(rel.foreign_key.primary_table));
    details.insert("primary_column".to_string(), json!(rel.foreign_key.primary_column));
    let kind = match &report.status {
        LinkStatus::Linked { links } => {
            details.insert("links".to_string(), json!(links));
            "linked"
        }
        LinkStatus::MissingTarget { table, column } => {
            details.insert("missing_table".to_string(), json!(table));
            if let Some(column) = column {
                details.insert("missing_column".to_string(), json!(column));
            }
            "missing_target"
        }
        LinkStatus::PartialLink { linked, expected } => {
            details.insert("linked".to_string(), json!(linked));
            details.insert("expected".to_string(), json!(expected));
            "partial_link"
        }
    };
    Notice {
        kind: kind.to_string(),
        time,
        cmd: cmd.to_string(),
        database: database.to_string(),
        message: format!(
            "foreign key {}.{}: {}",
            rel.table, rel.foreign_key.foreign_key_column, report.status
        ),
        details,
    }
}
