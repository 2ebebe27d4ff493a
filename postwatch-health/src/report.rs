//! Verbose status report types.
//!
//! These are the JSON shapes served by `/status`. They carry raw command
//! output and file metadata so an operator can diagnose the relay without
//! shelling into the container.

use std::{collections::BTreeMap, path::Path};

use chrono::{DateTime, Utc};
use postwatch_common::queue::QueueListing;
use serde::Serialize;

use crate::{checker::HealthSnapshot, config::HealthConfig};

/// Everything `/status` reports.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
    pub health: HealthSnapshot,
    pub postfix: PostfixReport,
    pub files: FilesPresent,
    pub configuration: HealthConfig,
}

/// Postfix-specific diagnostics.
#[derive(Debug, Serialize)]
pub struct PostfixReport {
    pub queue_stats: QueueStats,
    pub process_info: ProcessInfo,
    pub config_info: BTreeMap<String, ConfigFileInfo>,
}

/// Queue statistics derived from a `postqueue -p` listing.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueueStats {
    Empty {
        total_messages: usize,
    },
    HasMessages {
        total_messages: usize,
        sample_output: Vec<String>,
    },
    Unavailable {
        error: String,
    },
}

impl QueueStats {
    /// Summarise a parsed queue listing.
    #[must_use]
    pub fn from_listing(listing: &QueueListing) -> Self {
        if listing.empty {
            Self::Empty { total_messages: 0 }
        } else {
            Self::HasMessages {
                total_messages: listing.message_estimate,
                sample_output: listing.sample.clone(),
            }
        }
    }
}

/// Raw `postfix status` result.
#[derive(Debug, Serialize)]
pub struct ProcessInfo {
    pub running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Existence of the configuration files the relay depends on.
#[derive(Debug, Serialize)]
#[allow(
    clippy::struct_excessive_bools,
    reason = "Report intentionally has one boolean per file"
)]
pub struct FilesPresent {
    pub main_config: bool,
    pub master_config: bool,
    pub clients_cidr: bool,
    pub sasl_passwd: bool,
}

/// Metadata for one configuration file.
#[derive(Debug, Serialize)]
pub struct ConfigFileInfo {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

impl ConfigFileInfo {
    /// Inspect a file on disk. A missing or unreadable file reports
    /// `exists: false` rather than an error.
    pub async fn inspect(path: &Path) -> Self {
        match tokio::fs::metadata(path).await {
            Ok(metadata) => Self {
                exists: true,
                size: Some(metadata.len()),
                modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            },
            Err(_) => Self {
                exists: false,
                size: None,
                modified: None,
            },
        }
    }
}
