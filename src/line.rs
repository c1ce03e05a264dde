//! Target context and the structured output line
//!
//! The context is resolved once when a worker starts and copied verbatim into
//! every line it forwards; only the message, source and timestamp vary per
//! record.

use crate::errors::{ForwarderError, Result};
use crate::record::LogRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Tag template applied when the target does not configure one.
pub const DEFAULT_TAG_TEMPLATE: &str = "{{.ID}}";

/// Everything the daemon tells us about a logging target at start time.
#[derive(Debug, Clone, Default)]
pub struct TargetInfo {
    pub container_id: String,
    pub container_name: String,
    pub container_image_id: String,
    pub container_image_name: String,
    pub command: String,
    pub created: DateTime<Utc>,
    /// Driver options (`redis-*` keys, `tag`)
    pub config: HashMap<String, String>,
    /// User-supplied extra attributes copied into every line
    pub extra: HashMap<String, String>,
    pub hostname: String,
}

/// Immutable per-worker context, established once at start.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetContext {
    pub container_id: String,
    pub container_name: String,
    pub container_created: DateTime<Utc>,
    pub image_id: String,
    pub image_name: String,
    pub command: String,
    pub tag: String,
    pub extra: HashMap<String, String>,
    pub host: String,
}

impl TargetContext {
    /// Build the context, expanding the tag template.
    ///
    /// Tag resolution happens here, once, never per record.
    pub fn resolve(info: &TargetInfo) -> Result<Self> {
        let template = info
            .config
            .get("tag")
            .map(String::as_str)
            .unwrap_or(DEFAULT_TAG_TEMPLATE);

        Ok(Self {
            container_id: info.container_id.clone(),
            container_name: info.container_name.clone(),
            container_created: info.created,
            image_id: info.container_image_id.clone(),
            image_name: info.container_image_name.clone(),
            command: info.command.clone(),
            tag: expand_tag(template, info)?,
            extra: info.extra.clone(),
            host: info.hostname.clone(),
        })
    }
}

/// One structured line, serialized to JSON and pushed onto the store list.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LogLine {
    pub message: String,
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub container_id: String,
    pub container_name: String,
    pub container_created: DateTime<Utc>,
    pub image_id: String,
    pub image_name: String,
    pub command: String,
    pub tag: String,
    pub extra: HashMap<String, String>,
    pub host: String,
}

impl LogLine {
    /// Pure transform of a raw record into an output line.
    ///
    /// Payload bytes pass through uninterpreted; invalid UTF-8 is replaced,
    /// never rejected.
    pub fn build(context: &TargetContext, record: &LogRecord) -> Self {
        Self {
            message: String::from_utf8_lossy(&record.line).into_owned(),
            source: record.source.clone(),
            timestamp: DateTime::from_timestamp_nanos(record.time_nano),
            container_id: context.container_id.clone(),
            container_name: context.container_name.clone(),
            container_created: context.container_created,
            image_id: context.image_id.clone(),
            image_name: context.image_name.clone(),
            command: context.command.clone(),
            tag: context.tag.clone(),
            extra: context.extra.clone(),
            host: context.host.clone(),
        }
    }
}

/// Expand `{{.Field}}` placeholders in a tag template.
fn expand_tag(template: &str, info: &TargetInfo) -> Result<String> {
    let mut tag = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{.") {
        tag.push_str(&rest[..start]);
        let after = &rest[start + 3..];
        let end = after.find("}}").ok_or_else(|| {
            ForwarderError::TagResolution(format!("unterminated placeholder in {:?}", template))
        })?;
        let field = &after[..end];

        match field {
            "ID" => tag.push_str(short_id(&info.container_id)),
            "FullID" => tag.push_str(&info.container_id),
            "Name" => tag.push_str(&info.container_name),
            "ImageID" => tag.push_str(short_id(&info.container_image_id)),
            "ImageFullID" => tag.push_str(&info.container_image_id),
            "ImageName" => tag.push_str(&info.container_image_name),
            "DaemonName" => tag.push_str(&info.hostname),
            _ => {
                return Err(ForwarderError::TagResolution(format!(
                    "unknown placeholder {:?} in tag template {:?}",
                    field, template
                )));
            }
        }

        rest = &after[end + 2..];
    }

    tag.push_str(rest);
    Ok(tag)
}

/// Truncated 12-character form of a container or image id.
fn short_id(id: &str) -> &str {
    let id = id.strip_prefix("sha256:").unwrap_or(id);
    &id[..id.len().min(12)]
}
