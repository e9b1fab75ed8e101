//! Content and name normalization applied before any provider call

use crate::config::RecordDefaults;
use crate::error::{Error, Result};
use crate::record::RecordType;
use crate::traits::{ChangeRequest, RecordPayload};

/// Split MX content `"<priority> <target>"` on the first space
pub fn parse_mx(content: &str) -> Result<(u16, String)> {
    let content = content.trim();
    let (priority, target) = content.split_once(' ').ok_or_else(|| {
        Error::validation(format!(
            "MX content must be '<priority> <target>'. Got: '{}'",
            content
        ))
    })?;

    let priority: u16 = priority.parse().map_err(|_| {
        Error::validation(format!(
            "MX priority must be an integer between 0 and 65535. Got: '{}'",
            priority
        ))
    })?;

    let target = target.trim();
    if target.is_empty() {
        return Err(Error::validation(format!(
            "MX content has no target host: '{}'",
            content
        )));
    }

    Ok((priority, target.to_string()))
}

/// Wrap TXT content in double quotes unless it already is
pub fn quote_txt(content: &str) -> String {
    if content.len() >= 2 && content.starts_with('"') && content.ends_with('"') {
        content.to_string()
    } else {
        format!("\"{}\"", content)
    }
}

/// Proxy flag actually submitted for a record type
pub fn effective_proxied(record_type: &RecordType, requested: bool) -> bool {
    requested && !record_type.forbids_proxy()
}

/// Qualify `name` with `zone` unless it already belongs to the zone
///
/// Comparison ignores ASCII case and a trailing dot. `@` and the empty name
/// stand for the zone apex.
pub fn fully_qualified_name(name: &str, zone: &str) -> String {
    let zone = zone.trim_end_matches('.');
    let name = name.trim().trim_end_matches('.');

    if name.is_empty() || name == "@" {
        return zone.to_string();
    }

    let lower = name.to_ascii_lowercase();
    let zone_lower = zone.to_ascii_lowercase();
    if lower == zone_lower || lower.ends_with(&format!(".{}", zone_lower)) {
        name.to_string()
    } else {
        format!("{}.{}", name, zone)
    }
}

/// Build the provider payload for a create or replace
///
/// Fails with a validation error, without side effects, when the content
/// cannot be normalized.
pub fn build_payload(request: &ChangeRequest, defaults: &RecordDefaults) -> Result<RecordPayload> {
    let record_type = request.record_type.clone();

    let (content, priority) = match record_type {
        RecordType::Mx => {
            let (priority, target) = parse_mx(&request.content)?;
            (target, Some(priority))
        }
        RecordType::Txt => (quote_txt(&request.content), None),
        _ => (request.content.clone(), None),
    };

    let proxied = effective_proxied(&record_type, request.proxied.unwrap_or(defaults.proxied));

    Ok(RecordPayload {
        record_type,
        name: request.name.clone(),
        content,
        ttl: request.ttl.unwrap_or(defaults.ttl),
        proxied,
        priority,
    })
}
