// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Minimal in-place patching of raw Anthropic request bodies.
//!
//! Top-level fields are held as raw JSON values, so everything the patch
//! does not touch -- messages with tool_use, tool_result, image, and
//! reasoning blocks included -- round-trips byte-for-byte.

use std::collections::BTreeMap;

use serde_json::value::RawValue;
use switchboard_core::SwitchboardError;

fn parse_err(what: &str, e: impl std::error::Error + Send + Sync + 'static) -> SwitchboardError {
    SwitchboardError::Provider {
        message: format!("{what}: {e}"),
        source: Some(Box::new(e)),
    }
}

fn raw(json: String) -> Result<Box<RawValue>, SwitchboardError> {
    RawValue::from_string(json).map_err(|e| parse_err("building raw JSON value", e))
}

/// Returns a copy of `raw_body` with the `model` field set to `api_model`
/// and `suffix` (when non-empty) injected into the `system` field.
///
/// Suffix injection is polymorphic over the system field's shape:
/// - absent → set to the suffix string
/// - plain string → joined with a blank-line separator (empty original →
///   suffix alone)
/// - array of typed blocks → a new text block `"\n\n" + suffix` is appended
pub fn patch_raw_body(
    raw_body: &[u8],
    api_model: &str,
    suffix: &str,
) -> Result<Vec<u8>, SwitchboardError> {
    let text = std::str::from_utf8(raw_body)
        .map_err(|e| parse_err("raw request body is not UTF-8", e))?;

    let mut body: BTreeMap<String, Box<RawValue>> =
        serde_json::from_str(text).map_err(|e| parse_err("parsing raw request body", e))?;

    let model_json =
        serde_json::to_string(api_model).map_err(|e| parse_err("encoding model name", e))?;
    body.insert("model".to_string(), raw(model_json)?);

    if !suffix.is_empty() {
        let patched_system = match body.get("system") {
            None => {
                let json = serde_json::to_string(suffix)
                    .map_err(|e| parse_err("encoding system suffix", e))?;
                Some(raw(json)?)
            }
            Some(existing) => patch_system(existing.get(), suffix)?,
        };
        if let Some(system) = patched_system {
            body.insert("system".to_string(), system);
        }
    }

    serde_json::to_vec(&body).map_err(|e| parse_err("re-encoding patched body", e))
}

/// Injects the suffix into an existing `system` value. Returns `None` when
/// the value is neither a string nor an array (left untouched).
fn patch_system(existing: &str, suffix: &str) -> Result<Option<Box<RawValue>>, SwitchboardError> {
    if let Ok(s) = serde_json::from_str::<String>(existing) {
        let joined = if s.is_empty() {
            suffix.to_string()
        } else {
            format!("{s}\n\n{suffix}")
        };
        let json =
            serde_json::to_string(&joined).map_err(|e| parse_err("encoding system string", e))?;
        return Ok(Some(raw(json)?));
    }

    if let Ok(mut blocks) = serde_json::from_str::<Vec<Box<RawValue>>>(existing) {
        let block = serde_json::json!({
            "type": "text",
            "text": format!("\n\n{suffix}"),
        });
        blocks.push(raw(block.to_string())?);
        let json =
            serde_json::to_string(&blocks).map_err(|e| parse_err("encoding system blocks", e))?;
        return Ok(Some(raw(json)?));
    }

    Ok(None)
}
