//! pt-config
//!
//! Service configuration for the paper-trading daemon.
//! - Layered YAML: later documents override earlier ones (deep merge)
//! - Canonical JSON + sha256 config hash, logged at startup
//! - Secret-literal guard: credentials never live in config, only env var names
//! - Unused-key report against the registry of keys the service reads
//! - Typed `ServiceConfig` with a default for every key

mod guard;
pub mod secrets;
mod settings;

pub use guard::{
    consumed_pointers, report_unused_keys, UnusedKeyPolicy, UnusedKeyReport, CONSUMED_POINTERS,
};
pub use settings::{
    ConfigLints, LedgerBackend, LedgerConfig, PostgresConfig, QuoteProviderKind, QuotesConfig, ServerConfig,
    ServiceConfig,
};

use anyhow::{Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

/// Env var holding a comma-separated list of YAML layers.
pub const ENV_CONFIG_PATHS: &str = "PT_CONFIG";

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// sha256 of `canonical_json`, hex.
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::with_capacity(paths.len());
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }
    let refs: Vec<&str> = docs.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&refs)
}

/// Layers named by `PT_CONFIG`, or an empty config (all defaults) when unset.
pub fn load_from_env() -> Result<LoadedConfig> {
    match std::env::var(ENV_CONFIG_PATHS) {
        Ok(v) if !v.trim().is_empty() => {
            let paths: Vec<&str> = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();
            load_layered_yaml(&paths)
        }
        _ => load_layered_yaml_from_strings(&[]),
    }
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for (i, raw) in yaml_docs.iter().enumerate() {
        let v_yaml: serde_yaml::Value =
            serde_yaml::from_str(raw).with_context(|| format!("invalid yaml in layer {i}"))?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        // Empty or comment-only layers parse as null and must not wipe the base.
        if v_json.is_null() {
            continue;
        }
        merged = deep_merge(merged, v_json);
    }

    guard::enforce_no_secret_literals(&merged)?;

    // serde_json's map is ordered by key, so this is canonical.
    let canonical_json = serde_json::to_string(&merged).context("canonical json serialize failed")?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (k, v) in overlay_map {
                let prev = base_map.remove(&k).unwrap_or(Value::Null);
                base_map.insert(k, deep_merge(prev, v));
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
