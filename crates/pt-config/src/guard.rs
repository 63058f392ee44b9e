//! Config lints: secret literals and unused keys.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Value prefixes that indicate a credential pasted into config.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",        // OpenAI style
    "sk_live",    // Stripe live
    "sk_test",    // Stripe test
    "AKIA",       // AWS access key ID
    "-----BEGIN", // PEM private keys
    "ghp_",       // GitHub PAT
    "glpat-",     // GitLab PAT
    "xoxb-",      // Slack bot token
];

/// Connection-string schemes whose userinfo may carry a password.
const URL_SCHEMES_WITH_CREDENTIALS: &[&str] = &["postgres://", "postgresql://"];

pub(crate) fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let mut leaves = Vec::new();
    collect_leaf_pointers(v, "", &mut leaves);

    for ptr in leaves {
        let Some(s) = v.pointer(&ptr).and_then(Value::as_str) else {
            continue;
        };
        if looks_like_secret(s) {
            bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", ptr);
        }
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if let Some(rest) = URL_SCHEMES_WITH_CREDENTIALS
        .iter()
        .find_map(|scheme| t.strip_prefix(scheme))
    {
        // user:password@host
        return rest
            .split_once('@')
            .map(|(userinfo, _)| userinfo.contains(':'))
            .unwrap_or(false);
    }
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

// ---------------------------------------------------------------------------
// Unused keys
// ---------------------------------------------------------------------------

/// JSON-pointer prefixes of every key `ServiceConfig` reads. A leaf under one
/// of these is consumed; any other leaf is unused (typo, stale key, or a key
/// for a feature this build does not have).
pub const CONSUMED_POINTERS: &[&str] = &[
    "/config/unused_keys",
    "/server/bind_addr",
    "/server/cors_allowed_origins",
    "/quotes/provider",
    "/quotes/base_url",
    "/quotes/range",
    "/quotes/interval",
    "/quotes/timeout_ms",
    "/quotes/cache_ttl_secs",
    "/quotes/cache_max_entries",
    "/quotes/fixed_prices",
    "/ledger/backend",
    "/ledger/starting_balance",
    "/ledger/pnl_policy",
    "/ledger/max_commit_retries",
    "/ledger/postgres/url_env",
    "/ledger/postgres/max_connections",
];

pub fn consumed_pointers() -> &'static [&'static str] {
    CONSUMED_POINTERS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnusedKeyPolicy {
    #[default]
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    /// Unused leaf pointers, sorted.
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// Leaves of `config_json` not covered by [`CONSUMED_POINTERS`].
///
/// `Warn` always returns the report; `Fail` errors with `CONFIG_UNUSED_KEYS`
/// when the report is not clean.
pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    let consumed: BTreeSet<&str> = CONSUMED_POINTERS.iter().copied().collect();

    let mut leaves = Vec::new();
    collect_leaf_pointers(config_json, "", &mut leaves);

    let mut unused: Vec<String> = leaves
        .into_iter()
        .filter(|leaf| !consumed.iter().any(|p| is_prefix_pointer(p, leaf)))
        .collect();
    unused.sort();
    unused.dedup();

    let report = UnusedKeyReport {
        unused_leaf_pointers: unused,
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        bail!(
            "CONFIG_UNUSED_KEYS: {} unused config leaf key(s) detected. \
            Remove them or fix the key name. First few: {:?}",
            report.unused_leaf_pointers.len(),
            report.unused_leaf_pointers.iter().take(12).collect::<Vec<_>>()
        );
    }
    Ok(report)
}

/// `/a/b` covers `/a/b` and `/a/b/c`, never `/a/bc`.
fn is_prefix_pointer(prefix: &str, leaf: &str) -> bool {
    match leaf.strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => rest.starts_with('/'),
        None => false,
    }
}

fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) if !map.is_empty() => {
            for (k, vv) in map {
                let next = format!("{}/{}", prefix, escape_pointer_token(k));
                collect_leaf_pointers(vv, &next, out);
            }
        }
        Value::Array(arr) if !arr.is_empty() => {
            for (i, vv) in arr.iter().enumerate() {
                collect_leaf_pointers(vv, &format!("{prefix}/{i}"), out);
            }
        }
        _ => {
            if !prefix.is_empty() {
                out.push(prefix.to_string());
            }
        }
    }
}

fn escape_pointer_token(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prefix_respects_segment_boundary() {
        assert!(is_prefix_pointer("/quotes/range", "/quotes/range"));
        assert!(is_prefix_pointer("/quotes/fixed_prices", "/quotes/fixed_prices/AAPL"));
        assert!(!is_prefix_pointer("/quotes/range", "/quotes/ranges"));
    }

    #[test]
    fn leaves_include_array_elements_and_escape_slashes() {
        let mut out = Vec::new();
        collect_leaf_pointers(&json!({"a/b": 1, "xs": ["p", "q"]}), "", &mut out);
        out.sort();
        assert_eq!(out, vec!["/a~1b", "/xs/0", "/xs/1"]);
    }

    #[test]
    fn credentialed_database_url_is_a_secret() {
        assert!(looks_like_secret("postgres://app:hunter2@db:5432/pt"));
        assert!(!looks_like_secret("postgres://db:5432/pt"));
        assert!(!looks_like_secret("PT_DATABASE_URL"));
    }
}
