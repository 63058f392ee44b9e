//! Runtime secret resolution.
//!
//! Config names the env vars; this module reads them. Resolved values never
//! appear in `Debug` output or error messages.

use anyhow::{bail, Result};

use crate::{LedgerBackend, ServiceConfig};

#[derive(Clone, Default)]
pub struct ResolvedSecrets {
    /// Present only when the postgres backend is configured.
    pub database_url: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("database_url", &self.database_url.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

/// Resolve every secret the configured backends need.
///
/// Errors name the missing env var, never a value.
pub fn resolve_secrets(cfg: &ServiceConfig) -> Result<ResolvedSecrets> {
    match cfg.ledger.backend {
        LedgerBackend::Memory => Ok(ResolvedSecrets::default()),
        LedgerBackend::Postgres => {
            let var = cfg.ledger.postgres.url_env.trim();
            match read_env(var) {
                Some(url) => Ok(ResolvedSecrets {
                    database_url: Some(url),
                }),
                None => bail!(
                    "SECRETS_MISSING ledger.backend=postgres requires env var {var} (ledger.postgres.url_env) to be set"
                ),
            }
        }
    }
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_hides_values() {
        let s = ResolvedSecrets {
            database_url: Some("postgres://u:p@h/db".to_string()),
        };
        let dbg = format!("{s:?}");
        assert!(dbg.contains("<REDACTED>"));
        assert!(!dbg.contains("u:p"));
    }
}
