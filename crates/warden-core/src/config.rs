//! Gate configuration
//!
//! Loaded from the optional `[gate]` table of the workspace marker file
//! (`warden.toml`); every field has a working default, so a bare marker file
//! or none at all is fine.

use std::time::Duration;

use serde::Deserialize;

use warden_audit::LockPolicy;
use warden_workspace::{WorkspaceRoot, ROOT_MARKER_FILE};

use crate::error::GateError;

const DEFAULT_LOCK_ATTEMPTS: u32 = 20;
const DEFAULT_LOCK_BACKOFF_MS: u64 = 15;

/// Tunable gate behavior for one session
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GateConfig {
    /// Audit lock acquisition attempts before giving up
    pub lock_attempts: u32,
    /// Base delay between lock attempts, in milliseconds
    pub lock_backoff_ms: u64,
    /// Whether post-write preflight verification runs at all
    pub preflight: bool,
    /// Workspace-wide verification command run after every tentative write
    ///
    /// Empty means no workspace-level step; analyzer-demanded steps still
    /// run when preflight is enabled.
    pub verify_command: Vec<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            lock_attempts: DEFAULT_LOCK_ATTEMPTS,
            lock_backoff_ms: DEFAULT_LOCK_BACKOFF_MS,
            preflight: true,
            verify_command: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct MarkerFile {
    #[serde(default)]
    gate: GateConfig,
}

impl GateConfig {
    /// Load from the workspace marker file, defaulting when absent
    ///
    /// # Errors
    /// A marker file that exists but does not parse is a validation error;
    /// it is never silently defaulted.
    pub fn load(root: &WorkspaceRoot) -> Result<Self, GateError> {
        let path = root.path().join(ROOT_MARKER_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path).map_err(|e| GateError::io("config", &e))?;
        let marker: MarkerFile = toml::from_str(&text).map_err(|e| GateError::Validation {
            gate: "config",
            message: format!("{}: {e}", path.display()),
        })?;
        Ok(marker.gate)
    }

    /// The audit lock policy this config implies
    #[inline]
    #[must_use]
    pub fn lock_policy(&self) -> LockPolicy {
        LockPolicy {
            attempts: self.lock_attempts,
            backoff: Duration::from_millis(self.lock_backoff_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn absent_marker_file_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let root = WorkspaceRoot::discover(dir.path()).unwrap();
        let config = GateConfig::load(&root).unwrap();
        assert_eq!(config, GateConfig::default());
        assert!(config.preflight);
    }

    #[test]
    fn gate_table_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(ROOT_MARKER_FILE),
            "[gate]\nlock_attempts = 3\npreflight = false\nverify_command = [\"true\"]\n",
        )
        .unwrap();
        let root = WorkspaceRoot::discover(dir.path()).unwrap();

        let config = GateConfig::load(&root).unwrap();
        assert_eq!(config.lock_attempts, 3);
        assert!(!config.preflight);
        assert_eq!(config.verify_command, vec!["true".to_string()]);
        assert_eq!(config.lock_policy().attempts, 3);
    }

    #[test]
    fn marker_without_gate_table_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(ROOT_MARKER_FILE), "# workspace marker\n").unwrap();
        let root = WorkspaceRoot::discover(dir.path()).unwrap();
        assert_eq!(GateConfig::load(&root).unwrap(), GateConfig::default());
    }

    #[test]
    fn unparsable_marker_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(ROOT_MARKER_FILE), "[gate]\nlock_attempts = \"many\"\n")
            .unwrap();
        let root = WorkspaceRoot::discover(dir.path()).unwrap();
        assert!(matches!(
            GateConfig::load(&root),
            Err(GateError::Validation { gate: "config", .. })
        ));
    }
}
