//! Canonical workspace root resolution
//!
//! A session locks exactly one [`WorkspaceRoot`]. Every governed path is
//! resolved against it, and any path whose normalized form escapes the root
//! is rejected with a dedicated error rather than silently clamped.

use std::path::{Component, Path, PathBuf};

use parking_lot::Mutex;

/// Marker file that pins a workspace root during upward discovery
pub const ROOT_MARKER_FILE: &str = "warden.toml";

/// Marker directory that pins a workspace root during upward discovery
pub const ROOT_MARKER_DIR: &str = ".warden";

/// The canonical, session-locked workspace root
///
/// Immutable once constructed; all derived paths are descendants of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceRoot {
    path: PathBuf,
}

impl WorkspaceRoot {
    /// Discover the canonical root for `candidate`
    ///
    /// Walks upward from `candidate` looking for a [`ROOT_MARKER_FILE`] or
    /// [`ROOT_MARKER_DIR`]; the nearest marked ancestor wins. Without a
    /// marker, `candidate` itself becomes the root. The result is
    /// canonicalized (symlinks resolved).
    ///
    /// # Errors
    /// Returns an error if `candidate` does not exist or is not a directory.
    pub fn discover(candidate: impl AsRef<Path>) -> Result<Self, WorkspaceError> {
        let candidate = candidate.as_ref();
        let canonical = candidate
            .canonicalize()
            .map_err(|source| WorkspaceError::io(candidate, source))?;
        if !canonical.is_dir() {
            return Err(WorkspaceError::NotADirectory(canonical));
        }

        let marked = canonical
            .ancestors()
            .find(|dir| dir.join(ROOT_MARKER_FILE).is_file() || dir.join(ROOT_MARKER_DIR).is_dir());

        Ok(Self {
            path: marked.map_or(canonical.clone(), Path::to_path_buf),
        })
    }

    /// The canonical root path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve `input` to an absolute path inside the root
    ///
    /// Relative inputs are joined onto the root; absolute inputs must already
    /// point inside it. Normalization is lexical (`.` and `..` components
    /// collapsed without touching the filesystem), so targets that do not
    /// exist yet can still be checked.
    ///
    /// # Errors
    /// Returns [`WorkspaceError::PathEscapesRoot`] if the normalized path
    /// falls outside the root.
    pub fn resolve(&self, input: impl AsRef<Path>) -> Result<PathBuf, WorkspaceError> {
        let input = input.as_ref();
        let joined = if input.is_absolute() {
            input.to_path_buf()
        } else {
            self.path.join(input)
        };

        let mut normalized = PathBuf::new();
        for component in joined.components() {
            match component {
                Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
                Component::RootDir => normalized.push(Component::RootDir.as_os_str()),
                Component::CurDir => {}
                Component::ParentDir => {
                    if !normalized.pop() {
                        return Err(WorkspaceError::PathEscapesRoot {
                            path: input.to_path_buf(),
                        });
                    }
                }
                Component::Normal(segment) => normalized.push(segment),
            }
        }

        if !normalized.starts_with(&self.path) {
            return Err(WorkspaceError::PathEscapesRoot {
                path: input.to_path_buf(),
            });
        }
        Ok(normalized)
    }

    /// Directory holding all warden-managed state
    #[inline]
    #[must_use]
    pub fn warden_dir(&self) -> PathBuf {
        self.path.join(ROOT_MARKER_DIR)
    }

    /// Directory holding persisted plans (one file per plan, named by hash)
    #[inline]
    #[must_use]
    pub fn plans_dir(&self) -> PathBuf {
        self.warden_dir().join("plans")
    }

    /// Directory holding the audit log and its lock file
    #[inline]
    #[must_use]
    pub fn audit_dir(&self) -> PathBuf {
        self.warden_dir().join("audit")
    }

    /// Path of the append-only audit log
    #[inline]
    #[must_use]
    pub fn audit_log_path(&self) -> PathBuf {
        self.audit_dir().join("log.jsonl")
    }

    /// Path of the persisted governance-state record
    #[inline]
    #[must_use]
    pub fn governance_path(&self) -> PathBuf {
        self.warden_dir().join("governance.json")
    }

    /// Create the managed directories if absent
    ///
    /// Self-healing: callers never perform manual setup.
    ///
    /// # Errors
    /// Returns an error if a directory cannot be created.
    pub fn ensure_layout(&self) -> Result<(), WorkspaceError> {
        for dir in [self.plans_dir(), self.audit_dir()] {
            std::fs::create_dir_all(&dir).map_err(|source| WorkspaceError::io(&dir, source))?;
        }
        Ok(())
    }
}

/// Per-session root cache
///
/// Enforces the one-root-per-session invariant: the first [`lock`] call
/// discovers and caches the root; later calls must resolve to the same root
/// or fail with [`WorkspaceError::RootConflict`].
///
/// [`lock`]: SessionRoots::lock
#[derive(Debug, Default)]
pub struct SessionRoots {
    cached: Mutex<Option<WorkspaceRoot>>,
}

impl SessionRoots {
    /// Create an empty session cache
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache pre-seeded with an already-discovered root
    #[must_use]
    pub fn with_root(root: WorkspaceRoot) -> Self {
        Self {
            cached: Mutex::new(Some(root)),
        }
    }

    /// Lock the session to the root discovered from `candidate`
    ///
    /// # Errors
    /// Returns [`WorkspaceError::RootConflict`] if a different root is
    /// already locked, or a discovery error for an invalid candidate.
    pub fn lock(&self, candidate: impl AsRef<Path>) -> Result<WorkspaceRoot, WorkspaceError> {
        let discovered = WorkspaceRoot::discover(candidate)?;
        let mut guard = self.cached.lock();
        match guard.as_ref() {
            None => {
                *guard = Some(discovered.clone());
                Ok(discovered)
            }
            Some(existing) if discovered.path().starts_with(existing.path()) => {
                Ok(existing.clone())
            }
            Some(existing) => Err(WorkspaceError::RootConflict {
                locked: existing.path().to_path_buf(),
                candidate: discovered.path().to_path_buf(),
            }),
        }
    }

    /// The currently locked root, if any
    #[inline]
    #[must_use]
    pub fn current(&self) -> Option<WorkspaceRoot> {
        self.cached.lock().clone()
    }
}

/// Errors related to workspace root resolution
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    /// Candidate path is not a directory
    #[error("workspace candidate is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Normalized path escapes the locked root
    #[error("path escapes workspace root: {path}")]
    PathEscapesRoot {
        /// The offending input path
        path: PathBuf,
    },

    /// A different root is already locked for this session
    #[error("workspace already locked to {locked}, refusing re-root to {candidate}")]
    RootConflict {
        /// The root locked earlier in the session
        locked: PathBuf,
        /// The conflicting root a later call resolved to
        candidate: PathBuf,
    },

    /// IO error touching a workspace path
    #[error("io error at {path}: {source}")]
    Io {
        /// Path the operation touched
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

impl WorkspaceError {
    /// Create an IO error for a path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
