/// Submission-scoped workspaces
///
/// Each judgement owns one directory `<root>/<submission-id>-<uuid>`. Two
/// submissions never share a directory, even when their ids collide, and
/// cleanup never fails the judgement that owns it.
use crate::config::types::{JudgeError, Result};
use crate::observability::audit::events;
use crate::observability::metrics::get_metrics;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::fs;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

/// Workspaces of judgements still in flight in this process
static LIVE_WORKSPACES: Lazy<Mutex<HashSet<PathBuf>>> = Lazy::new(|| Mutex::new(HashSet::new()));

fn live_workspaces() -> MutexGuard<'static, HashSet<PathBuf>> {
    LIVE_WORKSPACES
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Remove every in-flight workspace. Used when the judge is terminated
/// mid-judgement; returns how many directories were removed.
pub fn remove_live_workspaces() -> usize {
    let dirs: Vec<PathBuf> = live_workspaces().drain().collect();
    let mut removed = 0;
    for dir in dirs {
        match remove_tree(&dir) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to remove workspace {}: {}", dir.display(), e),
        }
    }
    removed
}

/// Owner-only; judged programs run as the judge's user
const WORKSPACE_MODE: u32 = 0o700;

/// Longest prefix of the submission id kept in directory names
const MAX_ID_PREFIX: usize = 48;

/// Workspace for one submission's judgement
#[derive(Debug)]
pub struct Workspace {
    run_dir: PathBuf,
    source_file: Option<PathBuf>,
    cleaned: bool,
}

impl Workspace {
    /// Create a fresh workspace under `root` (created if missing).
    pub fn create(root: &Path, submission_id: &str) -> Result<Self> {
        fs::create_dir_all(root).map_err(|e| {
            JudgeError::Workspace(format!(
                "Failed to create workspace root {}: {}",
                root.display(),
                e
            ))
        })?;

        let name = format!("{}-{}", sanitize_id(submission_id), Uuid::new_v4());
        let run_dir = root.join(name);

        // create (not create_all): an existing directory is a collision
        fs::DirBuilder::new()
            .mode(WORKSPACE_MODE)
            .create(&run_dir)
            .map_err(|e| {
                JudgeError::Workspace(format!(
                    "Failed to create workspace directory {}: {}",
                    run_dir.display(),
                    e
                ))
            })?;
        live_workspaces().insert(run_dir.clone());

        Ok(Self {
            run_dir,
            source_file: None,
            cleaned: false,
        })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Write the submitted source as `file_name` inside the workspace.
    pub fn write_source(&mut self, file_name: &str, code: &str) -> Result<PathBuf> {
        if file_name.contains('/') || file_name.starts_with('.') {
            return Err(JudgeError::Workspace(format!(
                "Refusing source file name {:?}",
                file_name
            )));
        }
        let path = self.run_dir.join(file_name);
        fs::write(&path, code).map_err(|e| {
            JudgeError::Workspace(format!(
                "Failed to write source file {}: {}",
                path.display(),
                e
            ))
        })?;
        self.source_file = Some(path.clone());
        Ok(path)
    }

    pub fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }

    /// Remove the workspace (idempotent). Failures are logged and audited,
    /// never returned.
    pub fn cleanup(&mut self) {
        if self.cleaned {
            return;
        }
        self.cleaned = true;
        live_workspaces().remove(&self.run_dir);

        if !self.run_dir.exists() {
            return;
        }
        if let Err(e) = remove_tree(&self.run_dir) {
            log::warn!(
                "Failed to remove workspace {}: {}",
                self.run_dir.display(),
                e
            );
            get_metrics().workspace_cleanup_failures.inc();
            events::workspace_cleanup_failure(&self.run_dir, e.to_string());
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Judged programs may strip permissions from their own files; restore
/// owner access before removal.
fn remove_tree(path: &Path) -> std::io::Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(first) => {
            restore_owner_access(path);
            fs::remove_dir_all(path).map_err(|_| first)
        }
    }
}

fn restore_owner_access(path: &Path) {
    let Ok(meta) = fs::symlink_metadata(path) else {
        return;
    };
    if !meta.is_dir() {
        return;
    }
    let _ = fs::set_permissions(path, fs::Permissions::from_mode(WORKSPACE_MODE));
    if let Ok(entries) = fs::read_dir(path) {
        for entry in entries.flatten() {
            restore_owner_access(&entry.path());
        }
    }
}

/// Keep ids readable in directory listings but safe as a single path
/// component.
fn sanitize_id(submission_id: &str) -> String {
    let cleaned: String = submission_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_ID_PREFIX)
        .collect();
    if cleaned.is_empty() {
        "submission".to_string()
    } else {
        cleaned
    }
}

/// Workspace root management
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn create_workspace(&self, submission_id: &str) -> Result<Workspace> {
        Workspace::create(&self.root, submission_id)
    }

    /// Remove workspace directories older than `max_age`. These are left
    /// behind only when a judge process died mid-judgement.
    pub fn sweep_stale(&self, max_age: Duration) -> Result<usize> {
        if !self.root.exists() {
            return Ok(0);
        }

        let now = SystemTime::now();
        let mut removed = 0;

        for entry in fs::read_dir(&self.root)? {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    log::warn!("Failed to read workspace entry: {}", e);
                    continue;
                }
            };
            let path = entry.path();
            let modified = match entry.metadata().and_then(|m| {
                if m.is_dir() {
                    m.modified()
                } else {
                    Err(std::io::Error::new(std::io::ErrorKind::Other, "not a directory"))
                }
            }) {
                Ok(m) => m,
                Err(_) => continue,
            };

            let age = match now.duration_since(modified) {
                Ok(d) => d,
                Err(_) => continue, // future timestamp
            };

            if age > max_age {
                match remove_tree(&path) {
                    Ok(()) => {
                        log::info!("Removed stale workspace {}", path.display());
                        removed += 1;
                    }
                    Err(e) => {
                        log::warn!("Failed to remove stale workspace {}: {}", path.display(), e)
                    }
                }
            }
        }

        if removed > 0 {
            get_metrics().stale_workspaces_removed.add(removed as u64);
            events::stale_workspaces_swept(&self.root, removed);
        }
        Ok(removed)
    }
}
