use crate::models::{MoveFailure, MovedFile};
use crate::organizer::preview::{MoveOperation, PreviewTree};
use crate::utils;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What to do when the destination already holds a file with the same name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Keep both: the moved file becomes `name (1).ext`, `name (2).ext`, ...
    #[default]
    Rename,
    /// Replace the existing file
    Overwrite,
    /// Leave the source in place and report the move as failed
    Fail,
}

/// Moves that happened (or would happen on a dry run) and moves that failed
#[derive(Debug, Clone, Default)]
pub struct MoveReport {
    pub moved: Vec<MovedFile>,
    pub failed: Vec<MoveFailure>,
}

/// Handles safe file reorganization with dry-run support
pub struct FileMover {
    base_path: PathBuf,
    collision: CollisionPolicy,
}

impl FileMover {
    /// Create a new FileMover for the given base directory
    pub fn new<P: AsRef<Path>>(base_path: P, collision: CollisionPolicy) -> Result<Self> {
        let base_path = base_path
            .as_ref()
            .canonicalize()
            .context("Failed to canonicalize base path")?;

        if !base_path.is_dir() {
            anyhow::bail!("Base path is not a directory: {}", base_path.display());
        }

        Ok(Self {
            base_path,
            collision,
        })
    }

    /// Validate that every planned operation stays inside the base path
    pub fn plan_moves(&self, preview: &PreviewTree) -> Result<PreviewTree> {
        for dir_op in &preview.directories_to_create {
            if !dir_op.path.starts_with(&self.base_path) {
                anyhow::bail!(
                    "Directory creation outside base path: {}",
                    dir_op.path.display()
                );
            }
        }

        for move_op in &preview.files_to_move {
            if !move_op.source.starts_with(&self.base_path) {
                anyhow::bail!("Source file outside base path: {}", move_op.source.display());
            }
            if !move_op.destination.starts_with(&self.base_path) {
                anyhow::bail!("Destination outside base path: {}", move_op.destination.display());
            }
        }

        Ok(preview.clone())
    }

    /// Execute the planned moves in order.
    ///
    /// Cluster directories are created on the first move into them. A
    /// failing move, including one whose directory cannot be created, is
    /// recorded and the remaining moves still run.
    pub async fn execute(&self, preview: &PreviewTree, dry_run: bool) -> Result<MoveReport> {
        let preview = self.plan_moves(preview)?;
        let mut report = MoveReport::default();

        if dry_run {
            info!(moves = preview.files_to_move.len(), "dry run, no files will be moved");
            for op in &preview.files_to_move {
                match self.resolve_destination(&op.destination) {
                    Ok(destination) => report.moved.push(moved(op, destination)),
                    Err(e) => report.failed.push(failure(op, &e)),
                }
            }
            return Ok(report);
        }

        for op in &preview.files_to_move {
            match self.move_one(op) {
                Ok(destination) => {
                    info!(
                        source = %op.source.display(),
                        destination = %destination.display(),
                        cluster = op.cluster,
                        "moved file"
                    );
                    report.moved.push(moved(op, destination));
                }
                Err(e) => {
                    warn!(source = %op.source.display(), error = %format!("{:#}", e), "move failed");
                    report.failed.push(failure(op, &e));
                }
            }
        }

        Ok(report)
    }

    fn move_one(&self, op: &MoveOperation) -> Result<PathBuf> {
        if let Some(parent) = op.destination.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create destination directory: {}", parent.display()))?;
        }

        let destination = self.resolve_destination(&op.destination)?;
        move_file(&op.source, &destination).with_context(|| {
            format!(
                "Failed to move {} to {}",
                op.source.display(),
                destination.display()
            )
        })?;
        Ok(destination)
    }

    /// Apply the collision policy to a planned destination
    pub fn resolve_destination(&self, destination: &Path) -> Result<PathBuf> {
        if !destination.exists() {
            return Ok(destination.to_path_buf());
        }

        match self.collision {
            CollisionPolicy::Overwrite => Ok(destination.to_path_buf()),
            CollisionPolicy::Fail => {
                anyhow::bail!("Destination already exists: {}", destination.display())
            }
            CollisionPolicy::Rename => {
                let parent = destination.parent().unwrap_or(&self.base_path);
                let file_name = destination
                    .file_name()
                    .and_then(|n| n.to_str())
                    .context("Destination has no valid file name")?;
                (1..)
                    .map(|n| parent.join(utils::numbered_file_name(file_name, n)))
                    .find(|candidate| !candidate.exists())
                    .context("No free file name found")
            }
        }
    }
}

/// Rename, falling back to copy + delete when source and destination are on different devices
fn move_file(source: &Path, destination: &Path) -> io::Result<()> {
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            fs::copy(source, destination)?;
            if let Err(remove_err) = fs::remove_file(source) {
                let _ = fs::remove_file(destination);
                return Err(remove_err);
            }
            Ok(())
        }
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn is_cross_device(e: &io::Error) -> bool {
    // EXDEV
    e.raw_os_error() == Some(18)
}

#[cfg(windows)]
fn is_cross_device(e: &io::Error) -> bool {
    // ERROR_NOT_SAME_DEVICE
    e.raw_os_error() == Some(17)
}

#[cfg(not(any(unix, windows)))]
fn is_cross_device(_e: &io::Error) -> bool {
    false
}

fn moved(op: &MoveOperation, destination: PathBuf) -> MovedFile {
    MovedFile {
        source: op.source.clone(),
        destination,
        cluster: op.cluster,
    }
}

fn failure(op: &MoveOperation, error: &anyhow::Error) -> MoveFailure {
    MoveFailure {
        source: op.source.clone(),
        destination: op.destination.clone(),
        error: format!("{:#}", error),
    }
}
