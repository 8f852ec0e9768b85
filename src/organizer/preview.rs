use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Represents a file move operation
#[derive(Debug, Clone, PartialEq)]
pub struct MoveOperation {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Cluster label the file was assigned to
    pub cluster: usize,
}

/// Represents a directory creation operation
#[derive(Debug, Clone, PartialEq)]
pub struct CreateDirOperation {
    pub path: PathBuf,
}

/// Collection of operations for preview
#[derive(Debug, Clone, Default)]
pub struct PreviewTree {
    pub directories_to_create: Vec<CreateDirOperation>,
    pub files_to_move: Vec<MoveOperation>,
}

impl PreviewTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directory to be created; duplicates are ignored
    pub fn add_directory(&mut self, path: PathBuf) {
        if !self.directories_to_create.iter().any(|d| d.path == path) {
            self.directories_to_create.push(CreateDirOperation { path });
        }
    }

    /// Add a file move operation
    pub fn add_move(&mut self, source: PathBuf, destination: PathBuf, cluster: usize) {
        self.files_to_move.push(MoveOperation {
            source,
            destination,
            cluster,
        });
    }

    /// Render the planned layout, paths shown relative to `base`
    pub fn render(&self, base: &Path) -> String {
        let mut output = String::new();
        output.push_str("Proposed changes:\n");

        let mut dir_files: BTreeMap<PathBuf, Vec<&MoveOperation>> = BTreeMap::new();
        for op in &self.files_to_move {
            let dir = op.destination.parent().unwrap_or(base).to_path_buf();
            dir_files.entry(dir).or_default().push(op);
        }

        for (dir, files) in &dir_files {
            let display_dir = dir.strip_prefix(base).unwrap_or(dir);
            output.push_str(&format!("📁 {}/\n", display_dir.display()));

            for file_op in files {
                let file_name = file_op
                    .destination
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("unknown");
                let source_display = file_op.source.strip_prefix(base).unwrap_or(&file_op.source);
                output.push_str(&format!(
                    "  📄 {} (from: {})\n",
                    file_name,
                    source_display.display()
                ));
            }
        }

        output.push_str(&format!(
            "\nCreate {} directories, move {} files.",
            self.directories_to_create.len(),
            self.files_to_move.len()
        ));

        output
    }
}
