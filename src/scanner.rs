use anyhow::{bail, Result};
use log::{info, warn};
use std::path::PathBuf;
use walkdir::WalkDir;

/// Directories never descended into
const SKIPPED_DIRS: [&str; 3] = ["node_modules", "dist", "build"];

/// File scanner for traversing project directories.
///
/// The `FileScanner` recursively walks through a project directory to find all
/// TypeScript sources. Dependency and build output directories are skipped, as
/// are hidden directories (those starting with `.`) and `.d.ts` declaration files.
///
/// # Example
///
/// ```no_run
/// use ts_route_compiler::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let scanner = FileScanner::new(PathBuf::from("./my-project"));
/// let result = scanner.scan().unwrap();
/// println!("Found {} TypeScript files", result.source_files.len());
/// ```
pub struct FileScanner {
    root_path: PathBuf,
}

/// Result of directory scanning operation.
pub struct ScanResult {
    /// Discovered `.ts` files, sorted by path
    pub source_files: Vec<PathBuf>,
    /// Warning messages for any issues encountered (e.g., inaccessible directories)
    pub warnings: Vec<String>,
}

impl FileScanner {
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Scans the directory tree and collects all `.ts` files.
    ///
    /// Entries that cannot be read are logged and recorded in
    /// [`ScanResult::warnings`]; scanning continues past them.
    ///
    /// # Errors
    ///
    /// Returns an error if the root is not a directory.
    pub fn scan(&self) -> Result<ScanResult> {
        if !self.root_path.is_dir() {
            bail!("{} is not a directory", self.root_path.display());
        }
        let mut source_files = Vec::new();
        let mut warnings = Vec::new();

        for entry in WalkDir::new(&self.root_path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                if e.path() == self.root_path || !e.file_type().is_dir() {
                    return true;
                }
                let file_name = e.file_name().to_string_lossy();
                !file_name.starts_with('.') && !SKIPPED_DIRS.contains(&file_name.as_ref())
            })
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    let name = entry.file_name().to_string_lossy();
                    if entry.file_type().is_file() && name.ends_with(".ts") && !name.ends_with(".d.ts") {
                        source_files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        info!("Found {} TypeScript files", source_files.len());
        Ok(ScanResult {
            source_files,
            warnings,
        })
    }
}
