//! Test case discovery
//!
//! Every immediate subdirectory of a root is a test case. Roots are searched in the order given and
//! the cases inside one root are sorted by name. Nothing is recursive.

use std::ffi::OsStr;
use std::fs;
use std::path::{Component, Path, PathBuf};

use casebook_core::layout::missing_fixture_files;
use casebook_core::{Annotation, AnnotationScanner};
use tracing::{debug, warn};

use super::case_interfaces::{CaseDiscovery, case_has_file};

/// One discovered case folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// Folder name; also the stem of the named-layout board/game/output files
    pub name: String,
    pub dir: PathBuf,
    /// Root the folder was found under
    pub root: PathBuf,
}

impl TestCase {
    /// Fixture files this case lacks (empty when it can be checked).
    pub fn missing_fixture_files(&self) -> Vec<&'static str> {
        missing_fixture_files(|name| case_has_file(&self.dir, name))
    }
}

/// Result of scanning the roots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    pub cases: Vec<TestCase>,
    /// Roots that do not exist or could not be read
    pub missing: Vec<PathBuf>,
    /// Roots that are files rather than folders
    pub not_directories: Vec<PathBuf>,
}

impl Discovery {
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

/// Filesystem discovery that skips hidden folders and the harness's own output folder.
#[derive(Debug, Clone)]
pub struct FsDiscovery {
    pub output_dir: String,
}

impl FsDiscovery {
    pub fn new(output_dir: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

impl CaseDiscovery for FsDiscovery {
    fn discover(&self, roots: &[PathBuf]) -> Discovery {
        discover_cases(roots, &self.output_dir)
    }
}

/// Scan `roots` for case folders.
pub fn discover_cases(roots: &[PathBuf], output_dir: &str) -> Discovery {
    let mut discovery = Discovery::default();

    for root in roots {
        if !root.exists() {
            warn!("Folder {} does not exist", root.display());
            discovery.missing.push(root.clone());
            continue;
        }
        if !root.is_dir() {
            discovery.not_directories.push(root.clone());
            continue;
        }

        match case_folders(root, output_dir) {
            Ok(cases) => {
                debug!(root = %root.display(), count = cases.len(), "discovered cases");
                discovery.cases.extend(cases);
            }
            Err(e) => {
                warn!("Cannot read folder {}: {}", root.display(), e);
                discovery.missing.push(root.clone());
            }
        }
    }

    discovery
}

/// Top-level folder that `output_dir` creates under a root.
fn output_folder_name(output_dir: &str) -> Option<&OsStr> {
    Path::new(output_dir).components().find_map(|component| match component {
        Component::Normal(name) => Some(name),
        _ => None,
    })
}

fn case_folders(root: &Path, output_dir: &str) -> std::io::Result<Vec<TestCase>> {
    let skipped = output_folder_name(output_dir);
    let mut cases = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let file_name = entry.file_name();
        if skipped == Some(file_name.as_os_str()) {
            continue;
        }
        let name = file_name.to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        cases.push(TestCase {
            name,
            dir: path,
            root: root.to_path_buf(),
        });
    }
    cases.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(cases)
}

/// Annotations from every regular file directly inside `case_dir`, in file-name order.
///
/// Unreadable files are skipped; non-UTF-8 bytes are replaced.
pub fn scan_case_annotations(case_dir: &Path, scanner: &AnnotationScanner) -> Vec<Annotation> {
    let mut files: Vec<(String, PathBuf)> = match fs::read_dir(case_dir) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_file())
            .map(|entry| (entry.file_name().to_string_lossy().into_owned(), entry.path()))
            .collect(),
        Err(e) => {
            warn!("Cannot read case folder {}: {}", case_dir.display(), e);
            return Vec::new();
        }
    };
    files.sort();

    let mut annotations = Vec::new();
    for (name, path) in files {
        match fs::read(&path) {
            Ok(bytes) => annotations.extend(scanner.scan(&name, &String::from_utf8_lossy(&bytes))),
            Err(e) => debug!("skipping unreadable file {}: {}", path.display(), e),
        }
    }
    annotations
}
