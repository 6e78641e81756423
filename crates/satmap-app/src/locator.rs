//! File lookup for materials, textures and masks.
//!
//! The data directory is scanned once; names and extensions are then matched
//! case-insensitively against the index, wherever the file sits in the tree.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use satmap_materials::DefinitionSource;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Index of every file under a directory, keyed by lowercase file stem.
pub struct AssetLocator {
    /// stem → (lowercase extension, path), in walk order.
    files: HashMap<String, Vec<(String, PathBuf)>>,
}

impl AssetLocator {
    /// Walks `root` recursively and indexes every file.
    ///
    /// Unreadable entries below the root are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns the walk error if `root` itself cannot be read.
    pub fn scan(root: &Path) -> Result<Self, walkdir::Error> {
        let mut files: HashMap<String, Vec<(String, PathBuf)>> = HashMap::new();

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => return Err(e),
                Err(e) => {
                    warn!("skipping unreadable entry under {}: {e}", root.display());
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.into_path();
            let (Some(stem), Some(ext)) = (path.file_stem(), path.extension()) else {
                continue;
            };
            let stem = stem.to_string_lossy().to_lowercase();
            let ext = ext.to_string_lossy().to_lowercase();
            files.entry(stem).or_default().push((ext, path));
        }

        debug!(root = %root.display(), names = files.len(), "indexed data directory");
        Ok(Self { files })
    }

    /// Finds `name` with the first of `extensions` that exists.
    ///
    /// Both name and extensions match case-insensitively. Among files with
    /// the same name and extension, the first in sorted walk order wins.
    pub fn find(&self, name: &str, extensions: &[String]) -> Option<&Path> {
        let candidates = self.files.get(&name.to_lowercase())?;
        extensions.iter().find_map(|wanted| {
            let wanted = wanted.to_lowercase();
            candidates
                .iter()
                .find(|(ext, _)| *ext == wanted)
                .map(|(_, path)| path.as_path())
        })
    }

    /// Number of distinct file names indexed.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns `true` if no files were found.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Material definitions stored as `<name>.<extension>` files in the data directory.
pub struct DefinitionFiles<'a> {
    locator: &'a AssetLocator,
    extension: [String; 1],
}

impl<'a> DefinitionFiles<'a> {
    /// Serves definitions with the given file extension from `locator`.
    pub fn new(locator: &'a AssetLocator, extension: &str) -> Self {
        Self {
            locator,
            extension: [extension.to_string()],
        }
    }

    /// Path of the definition file for `name`, if any.
    pub fn path(&self, name: &str) -> Option<&Path> {
        self.locator.find(name, &self.extension)
    }
}

impl DefinitionSource for DefinitionFiles<'_> {
    fn read_definition(&self, name: &str) -> std::io::Result<Option<String>> {
        self.path(name).map(std::fs::read_to_string).transpose()
    }
}

/// Lists mask files directly inside `dir` whose extension is one of
/// `extensions` (case-insensitive), sorted by file name.
///
/// # Errors
///
/// Returns the I/O error if `dir` cannot be read.
pub fn list_masks(dir: &Path, extensions: &[String]) -> std::io::Result<Vec<PathBuf>> {
    let mut masks = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let matches = path.extension().is_some_and(|ext| {
            let ext = ext.to_string_lossy();
            extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext))
        });
        if matches {
            masks.push(path);
        }
    }
    masks.sort();
    Ok(masks)
}
