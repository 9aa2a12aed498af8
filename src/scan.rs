//! Directory scanning for poster assets.

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::error::Error;

/// Extensions the offline asset pipeline produces and the resolver can decode.
pub const POSTER_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Options controlling poster discovery.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Whether to descend into subdirectories of the asset root.
    pub recursive: bool,
    /// Optional override for allowed extensions (lowercase, without dot).
    pub exts: Option<Vec<&'static str>>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            exts: None,
        }
    }
}

/// Return `true` if `path` has an allowed poster extension.
#[must_use]
pub fn is_supported_image(path: &Path, exts: Option<&[&str]>) -> bool {
    let exts = exts.unwrap_or(POSTER_EXTENSIONS);
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| *e == ext)
        })
}

/// List poster files under `root` as filenames relative to it, sorted.
///
/// Relative names are what the catalog stores and what the resolver joins
/// back onto the thumbnail and full-size directories.
///
/// # Errors
/// Returns [`Error::BadDir`] if `root` is missing or not a directory.
pub fn scan_posters(root: &Path, opts: &ScanOptions) -> Result<Vec<String>, Error> {
    if !root.is_dir() {
        return Err(Error::BadDir(root.to_string_lossy().into_owned()));
    }

    let mut wd = WalkDir::new(root).follow_links(true);
    if !opts.recursive {
        wd = wd.max_depth(1);
    }

    let mut out: Vec<String> = wd
        .into_iter()
        .filter_entry(|e| !should_skip_dir(e))
        .flatten()
        .filter(|e| e.file_type().is_file())
        .filter(|e| is_supported_image(e.path(), opts.exts.as_deref()))
        .filter_map(|e| relative_name(root, e.path()))
        .collect();
    out.sort();
    Ok(out)
}

fn relative_name(root: &Path, path: &Path) -> Option<String> {
    let rel: PathBuf = path.strip_prefix(root).ok()?.to_path_buf();
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

fn should_skip_dir(entry: &DirEntry) -> bool {
    // Never skip the root; tempfile roots can be dot-dirs.
    if entry.depth() == 0 {
        return false;
    }
    if !entry.file_type().is_dir() {
        return false;
    }
    entry
        .file_name()
        .to_str()
        .is_some_and(|n| n.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(is_supported_image(Path::new("a/B.JPG"), None));
        assert!(is_supported_image(Path::new("poster.webp"), None));
        assert!(!is_supported_image(Path::new("notes.txt"), None));
        assert!(!is_supported_image(Path::new("poster.gif"), None));
        assert!(is_supported_image(Path::new("poster.gif"), Some(&["gif"][..])));
    }

    #[test]
    fn flat_scan_skips_nested_and_hidden() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::create_dir_all(root.join(".cache")).unwrap();
        fs::write(root.join("b.png"), b"x").unwrap();
        fs::write(root.join("a.jpg"), b"x").unwrap();
        fs::write(root.join("readme.md"), b"x").unwrap();
        fs::write(root.join("nested").join("c.jpg"), b"x").unwrap();
        fs::write(root.join(".cache").join("d.jpg"), b"x").unwrap();

        let flat = scan_posters(root, &ScanOptions::default()).unwrap();
        assert_eq!(flat, vec!["a.jpg".to_string(), "b.png".to_string()]);

        let deep = scan_posters(
            root,
            &ScanOptions {
                recursive: true,
                exts: None,
            },
        )
        .unwrap();
        assert_eq!(
            deep,
            vec![
                "a.jpg".to_string(),
                "b.png".to_string(),
                "nested/c.jpg".to_string()
            ]
        );
    }

    #[test]
    fn missing_root_is_bad_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let err = scan_posters(&tmp.path().join("nope"), &ScanOptions::default()).unwrap_err();
        assert!(matches!(err, Error::BadDir(_)));
    }
}
