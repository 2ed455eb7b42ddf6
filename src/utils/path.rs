//! Path normalization and tree copying.

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to:
/// - Return as-is if already absolute
/// - Join with current directory if relative
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Join `rel` onto `base`, dropping `.` components.
///
/// `join_clean("/a/b", "./index.js")` is `/a/b/index.js`, so paths built
/// from a compiler's `outFile` compare equal no matter how it was spelled.
pub fn join_clean(base: &Path, rel: &Path) -> PathBuf {
    let mut out = base.to_path_buf();
    for component in rel.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Copy a file or a whole directory tree to `dest`.
///
/// Directories are merged into `dest`, files overwrite. Returns the number
/// of files copied.
pub fn copy_tree(src: &Path, dest: &Path) -> Result<usize> {
    if src.is_dir() {
        let mut count = 0;
        copy_dir_recursive(src, dest, &mut count)?;
        return Ok(count);
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::copy(src, dest)
        .with_context(|| format!("failed to copy {} -> {}", src.display(), dest.display()))?;
    Ok(1)
}

fn copy_dir_recursive(src_dir: &Path, dest_dir: &Path, count: &mut usize) -> Result<()> {
    fs::create_dir_all(dest_dir)
        .with_context(|| format!("failed to create {}", dest_dir.display()))?;

    for entry in
        fs::read_dir(src_dir).with_context(|| format!("failed to read {}", src_dir.display()))?
    {
        let entry = entry?;
        let src_path = entry.path();
        let dest_path = dest_dir.join(entry.file_name());

        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dest_path, count)?;
        } else {
            fs::copy(&src_path, &dest_path).with_context(|| {
                format!(
                    "failed to copy {} -> {}",
                    src_path.display(),
                    dest_path.display()
                )
            })?;
            *count += 1;
        }
    }

    Ok(())
}

/// Render a path relative to `root` with forward slashes.
///
/// Paths outside `root` are returned as-is.
pub fn display_relative(path: &Path, root: &Path) -> String {
    let Ok(rel) = path.strip_prefix(root) else {
        return path.display().to_string();
    };
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_path_relative() {
        let normalized = normalize_path(Path::new("relative/path/file.txt"));
        assert!(normalized.is_absolute());
    }

    #[test]
    fn test_join_clean() {
        assert_eq!(
            join_clean(Path::new("/a/b"), Path::new("./index.js")),
            PathBuf::from("/a/b/index.js")
        );
        assert_eq!(
            join_clean(Path::new("/a/b"), Path::new("../out/app.js")),
            PathBuf::from("/a/out/app.js")
        );
    }

    #[test]
    fn test_copy_tree_nested() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("a.js"), "a").unwrap();
        fs::write(src.join("nested/b.js"), "b").unwrap();

        let dest = dir.path().join("out/copy");
        assert_eq!(copy_tree(&src, &dest).unwrap(), 2);
        assert_eq!(fs::read_to_string(dest.join("nested/b.js")).unwrap(), "b");
    }

    #[test]
    fn test_copy_tree_single_file() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("one.css");
        fs::write(&src, "body{}").unwrap();

        let dest = dir.path().join("stage/0000-one.css");
        assert_eq!(copy_tree(&src, &dest).unwrap(), 1);
        assert_eq!(fs::read_to_string(dest).unwrap(), "body{}");
    }

    #[test]
    fn test_display_relative() {
        let root = Path::new("/site");
        assert_eq!(
            display_relative(Path::new("/site/build/main.js"), root),
            "build/main.js"
        );
        assert_eq!(display_relative(Path::new("/other/x.js"), root), "/other/x.js");
    }
}
