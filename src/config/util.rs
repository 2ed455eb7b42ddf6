//! Configuration utility functions.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::utils::path::{join_clean, normalize_path};

/// Matches string literals, block comments and line comments.
///
/// String literals are matched so that `//` inside `"https://..."` is left
/// alone; only the two comment alternatives are replaced.
static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(?:[^"\\]|\\.)*"|(?s:/\*.*?\*/)|//[^\n]*"#).unwrap()
});

/// Remove `//` and `/* */` comments from JSON text.
///
/// ```ignore
/// strip_json_comments(r#"{"a": "http://x" // note
/// }"#) -> r#"{"a": "http://x" 
/// }"#
/// ```
pub fn strip_json_comments(input: &str) -> Cow<'_, str> {
    COMMENT_RE.replace_all(input, |caps: &regex::Captures<'_>| {
        let m = &caps[0];
        if m.starts_with('"') {
            m.to_string()
        } else {
            String::new()
        }
    })
}

/// Read a JSON file that may contain comments (manifests, `tsconfig.json`).
pub fn read_commented_json(path: &Path) -> Result<serde_json::Value> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&strip_json_comments(&content))
        .with_context(|| format!("invalid JSON in {}", path.display()))
}

/// Resolve a manifest-relative path, expanding a leading `~`.
///
/// `.` and `..` are folded lexically, so `../shared` compares against
/// watched paths and watch roots like any other absolute path.
pub fn resolve_manifest_path(root: &Path, raw: &str) -> PathBuf {
    let expanded = shellexpand::tilde(raw);
    join_clean(root, Path::new(expanded.as_ref()))
}

/// Find the manifest by searching upward from the current directory.
///
/// ```text
/// /home/user/site/client/js/   ← cwd
/// /home/user/site/build.json   ← found!
/// ```
pub fn find_manifest(name: &Path) -> Option<PathBuf> {
    if name.is_absolute() {
        return name.exists().then(|| name.to_path_buf());
    }

    let cwd = std::env::current_dir().ok()?;
    let mut current = cwd.as_path();
    loop {
        let candidate = current.join(name);
        if candidate.exists() {
            return Some(normalize_path(&candidate));
        }
        current = current.parent()?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_strip_line_and_block_comments() {
        let input = r#"{
            // streams
            "minify": false, /* inline */ "ignore": []
            /* multi
               line */
        }"#;
        let value: serde_json::Value =
            serde_json::from_str(&strip_json_comments(input)).unwrap();
        assert_eq!(value["minify"], false);
        assert!(value["ignore"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_strip_keeps_urls_in_strings() {
        let input = r#"{"files": ["https://cdn.example.com/a.js --force"]} // trailing"#;
        let stripped = strip_json_comments(input);
        assert!(stripped.contains("https://cdn.example.com/a.js --force"));
        assert!(!stripped.contains("trailing"));
    }

    #[test]
    fn test_strip_keeps_escaped_quotes() {
        let input = r#"{"a": "say \"//hi\""}"#;
        let value: serde_json::Value =
            serde_json::from_str(&strip_json_comments(input)).unwrap();
        assert_eq!(value["a"], r#"say "//hi""#);
    }

    #[test]
    fn test_read_commented_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tsconfig.json");
        fs::write(
            &path,
            "{\n  // emit one file\n  \"compilerOptions\": { \"outFile\": \"./out.js\" }\n}",
        )
        .unwrap();
        let value = read_commented_json(&path).unwrap();
        assert_eq!(value["compilerOptions"]["outFile"], "./out.js");
    }

    #[test]
    fn test_resolve_manifest_path() {
        let root = Path::new("/site");
        assert_eq!(
            resolve_manifest_path(root, "./static/js"),
            PathBuf::from("/site/static/js")
        );
        assert_eq!(
            resolve_manifest_path(root, "/abs/x.js"),
            PathBuf::from("/abs/x.js")
        );
        assert!(!resolve_manifest_path(root, "~/x.js").starts_with("~"));
    }

    #[test]
    fn test_resolve_manifest_path_folds_parent_dirs() {
        let root = Path::new("/work/site");
        assert_eq!(
            resolve_manifest_path(root, "../shared/"),
            PathBuf::from("/work/shared")
        );
        assert_eq!(
            resolve_manifest_path(root, "./js/../css/./theme.scss"),
            PathBuf::from("/work/site/css/theme.scss")
        );
        assert!(!resolve_manifest_path(root, "../shared").starts_with(root));
    }

    #[test]
    fn test_find_manifest_absolute_missing() {
        assert_eq!(find_manifest(Path::new("/definitely/not/here.json")), None);
    }
}
