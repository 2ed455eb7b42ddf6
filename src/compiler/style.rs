//! Style preprocessor adapter (scss/sass -> css).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

/// Compile one stylesheet source to compressed CSS.
pub fn compile_style(path: &Path) -> Result<String> {
    let options = grass::Options::default().style(grass::OutputStyle::Compressed);
    grass::from_path(path, &options)
        .map_err(|e| anyhow!("{e}"))
        .with_context(|| format!("failed to compile {}", path.display()))
}

/// `theme.scss` -> `theme.css`.
pub fn css_sibling(path: &Path) -> PathBuf {
    path.with_extension("css")
}

/// Compile a stylesheet source and write the result next to it.
///
/// Returns the written sibling path and the compiled CSS.
pub fn render_style(path: &Path) -> Result<(PathBuf, String)> {
    let css = compile_style(path)?;
    let sibling = css_sibling(path);
    fs::write(&sibling, &css).with_context(|| format!("failed to write {}", sibling.display()))?;
    Ok((sibling, css))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_render_style_writes_sibling() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("theme.scss");
        fs::write(&src, "$pad: 4px;\n.card { padding: $pad; .title { margin: 0; } }\n").unwrap();

        let (sibling, css) = render_style(&src).unwrap();
        assert_eq!(sibling, dir.path().join("theme.css"));
        assert!(css.contains(".card{padding:4px}"));
        assert!(css.contains(".card .title{margin:0}"));
        assert_eq!(fs::read_to_string(sibling).unwrap(), css);
    }

    #[test]
    fn test_indented_syntax() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("base.sass");
        fs::write(&src, "body\n  margin: 0\n").unwrap();
        assert!(compile_style(&src).unwrap().contains("body{margin:0}"));
    }

    #[test]
    fn test_invalid_style_is_error() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("bad.scss");
        fs::write(&src, ".a { color: $undefined; }").unwrap();
        assert!(compile_style(&src).is_err());
        assert!(!css_sibling(&src).exists());
    }
}
