//! Output and source kinds.

use std::path::Path;

use serde::Serialize;

/// Kind of a combined artifact, implied by the stream name's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Script,
    Stylesheet,
}

impl OutputKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "js" => Some(Self::Script),
            "css" => Some(Self::Stylesheet),
            _ => None,
        }
    }

    /// `main.js` -> Script, `css/site.css` -> Stylesheet.
    pub fn from_stream_name(name: &str) -> Option<Self> {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub const fn extension(self) -> &'static str {
        match self {
            Self::Script => "js",
            Self::Stylesheet => "css",
        }
    }

    /// Appended after every piece of content in a combined artifact.
    pub const fn delimiter(self) -> &'static str {
        match self {
            Self::Script => ";\n",
            Self::Stylesheet => "\n",
        }
    }
}

/// Kind of a watched source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Script,
    Stylesheet,
    /// `.scss` / `.sass`, compiled by the style preprocessor.
    Style,
    /// `.ts`, compiled as part of a sub-project.
    Compiled,
    /// `.json`: manifests and compiler configuration.
    Json,
}

impl SourceKind {
    /// Extension allow-list of the watcher.
    pub const WATCHED: &[&str] = &["ts", "js", "css", "scss", "sass", "json"];

    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "js" => Some(Self::Script),
            "css" => Some(Self::Stylesheet),
            "scss" | "sass" => Some(Self::Style),
            "ts" => Some(Self::Compiled),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Output kind this source renders into, if it renders at all.
    pub const fn rendered(self) -> Option<OutputKind> {
        match self {
            Self::Script | Self::Compiled => Some(OutputKind::Script),
            Self::Stylesheet | Self::Style => Some(OutputKind::Stylesheet),
            Self::Json => None,
        }
    }
}

/// Whether `path` is a preprocessed stylesheet source.
pub fn is_style_source(path: &Path) -> bool {
    SourceKind::from_path(path) == Some(SourceKind::Style)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_kind_from_stream_name() {
        assert_eq!(OutputKind::from_stream_name("main.js"), Some(OutputKind::Script));
        assert_eq!(
            OutputKind::from_stream_name("css/site.css"),
            Some(OutputKind::Stylesheet)
        );
        assert_eq!(OutputKind::from_stream_name("main.ts"), None);
        assert_eq!(OutputKind::from_stream_name("main"), None);
    }

    #[test]
    fn test_delimiters() {
        assert_eq!(OutputKind::Script.delimiter(), ";\n");
        assert_eq!(OutputKind::Stylesheet.delimiter(), "\n");
    }

    #[test]
    fn test_source_kind_rendering() {
        let rendered = |p: &str| SourceKind::from_path(Path::new(p)).and_then(SourceKind::rendered);
        assert_eq!(rendered("a/b.ts"), Some(OutputKind::Script));
        assert_eq!(rendered("a/b.scss"), Some(OutputKind::Stylesheet));
        assert_eq!(rendered("a/b.sass"), Some(OutputKind::Stylesheet));
        assert_eq!(rendered("tsconfig.json"), None);
        assert_eq!(SourceKind::from_path(Path::new("a/b.md")), None);
    }

    #[test]
    fn test_allow_list_matches_kinds() {
        for ext in SourceKind::WATCHED {
            let path = format!("x.{ext}");
            assert!(SourceKind::from_path(Path::new(&path)).is_some(), "{ext}");
        }
    }
}
