//! Build manifest (`build.json`).
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── entry      # `files` entry grammar (directives, sub-project marker)
//! ├── error      # ManifestError, EntryError, diagnostics
//! ├── settings   # Env, ErrorPolicy, Settings (CLI over manifest)
//! ├── util       # comment stripping, path resolution, manifest lookup
//! └── mod.rs     # Manifest, StreamSpec, BuildPaths (this file)
//! ```
//!
//! # Format
//!
//! ```text
//! {
//!   // global ignore list, applied to file names
//!   "ignore": ["test.js"],
//!   "minify": true,
//!   "streams": {
//!     "main.js": {
//!       "priority": ["init.js"],
//!       "files": [
//!         "static/js/",
//!         "static/app/[ts]",
//!         "https://cdn.example.com/lib.js --force"
//!       ]
//!     }
//!   }
//! }
//! ```

mod entry;
mod error;
mod settings;
mod util;

pub use entry::{Entry, FORCE, IGNORE_BUILD, SUBPROJECT_MARKER, Source};
pub use error::{EntryError, ManifestDiagnostics, ManifestError};
pub use settings::{Env, ErrorPolicy, Settings};
pub use util::{find_manifest, read_commented_json, resolve_manifest_path, strip_json_comments};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::asset::OutputKind;
use crate::utils::path::normalize_path;

// ============================================================================
// manifest
// ============================================================================

/// Root structure of a build manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Absolute path to the manifest file (internal use only)
    #[serde(skip)]
    pub path: PathBuf,

    /// Directory containing the manifest; every relative path resolves here
    #[serde(skip)]
    pub root: PathBuf,

    /// Stream name (doubles as artifact path) -> stream spec
    pub streams: BTreeMap<String, StreamSpec>,

    /// File names ignored in every stream
    #[serde(default)]
    pub ignore: Vec<String>,

    #[serde(default = "defaults::minify")]
    pub minify: bool,

    /// Output root, relative to the manifest directory
    #[serde(default = "defaults::output")]
    pub output: String,

    /// Sub-project compiler command, run inside the staged sub-project
    #[serde(default = "defaults::compiler")]
    pub compiler: Vec<String>,

    /// Compiler configuration deposited into staged sub-projects
    #[serde(default)]
    pub tsconfig: Option<String>,

    /// Fail the run on any contained error
    #[serde(default)]
    pub strict: bool,
}

/// One stream: an ordered list of sources combined into one artifact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamSpec {
    pub files: Vec<String>,

    #[serde(default)]
    pub ignore: Vec<String>,

    /// File names visited first, in this order, in every directory
    #[serde(default)]
    pub priority: Vec<String>,
}

mod defaults {
    pub fn minify() -> bool {
        true
    }

    pub fn output() -> String {
        "build".into()
    }

    pub fn compiler() -> Vec<String> {
        vec!["tsc".into()]
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            root: PathBuf::new(),
            streams: BTreeMap::new(),
            ignore: Vec::new(),
            minify: defaults::minify(),
            output: defaults::output(),
            compiler: defaults::compiler(),
            tsconfig: None,
            strict: false,
        }
    }
}

impl StreamSpec {
    /// Parse every `files` entry, in declaration order.
    pub fn entries(&self) -> Result<Vec<Entry>, EntryError> {
        self.files.iter().map(|f| f.parse()).collect()
    }
}

impl Manifest {
    /// Read, parse and validate the manifest at `path`.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let path = normalize_path(path);
        let content =
            fs::read_to_string(&path).map_err(|e| ManifestError::Io(path.clone(), e))?;
        let manifest = Self::parse(&content, &path)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Parse manifest text as if it were read from `path`.
    ///
    /// `.toml` files are TOML; anything else is JSON with comments.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ManifestError> {
        let is_toml = path.extension().is_some_and(|e| e == "toml");
        let mut manifest: Self = if is_toml {
            toml::from_str(content).map_err(|e| ManifestError::Toml(path.to_path_buf(), e))?
        } else {
            serde_json::from_str(&strip_json_comments(content))
                .map_err(|e| ManifestError::Json(path.to_path_buf(), e))?
        };

        manifest.path = path.to_path_buf();
        manifest.root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(manifest)
    }

    /// Check every stream and entry; collects all problems before failing.
    pub fn validate(&self) -> Result<(), ManifestError> {
        let mut diag = ManifestDiagnostics::new(self.path.clone());

        if self.streams.is_empty() {
            diag.push("streams", "no streams declared");
        }
        if self.compiler.is_empty() {
            diag.push("compiler", "compiler command must not be empty");
        }
        if let Some(tsconfig) = self.compiler_config()
            && !tsconfig.is_file()
        {
            diag.push(
                "tsconfig",
                format!("`{}` does not exist", tsconfig.display()),
            );
        }

        for (name, spec) in &self.streams {
            if OutputKind::from_stream_name(name).is_none() {
                diag.push(
                    format!("streams.{name}"),
                    "stream name must end in `.js` or `.css`",
                );
            }
            if spec.files.is_empty() {
                diag.push(format!("streams.{name}.files"), "no files declared");
            }

            for (i, raw) in spec.files.iter().enumerate() {
                let field = format!("streams.{name}.files[{i}]");
                let entry = match raw.parse::<Entry>() {
                    Ok(entry) => entry,
                    Err(e) => {
                        diag.push(field, e.to_string());
                        continue;
                    }
                };
                if entry.ignore_build {
                    continue;
                }
                if let Some(source) = entry.source_path(&self.root)
                    && !source.exists()
                {
                    diag.push(field, format!("`{}` does not exist", source.display()));
                }
            }
        }

        diag.into_result()
    }

    pub fn paths(&self) -> BuildPaths<'_> {
        BuildPaths { manifest: self }
    }

    pub fn stream(&self, name: &str) -> Option<&StreamSpec> {
        self.streams.get(name)
    }

    /// Global ignore list followed by the stream's own.
    pub fn ignore_for(&self, spec: &StreamSpec) -> Vec<String> {
        self.ignore.iter().chain(&spec.ignore).cloned().collect()
    }

    /// Absolute path of the configured compiler configuration, if any.
    pub fn compiler_config(&self) -> Option<PathBuf> {
        self.tsconfig
            .as_deref()
            .map(|p| resolve_manifest_path(&self.root, p))
    }

    /// Directories a watcher must observe: the manifest directory plus any
    /// local source living outside it.
    pub fn watch_roots(&self) -> Vec<PathBuf> {
        let mut roots = vec![self.root.clone()];
        for spec in self.streams.values() {
            for entry in spec.files.iter().filter_map(|f| f.parse::<Entry>().ok()) {
                let Some(source) = entry.source_path(&self.root) else {
                    continue;
                };
                if roots.iter().any(|r| source.starts_with(r)) {
                    continue;
                }
                let dir = if source.is_dir() {
                    source
                } else {
                    source.parent().map(Path::to_path_buf).unwrap_or(source)
                };
                roots.push(dir);
            }
        }
        roots
    }
}

// ============================================================================
// output layout
// ============================================================================

/// Paths of everything a build writes, derived from the manifest.
///
/// ```text
/// build/
/// ├── main.js                 combined artifact
/// ├── main.min.js             minified variant
/// ├── dir-main-js/            staging tree
/// │   ├── 0000-static_js/
/// │   └── 0001-https---cdn-...-js.js
/// └── dependencies/           download cache
/// ```
#[derive(Debug, Clone, Copy)]
pub struct BuildPaths<'a> {
    manifest: &'a Manifest,
}

impl BuildPaths<'_> {
    pub fn output_dir(&self) -> PathBuf {
        resolve_manifest_path(&self.manifest.root, &self.manifest.output)
    }

    pub fn artifact(&self, stream: &str) -> PathBuf {
        self.output_dir().join(stream)
    }

    /// `main.js` -> `main.min.js`, `css/site.css` -> `css/site.min.css`.
    pub fn minified(&self, stream: &str) -> PathBuf {
        let artifact = self.artifact(stream);
        let stem = artifact
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let name = match artifact.extension() {
            Some(ext) => format!("{stem}.min.{}", ext.to_string_lossy()),
            None => format!("{stem}.min"),
        };
        artifact.with_file_name(name)
    }

    pub fn staging_dir(&self, stream: &str) -> PathBuf {
        self.output_dir()
            .join(format!("dir-{}", stream.replace(['.', '/', '\\'], "-")))
    }

    pub fn dependencies_dir(&self) -> PathBuf {
        self.output_dir().join("dependencies")
    }
}

#[cfg(test)]
pub fn test_manifest(root: &Path, json: &str) -> Manifest {
    Manifest::parse(json, &root.join("build.json")).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_parse_defaults() {
        let manifest = test_manifest(
            Path::new("/site"),
            r#"{ "streams": { "main.js": { "files": ["a.js"] } } }"#,
        );
        assert!(manifest.minify);
        assert!(!manifest.strict);
        assert_eq!(manifest.output, "build");
        assert_eq!(manifest.compiler, vec!["tsc".to_string()]);
        assert_eq!(manifest.root, PathBuf::from("/site"));
        assert!(manifest.streams["main.js"].ignore.is_empty());
    }

    #[test]
    fn test_parse_with_comments() {
        let manifest = test_manifest(
            Path::new("/site"),
            r#"{
                // only one stream for now
                "minify": false, /* dev box */
                "streams": {
                    "main.js": { "files": ["https://cdn.example.com/a.js --force"] }
                }
            }"#,
        );
        assert!(!manifest.minify);
        assert_eq!(
            manifest.streams["main.js"].files[0],
            "https://cdn.example.com/a.js --force"
        );
    }

    #[test]
    fn test_parse_toml() {
        let manifest = Manifest::parse(
            "minify = false\n[streams.\"site.css\"]\nfiles = [\"css/\"]\n",
            Path::new("/site/build.toml"),
        )
        .unwrap();
        assert!(!manifest.minify);
        assert_eq!(manifest.streams["site.css"].files, vec!["css/".to_string()]);
    }

    #[test]
    fn test_parse_invalid_json() {
        let err = Manifest::parse("{ streams: ", Path::new("/site/build.json")).unwrap_err();
        assert!(matches!(err, ManifestError::Json(..)));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = Manifest::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ManifestError::Io(..)));
    }

    #[test]
    fn test_validate_collects_problems() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "static/a.js", "a");
        let manifest = test_manifest(
            dir.path(),
            r#"{ "streams": {
                "main.js": { "files": ["static/a.js", "static/missing.js", "x.js --force"] },
                "main.ts": { "files": ["static/a.js"] }
            } }"#,
        );
        let Err(ManifestError::Invalid(diag)) = manifest.validate() else {
            panic!("expected validation failure");
        };
        assert_eq!(diag.len(), 3);
        let text = diag.to_string();
        assert!(text.contains("missing.js"));
        assert!(text.contains("streams.main.ts"));
    }

    #[test]
    fn test_validate_skips_ignore_build_existence() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "static/a.js", "a");
        let manifest = test_manifest(
            dir.path(),
            r#"{ "streams": { "main.js": { "files": [
                "static/a.js",
                "vendor/not-here.js --ignore-build",
                "https://cdn.example.com/lib.js"
            ] } } }"#,
        );
        manifest.validate().unwrap();
    }

    #[test]
    fn test_build_paths() {
        let manifest = test_manifest(
            Path::new("/site"),
            r#"{ "output": "public/assets", "streams": { "js/main.js": { "files": [] } } }"#,
        );
        let paths = manifest.paths();
        assert_eq!(paths.output_dir(), PathBuf::from("/site/public/assets"));
        assert_eq!(
            paths.artifact("js/main.js"),
            PathBuf::from("/site/public/assets/js/main.js")
        );
        assert_eq!(
            paths.minified("js/main.js"),
            PathBuf::from("/site/public/assets/js/main.min.js")
        );
        assert_eq!(
            paths.staging_dir("js/main.js"),
            PathBuf::from("/site/public/assets/dir-js-main-js")
        );
        assert_eq!(
            paths.dependencies_dir(),
            PathBuf::from("/site/public/assets/dependencies")
        );
    }

    #[test]
    fn test_ignore_for_merges_lists() {
        let manifest = test_manifest(
            Path::new("/site"),
            r#"{ "ignore": ["a.js"], "streams": { "m.js": { "files": [], "ignore": ["b.js"] } } }"#,
        );
        let ignore = manifest.ignore_for(&manifest.streams["m.js"]);
        assert_eq!(ignore, vec!["a.js".to_string(), "b.js".to_string()]);
    }

    #[test]
    fn test_watch_roots_include_outside_sources() {
        let site = TempDir::new().unwrap();
        let shared = TempDir::new().unwrap();
        write(shared.path(), "lib/x.js", "x");
        let json = format!(
            r#"{{ "streams": {{ "m.js": {{ "files": ["a/", "{}"] }} }} }}"#,
            shared.path().join("lib").display()
        );
        let manifest = test_manifest(site.path(), &json);
        let roots = manifest.watch_roots();
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[1], shared.path().join("lib"));
    }

    #[test]
    fn test_watch_roots_include_parent_relative_sources() {
        let dir = TempDir::new().unwrap();
        let base = normalize_path(dir.path());
        write(&base, "shared/x.js", "x");
        std::fs::create_dir_all(base.join("site")).unwrap();

        let manifest = test_manifest(
            &base.join("site"),
            r#"{ "streams": { "m.js": { "files": ["../shared/"] } } }"#,
        );
        assert_eq!(
            manifest.watch_roots(),
            vec![base.join("site"), base.join("shared")]
        );
    }
}
