//! Artifact minification.
//!
//! Uses oxc for scripts and lightningcss for stylesheets. Both degrade to
//! an empty string on failure: an empty minified variant means
//! "minification unavailable", never "stream has no content".

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

use super::OutputKind;
use crate::utils::blocking;

/// Minify a combined artifact. Returns an empty string on failure.
pub fn minify(kind: OutputKind, source: &str) -> String {
    let out = match kind {
        OutputKind::Script => minify_js(source),
        OutputKind::Stylesheet => minify_css(source),
    };
    out.unwrap_or_default()
}

/// [`minify`] on the blocking pool.
pub async fn minify_async(kind: OutputKind, source: String) -> String {
    blocking(move || Ok(minify(kind, &source)))
        .await
        .unwrap_or_default()
}

/// Minify script source.
///
/// Combined artifacts are classic scripts sharing one global scope, so
/// top-level names are left alone.
pub fn minify_js(source: &str) -> Option<String> {
    let allocator = Allocator::default();
    let source_type = SourceType::script();
    let ret = Parser::new(&allocator, source, source_type).parse();
    if ret.panicked || !ret.errors.is_empty() {
        return None;
    }
    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;
    Some(code)
}

/// Browsers the vendor-prefixing pass targets.
fn targets() -> Targets {
    Targets::from(Browsers {
        chrome: Some(95 << 16),
        edge: Some(95 << 16),
        firefox: Some(90 << 16),
        safari: Some(13 << 16),
        ios_saf: Some(13 << 16),
        ..Browsers::default()
    })
}

/// Minify stylesheet source: vendor-prefix for [`targets`], then compress.
pub fn minify_css(source: &str) -> Option<String> {
    let mut stylesheet = StyleSheet::parse(source, ParserOptions::default()).ok()?;
    stylesheet
        .minify(MinifyOptions {
            targets: targets(),
            ..MinifyOptions::default()
        })
        .ok()?;
    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            targets: targets(),
            ..PrinterOptions::default()
        })
        .ok()?;
    Some(result.code)
}
