//! Output kinds, minification and the asset tag plan.

mod kind;
mod minify;
mod tags;

pub use kind::{OutputKind, SourceKind, is_style_source};
pub use minify::{minify, minify_async, minify_css, minify_js};
pub use tags::{AssetTag, TagInputs, tag_plan};
