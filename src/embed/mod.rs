//! Embedded static resources.
//!
//! - `template` - Template types for typed variable injection
//! - `compiler` - default compiler configuration for staged sub-projects
//!
//! # Usage
//!
//! ```ignore
//! use embed::compiler::{TSCONFIG_JSON, TsconfigVars};
//!
//! let json = TSCONFIG_JSON.render(&TsconfigVars::default());
//! ```

mod template;

pub use template::{Template, TemplateVars};

pub mod compiler {
    use super::{Template, TemplateVars};

    /// Variables for tsconfig.json template.
    pub struct TsconfigVars<'a> {
        /// Single output file, relative to the sub-project
        pub out_file: &'a str,
    }

    impl Default for TsconfigVars<'_> {
        fn default() -> Self {
            Self {
                out_file: "./index.js",
            }
        }
    }

    impl TemplateVars for TsconfigVars<'_> {
        fn apply(&self, content: &str) -> String {
            content.replace("__OUT_FILE__", self.out_file)
        }
    }

    /// Compiler configuration deposited into sub-projects without their own.
    pub const TSCONFIG_JSON: Template<TsconfigVars<'static>> =
        Template::new(include_str!("tsconfig.json"));
}
