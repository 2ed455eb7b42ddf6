//! Remote `--force` sources.
//!
//! - `cache` - single-flight Download Cache, owned by the orchestrator
//! - `client` - worker side: ask, download or read, stage

mod cache;
mod client;

pub use cache::{DownloadCache, Ticket};
pub use client::{fetch_into, http_client};

/// Deterministic cache file name for a URL.
///
/// Every `/ : . ? & = % # + space` becomes `-`, then the extension of the
/// URL path is appended so tooling still recognizes the file type:
///
/// ```ignore
/// url_slug("https://a.b/x.js") -> "https---a-b-x-js.js"
/// ```
pub fn url_slug(url: &str) -> String {
    let slug: String = url
        .chars()
        .map(|c| match c {
            '/' | ':' | '.' | '?' | '&' | '=' | '%' | '#' | '+' | ' ' => '-',
            c => c,
        })
        .collect();

    match url_extension(url) {
        Some(ext) => format!("{slug}.{ext}"),
        None => slug,
    }
}

/// Extension of the last path segment, ignoring query and fragment.
fn url_extension(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    let (_, ext) = last.rsplit_once('.')?;
    (!ext.is_empty()).then(|| ext.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_slug() {
        assert_eq!(url_slug("https://a.b/x.js"), "https---a-b-x-js.js");
        assert_eq!(
            url_slug("https://cdn.example.com/lib.min.css?v=2#top"),
            "https---cdn-example-com-lib-min-css-v-2-top.css"
        );
    }

    #[test]
    fn test_url_slug_without_extension() {
        assert_eq!(url_slug("https://a.b/lib"), "https---a-b-lib");
        assert_eq!(url_slug("https://a.b/"), "https---a-b-");
    }

    #[test]
    fn test_url_slug_is_a_file_name() {
        let slug = url_slug("http://127.0.0.1:8080/a b/c+d.js?x=1&y=%20");
        assert!(!slug.contains('/'));
        assert!(!slug.contains(':'));
        assert!(slug.ends_with(".js"));
    }
}
