//! Shared helpers: subprocess execution, path handling, blocking bridges.

pub mod exec;
pub mod path;

use anyhow::Result;

/// Run blocking file-system or CPU work off the async worker threads.
///
/// A panic inside `f` surfaces as an error instead of unwinding into the
/// calling task.
pub async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

/// Format count with noun, `1 stream` / `3 streams`.
#[inline]
pub fn plural_count(count: usize, noun: &str) -> String {
    let suffix = if count == 1 { "" } else { "s" };
    format!("{count} {noun}{suffix}")
}
