//! Worker side of the fetch protocol.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};

use super::{Ticket, url_slug};
use crate::actor::messages::WorkerLink;
use crate::config::ErrorPolicy;
use crate::utils::blocking;
use crate::{debug, log};

/// HTTP client shared by every worker of an orchestrator.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(60))
        .build()
        .context("failed to build HTTP client")
}

/// Resolve a `--force` URL through the Download Cache and stage it at `dest`.
///
/// Under [`ErrorPolicy::Degrade`] a failed fetch stages an empty file.
pub async fn fetch_into(
    link: &WorkerLink,
    http: &reqwest::Client,
    deps_dir: &Path,
    url: &str,
    dest: PathBuf,
    policy: ErrorPolicy,
) -> Result<()> {
    let cached = deps_dir.join(url_slug(url));

    let bytes = match link.request_fetch(url).await {
        Ticket::Cached => {
            debug!("fetch"; "{url} (cached)");
            blocking(move || {
                fs::read(&cached).with_context(|| format!("failed to read {}", cached.display()))
            })
            .await
        }
        Ticket::Fetch => {
            link.downloading(url);
            let result = download(http, url, cached).await;
            link.downloaded(url, result.is_ok());
            result
        }
        Ticket::Failed => Err(anyhow!("download failed in another stream")),
    };

    let bytes = policy.recover("fetch", format!("fetching {url}"), bytes)?;
    blocking(move || {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&dest, bytes).with_context(|| format!("failed to write {}", dest.display()))
    })
    .await
}

async fn download(http: &reqwest::Client, url: &str, cached: PathBuf) -> Result<Vec<u8>> {
    log!("fetch"; "downloading {url}");
    let response = http
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .with_context(|| format!("GET {url}"))?;
    let bytes = response.bytes().await?.to_vec();

    let body = bytes.clone();
    blocking(move || {
        if let Some(parent) = cached.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&cached, body).with_context(|| format!("failed to write {}", cached.display()))
    })
    .await?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::messages::WorkerMsg;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_cached_ticket_reads_dependency_file() {
        let dir = TempDir::new().unwrap();
        let deps = dir.path().join("dependencies");
        let url = "https://cdn.example.com/lib.js";
        fs::create_dir_all(&deps).unwrap();
        fs::write(deps.join(url_slug(url)), "lib();").unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let link = WorkerLink::new("main.js", tx);
        let supervisor = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let WorkerMsg::Fetch { reply, .. } = msg {
                    let _ = reply.send(Ticket::Cached);
                }
            }
        });

        let dest = dir.path().join("stage/0000-lib.js");
        let http = reqwest::Client::new();
        fetch_into(&link, &http, &deps, url, dest.clone(), ErrorPolicy::Degrade)
            .await
            .unwrap();
        assert_eq!(fs::read_to_string(dest).unwrap(), "lib();");

        drop(link);
        supervisor.await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_ticket_degrades_to_empty() {
        let dir = TempDir::new().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let link = WorkerLink::new("main.js", tx);
        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let WorkerMsg::Fetch { reply, .. } = msg {
                    let _ = reply.send(Ticket::Failed);
                }
            }
        });

        let dest = dir.path().join("0000-x.js");
        let http = reqwest::Client::new();
        let url = "https://cdn.example.com/x.js";
        fetch_into(&link, &http, dir.path(), url, dest.clone(), ErrorPolicy::Degrade)
            .await
            .unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "");

        let err = fetch_into(&link, &http, dir.path(), url, dest, ErrorPolicy::FailFast).await;
        assert!(err.is_err());
    }
}
