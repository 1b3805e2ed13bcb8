// src/webhook.rs
use std::time::Duration;

use log::{info, warn};
use reqwest::StatusCode;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::types::TagEvent;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("URI is empty after sanitizing")]
    EmptyUrl,

    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Debug, PartialEq, Eq)]
pub enum Dispatch {
    Completed { url: String, status: StatusCode },
    Skipped(String),
}

/// Tag memory is zero padded and may carry whitespace around the URI, so
/// NULs are dropped anywhere and whitespace at either end.
pub fn sanitize_url(raw: &str) -> String {
    raw.replace('\0', "").trim().to_string()
}

pub struct Dispatcher {
    client: reqwest::Client,
    dry_run: bool,
}

impl Dispatcher {
    pub fn new(timeout: Duration, dry_run: bool) -> Result<Self, WebhookError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, dry_run })
    }

    /// Sends a GET to the sanitized URI. Any HTTP status counts as completed.
    pub async fn dispatch(&self, raw_uri: &str) -> Result<Dispatch, WebhookError> {
        let url = sanitize_url(raw_uri);
        if url.is_empty() {
            return Err(WebhookError::EmptyUrl);
        }
        if self.dry_run {
            return Ok(Dispatch::Skipped(url));
        }

        let response = self.client.get(&url).send().await?;
        Ok(Dispatch::Completed {
            url,
            status: response.status(),
        })
    }

    pub async fn run(&self, mut rx: UnboundedReceiver<TagEvent>) {
        while let Some(event) = rx.recv().await {
            match event {
                TagEvent::TagRead { uid, uri } => {
                    info!("Tag {}: inspecting URI {:?}", uid, uri);
                    match self.dispatch(&uri).await {
                        Ok(Dispatch::Completed { url, status }) => {
                            info!("Webhook {} completed: {}", url, status);
                        }
                        Ok(Dispatch::Skipped(url)) => info!("Dry run, not calling {}", url),
                        Err(e) => warn!("Tag {}: {}", uid, e),
                    }
                }
                TagEvent::NoUriRecord { uid } => {
                    warn!("Tag {}: could not find a valid NDEF URI record", uid);
                }
                TagEvent::TagReadError { uid, error } => warn!("Tag {}: {}", uid, error),
                TagEvent::ReaderStatus { connected } => info!("Reader connected: {}", connected),
                TagEvent::TagRemoved => info!("Tag removed"),
            }
        }
        info!("Event channel closed, dispatcher stopping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use warp::Filter;

    fn spawn_hook(hits: Arc<AtomicUsize>) -> std::net::SocketAddr {
        let route = warp::path!("hook" / String).map(move |_id: String| {
            hits.fetch_add(1, Ordering::SeqCst);
            warp::reply::with_status("queued", warp::http::StatusCode::ACCEPTED)
        });
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);
        addr
    }

    #[test]
    fn strips_nul_and_whitespace() {
        assert_eq!(
            sanitize_url("  https://example.com/x\0\0\n"),
            "https://example.com/x"
        );
        assert_eq!(sanitize_url("https://exa\0mple.com"), "https://example.com");
        assert_eq!(sanitize_url("\0 \t"), "");
    }

    #[test]
    fn clean_url_is_unchanged() {
        let url = "https://example.com/play?room=kitchen";
        assert_eq!(sanitize_url(url), url);
        assert_eq!(sanitize_url(&sanitize_url(" a\0 ")), sanitize_url(" a\0 "));
    }

    #[tokio::test]
    async fn dry_run_skips_request() {
        let dispatcher = Dispatcher::new(Duration::from_secs(1), true).unwrap();
        let result = dispatcher.dispatch(" http://127.0.0.1:1/x\0").await.unwrap();
        assert_eq!(result, Dispatch::Skipped("http://127.0.0.1:1/x".into()));
    }

    #[tokio::test]
    async fn empty_url_is_rejected() {
        let dispatcher = Dispatcher::new(Duration::from_secs(1), false).unwrap();
        assert!(matches!(
            dispatcher.dispatch("\0\0 ").await,
            Err(WebhookError::EmptyUrl)
        ));
    }

    #[tokio::test]
    async fn reports_status_code() {
        let hits = Arc::new(AtomicUsize::new(0));
        let addr = spawn_hook(hits.clone());

        let dispatcher = Dispatcher::new(Duration::from_secs(5), false).unwrap();
        let raw = format!("http://{}/hook/kitchen\0\0", addr);
        match dispatcher.dispatch(&raw).await.unwrap() {
            Dispatch::Completed { url, status } => {
                assert_eq!(url, format!("http://{}/hook/kitchen", addr));
                assert_eq!(status.as_u16(), 202);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn not_found_is_not_an_error() {
        let addr = spawn_hook(Arc::new(AtomicUsize::new(0)));
        let dispatcher = Dispatcher::new(Duration::from_secs(5), false).unwrap();
        let result = dispatcher
            .dispatch(&format!("http://{}/missing", addr))
            .await
            .unwrap();
        assert!(matches!(
            result,
            Dispatch::Completed { status, .. } if status == StatusCode::NOT_FOUND
        ));
    }

    #[tokio::test]
    async fn connection_failure_is_an_error() {
        let dispatcher = Dispatcher::new(Duration::from_secs(2), false).unwrap();
        assert!(matches!(
            dispatcher.dispatch("http://127.0.0.1:1/").await,
            Err(WebhookError::Request(_))
        ));
    }

    #[tokio::test]
    async fn run_dispatches_tag_reads() {
        let hits = Arc::new(AtomicUsize::new(0));
        let addr = spawn_hook(hits.clone());
        let dispatcher = Dispatcher::new(Duration::from_secs(5), false).unwrap();

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        tx.send(TagEvent::ReaderStatus { connected: true }).unwrap();
        tx.send(TagEvent::TagRead {
            uid: "04a1b2c3d4e5f6".into(),
            uri: format!("http://{}/hook/a", addr),
        })
        .unwrap();
        tx.send(TagEvent::NoUriRecord {
            uid: "04a1b2c3d4e5f7".into(),
        })
        .unwrap();
        tx.send(TagEvent::TagRead {
            uid: "04a1b2c3d4e5f8".into(),
            uri: format!(" http://{}/hook/b\0", addr),
        })
        .unwrap();
        drop(tx);

        dispatcher.run(rx).await;
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
