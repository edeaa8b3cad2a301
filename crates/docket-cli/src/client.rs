//! Async HTTP client wrapping the Docket backend API.

use std::{path::Path, time::Duration};

use anyhow::{Context, Result, anyhow};
use docket_core::lifecycle::{LifecycleResponse, PoListResponse};
use reqwest::{Client, StatusCode, Url, multipart};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Connection settings for the Docket backend.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub timeout:  Duration,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: "http://127.0.0.1:8000".to_string(),
      timeout:  Duration::from_secs(30),
    }
  }
}

/// Why a lifecycle read did not produce data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
  /// The backend answered 404; the detail is its human-readable reason.
  #[error("not found: {}", .detail.as_deref().unwrap_or("no detail"))]
  NotFound { detail: Option<String> },

  /// Network failure, non-404 error status, or an unreadable body.
  #[error("{0}")]
  Transport(String),
}

impl FetchError {
  pub fn is_not_found(&self) -> bool { matches!(self, Self::NotFound { .. }) }
}

/// Body of a successful `POST /upload-csv`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReceipt {
  pub message:     String,
  pub rows_loaded: usize,
  #[serde(default)]
  pub upload_id:   Option<Uuid>,
}

#[derive(Serialize)]
struct AskBody<'a> {
  question: &'a str,
}

#[derive(Deserialize)]
struct AskReply {
  answer: String,
}

#[derive(Deserialize)]
struct ErrorBody {
  detail: Option<String>,
}

/// Async HTTP client for the Docket REST API.
///
/// Clones share the inner [`reqwest::Client`] connection pool.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  base:   Url,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(config.timeout)
      .build()
      .context("failed to build HTTP client")?;
    let base = Url::parse(&config.base_url)
      .with_context(|| format!("invalid base URL {:?}", config.base_url))?;
    if base.cannot_be_a_base() {
      return Err(anyhow!("base URL {:?} cannot carry a path", config.base_url));
    }
    Ok(Self { client, base })
  }

  pub fn base_url(&self) -> &Url { &self.base }

  /// Join path segments onto the base URL, percent-encoding each one.
  fn url(&self, segments: &[&str]) -> Url {
    let mut url = self.base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }

  // ── Lifecycle ─────────────────────────────────────────────────────────────

  /// `GET /lifecycle/po-list`
  pub async fn list_purchase_orders(&self) -> Result<PoListResponse, FetchError> {
    let resp = self
      .client
      .get(self.url(&["lifecycle", "po-list"]))
      .send()
      .await
      .map_err(|e| FetchError::Transport(format!("GET /lifecycle/po-list failed: {e}")))?;

    if !resp.status().is_success() {
      return Err(FetchError::Transport(format!(
        "GET /lifecycle/po-list → {}",
        resp.status()
      )));
    }
    resp
      .json()
      .await
      .map_err(|e| FetchError::Transport(format!("deserialising PO list: {e}")))
  }

  /// `GET /lifecycle/po/{po_id}`
  pub async fn get_lifecycle(&self, po_id: &str) -> Result<LifecycleResponse, FetchError> {
    let resp = self
      .client
      .get(self.url(&["lifecycle", "po", po_id]))
      .send()
      .await
      .map_err(|e| FetchError::Transport(format!("GET /lifecycle/po/{po_id} failed: {e}")))?;

    match resp.status() {
      StatusCode::NOT_FOUND => {
        let detail = resp.json::<ErrorBody>().await.ok().and_then(|b| b.detail);
        return Err(FetchError::NotFound { detail });
      }
      status if !status.is_success() => {
        return Err(FetchError::Transport(format!("GET /lifecycle/po/{po_id} → {status}")));
      }
      _ => {}
    }

    let lifecycle: LifecycleResponse = resp
      .json()
      .await
      .map_err(|e| FetchError::Transport(format!("deserialising lifecycle: {e}")))?;

    if lifecycle.po_id != po_id {
      return Err(FetchError::Transport(format!(
        "backend answered for {:?} when asked for {po_id:?}",
        lifecycle.po_id
      )));
    }
    if !lifecycle.is_consistent() {
      tracing::warn!(%po_id, "backend completeness disagrees with its events");
    }
    Ok(lifecycle)
  }

  // ── Chat ──────────────────────────────────────────────────────────────────

  /// `POST /upload-csv` with the file at `path` as the `file` part.
  pub async fn upload_csv(&self, path: &Path) -> Result<UploadReceipt> {
    let bytes = tokio::fs::read(path)
      .await
      .with_context(|| format!("reading {}", path.display()))?;
    let file_name = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| "upload.csv".to_string());
    let part = multipart::Part::bytes(bytes)
      .file_name(file_name)
      .mime_str("text/csv")
      .context("building multipart part")?;
    let form = multipart::Form::new().part("file", part);

    let resp = self
      .client
      .post(self.url(&["upload-csv"]))
      .multipart(form)
      .send()
      .await
      .context("POST /upload-csv failed")?;

    if !resp.status().is_success() {
      let status = resp.status();
      let detail = resp.json::<ErrorBody>().await.ok().and_then(|b| b.detail);
      return Err(anyhow!(
        "POST /upload-csv → {status}{}",
        detail.map(|d| format!(": {d}")).unwrap_or_default()
      ));
    }
    resp.json().await.context("deserialising upload receipt")
  }

  /// `POST /ask`
  pub async fn ask(&self, question: &str) -> Result<String> {
    let resp = self
      .client
      .post(self.url(&["ask"]))
      .json(&AskBody { question })
      .send()
      .await
      .context("POST /ask failed")?;

    if !resp.status().is_success() {
      return Err(anyhow!("POST /ask → {}", resp.status()));
    }
    let reply: AskReply = resp.json().await.context("deserialising answer")?;
    Ok(reply.answer)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use docket_core::event::EventType;
  use docket_store_sqlite::SqliteStore;
  use tokio::net::TcpListener;

  use super::*;

  /// Serve the real API on an ephemeral port and return a client for it.
  async fn live_client() -> ApiClient {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let app = docket_api::api_router(Arc::new(store));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, app).await.unwrap();
    });
    ApiClient::new(ApiConfig {
      base_url: format!("http://{addr}"),
      ..ApiConfig::default()
    })
    .unwrap()
  }

  fn write_csv(contents: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("docket-client-{}.csv", Uuid::new_v4()));
    std::fs::write(&path, contents).unwrap();
    path
  }

  #[test]
  fn url_segments_are_percent_encoded() {
    let client = ApiClient::new(ApiConfig {
      base_url: "http://example.test/backend/".into(),
      ..ApiConfig::default()
    })
    .unwrap();
    let url = client.url(&["lifecycle", "po", "PO 1/2"]);
    assert_eq!(url.as_str(), "http://example.test/backend/lifecycle/po/PO%201%2F2");
  }

  #[test]
  fn invalid_base_url_is_rejected() {
    let cfg = ApiConfig {
      base_url: "not a url".into(),
      ..ApiConfig::default()
    };
    assert!(ApiClient::new(cfg).is_err());
  }

  #[tokio::test(flavor = "multi_thread")]
  async fn empty_backend_lists_nothing() {
    let client = live_client().await;
    let list = client.list_purchase_orders().await.unwrap();
    assert_eq!(list, PoListResponse::not_loaded());
  }

  #[tokio::test(flavor = "multi_thread")]
  async fn unknown_po_is_not_found_rather_than_transport() {
    let client = live_client().await;
    let path = write_csv("transaction_type,document_id\n850,PO-1\n");
    client.upload_csv(&path).await.unwrap();

    let err = client.get_lifecycle("unknown-id").await.unwrap_err();
    assert!(err.is_not_found(), "{err:?}");
    let FetchError::NotFound { detail } = err else { unreachable!() };
    assert!(detail.unwrap().contains("unknown-id"));
  }

  #[tokio::test(flavor = "multi_thread")]
  async fn upload_then_fetch_lifecycle() {
    let client = live_client().await;
    let path = write_csv(
      "transaction_type,document_id,related_document_id\n850,PO-1,\n856,ASN-1,PO-1\n",
    );
    let receipt = client.upload_csv(&path).await.unwrap();
    assert_eq!(receipt.rows_loaded, 2);
    assert!(receipt.upload_id.is_some());

    let list = client.list_purchase_orders().await.unwrap();
    assert!(list.csv_loaded);
    assert_eq!(list.pos.len(), 1);

    let lifecycle = client.get_lifecycle("PO-1").await.unwrap();
    assert!(lifecycle.completeness.has_asn);
    assert!(lifecycle.event_of_type(EventType::Ack).is_none());
  }

  #[tokio::test(flavor = "multi_thread")]
  async fn unreachable_backend_is_a_transport_fault() {
    // Bind then drop to get a port nothing listens on.
    let addr = {
      let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
      l.local_addr().unwrap()
    };
    let client = ApiClient::new(ApiConfig {
      base_url: format!("http://{addr}"),
      timeout:  Duration::from_secs(2),
    })
    .unwrap();

    assert!(matches!(
      client.list_purchase_orders().await,
      Err(FetchError::Transport(_))
    ));
    assert!(matches!(
      client.get_lifecycle("PO-1").await,
      Err(FetchError::Transport(_))
    ));
  }

  #[tokio::test(flavor = "multi_thread")]
  async fn ask_against_a_backend_without_answers_fails() {
    let client = live_client().await;
    assert!(client.ask("is PO-1 late?").await.is_err());
  }
}
