//! Application state and event dispatcher.
//!
//! Key handling never awaits the backend. Requests run as tokio tasks that
//! report back through a [`BackendEvent`] channel, which the event loop
//! drains between frames.

use std::{path::PathBuf, sync::Arc};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use docket_core::lifecycle::{LifecycleResponse, PoListResponse, PurchaseOrderSummary};
use fuzzy_matcher::{FuzzyMatcher, skim::SkimMatcherV2};
use tokio::sync::mpsc;

use crate::{
  client::{ApiClient, FetchError, UploadReceipt},
  session::{self, ChatMessage, Submission, UploadSession},
  viewer::{Effect, Ticket, Viewer},
};

// ─── Backend events ───────────────────────────────────────────────────────────

/// Completion of a request started by [`App`].
#[derive(Debug)]
pub enum BackendEvent {
  ListLoaded {
    ticket: Ticket,
    result: Result<PoListResponse, FetchError>,
  },
  LifecycleLoaded {
    ticket: Ticket,
    result: Result<LifecycleResponse, FetchError>,
  },
  /// Whether a CSV is loaded, as of enablement check `generation`.
  Enablement { generation: u64, enabled: bool },
  UploadFinished {
    file:     PathBuf,
    result:   Result<UploadReceipt, String>,
    /// Question to ask once the upload has gone through.
    then_ask: Option<String>,
  },
  AskFinished { result: Result<String, String> },
}

// ─── App ──────────────────────────────────────────────────────────────────────

/// Top-level application state.
pub struct App {
  /// Chat history, oldest first.
  pub transcript: Vec<ChatMessage>,

  /// Text being typed in the chat input.
  pub input: String,

  /// CSV attached with `/attach`, sent with the next question.
  pub pending_file: Option<PathBuf>,

  pub session: UploadSession,

  pub uploading: bool,
  pub thinking:  bool,

  pub viewer: Viewer,

  /// Whether the lifecycle viewer may be opened.
  pub viewer_enabled: bool,

  /// Latest enablement check; older answers are ignored.
  enablement_generation: u64,

  /// Cursor position within the *filtered* PO list.
  pub po_cursor: usize,

  /// Current fuzzy-filter string for the PO list.
  pub filter: String,

  /// Whether the user is typing a filter query.
  pub filter_active: bool,

  /// One-line status message shown in the status bar.
  pub status_msg: String,

  client: Arc<ApiClient>,
  tx:     mpsc::UnboundedSender<BackendEvent>,
  rx:     mpsc::UnboundedReceiver<BackendEvent>,
}

impl App {
  pub fn new(client: ApiClient) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    Self {
      transcript: Vec::new(),
      input: String::new(),
      pending_file: None,
      session: UploadSession::default(),
      uploading: false,
      thinking: false,
      viewer: Viewer::new(),
      viewer_enabled: false,
      enablement_generation: 0,
      po_cursor: 0,
      filter: String::new(),
      filter_active: false,
      status_msg: String::new(),
      client: Arc::new(client),
      tx,
      rx,
    }
  }

  pub fn is_busy(&self) -> bool { self.uploading || self.thinking }

  // ── Dispatch ──────────────────────────────────────────────────────────────

  fn spawn(&self, task: impl Future<Output = BackendEvent> + Send + 'static) {
    let tx = self.tx.clone();
    tokio::spawn(async move {
      // The receiver lives as long as the app; a send error means we are
      // shutting down.
      let _ = tx.send(task.await);
    });
  }

  /// Carry out an effect returned by the viewer.
  pub fn dispatch(&mut self, effect: Effect) {
    let client = Arc::clone(&self.client);
    match effect {
      Effect::FetchList(ticket) => self.spawn(async move {
        BackendEvent::ListLoaded {
          ticket,
          result: client.list_purchase_orders().await,
        }
      }),
      Effect::FetchLifecycle { ticket, po_id } => self.spawn(async move {
        BackendEvent::LifecycleLoaded {
          ticket,
          result: client.get_lifecycle(&po_id).await,
        }
      }),
      Effect::RefreshEnablement => self.refresh_enablement(),
    }
  }

  /// Re-check whether a CSV is loaded on the backend.
  pub fn refresh_enablement(&mut self) {
    self.enablement_generation += 1;
    let generation = self.enablement_generation;
    let client = Arc::clone(&self.client);
    self.spawn(async move {
      let enabled = match client.list_purchase_orders().await {
        Ok(list) => list.csv_loaded,
        Err(e) => {
          tracing::warn!(error = %e, "enablement check failed");
          false
        }
      };
      BackendEvent::Enablement {
        generation,
        enabled,
      }
    });
  }

  fn spawn_ask(&mut self, question: String) {
    self.thinking = true;
    let client = Arc::clone(&self.client);
    self.spawn(async move {
      BackendEvent::AskFinished {
        result: client.ask(&question).await.map_err(|e| format!("{e:#}")),
      }
    });
  }

  fn spawn_upload(&mut self, file: PathBuf, then_ask: Option<String>) {
    self.uploading = true;
    let client = Arc::clone(&self.client);
    self.spawn(async move {
      let result = client.upload_csv(&file).await.map_err(|e| format!("{e:#}"));
      BackendEvent::UploadFinished {
        file,
        result,
        then_ask,
      }
    });
  }

  // ── Backend results ───────────────────────────────────────────────────────

  /// Apply every backend event that has already arrived.
  pub fn drain_backend(&mut self) {
    while let Ok(event) = self.rx.try_recv() {
      self.handle_backend(event);
    }
  }

  /// Wait for the next backend event.
  #[cfg(test)]
  pub async fn next_backend(&mut self) -> Option<BackendEvent> { self.rx.recv().await }

  pub fn handle_backend(&mut self, event: BackendEvent) {
    match event {
      BackendEvent::ListLoaded { ticket, result } => {
        if self.viewer.apply_list(ticket, result) {
          self.po_cursor = 0;
        }
      }
      BackendEvent::LifecycleLoaded { ticket, result } => {
        self.viewer.apply_lifecycle(ticket, result);
      }
      BackendEvent::Enablement {
        generation,
        enabled,
      } => {
        if generation == self.enablement_generation {
          self.viewer_enabled = enabled;
        }
      }
      BackendEvent::UploadFinished {
        file,
        result,
        then_ask,
      } => {
        self.uploading = false;
        match result {
          Ok(receipt) => {
            tracing::info!(file = %file.display(), rows = receipt.rows_loaded, "csv uploaded");
            self.session.mark_uploaded(file);
            self.transcript.push(ChatMessage::assistant(session::UPLOAD_OK));
            self.refresh_enablement();
            if let Some(question) = then_ask {
              self.spawn_ask(question);
            }
          }
          Err(e) => {
            tracing::warn!(file = %file.display(), error = %e, "csv upload failed");
            self.transcript.push(ChatMessage::assistant(session::UPLOAD_FAILED));
          }
        }
      }
      BackendEvent::AskFinished { result } => {
        self.thinking = false;
        match result {
          Ok(answer) => self.transcript.push(ChatMessage::assistant(answer)),
          Err(e) => {
            tracing::warn!(error = %e, "ask failed");
            self.transcript.push(ChatMessage::assistant(session::ASK_FAILED));
          }
        }
      }
    }
  }

  // ── Chat ──────────────────────────────────────────────────────────────────

  /// Submit the current input as a question, or run it as a command.
  ///
  /// `/attach <file>` replaces the pending CSV and `/detach` drops it.
  pub fn submit(&mut self) {
    let command = self.input.trim();
    if let Some(path) = command.strip_prefix("/attach ") {
      let path = PathBuf::from(path.trim());
      self.status_msg = format!("Attached {}", path.display());
      self.pending_file = Some(path);
      self.input.clear();
      return;
    }
    if command == "/detach" {
      self.status_msg = match self.pending_file.take() {
        Some(path) => format!("Detached {}", path.display()),
        None => "No file attached".into(),
      };
      self.input.clear();
      return;
    }

    if self.is_busy() {
      return;
    }
    let Some(plan) =
      session::plan_submission(&self.session, self.pending_file.as_deref(), &self.input)
    else {
      return;
    };
    self.input.clear();
    self.transcript.push(ChatMessage::user(plan.question()));

    match plan {
      Submission::Ask { question } => self.spawn_ask(question),
      Submission::UploadThenAsk { file, question } => self.spawn_upload(file, Some(question)),
    }
  }

  // ── Viewer ────────────────────────────────────────────────────────────────

  pub fn open_viewer(&mut self) {
    if !self.viewer_enabled {
      self.status_msg = "Upload a CSV to enable the lifecycle viewer".into();
      return;
    }
    self.filter.clear();
    self.filter_active = false;
    self.po_cursor = 0;
    let effect = self.viewer.open();
    self.dispatch(effect);
  }

  pub fn close_viewer(&mut self) {
    if let Some(effect) = self.viewer.close() {
      self.dispatch(effect);
    }
  }

  /// Purchase orders matching the current filter query.
  pub fn filtered_pos(&self) -> Vec<&PurchaseOrderSummary> {
    let pos = self.viewer.pos();
    if self.filter.is_empty() {
      return pos.iter().collect();
    }
    let matcher = SkimMatcherV2::default();
    pos
      .iter()
      .filter(|po| {
        matcher.fuzzy_match(&po.document_id, &self.filter).is_some()
          || po
            .partner
            .as_deref()
            .is_some_and(|p| matcher.fuzzy_match(p, &self.filter).is_some())
      })
      .collect()
  }

  /// The PO under the list cursor in the filtered view, if any.
  pub fn cursor_po(&self) -> Option<&PurchaseOrderSummary> {
    self.filtered_pos().get(self.po_cursor).copied()
  }

  fn select_cursor(&mut self) {
    let Some(po_id) = self.cursor_po().map(|po| po.document_id.clone()) else {
      return;
    };
    if let Some(effect) = self.viewer.select(&po_id) {
      self.dispatch(effect);
    }
  }

  // ── Key handling ──────────────────────────────────────────────────────────

  /// Process a key event. Returns `false` to quit.
  pub fn handle_key(&mut self, key: KeyEvent) -> bool {
    // Status messages last until the next key.
    self.status_msg.clear();

    if key.modifiers.contains(KeyModifiers::CONTROL) {
      match key.code {
        KeyCode::Char('c') => return false,
        KeyCode::Char('l') => {
          if self.viewer.is_open() {
            self.close_viewer();
          } else {
            self.open_viewer();
          }
          return true;
        }
        _ => {}
      }
    }

    if !self.viewer.is_open() {
      self.handle_chat_key(key);
    } else if self.filter_active {
      self.handle_filter_key(key);
    } else {
      self.handle_viewer_key(key);
    }
    true
  }

  fn handle_chat_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Enter => self.submit(),
      KeyCode::Backspace => {
        self.input.pop();
      }
      KeyCode::Esc => self.input.clear(),
      KeyCode::Char(c) => self.input.push(c),
      _ => {}
    }
  }

  fn handle_filter_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.filter_active = false;
        self.filter.clear();
        self.po_cursor = 0;
      }
      KeyCode::Enter => {
        self.filter_active = false;
        self.po_cursor = 0;
        if self.filtered_pos().len() == 1 {
          self.select_cursor();
        }
      }
      KeyCode::Backspace => {
        self.filter.pop();
        self.po_cursor = 0;
      }
      KeyCode::Char(c) => {
        self.filter.push(c);
        self.po_cursor = 0;
      }
      _ => {}
    }
  }

  fn handle_viewer_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Esc | KeyCode::Char('q') => self.close_viewer(),

      KeyCode::Down | KeyCode::Char('j') => {
        let len = self.filtered_pos().len();
        if len > 0 && self.po_cursor + 1 < len {
          self.po_cursor += 1;
        }
      }
      KeyCode::Up | KeyCode::Char('k') => {
        self.po_cursor = self.po_cursor.saturating_sub(1);
      }

      KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => self.select_cursor(),

      KeyCode::Char('/') => {
        self.filter_active = true;
        self.filter.clear();
        self.po_cursor = 0;
      }

      KeyCode::Char('r') => {
        let effect = self.viewer.open();
        self.dispatch(effect);
      }

      _ => {}
    }
  }
}

#[cfg(test)]
mod tests {
  use std::path::Path;

  use docket_core::{event::EventType, lifecycle::LifecycleEvent};
  use tokio::net::TcpListener;

  use super::*;
  use crate::{client::ApiConfig, session::Role, viewer::ViewerState};

  /// An app whose backend refuses every connection.
  async fn offline_app() -> App {
    let addr = {
      let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
      l.local_addr().unwrap()
    };
    let client = ApiClient::new(ApiConfig {
      base_url: format!("http://{addr}"),
      ..ApiConfig::default()
    })
    .unwrap();
    App::new(client)
  }

  fn key(code: KeyCode) -> KeyEvent { KeyEvent::new(code, KeyModifiers::NONE) }

  fn ctrl(c: char) -> KeyEvent { KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL) }

  fn type_str(app: &mut App, s: &str) {
    for c in s.chars() {
      app.handle_key(key(KeyCode::Char(c)));
    }
  }

  fn list_ticket(app: &App) -> Ticket {
    match app.viewer.state() {
      ViewerState::LoadingList { ticket } => *ticket,
      other => panic!("viewer not loading: {other:?}"),
    }
  }

  fn lifecycle_ticket(app: &App) -> Ticket {
    match app.viewer.state() {
      ViewerState::LoadingLifecycle { ticket, .. } => *ticket,
      other => panic!("viewer not loading a lifecycle: {other:?}"),
    }
  }

  fn list_of(ids: &[(&str, Option<&str>)]) -> PoListResponse {
    PoListResponse {
      csv_loaded: true,
      pos:        ids
        .iter()
        .map(|(id, partner)| {
          let mut po = PurchaseOrderSummary::new(*id);
          po.partner = partner.map(str::to_owned);
          po
        })
        .collect(),
    }
  }

  /// An app with the viewer open and `ids` listed.
  async fn viewing(ids: &[(&str, Option<&str>)]) -> App {
    let mut app = offline_app().await;
    app.viewer_enabled = true;
    app.handle_key(ctrl('l'));
    let ticket = list_ticket(&app);
    app.handle_backend(BackendEvent::ListLoaded {
      ticket,
      result: Ok(list_of(ids)),
    });
    app
  }

  #[tokio::test]
  async fn ctrl_c_quits() {
    let mut app = offline_app().await;
    assert!(app.handle_key(key(KeyCode::Char('x'))));
    assert!(!app.handle_key(ctrl('c')));
  }

  fn uploaded(file: &str, then_ask: Option<&str>) -> BackendEvent {
    BackendEvent::UploadFinished {
      file:     PathBuf::from(file),
      result:   Ok(UploadReceipt {
        message:     "ok".into(),
        rows_loaded: 3,
        upload_id:   None,
      }),
      then_ask: then_ask.map(str::to_owned),
    }
  }

  #[tokio::test]
  async fn viewer_stays_closed_until_enabled() {
    let mut app = offline_app().await;
    app.handle_key(ctrl('l'));
    assert!(!app.viewer.is_open());
    assert!(!app.status_msg.is_empty());
  }

  #[tokio::test]
  async fn status_message_clears_on_the_next_key() {
    let mut app = offline_app().await;
    type_str(&mut app, "/attach edi.csv");
    app.handle_key(key(KeyCode::Enter));
    assert_eq!(app.status_msg, "Attached edi.csv");

    app.handle_key(key(KeyCode::Char('w')));
    assert!(app.status_msg.is_empty());
    assert_eq!(app.input, "w");
  }

  #[tokio::test]
  async fn offline_list_becomes_a_transport_error() {
    let mut app = offline_app().await;
    app.viewer_enabled = true;
    app.handle_key(ctrl('l'));
    assert!(app.viewer.is_loading_list());

    let event = app.next_backend().await.unwrap();
    app.handle_backend(event);
    assert!(matches!(app.viewer.error(), Some(FetchError::Transport(_))));
  }

  #[tokio::test]
  async fn stale_enablement_answers_are_ignored() {
    let mut app = offline_app().await;
    app.refresh_enablement();
    app.refresh_enablement();
    app.handle_backend(BackendEvent::Enablement {
      generation: 2,
      enabled:    true,
    });
    app.handle_backend(BackendEvent::Enablement {
      generation: 1,
      enabled:    false,
    });
    assert!(app.viewer_enabled);
  }

  #[tokio::test]
  async fn enter_selects_the_cursor_po() {
    let mut app = viewing(&[("PO-1", None), ("PO-2", None)]).await;
    app.handle_key(key(KeyCode::Char('j')));
    app.handle_key(key(KeyCode::Enter));
    assert_eq!(app.viewer.selected_po(), Some("PO-2"));

    let ticket = lifecycle_ticket(&app);
    app.handle_backend(BackendEvent::LifecycleLoaded {
      ticket,
      result: Ok(LifecycleResponse::new("PO-2", vec![LifecycleEvent::bare(EventType::Po)])),
    });
    assert!(app.viewer.event_of_type(EventType::Po).is_some());
  }

  #[tokio::test]
  async fn cursor_stays_in_bounds() {
    let mut app = viewing(&[("PO-1", None)]).await;
    app.handle_key(key(KeyCode::Char('k')));
    app.handle_key(key(KeyCode::Char('j')));
    app.handle_key(key(KeyCode::Char('j')));
    assert_eq!(app.po_cursor, 0);
  }

  #[tokio::test]
  async fn filter_matches_id_or_partner() {
    let mut app = viewing(&[("PO-100", Some("Acme")), ("PO-200", Some("Globex"))]).await;
    app.handle_key(key(KeyCode::Char('/')));
    type_str(&mut app, "glob");
    let ids: Vec<_> = app.filtered_pos().iter().map(|p| p.document_id.as_str()).collect();
    assert_eq!(ids, vec!["PO-200"]);

    // A single match is selected on Enter.
    app.handle_key(key(KeyCode::Enter));
    assert_eq!(app.viewer.selected_po(), Some("PO-200"));
  }

  #[tokio::test]
  async fn closing_the_viewer_rechecks_enablement() {
    let mut app = viewing(&[("PO-1", None)]).await;
    let before = app.enablement_generation;
    app.handle_key(key(KeyCode::Esc));
    assert!(!app.viewer.is_open());
    assert_eq!(app.enablement_generation, before + 1);

    // A second close is a no-op.
    app.close_viewer();
    assert_eq!(app.enablement_generation, before + 1);
  }

  #[tokio::test]
  async fn attach_then_ask_uploads_first() {
    let mut app = offline_app().await;
    type_str(&mut app, "/attach edi.csv");
    app.handle_key(key(KeyCode::Enter));
    assert_eq!(app.pending_file.as_deref(), Some(Path::new("edi.csv")));
    assert!(app.input.is_empty());

    type_str(&mut app, "which POs lack an invoice?");
    app.handle_key(key(KeyCode::Enter));
    assert!(app.uploading);
    assert!(!app.thinking);
    assert_eq!(app.transcript, vec![ChatMessage::user("which POs lack an invoice?")]);
  }

  #[tokio::test]
  async fn attaching_another_file_uploads_it() {
    let mut app = offline_app().await;
    type_str(&mut app, "/attach first.csv");
    app.handle_key(key(KeyCode::Enter));
    app.input = "q1".into();
    app.submit();
    assert!(app.uploading);
    app.handle_backend(uploaded("first.csv", None));
    assert!(!app.is_busy());

    type_str(&mut app, "/attach second.csv");
    app.handle_key(key(KeyCode::Enter));
    assert!(!app.session.has_uploaded(Path::new("second.csv")));

    app.input = "q2".into();
    app.submit();
    assert!(app.uploading);
    assert!(!app.thinking);
  }

  #[tokio::test]
  async fn reattaching_the_uploaded_file_just_asks() {
    let mut app = offline_app().await;
    app.pending_file = Some(PathBuf::from("edi.csv"));
    app.handle_backend(uploaded("edi.csv", None));

    app.input = "/attach edi.csv".into();
    app.submit();
    app.input = "q".into();
    app.submit();
    assert!(!app.uploading);
    assert!(app.thinking);
  }

  #[tokio::test]
  async fn detach_drops_the_pending_file() {
    let mut app = offline_app().await;
    app.input = "/attach edi.csv".into();
    app.submit();
    app.input = " /detach ".into();
    app.submit();
    assert!(app.pending_file.is_none());
    assert!(app.input.is_empty());
    assert_eq!(app.status_msg, "Detached edi.csv");
    assert!(app.transcript.is_empty());

    app.input = "q".into();
    app.submit();
    assert!(!app.uploading);
    assert!(app.thinking);
  }

  #[tokio::test]
  async fn blank_and_busy_submissions_are_ignored() {
    let mut app = offline_app().await;
    type_str(&mut app, "   ");
    app.handle_key(key(KeyCode::Enter));
    assert!(app.transcript.is_empty());

    app.input = "first".into();
    app.submit();
    assert!(app.thinking);
    app.input = "second".into();
    app.submit();
    assert_eq!(app.transcript.len(), 1);
    assert_eq!(app.input, "second");
  }

  #[tokio::test]
  async fn failed_upload_keeps_the_session_unuploaded() {
    let mut app = offline_app().await;
    app.uploading = true;
    app.handle_backend(BackendEvent::UploadFinished {
      file:     PathBuf::from("edi.csv"),
      result:   Err("connection refused".into()),
      then_ask: Some("q".into()),
    });
    assert!(!app.uploading);
    assert!(!app.thinking);
    assert!(!app.session.has_uploaded(Path::new("edi.csv")));
    assert_eq!(app.transcript.last().unwrap().content, session::UPLOAD_FAILED);
  }

  #[tokio::test]
  async fn successful_upload_asks_and_rechecks_enablement() {
    let mut app = offline_app().await;
    app.uploading = true;
    app.handle_backend(uploaded("edi.csv", Some("q")));
    assert!(app.session.has_uploaded(Path::new("edi.csv")));
    assert!(app.thinking);
    assert_eq!(app.enablement_generation, 1);
    assert_eq!(app.transcript.last().unwrap().content, session::UPLOAD_OK);
  }

  #[tokio::test]
  async fn ask_failure_is_reported_in_the_transcript() {
    let mut app = offline_app().await;
    app.input = "anything late?".into();
    app.submit();
    let event = app.next_backend().await.unwrap();
    app.handle_backend(event);
    assert!(!app.thinking);
    let last = app.transcript.last().unwrap();
    assert_eq!(last.role, Role::Assistant);
    assert_eq!(last.content, session::ASK_FAILED);
  }
}
