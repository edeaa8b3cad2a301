//! Chat transcript and the upload-once-per-file submission rule.

use std::path::{Path, PathBuf};

pub const UPLOAD_OK: &str = "CSV uploaded successfully. Ask your question.";
pub const UPLOAD_FAILED: &str = "CSV upload failed.";
pub const ASK_FAILED: &str = "Error contacting backend.";

// ─── Transcript ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
  User,
  Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
  pub role:    Role,
  pub content: String,
}

impl ChatMessage {
  pub fn user(content: impl Into<String>) -> Self {
    Self {
      role:    Role::User,
      content: content.into(),
    }
  }

  pub fn assistant(content: impl Into<String>) -> Self {
    Self {
      role:    Role::Assistant,
      content: content.into(),
    }
  }
}

// ─── Submission planning ──────────────────────────────────────────────────────

/// Which attached CSV, if any, this chat session has sent to the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSession {
  uploaded: Option<PathBuf>,
}

impl UploadSession {
  /// Whether `file` is the CSV last uploaded successfully.
  pub fn has_uploaded(&self, file: &Path) -> bool { self.uploaded.as_deref() == Some(file) }

  /// Record a successful upload of `file`. Failed uploads leave the session
  /// untouched.
  pub fn mark_uploaded(&mut self, file: PathBuf) { self.uploaded = Some(file); }
}

/// What a submitted question turns into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
  Ask { question: String },
  UploadThenAsk { file: PathBuf, question: String },
}

impl Submission {
  pub fn question(&self) -> &str {
    match self {
      Self::Ask { question } | Self::UploadThenAsk { question, .. } => question,
    }
  }
}

/// Plan a submission. Returns `None` for a blank question.
///
/// A pending file is uploaded first unless it is the one the session already
/// uploaded. Attaching a different file makes the next question upload again.
pub fn plan_submission(
  session: &UploadSession,
  pending_file: Option<&Path>,
  question: &str,
) -> Option<Submission> {
  let question = question.trim();
  if question.is_empty() {
    return None;
  }
  let question = question.to_owned();
  Some(match pending_file {
    Some(file) if !session.has_uploaded(file) => Submission::UploadThenAsk {
      file: file.to_path_buf(),
      question,
    },
    _ => Submission::Ask { question },
  })
}
