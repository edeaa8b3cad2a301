//! The lifecycle viewer state machine.
//!
//! The viewer performs no I/O. Each transition that needs data returns an
//! [`Effect`] for the host to dispatch; results come back through
//! [`Viewer::apply_list`] and [`Viewer::apply_lifecycle`] together with the
//! [`Ticket`] the effect carried. A result whose ticket is no longer the one
//! the viewer is waiting for is dropped, so a slow response for an earlier
//! selection can never overwrite a newer one.
//!
//! ```text
//! Closed ─open─▶ LoadingList ─ok──▶ ListReady ─┐
//!                     └──err─▶ ListError ──────┤ select
//!                                              ▼
//!            ┌──────────── select ───── LoadingLifecycle
//!            │                          ├─ok──▶ LifecycleReady ─┐
//!            │                          └─err─▶ LifecycleError ─┤
//!            └──────────────────────────────────────────────────┘
//! any ─close─▶ Closed   (+ RefreshEnablement)
//! ```

use docket_core::{
  event::EventType,
  lifecycle::{LifecycleEvent, LifecycleResponse, PoListResponse, PurchaseOrderSummary},
};

use crate::client::FetchError;

// ─── Tickets and effects ──────────────────────────────────────────────────────

/// Identifies one dispatched fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

/// Work the host must perform on the viewer's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
  FetchList(Ticket),
  FetchLifecycle { ticket: Ticket, po_id: String },
  /// Re-derive whether the viewer should be offered at all.
  RefreshEnablement,
}

// ─── List outcome ─────────────────────────────────────────────────────────────

/// What the last PO-list fetch produced; kept while lifecycles load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoList {
  Loaded(PoListResponse),
  Failed(FetchError),
}

impl PoList {
  /// Purchase orders to offer; empty when the list failed to load.
  pub fn pos(&self) -> &[PurchaseOrderSummary] {
    match self {
      Self::Loaded(list) => &list.pos,
      Self::Failed(_) => &[],
    }
  }

  pub fn csv_loaded(&self) -> bool {
    matches!(self, Self::Loaded(list) if list.csv_loaded)
  }
}

// ─── State ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerState {
  Closed,
  LoadingList {
    ticket: Ticket,
  },
  ListReady(PoListResponse),
  ListError(FetchError),
  LoadingLifecycle {
    list:   PoList,
    po_id:  String,
    ticket: Ticket,
  },
  LifecycleReady {
    list:      PoList,
    lifecycle: LifecycleResponse,
  },
  LifecycleError {
    list:  PoList,
    po_id: String,
    error: FetchError,
  },
}

/// One viewer session plus the ticket counter that outlives it.
#[derive(Debug)]
pub struct Viewer {
  state:       ViewerState,
  next_ticket: u64,
}

impl Default for Viewer {
  fn default() -> Self { Self::new() }
}

impl Viewer {
  pub fn new() -> Self {
    Self {
      state:       ViewerState::Closed,
      next_ticket: 0,
    }
  }

  pub fn state(&self) -> &ViewerState { &self.state }

  fn issue(&mut self) -> Ticket {
    self.next_ticket += 1;
    Ticket(self.next_ticket)
  }

  // ── Transitions ───────────────────────────────────────────────────────────

  /// Start a session, or restart one in progress, by reloading the PO list.
  /// Any selected lifecycle is dropped.
  pub fn open(&mut self) -> Effect {
    let ticket = self.issue();
    self.state = ViewerState::LoadingList { ticket };
    Effect::FetchList(ticket)
  }

  /// End the session. Returns `None` if the viewer was already closed.
  pub fn close(&mut self) -> Option<Effect> {
    if self.state == ViewerState::Closed {
      return None;
    }
    self.state = ViewerState::Closed;
    Some(Effect::RefreshEnablement)
  }

  /// Select `po_id` and request its lifecycle.
  ///
  /// Ignored while closed or while the list is still loading, and when
  /// `po_id` is already loading. Re-selecting the shown PO fetches it again.
  pub fn select(&mut self, po_id: &str) -> Option<Effect> {
    let list = match &self.state {
      ViewerState::Closed | ViewerState::LoadingList { .. } => return None,
      ViewerState::LoadingLifecycle { po_id: current, .. } if current == po_id => return None,
      ViewerState::ListReady(list) => PoList::Loaded(list.clone()),
      ViewerState::ListError(error) => PoList::Failed(error.clone()),
      ViewerState::LoadingLifecycle { list, .. }
      | ViewerState::LifecycleReady { list, .. }
      | ViewerState::LifecycleError { list, .. } => list.clone(),
    };

    let ticket = self.issue();
    self.state = ViewerState::LoadingLifecycle {
      list,
      po_id: po_id.to_owned(),
      ticket,
    };
    Some(Effect::FetchLifecycle {
      ticket,
      po_id: po_id.to_owned(),
    })
  }

  /// Deliver a PO-list result. Returns `false` if it was stale and dropped.
  pub fn apply_list(
    &mut self,
    ticket: Ticket,
    result: Result<PoListResponse, FetchError>,
  ) -> bool {
    if !matches!(self.state, ViewerState::LoadingList { ticket: t } if t == ticket) {
      tracing::debug!(?ticket, "dropping stale PO list");
      return false;
    }
    self.state = match result {
      Ok(list) => ViewerState::ListReady(list),
      Err(error) => ViewerState::ListError(error),
    };
    true
  }

  /// Deliver a lifecycle result. Returns `false` if it was stale and dropped.
  pub fn apply_lifecycle(
    &mut self,
    ticket: Ticket,
    result: Result<LifecycleResponse, FetchError>,
  ) -> bool {
    let ViewerState::LoadingLifecycle {
      list,
      po_id,
      ticket: expected,
    } = &self.state
    else {
      tracing::debug!(?ticket, "dropping lifecycle with no fetch in flight");
      return false;
    };
    if *expected != ticket {
      tracing::debug!(?ticket, %po_id, "dropping superseded lifecycle");
      return false;
    }

    let (list, po_id) = (list.clone(), po_id.clone());
    self.state = match result {
      Ok(lifecycle) => ViewerState::LifecycleReady { list, lifecycle },
      Err(error) => ViewerState::LifecycleError { list, po_id, error },
    };
    true
  }

  // ── Queries ───────────────────────────────────────────────────────────────

  pub fn is_open(&self) -> bool { self.state != ViewerState::Closed }

  pub fn is_loading_list(&self) -> bool {
    matches!(self.state, ViewerState::LoadingList { .. })
  }

  pub fn is_loading_lifecycle(&self) -> bool {
    matches!(self.state, ViewerState::LoadingLifecycle { .. })
  }

  /// The PO-list outcome, once known.
  pub fn list(&self) -> Option<PoList> {
    match &self.state {
      ViewerState::Closed | ViewerState::LoadingList { .. } => None,
      ViewerState::ListReady(list) => Some(PoList::Loaded(list.clone())),
      ViewerState::ListError(error) => Some(PoList::Failed(error.clone())),
      ViewerState::LoadingLifecycle { list, .. }
      | ViewerState::LifecycleReady { list, .. }
      | ViewerState::LifecycleError { list, .. } => Some(list.clone()),
    }
  }

  /// Purchase orders currently offered for selection.
  pub fn pos(&self) -> &[PurchaseOrderSummary] {
    match &self.state {
      ViewerState::ListReady(list) => &list.pos,
      ViewerState::LoadingLifecycle { list, .. }
      | ViewerState::LifecycleReady { list, .. }
      | ViewerState::LifecycleError { list, .. } => list.pos(),
      _ => &[],
    }
  }

  /// The PO whose lifecycle is loading, shown, or failed.
  pub fn selected_po(&self) -> Option<&str> {
    match &self.state {
      ViewerState::LoadingLifecycle { po_id, .. }
      | ViewerState::LifecycleError { po_id, .. } => Some(po_id),
      ViewerState::LifecycleReady { lifecycle, .. } => Some(&lifecycle.po_id),
      _ => None,
    }
  }

  pub fn lifecycle(&self) -> Option<&LifecycleResponse> {
    match &self.state {
      ViewerState::LifecycleReady { lifecycle, .. } => Some(lifecycle),
      _ => None,
    }
  }

  /// The error currently shown, if any.
  pub fn error(&self) -> Option<&FetchError> {
    match &self.state {
      ViewerState::ListError(error) | ViewerState::LifecycleError { error, .. } => Some(error),
      _ => None,
    }
  }

  /// First event of `event_type` in the shown lifecycle.
  pub fn event_of_type(&self, event_type: EventType) -> Option<&LifecycleEvent> {
    self.lifecycle().and_then(|l| l.event_of_type(event_type))
  }
}
