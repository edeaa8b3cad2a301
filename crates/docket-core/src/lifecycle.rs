//! The lifecycle wire contract.
//!
//! These types are shared verbatim by the server (which assembles them) and
//! the client (which only ever replaces them wholesale on re-fetch). Nothing
//! here is mutated after it has been received.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::event::EventType;

// ─── Purchase-order list ─────────────────────────────────────────────────────

/// One entry in the purchase-order picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderSummary {
  pub document_id: String,
  #[serde(default)]
  pub partner:     Option<String>,
  #[serde(default)]
  pub status:      Option<String>,
  /// The PO row's expected date, presented as the order date.
  #[serde(default)]
  pub po_date:     Option<NaiveDate>,
}

impl PurchaseOrderSummary {
  pub fn new(document_id: impl Into<String>) -> Self {
    Self {
      document_id: document_id.into(),
      partner:     None,
      status:      None,
      po_date:     None,
    }
  }
}

/// Body of `GET /lifecycle/po-list`.
///
/// `csv_loaded: false` always comes with an empty `pos`; `csv_loaded: true`
/// with an empty `pos` means data exists but contains no purchase orders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoListResponse {
  pub csv_loaded: bool,
  #[serde(default)]
  pub pos:        Vec<PurchaseOrderSummary>,
}

impl PoListResponse {
  /// The response for a store with no uploaded rows.
  pub fn not_loaded() -> Self { Self::default() }
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// Traceability back to the CSV row an event was built from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
  #[serde(default)]
  pub csv_row_index: Option<u64>,
  /// Raw, non-blank cells of the source row.
  #[serde(default)]
  pub source_fields: BTreeMap<String, String>,
}

/// A single observed document tied to a purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
  pub event_type:          EventType,
  #[serde(default)]
  pub document_id:         Option<String>,
  #[serde(default)]
  pub related_document_id: Option<String>,
  #[serde(default)]
  pub status:              Option<String>,
  #[serde(default)]
  pub event_date:          Option<NaiveDate>,
  #[serde(default)]
  pub partner:             Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub evidence:            Option<Evidence>,
}

impl LifecycleEvent {
  /// An event carrying only its type; every optional field absent.
  pub fn bare(event_type: EventType) -> Self {
    Self {
      event_type,
      document_id: None,
      related_document_id: None,
      status: None,
      event_date: None,
      partner: None,
      evidence: None,
    }
  }
}

// ─── Completeness ────────────────────────────────────────────────────────────

/// Which document types have been observed for a purchase order.
///
/// Always derived from an event list; see [`CompletenessFlags::from_events`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletenessFlags {
  pub has_po:  bool,
  pub has_ack: bool,
  pub has_asn: bool,
  pub has_inv: bool,
  pub has_fa:  bool,
}

impl CompletenessFlags {
  pub fn from_events(events: &[LifecycleEvent]) -> Self {
    let mut flags = Self::default();
    for event in events {
      flags.set(event.event_type);
    }
    flags
  }

  pub fn has(&self, event_type: EventType) -> bool {
    match event_type {
      EventType::Po => self.has_po,
      EventType::Ack => self.has_ack,
      EventType::Asn => self.has_asn,
      EventType::Inv => self.has_inv,
      EventType::Fa => self.has_fa,
    }
  }

  fn set(&mut self, event_type: EventType) {
    match event_type {
      EventType::Po => self.has_po = true,
      EventType::Ack => self.has_ack = true,
      EventType::Asn => self.has_asn = true,
      EventType::Inv => self.has_inv = true,
      EventType::Fa => self.has_fa = true,
    }
  }

  /// True once every step from PO through FA has been seen.
  pub fn is_complete(&self) -> bool { EventType::iter().all(|t| self.has(t)) }

  /// The first lifecycle step not yet observed, if any.
  pub fn first_missing(&self) -> Option<EventType> {
    EventType::iter().find(|t| !self.has(*t))
  }
}

// ─── Response ────────────────────────────────────────────────────────────────

/// Body of `GET /lifecycle/po/{po_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleResponse {
  pub po_id:        String,
  /// Display order only. More than one event of a type may be present.
  pub events:       Vec<LifecycleEvent>,
  pub completeness: CompletenessFlags,
}

impl LifecycleResponse {
  /// Build a response whose completeness is derived from `events`.
  pub fn new(po_id: impl Into<String>, events: Vec<LifecycleEvent>) -> Self {
    let completeness = CompletenessFlags::from_events(&events);
    Self {
      po_id: po_id.into(),
      events,
      completeness,
    }
  }

  /// The first event of type `event_type`, or `None` if there is none.
  pub fn event_of_type(&self, event_type: EventType) -> Option<&LifecycleEvent> {
    self.events.iter().find(|e| e.event_type == event_type)
  }

  /// Every event of type `event_type`, in display order.
  pub fn events_of_type(
    &self,
    event_type: EventType,
  ) -> impl Iterator<Item = &LifecycleEvent> + '_ {
    self.events.iter().filter(move |e| e.event_type == event_type)
  }

  /// Whether `completeness` agrees with what `events` implies.
  pub fn is_consistent(&self) -> bool {
    self.completeness == CompletenessFlags::from_events(&self.events)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn events(types: &[EventType]) -> Vec<LifecycleEvent> {
    types.iter().copied().map(LifecycleEvent::bare).collect()
  }

  #[test]
  fn completeness_matches_presence_for_every_subset() {
    let all: Vec<EventType> = EventType::iter().collect();
    for mask in 0u8..32 {
      let present: Vec<EventType> = all
        .iter()
        .enumerate()
        .filter(|(i, _)| mask & (1 << i) != 0)
        .map(|(_, t)| *t)
        .collect();
      let resp = LifecycleResponse::new("PO-1", events(&present));
      for t in &all {
        assert_eq!(resp.completeness.has(*t), present.contains(t), "mask {mask:05b}, {t}");
      }
      assert!(resp.is_consistent());
    }
  }

  #[test]
  fn empty_events_yield_all_false() {
    let resp = LifecycleResponse::new("PO-9", Vec::new());
    assert_eq!(resp.completeness, CompletenessFlags::default());
    assert_eq!(resp.completeness.first_missing(), Some(EventType::Po));
    assert!(!resp.completeness.is_complete());
  }

  #[test]
  fn po_and_asn_scenario() {
    let resp = LifecycleResponse::new("PO-1", events(&[EventType::Po, EventType::Asn]));
    assert_eq!(resp.completeness, CompletenessFlags {
      has_po:  true,
      has_ack: false,
      has_asn: true,
      has_inv: false,
      has_fa:  false,
    });
    assert!(resp.event_of_type(EventType::Ack).is_none());
    assert_eq!(resp.event_of_type(EventType::Asn).unwrap().event_type, EventType::Asn);
  }

  #[test]
  fn event_of_type_returns_first_match() {
    let mut first = LifecycleEvent::bare(EventType::Inv);
    first.document_id = Some("INV-1".into());
    let mut second = LifecycleEvent::bare(EventType::Inv);
    second.document_id = Some("INV-2".into());
    let resp = LifecycleResponse::new("PO-1", vec![LifecycleEvent::bare(EventType::Po), first, second]);

    let found = resp.event_of_type(EventType::Inv).unwrap();
    assert_eq!(found.document_id.as_deref(), Some("INV-1"));
    assert_eq!(resp.events_of_type(EventType::Inv).count(), 2);
  }

  #[test]
  fn contradicting_completeness_is_detected() {
    let mut resp = LifecycleResponse::new("PO-1", events(&[EventType::Po]));
    resp.completeness.has_fa = true;
    assert!(!resp.is_consistent());
  }

  #[test]
  fn deserialises_minimal_backend_payload() {
    let raw = r#"{
      "po_id": "PO-1",
      "events": [{"event_type": "PO", "document_id": "PO-1", "event_date": "2024-03-01"}],
      "completeness": {"has_po": true, "has_ack": false, "has_asn": false, "has_inv": false, "has_fa": false}
    }"#;
    let resp: LifecycleResponse = serde_json::from_str(raw).unwrap();
    assert!(resp.is_consistent());
    let po = resp.event_of_type(EventType::Po).unwrap();
    assert_eq!(po.event_date, NaiveDate::from_ymd_opt(2024, 3, 1));
    assert!(po.partner.is_none());
    assert!(po.evidence.is_none());
  }

  #[test]
  fn po_list_defaults_to_not_loaded() {
    let list: PoListResponse = serde_json::from_str(r#"{"csv_loaded": false}"#).unwrap();
    assert_eq!(list, PoListResponse::not_loaded());
  }
}
