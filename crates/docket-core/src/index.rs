//! Correlates uploaded rows into per-purchase-order lifecycles.
//!
//! ```text
//! PO  (850) ── document_id ─────────────┐
//! ACK (855) ── related_document_id ─────┤ = PO id
//! ASN (856) ── related_document_id ─────┤
//! INV (810) ── related_document_id ─────┘
//! FA  (997) ── related_document_id ───── = an INV document_id
//! ```
//!
//! The index owns its rows so it can be cached across requests for the same
//! upload.

use std::{
  cmp::Ordering,
  collections::{BTreeSet, HashMap},
};

use strum::IntoEnumIterator;

use crate::{
  event::EventType,
  lifecycle::{Evidence, LifecycleEvent, LifecycleResponse, PurchaseOrderSummary},
  row::EdiRow,
};

/// Lookup tables over one upload's rows. Values are positions into `rows`.
#[derive(Debug, Clone, Default)]
pub struct LifecycleIndex {
  rows:       Vec<EdiRow>,
  po_by_id:   HashMap<String, usize>,
  by_related: HashMap<EventType, HashMap<String, Vec<usize>>>,
}

impl LifecycleIndex {
  pub fn build(rows: Vec<EdiRow>) -> Self {
    let mut po_by_id = HashMap::new();
    let mut by_related: HashMap<EventType, HashMap<String, Vec<usize>>> = HashMap::new();

    for (i, row) in rows.iter().enumerate() {
      let Some(event_type) = row.event_type() else {
        continue;
      };
      match event_type {
        // Duplicate PO ids: the last row wins.
        EventType::Po => {
          if let Some(id) = row.document_id() {
            po_by_id.insert(id.to_owned(), i);
          }
        }
        other => {
          if let Some(rel) = row.related_document_id() {
            by_related
              .entry(other)
              .or_default()
              .entry(rel.to_owned())
              .or_default()
              .push(i);
          }
        }
      }
    }

    Self {
      rows,
      po_by_id,
      by_related,
    }
  }

  pub fn is_empty(&self) -> bool { self.rows.is_empty() }

  pub fn row_count(&self) -> usize { self.rows.len() }

  /// One summary per known purchase order, in upload order.
  pub fn po_summaries(&self) -> Vec<PurchaseOrderSummary> {
    let mut winners: Vec<usize> = self.po_by_id.values().copied().collect();
    winners.sort_unstable();
    winners
      .into_iter()
      .map(|i| {
        let row = &self.rows[i];
        PurchaseOrderSummary {
          document_id: row.document_id().unwrap_or_default().to_owned(),
          partner:     row.partner().map(str::to_owned),
          status:      row.status().map(str::to_owned),
          po_date:     row.expected_date(),
        }
      })
      .collect()
  }

  /// Assemble the lifecycle for `po_id`, or `None` if it is not a known PO.
  ///
  /// Events are grouped PO → ACK → ASN → INV → FA. Within a group rows are
  /// ordered by [`preference`], so the first event of each type is the
  /// preferred one.
  pub fn lifecycle(&self, po_id: &str) -> Option<LifecycleResponse> {
    let po = *self.po_by_id.get(po_id)?;

    let mut events = Vec::new();
    for event_type in EventType::iter() {
      let mut members = match event_type {
        EventType::Po => vec![po],
        EventType::Fa => self.fa_candidates(po_id),
        other => self.related(other, po_id).to_vec(),
      };
      members.sort_by(|a, b| preference(&self.rows[*a], &self.rows[*b]));
      events.extend(members.into_iter().map(|i| event_from_row(event_type, &self.rows[i])));
    }

    Some(LifecycleResponse::new(po_id, events))
  }

  fn related(&self, event_type: EventType, id: &str) -> &[usize] {
    self
      .by_related
      .get(&event_type)
      .and_then(|m| m.get(id))
      .map(Vec::as_slice)
      .unwrap_or_default()
  }

  /// FA rows acknowledging any invoice of `po_id`, deduplicated.
  fn fa_candidates(&self, po_id: &str) -> Vec<usize> {
    let mut seen = BTreeSet::new();
    for &inv in self.related(EventType::Inv, po_id) {
      if let Some(inv_id) = self.rows[inv].document_id() {
        seen.extend(self.related(EventType::Fa, inv_id).iter().copied());
      }
    }
    seen.into_iter().collect()
  }
}

/// Deterministic ordering among rows of the same type:
///
/// 1. rows with a parseable actual date, earliest first;
/// 2. then rows with a parseable expected date, earliest first;
/// 3. then everything else;
///
/// with ties broken by explicit `csv_row_index` (absent last), then by upload
/// position.
pub fn preference(a: &EdiRow, b: &EdiRow) -> Ordering {
  fn key(row: &EdiRow) -> (u8, Option<chrono::NaiveDate>) {
    if let Some(d) = row.actual_date() {
      (0, Some(d))
    } else if let Some(d) = row.expected_date() {
      (1, Some(d))
    } else {
      (2, None)
    }
  }

  key(a)
    .cmp(&key(b))
    .then_with(|| match (a.csv_row_index, b.csv_row_index) {
      (Some(x), Some(y)) => x.cmp(&y),
      (Some(_), None) => Ordering::Less,
      (None, Some(_)) => Ordering::Greater,
      (None, None) => Ordering::Equal,
    })
    .then_with(|| a.position.cmp(&b.position))
}

fn event_from_row(event_type: EventType, row: &EdiRow) -> LifecycleEvent {
  LifecycleEvent {
    event_type,
    document_id: row.document_id().map(str::to_owned),
    related_document_id: row.related_document_id().map(str::to_owned),
    status: row.status().map(str::to_owned),
    event_date: row.event_date(),
    partner: row.partner().map(str::to_owned),
    evidence: Some(Evidence {
      csv_row_index: row.csv_row_index,
      source_fields: row.fields.clone(),
    }),
  }
}
