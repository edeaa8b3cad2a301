//! Lifecycle event types and their X12 transaction-set codes.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

use crate::{Error, Result};

/// The document types that make up a purchase-order lifecycle.
///
/// Variants are declared in lifecycle order; [`EventType::iter`] walks them
/// PO → ACK → ASN → INV → FA.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum EventType {
  /// Purchase order (850).
  Po,
  /// Purchase order acknowledgement (855).
  Ack,
  /// Advance ship notice (856).
  Asn,
  /// Invoice (810).
  Inv,
  /// Functional acknowledgement (997).
  Fa,
}

impl EventType {
  /// The X12 transaction-set code for this document type.
  pub fn transaction_code(self) -> u16 {
    match self {
      Self::Po => 850,
      Self::Ack => 855,
      Self::Asn => 856,
      Self::Inv => 810,
      Self::Fa => 997,
    }
  }

  /// Map a transaction-set code back to its event type.
  pub fn from_transaction_code(code: u16) -> Result<Self> {
    Self::iter()
      .find(|t| t.transaction_code() == code)
      .ok_or(Error::UnknownTransactionCode(code))
  }

  /// Human-readable name shown next to the short label.
  pub fn description(self) -> &'static str {
    match self {
      Self::Po => "Purchase Order",
      Self::Ack => "PO Acknowledgement",
      Self::Asn => "Advance Ship Notice",
      Self::Inv => "Invoice",
      Self::Fa => "Functional Acknowledgement",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn codes_round_trip_for_every_type() {
    for t in EventType::iter() {
      assert_eq!(EventType::from_transaction_code(t.transaction_code()).unwrap(), t);
    }
  }

  #[test]
  fn unknown_code_is_an_error() {
    assert!(matches!(
      EventType::from_transaction_code(811),
      Err(Error::UnknownTransactionCode(811))
    ));
  }

  #[test]
  fn wire_label_is_uppercase() {
    assert_eq!(serde_json::to_string(&EventType::Asn).unwrap(), "\"ASN\"");
    assert_eq!(EventType::Fa.to_string(), "FA");
  }

  #[test]
  fn iteration_follows_lifecycle_order() {
    let order: Vec<_> = EventType::iter().collect();
    assert_eq!(
      order,
      vec![EventType::Po, EventType::Ack, EventType::Asn, EventType::Inv, EventType::Fa]
    );
  }
}
