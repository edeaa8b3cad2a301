//! Integration tests for `SqliteStore` against an in-memory database.

use docket_core::{
  row::EdiRow,
  store::{NewUpload, RowStore},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn row(position: usize, cells: &[(&str, &str)]) -> EdiRow {
  EdiRow::from_fields(position, cells.iter().map(|(k, v)| (*k, *v)))
}

fn upload(name: &str, rows: Vec<EdiRow>) -> NewUpload {
  NewUpload {
    source_name:    name.to_owned(),
    content_sha256: format!("sha-of-{name}"),
    rows,
  }
}

// ─── Empty store ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn fresh_store_has_no_upload() {
  let s = store().await;
  assert!(s.latest_upload().await.unwrap().is_none());
  assert!(s.latest_dataset().await.unwrap().is_none());
}

// ─── Uploads ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn replace_then_read_back_rows() {
  let s = store().await;
  let rows = vec![
    row(0, &[("transaction_type", "850"), ("document_id", "PO-1"), ("csv_row_index", "3")]),
    row(1, &[("transaction_type", "855"), ("related_document_id", "PO-1")]),
  ];

  let record = s.replace_rows(upload("a.csv", rows.clone())).await.unwrap();
  assert_eq!(record.row_count, 2);
  assert_eq!(record.source_name, "a.csv");

  let latest = s.latest_upload().await.unwrap().unwrap();
  assert_eq!(latest.upload_id, record.upload_id);
  assert_eq!(latest.content_sha256, "sha-of-a.csv");

  let dataset = s.latest_dataset().await.unwrap().unwrap();
  assert_eq!(dataset.upload.upload_id, record.upload_id);
  assert_eq!(dataset.upload.row_count, 2);
  assert_eq!(dataset.rows, rows);
  assert_eq!(dataset.rows[0].csv_row_index, Some(3));
}

#[tokio::test]
async fn second_upload_replaces_the_first() {
  let s = store().await;
  let first = s
    .replace_rows(upload("a.csv", vec![row(0, &[("document_id", "PO-1")])]))
    .await
    .unwrap();
  let second = s
    .replace_rows(upload("b.csv", vec![
      row(0, &[("document_id", "PO-2")]),
      row(1, &[("document_id", "PO-3")]),
    ]))
    .await
    .unwrap();

  assert_ne!(first.upload_id, second.upload_id);
  assert_eq!(s.latest_upload().await.unwrap().unwrap().upload_id, second.upload_id);
  let dataset = s.latest_dataset().await.unwrap().unwrap();
  assert_eq!(dataset.upload.upload_id, second.upload_id);
  let ids: Vec<_> = dataset.rows.iter().filter_map(EdiRow::document_id).collect();
  assert_eq!(ids, vec!["PO-2", "PO-3"]);
}

#[tokio::test]
async fn empty_upload_is_recorded_with_zero_rows() {
  let s = store().await;
  let record = s.replace_rows(upload("empty.csv", Vec::new())).await.unwrap();
  assert_eq!(record.row_count, 0);
  let dataset = s.latest_dataset().await.unwrap().unwrap();
  assert_eq!(dataset.upload.upload_id, record.upload_id);
  assert!(dataset.rows.is_empty());
}

#[tokio::test]
async fn rows_come_back_in_position_order() {
  let s = store().await;
  let rows: Vec<EdiRow> = (0..25)
    .map(|i| {
      let id = format!("PO-{i}");
      row(i, &[("document_id", id.as_str())])
    })
    .collect();
  let record = s.replace_rows(upload("many.csv", rows)).await.unwrap();

  let stored = s.latest_dataset().await.unwrap().unwrap().rows;
  assert_eq!(stored.len(), record.row_count);
  let positions: Vec<usize> = stored.iter().map(|r| r.position).collect();
  assert_eq!(positions, (0..25).collect::<Vec<_>>());
  assert_eq!(stored[24].document_id(), Some("PO-24"));
}

// ─── Snapshots ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn datasets_never_mix_uploads_under_concurrent_replacement() {
  let s = store().await;
  s.replace_rows(upload("seed.csv", vec![row(0, &[("document_id", "PO-0")])]))
    .await
    .unwrap();

  let writer = {
    let s = s.clone();
    tokio::spawn(async move {
      for n in 1..=20usize {
        let name = format!("w{n}.csv");
        let rows = (0..n)
          .map(|i| {
            let id = format!("PO-{n}");
            row(i, &[("document_id", id.as_str())])
          })
          .collect();
        s.replace_rows(upload(&name, rows)).await.unwrap();
      }
    })
  };

  for _ in 0..50 {
    let dataset = s.latest_dataset().await.unwrap().unwrap();
    assert_eq!(dataset.rows.len(), dataset.upload.row_count);
    let first = dataset.rows[0].document_id();
    assert!(dataset.rows.iter().all(|r| r.document_id() == first));
  }
  writer.await.unwrap();

  let last = s.latest_dataset().await.unwrap().unwrap();
  assert_eq!(last.upload.source_name, "w20.csv");
  assert_eq!(last.rows.len(), 20);
}
