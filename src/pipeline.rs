//! Per-file driver: read, flatten, translate and publish in scoresheet order.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::IngestResult;
use crate::logging::{log, log_delivery_failure, log_file_summary, obj, v_str, Domain, Level};
use crate::publish::EventSink;
use crate::scoresheet::{Scoresheet, ScoresheetRecord};
use crate::store::EntityStore;
use crate::translate::DeliveryTranslator;

/// Outcome counts for one scoresheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileReport {
    pub total: usize,
    pub published: usize,
    pub translate_failures: usize,
    pub publish_failures: usize,
}

impl FileReport {
    pub fn failures(&self) -> usize {
        self.translate_failures + self.publish_failures
    }
}

pub struct Pipeline<S, E> {
    translator: DeliveryTranslator<S>,
    sink: Arc<E>,
}

impl<S: EntityStore, E: EventSink> Pipeline<S, E> {
    pub fn new(translator: DeliveryTranslator<S>, sink: Arc<E>) -> Self {
        Self { translator, sink }
    }

    pub fn translator(&self) -> &DeliveryTranslator<S> {
        &self.translator
    }

    /// Deliveries are handled one at a time so events reach the store in
    /// scoresheet order. A failed delivery is logged and skipped.
    pub async fn process_records(&self, file: &str, records: &[ScoresheetRecord]) -> FileReport {
        let mut report = FileReport {
            total: records.len(),
            ..FileReport::default()
        };
        for record in records {
            let d = &record.delivery;
            let delivery = match self.translator.translate(record).await {
                Ok(delivery) => delivery,
                Err(e) => {
                    report.translate_failures += 1;
                    log_delivery_failure("translate", file, record.innings, d.over, d.ball, &e);
                    continue;
                }
            };
            match self.sink.publish(&delivery).await {
                Ok(()) => report.published += 1,
                Err(e) => {
                    report.publish_failures += 1;
                    log_delivery_failure("publish", file, record.innings, d.over, d.ball, &e);
                }
            }
        }
        report
    }

    /// Fails only when the file cannot be read or parsed; per-delivery
    /// failures are counted in the report.
    pub async fn process_file(&self, path: &Path) -> IngestResult<FileReport> {
        let file = path.display().to_string();
        log(
            Level::Info,
            Domain::Scoresheet,
            "file_start",
            obj(&[("file", v_str(&file))]),
        );
        let sheet = Scoresheet::read(path).await?;
        let records = sheet.flatten()?;
        let report = self.process_records(&file, &records).await;
        log_file_summary(
            &file,
            report.total,
            report.published,
            report.translate_failures,
            report.publish_failures,
        );
        Ok(report)
    }
}

/// `*.yaml` files directly under `dir`, sorted by name.
pub async fn pending_scoresheets(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut found = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_yaml = path.extension().map_or(false, |ext| ext == "yaml");
        if is_yaml && entry.file_type().await?.is_file() {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

/// Where a scoresheet that cannot be read or parsed is moved.
pub fn failed_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".failed");
    PathBuf::from(name)
}
