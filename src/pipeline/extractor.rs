//! Runs the fixed queries against a staged database and emits artifacts.

use crate::artifacts::chromedb::chrome_to_unix_seconds;
use crate::artifacts::{
    ArtifactKind, ArtifactRecord, AttributeType, AttributeValue, FieldSpec, QuerySpec, ValueType,
};
use crate::base::context::SqlResultExt;
use crate::base::ingesterror::IngestError;
use crate::host::{
    ArtifactSink, ArtifactTypeId, ArtifactTypeRegistry, ArtifactTypes, DiagnosticLog,
    HostServices, IngestServices, JobCancellation, ModuleDataEvent,
};
use crate::pipeline::config::{IngestConfig, RowFailurePolicy};
use crate::pipeline::report::KindReport;
use crate::pipeline::staging::StagedDatabase;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row};
use std::path::Path;
use std::sync::Arc;

/// Result of extracting one staged database.
#[derive(Debug)]
pub struct Extraction {
    /// One entry per query that was attempted, in query order.
    pub kinds: Vec<KindReport>,
    pub cancelled: bool,
}

enum QueryEnd {
    Completed,
    Aborted,
    Cancelled,
}

/// Turns rows of the Chrome profile databases into host artifacts.
pub struct ArtifactExtractor {
    sink: Arc<dyn ArtifactSink>,
    registry: Arc<dyn ArtifactTypeRegistry>,
    services: Arc<dyn IngestServices>,
    log: Arc<dyn DiagnosticLog>,
    module_name: String,
    policy: RowFailurePolicy,
    convert_webkit_timestamps: bool,
}

impl ArtifactExtractor {
    pub fn new(host: &HostServices, config: &IngestConfig) -> Self {
        Self {
            sink: host.sink.clone(),
            registry: host.registry.clone(),
            services: host.services.clone(),
            log: host.log.clone(),
            module_name: config.module_name.clone(),
            policy: config.row_failure_policy,
            convert_webkit_timestamps: config.convert_webkit_timestamps,
        }
    }

    /// Open a staged database without write access.
    pub fn open(path: &Path) -> Result<Connection, IngestError> {
        Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .open_context(path)
    }

    /// Run `queries` against `staged`, in order.
    ///
    /// A failing query only affects its own kind. The connection is closed
    /// before returning, also on cancellation.
    pub fn extract(
        &self,
        staged: &StagedDatabase,
        queries: &[&'static QuerySpec],
        types: &mut ArtifactTypes,
        cancel: &dyn JobCancellation,
    ) -> Extraction {
        let mut extraction = Extraction {
            kinds: Vec::new(),
            cancelled: false,
        };

        let conn = match Self::open(&staged.path) {
            Ok(conn) => conn,
            Err(e) => {
                self.log.error(&format!(
                    "Error opening {} for {}: {}",
                    staged.path.display(),
                    staged.file.path(),
                    e
                ));
                for spec in queries {
                    let mut report = KindReport::new(spec.kind);
                    report.failures.push(e.to_string());
                    extraction.kinds.push(report);
                }
                return extraction;
            }
        };

        for spec in queries {
            if cancel.is_job_cancelled() {
                extraction.cancelled = true;
                break;
            }

            let mut report = KindReport::new(spec.kind);
            let type_id = match types.ensure(self.registry.as_ref(), spec.kind) {
                Ok(id) => id,
                Err(e) => {
                    self.log.error(&format!("Skipping {}: {}", spec.kind, e));
                    report.failures.push(e.to_string());
                    extraction.kinds.push(report);
                    continue;
                }
            };

            report.databases = 1;
            match self.run_query(&conn, staged, spec, type_id, cancel, &mut report) {
                Ok(QueryEnd::Completed) => self.fire_event(spec.kind, type_id, &mut report),
                Ok(QueryEnd::Aborted) => {}
                Ok(QueryEnd::Cancelled) => extraction.cancelled = true,
                Err(e) => {
                    self.log.error(&format!(
                        "Error querying {} in {}: {}",
                        spec.kind,
                        staged.file.path(),
                        e
                    ));
                    report.failures.push(e.to_string());
                    if report.records > 0 {
                        self.fire_event(spec.kind, type_id, &mut report);
                    }
                }
            }
            extraction.kinds.push(report);
            if extraction.cancelled {
                break;
            }
        }

        if let Err((_, e)) = conn.close() {
            tracing::warn!(path = %staged.path.display(), error = %e, "failed to close database");
        }
        extraction
    }

    fn run_query(
        &self,
        conn: &Connection,
        staged: &StagedDatabase,
        spec: &QuerySpec,
        type_id: ArtifactTypeId,
        cancel: &dyn JobCancellation,
        report: &mut KindReport,
    ) -> Result<QueryEnd, IngestError> {
        let sql = spec.sql();
        let mut stmt = conn.prepare(&sql).query_context(&sql)?;
        let mut rows = stmt.query([]).query_context(&sql)?;
        let mut index = 0usize;

        loop {
            if cancel.is_job_cancelled() {
                return Ok(QueryEnd::Cancelled);
            }
            let Some(row) = rows.next().query_context(&sql)? else {
                break;
            };
            index += 1;

            let emitted = self
                .convert_row(spec, row, index)
                .and_then(|record| self.emit(staged, type_id, &record, index));
            match emitted {
                Ok(()) => report.records += 1,
                Err(e) => {
                    report.skipped_rows += 1;
                    self.log.warn(&format!("Skipping row in {}: {}", staged.file.path(), e));
                    if self.policy == RowFailurePolicy::LegacyTopSitesAbort
                        && spec.kind == ArtifactKind::ChromeTopSites
                    {
                        report.aborted = true;
                        report.failures.push(e.to_string());
                        return Ok(QueryEnd::Aborted);
                    }
                }
            }
        }

        tracing::debug!(kind = %spec.kind, rows = index, records = report.records, "query complete");
        Ok(QueryEnd::Completed)
    }

    /// Build the record for one row. Nothing is emitted unless every field
    /// converts.
    pub fn convert_row(
        &self,
        spec: &QuerySpec,
        row: &Row<'_>,
        index: usize,
    ) -> Result<ArtifactRecord, IngestError> {
        let mut record = ArtifactRecord::new(spec.kind);
        for field in spec.fields {
            let failed = |reason: String| IngestError::RowConversion {
                kind: spec.kind,
                row: index,
                column: field.column,
                reason,
            };
            let raw = row
                .get_ref(field.column)
                .map_err(|e| failed(format!("could not be read: {}", e)))?;
            let value = self.convert_value(field, raw).map_err(failed)?;
            record.push(field.attribute, value);
        }
        Ok(record)
    }

    fn convert_value(&self, field: &FieldSpec, raw: ValueRef<'_>) -> Result<AttributeValue, String> {
        match field.value_type() {
            ValueType::Text => text_value(raw).map(AttributeValue::Text),
            ValueType::Integer => {
                let value = integer_value(raw)?;
                let value = if self.convert_webkit_timestamps
                    && field.attribute == AttributeType::DateTimeAccessed
                {
                    chrome_to_unix_seconds(value)
                } else {
                    value
                };
                Ok(AttributeValue::Integer(value))
            }
        }
    }

    fn emit(
        &self,
        staged: &StagedDatabase,
        type_id: ArtifactTypeId,
        record: &ArtifactRecord,
        index: usize,
    ) -> Result<(), IngestError> {
        self.sink
            .create_artifact(&staged.file, type_id, &record.to_attributes(&self.module_name))
            .map(|_| ())
            .map_err(|e| IngestError::sink(record.kind, index, e.0))
    }

    fn fire_event(&self, kind: ArtifactKind, type_id: ArtifactTypeId, report: &mut KindReport) {
        self.services.fire_module_data_event(ModuleDataEvent {
            module_name: self.module_name.clone(),
            kind,
            type_id,
        });
        report.events += 1;
    }
}

fn text_value(raw: ValueRef<'_>) -> Result<String, String> {
    match raw {
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|_| "is not valid UTF-8".to_string()),
        ValueRef::Integer(v) => Ok(v.to_string()),
        ValueRef::Real(v) => Ok(v.to_string()),
        // Untitled pages and downloads without a tab URL are NULL.
        ValueRef::Null => Ok(String::new()),
        ValueRef::Blob(_) => Err("is a BLOB".to_string()),
    }
}

fn integer_value(raw: ValueRef<'_>) -> Result<i64, String> {
    match raw {
        ValueRef::Integer(v) => Ok(v),
        ValueRef::Text(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            text.trim()
                .parse::<i64>()
                .map_err(|_| format!("is not an integer: '{}'", text))
        }
        ValueRef::Real(v) if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 => {
            Ok(v as i64)
        }
        ValueRef::Real(v) => Err(format!("is not an integer: {}", v)),
        ValueRef::Null => Ok(0),
        ValueRef::Blob(_) => Err("is a BLOB".to_string()),
    }
}
