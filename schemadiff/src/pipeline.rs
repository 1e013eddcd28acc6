//! End-to-end generation: diff both snapshots and drive a runner.

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use log::{info, warn};
use serde::{Serialize, Serializer};

use crate::errors::{ModelError, RunError, SinkError};
use crate::index::SnapshotIndex;
use crate::ops::OperationBlock;
use crate::runner::{RecordOutcome, Runner};
use crate::sequencer::{Pass, PlannedRecord, block_for, global_order, sequence};

/// Compute every non-empty block in global emission order without writing anything.
pub fn plan(before: &SnapshotIndex, after: &SnapshotIndex) -> Result<Vec<OperationBlock>, ModelError> {
    let per_record = global_order(before, after)
        .into_iter()
        .map(|planned| {
            let block = block_for(before, after, &planned)?;
            Ok((planned.record, block))
        })
        .collect::<Result<Vec<_>, ModelError>>()?;
    Ok(sequence(per_record))
}

/// Run a complete generation through `runner`.
///
/// Upserts are submitted before deletions, and both passes are awaited
/// together on the current task. Failures of individual content types and of
/// closing the output are reported in the summary; only a failure to open the
/// run's output is returned as `Err`.
pub async fn generate<R: Runner>(
    runner: &mut R,
    before: &SnapshotIndex,
    after: &SnapshotIndex,
) -> Result<RunSummary, SinkError> {
    runner.init().await?;

    let (upserts, deletes): (Vec<PlannedRecord>, Vec<PlannedRecord>) = global_order(before, after)
        .into_iter()
        .partition(|planned| planned.pass == Pass::Upsert);
    info!(
        "generating migrations for {} content type(s), {} deletion(s)",
        upserts.len(),
        deletes.len()
    );

    let ids = |planned: Vec<PlannedRecord>| planned.into_iter().map(|p| p.record).collect::<Vec<_>>();
    let producer = move |pass: Pass| {
        move |record: String| async move {
            block_for(before, after, &PlannedRecord { record, pass }).map_err(RunError::from)
        }
    };

    let mut pending = runner.run(ids(upserts), producer(Pass::Upsert));
    pending.extend(runner.run(ids(deletes), producer(Pass::Delete)));
    let outcomes = join_all(pending).await;

    let mut summary = RunSummary::from_outcomes(outcomes);
    if let Err(err) = runner.close().await {
        warn!("failed to close migration output: {err}");
        summary.close_error = Some(err);
    }
    info!(
        "{} content type(s) written, {} unchanged, {} failed",
        summary.count(RecordStatus::Written),
        summary.count(RecordStatus::Unchanged),
        summary.count(RecordStatus::Failed)
    );
    Ok(summary)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Written,
    Unchanged,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordSummary {
    pub record: String,
    pub status: RecordStatus,
    pub operations: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-content-type results of one generation, in submission order.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub records: Vec<RecordSummary>,
    #[serde(serialize_with = "display_error", skip_serializing_if = "Option::is_none")]
    close_error: Option<SinkError>,
    #[serde(skip)]
    fatal: Option<RunError>,
}

fn display_error<S: Serializer>(err: &Option<SinkError>, serializer: S) -> Result<S::Ok, S::Error> {
    match err {
        Some(err) => serializer.collect_str(err),
        None => serializer.serialize_none(),
    }
}

impl RunSummary {
    pub fn from_outcomes(outcomes: Vec<RecordOutcome>) -> Self {
        let mut fatal = None;
        let records = outcomes
            .into_iter()
            .map(|outcome| match outcome.result {
                Ok(report) => RecordSummary {
                    record: outcome.record,
                    status: if report.operations == 0 {
                        RecordStatus::Unchanged
                    } else {
                        RecordStatus::Written
                    },
                    operations: report.operations,
                    error: None,
                },
                Err(err) => {
                    warn!("content type '{}' failed: {err}", outcome.record);
                    if err.is_fatal() && fatal.is_none() {
                        fatal = Some(err.clone());
                    }
                    RecordSummary {
                        record: outcome.record,
                        status: RecordStatus::Failed,
                        operations: 0,
                        error: Some(err.to_string()),
                    }
                }
            })
            .collect();
        Self {
            generated_at: Utc::now(),
            records,
            close_error: None,
            fatal,
        }
    }

    pub fn count(&self, status: RecordStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &RecordSummary> {
        self.records.iter().filter(|r| r.status == RecordStatus::Failed)
    }

    pub fn succeeded(&self) -> bool {
        self.count(RecordStatus::Failed) == 0 && self.close_error.is_none()
    }

    pub fn get(&self, record: &str) -> Option<&RecordSummary> {
        self.records.iter().find(|r| r.record == record)
    }

    /// Failure flushing or closing the output after every block was handled.
    pub fn close_error(&self) -> Option<&SinkError> {
        self.close_error.as_ref()
    }

    /// The first fatal error of the run, if any.
    pub fn fatal(&self) -> Option<&RunError> {
        self.fatal.as_ref()
    }

    /// `Err` with the fatal error when the run was aborted, otherwise the summary.
    pub fn into_result(self) -> Result<Self, RunError> {
        match self.fatal {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RenderError;
    use crate::model::{Field, FieldType, RecordType, Snapshot};
    use crate::runner::WriteReport;

    fn index(records: Vec<RecordType>) -> SnapshotIndex {
        SnapshotIndex::new(Snapshot {
            content_types: records,
            editor_interfaces: vec![],
        })
        .unwrap()
    }

    #[test]
    fn test_plan_identical_snapshots_is_empty() {
        let post = RecordType::new("post", "Post").with_field(Field::new("title", FieldType::Symbol));
        let before = index(vec![post.clone()]);
        let after = index(vec![post]);
        assert!(plan(&before, &after).unwrap().is_empty());
    }

    #[test]
    fn test_plan_orders_creations_before_deletions() {
        let before = index(vec![RecordType::new("author", "Author")]);
        let after = index(vec![RecordType::new("tag", "Tag")]);
        let blocks = plan(&before, &after).unwrap();
        let order: Vec<_> = blocks.iter().map(|b| b.record.as_str()).collect();
        assert_eq!(order, vec!["tag", "author"]);
    }

    #[test]
    fn test_summary_statuses() {
        let summary = RunSummary::from_outcomes(vec![
            RecordOutcome {
                record: "post".to_string(),
                result: Ok(WriteReport { operations: 3 }),
            },
            RecordOutcome {
                record: "tag".to_string(),
                result: Ok(WriteReport { operations: 0 }),
            },
            RecordOutcome {
                record: "author".to_string(),
                result: Err(RunError::Sink(SinkError::Closed)),
            },
        ]);
        assert_eq!(summary.get("post").unwrap().status, RecordStatus::Written);
        assert_eq!(summary.get("tag").unwrap().status, RecordStatus::Unchanged);
        assert_eq!(summary.get("author").unwrap().status, RecordStatus::Failed);
        assert!(!summary.succeeded());
        // Sink failures are not fatal.
        assert!(summary.into_result().is_ok());
    }

    #[test]
    fn test_render_failure_is_fatal() {
        let err = RunError::Render(RenderError::Unsupported {
            kind: "change-field",
            record: "post".to_string(),
            reason: "empty patch".into(),
        });
        let summary = RunSummary::from_outcomes(vec![RecordOutcome {
            record: "post".to_string(),
            result: Err(err),
        }]);
        assert!(matches!(summary.into_result(), Err(RunError::Render(_))));
    }

    #[test]
    fn test_summary_json_shape() {
        let summary = RunSummary::from_outcomes(vec![RecordOutcome {
            record: "post".to_string(),
            result: Ok(WriteReport { operations: 1 }),
        }]);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["records"][0]["status"], "written");
        assert!(json["records"][0].get("error").is_none());
        assert!(json.get("fatal").is_none());
        assert!(json.get("close_error").is_none());
    }

    #[test]
    fn test_close_error_fails_the_summary() {
        let mut summary = RunSummary::from_outcomes(vec![RecordOutcome {
            record: "post".to_string(),
            result: Ok(WriteReport { operations: 1 }),
        }]);
        summary.close_error = Some(SinkError::Closed);
        assert!(!summary.succeeded());
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["close_error"], "sink is closed");
    }
}
