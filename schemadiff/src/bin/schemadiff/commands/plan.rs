use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, Table};
use schemadiff::{MigrationOperation, MigrationScriptRenderer, OperationBlock, Renderer, plan};
use serde::Serialize;

use super::{SnapshotArgs, SnapshotPair};
use crate::config::SchemadiffConfig;
use crate::examples::ExampleGroup;
use crate::output::{GlobalOptions, OutputManager, TableDisplay, themed_table};
use crate::theme::ICONS;

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Preview",
        commands: &[
            "schemadiff plan live.json staging.json                    # Operations per content type",
            "schemadiff plan live.json staging.json --script           # Include rendered statements",
            "schemadiff --output json plan live.json staging.json      # Machine-readable plan",
        ],
    },
];

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub snapshots: SnapshotArgs,

    /// Show the statement each operation renders to
    #[arg(long)]
    pub script: bool,
}

/// Operations in emission order, without writing anything
#[derive(Debug, Serialize)]
pub struct PlanView {
    pub operations: Vec<PlannedOperation>,
}

#[derive(Debug, Serialize)]
pub struct PlannedOperation {
    pub record: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
}

impl PlanView {
    pub fn build(blocks: &[OperationBlock], renderer: Option<&dyn Renderer>) -> Result<Self> {
        let mut operations = Vec::new();
        for op in blocks.iter().flat_map(|block| block.iter()) {
            let statement = match renderer {
                Some(renderer) => Some(
                    renderer
                        .render(op)
                        .with_context(|| format!("Failed to render {op}"))?
                        .trim()
                        .to_string(),
                ),
                None => None,
            };
            operations.push(PlannedOperation {
                record: op.record_id().to_string(),
                kind: op.kind(),
                field: op.field_id().map(str::to_string),
                statement,
            });
        }
        Ok(Self { operations })
    }
}

fn kind_icon(kind: &str) -> &'static str {
    if kind.starts_with("create") || kind.starts_with("set") {
        ICONS.plus
    } else if kind.starts_with("delete") || kind.starts_with("clear") {
        ICONS.minus
    } else {
        ICONS.changed
    }
}

impl TableDisplay for PlanView {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let with_script = self.operations.iter().any(|op| op.statement.is_some());
        let mut headers = vec!["#", "Content type", "Operation", "Field"];
        if with_script {
            headers.push("Statement");
        }
        let mut table = themed_table(options, &headers);
        for (i, op) in self.operations.iter().enumerate() {
            let mut row = vec![
                Cell::new(i + 1),
                Cell::new(&op.record),
                Cell::new(format!("{} {}", kind_icon(op.kind), op.kind)),
                Cell::new(op.field.as_deref().unwrap_or("")),
            ];
            if with_script {
                row.push(Cell::new(op.statement.as_deref().unwrap_or("")));
            }
            table.add_row(row);
        }
        table
    }

    fn to_compact(&self) -> String {
        self.operations
            .iter()
            .map(|op| match &op.field {
                Some(field) => format!("{} {}.{field}", op.kind, op.record),
                None => format!("{} {}", op.kind, op.record),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub async fn handle_plan(args: PlanArgs, config: &SchemadiffConfig, output: &OutputManager) -> Result<()> {
    output.heading("Migration Plan");

    let SnapshotPair { before, after } = args.snapshots.load(config, output).await?;
    let blocks = plan(&before, &after).context("Failed to diff snapshots")?;

    if blocks.is_empty() {
        output.info("No changes detected between the snapshots");
        return Ok(());
    }

    let renderer = MigrationScriptRenderer;
    let view = PlanView::build(&blocks, args.script.then_some(&renderer as &dyn Renderer))?;
    output.display(&view)?;

    let deletions = blocks
        .iter()
        .flat_map(|block| block.iter())
        .filter(|op| matches!(op, MigrationOperation::DeleteRecordType { .. }))
        .count();
    if deletions > 0 {
        output.warning(&format!("{deletions} content type(s) will be deleted"));
    }
    output.success(&format!(
        "{} operation(s) across {} content type(s)",
        view.operations.len(),
        blocks.len()
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block() -> OperationBlock {
        let mut block = OperationBlock::new("post");
        block.push(MigrationOperation::DeleteField {
            record: "post".to_string(),
            field: "legacy".to_string(),
        });
        block.push(MigrationOperation::DeleteRecordType {
            record: "post".to_string(),
        });
        block
    }

    #[test]
    fn test_plan_view_without_script() {
        let view = PlanView::build(&[block()], None).unwrap();
        assert_eq!(view.operations.len(), 2);
        assert_eq!(view.operations[0].field.as_deref(), Some("legacy"));
        assert!(view.operations[1].field.is_none());
        assert!(view.operations.iter().all(|op| op.statement.is_none()));
    }

    #[test]
    fn test_plan_view_with_script() {
        let renderer = MigrationScriptRenderer;
        let view = PlanView::build(&[block()], Some(&renderer)).unwrap();
        let statement = view.operations[1].statement.as_deref().unwrap();
        assert!(statement.contains("deleteContentType"));
    }

    #[test]
    fn test_compact_lists_one_operation_per_line() {
        let view = PlanView::build(&[block()], None).unwrap();
        assert_eq!(view.to_compact(), "delete-field post.legacy\ndelete-content-type post");
    }
}
