pub mod generate;
pub mod plan;

use anyhow::{Context, Result};
use clap::Args;
use schemadiff::SnapshotIndex;
use std::path::{Path, PathBuf};

use crate::config::SchemadiffConfig;
use crate::output::OutputManager;

/// Arguments shared by every command that compares two snapshots
#[derive(Args, Debug, Clone)]
pub struct SnapshotArgs {
    /// Snapshot export describing the current content model
    pub from: PathBuf,

    /// Snapshot export describing the desired content model
    pub to: PathBuf,

    /// Only diff this content type (repeatable; overrides [filter] in the config)
    #[arg(long = "content-type", value_name = "ID")]
    pub content_types: Vec<String>,
}

/// Both sides of a comparison, indexed and filtered
pub struct SnapshotPair {
    pub before: SnapshotIndex,
    pub after: SnapshotIndex,
}

impl SnapshotArgs {
    pub async fn load(&self, config: &SchemadiffConfig, output: &OutputManager) -> Result<SnapshotPair> {
        output.progress("Loading snapshots");
        let mut before = load_index(&self.from).await?;
        let mut after = load_index(&self.to).await?;
        output.clear_line();

        let filter = if self.content_types.is_empty() {
            &config.filter.content_types
        } else {
            &self.content_types
        };
        if !filter.is_empty() {
            output.verbose(&format!("Restricting to content types: {}", filter.join(", ")));
            before.retain(filter);
            after.retain(filter);
        }

        output.success(&format!(
            "Loaded {} source and {} target content type(s)",
            before.len(),
            after.len()
        ));
        Ok(SnapshotPair { before, after })
    }
}

async fn load_index(path: &Path) -> Result<SnapshotIndex> {
    let snapshot = schemadiff::load_snapshot(path).await?;
    SnapshotIndex::new(snapshot).with_context(|| format!("Invalid snapshot {}", path.display()))
}
