use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, ValueEnum};
use schemadiff::{
    BufferedSink, DirectorySinkFactory, Flavor, Framing, MigrationScriptRenderer, PerRecordRunner,
    RecordStatus, Renderer, RunSummary, SingleSinkRunner, generate,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{SnapshotArgs, SnapshotPair};
use crate::config::SchemadiffConfig;
use crate::examples::ExampleGroup;
use crate::output::{GlobalOptions, OutputManager};
use crate::theme::ICONS;

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "One file per content type",
        commands: &[
            "schemadiff generate live.json staging.json                 # Write into ./migrations",
            "schemadiff generate live.json staging.json --out scripts   # Choose the directory",
        ],
    },
    ExampleGroup {
        title: "Single file",
        commands: &[
            "schemadiff generate live.json staging.json --one-file --out migrate.js",
            "schemadiff generate live.json staging.json --one-file --out - --extension ts",
        ],
    },
    ExampleGroup {
        title: "Filtering",
        commands: &["schemadiff generate live.json staging.json --content-type post --content-type author"],
    },
];

/// Script language, selectable on the command line
#[derive(Clone, Copy, Debug, ValueEnum, PartialEq)]
pub enum Extension {
    Js,
    Ts,
}

impl From<Extension> for Flavor {
    fn from(extension: Extension) -> Self {
        match extension {
            Extension::Js => Flavor::Js,
            Extension::Ts => Flavor::Ts,
        }
    }
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub snapshots: SnapshotArgs,

    /// Output directory, or output file with --one-file ('-' for stdout)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Write every content type into a single file
    #[arg(long)]
    pub one_file: bool,

    /// Script language of the generated migrations
    #[arg(long, value_enum)]
    pub extension: Option<Extension>,
}

/// Where the generated script goes
#[derive(Debug, Clone, PartialEq)]
pub enum Destination {
    Stdout,
    File(PathBuf),
    Directory(PathBuf),
}

impl Destination {
    /// Merge command line flags over the configuration file.
    pub fn resolve(args: &GenerateArgs, config: &SchemadiffConfig, flavor: Flavor, prefix: &str) -> Self {
        let out = args
            .out
            .clone()
            .unwrap_or_else(|| PathBuf::from(&config.output.dir));

        if !(args.one_file || config.output.one_file) {
            return Destination::Directory(out);
        }
        if out == Path::new("-") {
            return Destination::Stdout;
        }
        if out.is_dir() || out.extension().is_none() {
            return Destination::File(out.join(format!("{prefix}-migration.{}", flavor.extension())));
        }
        Destination::File(out)
    }
}

pub async fn handle_generate(args: GenerateArgs, config: &SchemadiffConfig, output: &OutputManager) -> Result<()> {
    let flavor = args.extension.map(Flavor::from).unwrap_or(config.output.extension);
    let prefix = Utc::now().format("%Y%m%d_%H%M%S").to_string();
    let destination = Destination::resolve(&args, config, flavor, &prefix);

    // The script owns stdout; only errors remain visible.
    let script_on_stdout;
    let output = if destination == Destination::Stdout {
        script_on_stdout = OutputManager::new(GlobalOptions {
            quiet: true,
            ..output.options.clone()
        });
        &script_on_stdout
    } else {
        output
    };

    output.heading("Generate Migrations");
    let SnapshotPair { before, after } = args.snapshots.load(config, output).await?;
    let framing = Framing::for_flavor(
        flavor,
        &args.snapshots.from.display().to_string(),
        &args.snapshots.to.display().to_string(),
    );
    let renderer: Arc<dyn Renderer> = Arc::new(MigrationScriptRenderer);

    let summary = match &destination {
        Destination::Stdout => {
            let sink = BufferedSink::new(tokio::io::stdout());
            let mut runner = SingleSinkRunner::new(sink, framing, renderer);
            generate(&mut runner, &before, &after).await
        }
        Destination::File(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let file = tokio::fs::File::create(path)
                .await
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut runner = SingleSinkRunner::new(BufferedSink::new(file), framing, renderer);
            generate(&mut runner, &before, &after).await
        }
        Destination::Directory(dir) => {
            let factory = DirectorySinkFactory::new(dir, prefix.as_str(), flavor.extension());
            let mut runner = PerRecordRunner::new(factory, framing, renderer);
            generate(&mut runner, &before, &after).await
        }
    }
    .context("Failed to open migration output")?;

    report(&summary, &destination, &prefix, flavor, output)?;

    if let Some(err) = summary.close_error() {
        anyhow::bail!("Failed to finish migration output: {err}");
    }
    let summary = summary.into_result().context("Migration generation aborted")?;
    let failed = summary.count(RecordStatus::Failed);
    if failed > 0 {
        anyhow::bail!("{failed} content type(s) failed");
    }
    Ok(())
}

fn report(
    summary: &RunSummary,
    destination: &Destination,
    prefix: &str,
    flavor: Flavor,
    output: &OutputManager,
) -> Result<()> {
    output.display(summary)?;

    for failure in summary.failed() {
        output.error(&format!(
            "{}: {}",
            failure.record,
            failure.error.as_deref().unwrap_or("unknown error")
        ));
    }
    if let Some(err) = summary.close_error() {
        output.error(&format!("closing output: {err}"));
    }

    let written = summary.count(RecordStatus::Written);
    if written == 0 {
        output.info("No changes detected between the snapshots");
        return Ok(());
    }

    match destination {
        Destination::Stdout => {}
        Destination::File(path) => {
            output.success(&format!("Wrote {written} content type(s) to {}", path.display()));
        }
        Destination::Directory(dir) => {
            let factory = DirectorySinkFactory::new(dir, prefix, flavor.extension());
            output.success(&format!("Wrote {written} migration file(s)"));
            for record in summary.records.iter().filter(|r| r.status == RecordStatus::Written) {
                output.indented(ICONS.file, &factory.path_for(&record.record).display().to_string());
            }
        }
    }
    Ok(())
}
