use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::checker::Snapshot;
use crate::cli::IndexArgs;
use crate::config::{Config, PublishedPackage, SourceOverride};
use crate::driver::Driver;
use crate::emit::create_emitter;
use crate::error::{Result, WaypostError};
use crate::report::{FileReporter, NullReporter, Reporter, StreamReporter};

pub fn run(args: IndexArgs) -> Result<()> {
    let config = build_config(&args)?;
    let snapshot = Snapshot::load(&args.snapshot)?;

    let sink: Box<dyn Write> = match &args.out {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(std::io::stdout()),
    };
    let emitter = create_emitter(config.output_format, sink);

    let reporter: Box<dyn Reporter> = if args.quiet {
        Box::new(NullReporter)
    } else if let Some(path) = &args.reporter_file {
        Box::new(FileReporter::create(path)?)
    } else {
        Box::new(StreamReporter::stderr())
    };

    Driver::new(&snapshot, &config, reporter)
        .with_tool_args(std::env::args().skip(1).collect())
        .run(emitter)
}

fn build_config(args: &IndexArgs) -> Result<Config> {
    let workspace_root = match &args.workspace_root {
        Some(root) => root.clone(),
        None => args
            .snapshot
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    let published_packages = args
        .published_packages
        .iter()
        .map(|binding| {
            binding
                .split_once('=')
                .map(|(project, manifest)| PublishedPackage {
                    project: project.to_string(),
                    manifest: PathBuf::from(manifest),
                })
                .ok_or_else(|| {
                    WaypostError::Configuration(format!(
                        "published package binding must be PROJECT=MANIFEST: `{binding}`"
                    ))
                })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Config {
        workspace_root,
        project_name: args.project_name.clone(),
        no_contents: args.no_contents,
        no_project_references: args.no_project_references,
        moniker: args.moniker,
        id: args.id,
        output_format: args.format,
        package: args.package.clone(),
        published_packages,
        source: args.repository_url.as_ref().map(|url| SourceOverride {
            kind: "git".to_string(),
            url: url.clone(),
            commit_id: None,
            branch: None,
        }),
        probe_repository: args.probe_repository,
    })
}
