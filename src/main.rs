use std::{io::Write, process::ExitCode};

use clap::{Parser, Subcommand};
use env_logger::{Builder, Target};
use indicatif::ProgressBar;
use log::{error, info, LevelFilter};

use asperity::{
    error::AsperityError,
    export_zip, lookup,
    provenance::VersionHeader,
    run_analysis,
    solver::ElasticFoundation,
    storage::{ArtifactStore, FsStore},
    topography, AnalysisResult, ContactParams, ExportItem, Subject,
};

const WORKFLOW: &str = "contact-mechanics";

#[derive(Parser)]
#[command(name = "asperity", version, about = "Contact mechanics of rough surfaces")]
struct Cli {
    /// Log level (error, warn, info, debug, trace). Falls back to RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Runs a contact-mechanics analysis on a height map
    Run {
        /// JSON parameter file
        params: String,
        /// Height map csv, one grid row per line
        heights: String,
        /// Directory the results are stored in
        #[arg(long)]
        store: String,
        /// Name of the topography; defaults to the csv file stem
        #[arg(long)]
        name: Option<String>,
        /// Physical sizes of the map
        #[arg(long, num_args = 2, value_names = ["SX", "SY"])]
        size: Option<Vec<f64>>,
        /// The topography tiles at its edges
        #[arg(long)]
        periodic: bool,
    },
    /// Bundles stored results into a zip archive
    Export {
        /// Directory the results are stored in
        #[arg(long)]
        store: String,
        /// Path of the archive to write
        #[arg(long, default_value = "contact_mechanics.zip")]
        output: String,
        /// Result folders inside the store
        #[arg(required = true)]
        folders: Vec<String>,
    },
}

fn init_logging(level: Option<&str>) {
    let log_level = level
        .and_then(|l| l.parse::<LevelFilter>().ok())
        .or_else(|| {
            std::env::var("RUST_LOG")
                .ok()
                .and_then(|v| v.parse::<LevelFilter>().ok())
        })
        .unwrap_or(LevelFilter::Info);

    Builder::new()
        .filter_level(log_level)
        .target(Target::Stderr)
        .format(|buf, record| {
            writeln!(
                buf,
                "{}: {}",
                record.level().as_str().to_lowercase(),
                record.args()
            )
        })
        .init();
}

fn run(
    params_file: &str,
    heights_file: &str,
    store_dir: &str,
    name: Option<String>,
    size: Option<Vec<f64>>,
    periodic: bool,
) -> Result<(), AsperityError> {
    let params = ContactParams::load(params_file)?;

    let name = name.unwrap_or_else(|| {
        std::path::Path::new(heights_file)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "topography".to_owned())
    });
    let physical_sizes = size.map(|s| (s[0], s[1]));
    let topo = topography::load_csv(&name, heights_file, physical_sizes, periodic)?;

    let workflow = lookup(WORKFLOW)
        .ok_or_else(|| AsperityError::Input(format!("Unknown workflow {WORKFLOW}")))?;
    let store = FsStore::new(store_dir);
    let bar = ProgressBar::new(0);

    let result = run_analysis(workflow, &topo, &params, &ElasticFoundation, &store, &name, &bar)?;
    bar.finish_and_clear();

    for alert in &result.alerts {
        log::warn!("{}", alert.message);
    }
    info!("stored {} steps in {store_dir}/{name}", result.steps.len());

    Ok(())
}

fn export(store_dir: &str, output: &str, folders: &[String]) -> Result<(), AsperityError> {
    let store = FsStore::new(store_dir);

    let mut loaded: Vec<(Subject, AnalysisResult)> = Vec::with_capacity(folders.len());
    for (i, folder) in folders.iter().enumerate() {
        let bytes = store.read(&format!("{folder}/result.json"))?;
        let subject = Subject {
            id: i as u64 + 1,
            name: folder.rsplit('/').next().unwrap_or(folder).to_owned(),
        };
        loaded.push((subject, AnalysisResult::from_json(&bytes)?));
    }

    let items: Vec<ExportItem> = loaded
        .iter()
        .zip(folders)
        .map(|((subject, result), folder)| ExportItem {
            subject,
            result,
            folder: folder.as_str(),
        })
        .collect();

    let archive = export_zip(&items, &store, &VersionHeader)?;
    std::fs::write(output, &archive.bytes)
        .map_err(|err| AsperityError::Archive(format!("Failed to write {output}: {err}")))?;
    info!("wrote {output}");

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let outcome = match cli.command {
        Command::Run {
            params,
            heights,
            store,
            name,
            size,
            periodic,
        } => run(&params, &heights, &store, name, size, periodic),
        Command::Export {
            store,
            output,
            folders,
        } => export(&store, &output, &folders),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
