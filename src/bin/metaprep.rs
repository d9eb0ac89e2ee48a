use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use metaprep::app::App;
use metaprep::config::ConfigLoader;
use metaprep::dispatch::JellyfishRunner;
use metaprep::error::MetaprepError;
use metaprep::output::JsonOutput;
use metaprep::tools::{DatasetsClient, SystemDatasetsClient, ToolStatus};

#[derive(Parser)]
#[command(name = "metaprep")]
#[command(about = "Curate bacterial reference genomes from NCBI and count k-mers in parallel")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Refresh the cached genome summary table")]
    Refresh(RefreshArgs),
    #[command(about = "Filter and select one genome per species")]
    Curate(RefreshArgs),
    #[command(about = "Download and stage the selected genomes")]
    Download(RefreshArgs),
    #[command(about = "Count k-mers over the staged genome files")]
    Count(CountArgs),
    #[command(about = "Run the whole pipeline (curate, download, count)")]
    Run(RunArgs),
    #[command(about = "Report external tool availability and versions")]
    Tools,
}

#[derive(Args, Clone)]
struct RefreshArgs {
    #[arg(long)]
    force: bool,
}

#[derive(Args, Clone)]
struct CountArgs {
    #[arg(long)]
    genome: Vec<String>,

    #[arg(long)]
    workers: Option<usize>,
}

#[derive(Args, Clone)]
struct RunArgs {
    #[arg(long)]
    force: bool,

    #[arg(long)]
    workers: Option<usize>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<MetaprepError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &MetaprepError) -> u8 {
    match error {
        MetaprepError::MissingConfig
        | MetaprepError::ConfigRead(_)
        | MetaprepError::ConfigParse(_)
        | MetaprepError::FileNotFound(_) => 2,
        MetaprepError::MissingTool(_) | MetaprepError::ToolFailure { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Tools = cli.command {
        let datasets = SystemDatasetsClient::new(None);
        if let ToolStatus::Missing { message } = datasets.tool_status() {
            eprintln!("{message}");
        }
        return JsonOutput::print(&datasets.tool_info()).into_diagnostic();
    }

    let config = ConfigLoader::resolve(cli.config.as_deref()).into_diagnostic()?;
    let datasets = SystemDatasetsClient::new(config.api_key.clone());
    let app = App::new(config, datasets);

    match cli.command {
        Commands::Refresh(args) => {
            let result = app.refresh(args.force).into_diagnostic()?;
            JsonOutput::print(&result).into_diagnostic()
        }
        Commands::Curate(args) => {
            let result = app.curate(args.force).into_diagnostic()?;
            JsonOutput::print(&result).into_diagnostic()
        }
        Commands::Download(args) => {
            let result = app.download(args.force).into_diagnostic()?;
            JsonOutput::print(&result).into_diagnostic()
        }
        Commands::Count(args) => {
            let runner = JellyfishRunner::new().into_diagnostic()?;
            let genomes = if args.genome.is_empty() {
                None
            } else {
                Some(args.genome)
            };
            let result = app.count(&runner, genomes, args.workers).into_diagnostic()?;
            JsonOutput::print(&result).into_diagnostic()
        }
        Commands::Run(args) => {
            let runner = JellyfishRunner::new().into_diagnostic()?;
            let result = app
                .run(&runner, args.force, args.workers)
                .into_diagnostic()?;
            JsonOutput::print(&result).into_diagnostic()
        }
        Commands::Tools => Ok(()),
    }
}
