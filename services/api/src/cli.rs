use crate::demo::{run_catalog_check, run_demo, CatalogCheckArgs, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use doc_intake::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Document Intake",
    about = "Run the document intake service or walk through it from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Run a scripted client and staff walkthrough against the in-memory store
    Demo(DemoArgs),
    /// Inspect service catalog exports
    Catalog {
        #[command(subcommand)]
        command: CatalogCommand,
    },
}

#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// Validate a catalog CSV export and summarize its services and slots
    Check(CatalogCheckArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args),
        Command::Catalog {
            command: CatalogCommand::Check(args),
        } => run_catalog_check(args),
    }
}
