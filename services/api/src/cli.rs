use crate::demo::{run_analysis_report, run_demo, AnalysisArgs, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use rental_intel::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Rental Market Intelligence",
    about = "Run the rental market intelligence service or explore its analysis from the command line",
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
    /// Print a market analysis for an area using the configured market source
    Analysis(AnalysisArgs),
    /// Walk through contributions, analysis, yields, and recommendations on fixture data
    Demo(DemoArgs),
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
        Command::Analysis(args) => run_analysis_report(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}
