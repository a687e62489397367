use crate::enroll::{run_enroll, EnrollArgs};
use crate::requirements::{run_steps, StepsArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use enrollment::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Enrollment Wizard",
    about = "Serve the enrollment endpoints or walk an applicant through the eight-step wizard",
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
    /// Show what each step requires for a set of answers, and what is still missing
    Steps(StepsArgs),
    /// Drive the wizard end to end against a running backend
    Enroll(EnrollArgs),
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
        Command::Steps(args) => run_steps(args),
        Command::Enroll(args) => run_enroll(args).await,
    }
}
