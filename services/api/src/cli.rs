use crate::demo::{run_demo, run_estimate, DemoArgs, EstimateArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use quote_funnel::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Quote Funnel",
    about = "Run the portfolio mail relay and explore the project calculator from the command line",
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
    /// Print the price estimate for a JSON answers file
    Estimate(EstimateArgs),
    /// Walk a sample lead through the funnel, optionally submitting it
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
        Command::Estimate(args) => run_estimate(args),
        Command::Demo(args) => run_demo(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["quote-funnel-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn estimate_requires_an_answers_file() {
        assert!(Cli::try_parse_from(["quote-funnel-api", "estimate"]).is_err());
        let cli = Cli::try_parse_from(["quote-funnel-api", "estimate", "--answers", "a.json"])
            .expect("parses");
        assert!(matches!(cli.command, Some(Command::Estimate(_))));
    }

    #[test]
    fn demo_accepts_submit_flag() {
        let cli =
            Cli::try_parse_from(["quote-funnel-api", "demo", "--submit"]).expect("parses");
        match cli.command {
            Some(Command::Demo(args)) => assert!(args.submit),
            other => panic!("expected demo, got {other:?}"),
        }
    }
}
