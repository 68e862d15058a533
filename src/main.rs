use clap::Parser;

use hyperdash::adapter::inbound::cli::command::{CheckCommand, Cli, Commands, ShowCommand};
use hyperdash::adapter::inbound::cli::{check, output, run, show};
use hyperdash::error::Result;

async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run(args) => run::execute(&args).await,
        Commands::Check(CheckCommand::Config(args)) => {
            check::execute_config(args.config.as_deref())
        }
        Commands::Show(ShowCommand::Config(args)) => show::execute_config(args.config.as_deref()),
        Commands::Show(ShowCommand::Plan(args)) => {
            show::execute_plan(&args.operation, args.config.config.as_deref())
        }
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    output::configure(output::OutputConfig::new(cli.json, cli.quiet));

    let code = match dispatch(cli).await {
        Ok(()) => 0,
        Err(e) => {
            output::error(&e.to_string());
            1
        }
    };

    // Stdin is read on a blocking thread that runtime shutdown would wait on.
    std::process::exit(code);
}
