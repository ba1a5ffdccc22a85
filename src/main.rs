use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    // Commands set up tracing themselves once the configured log level is known
    match args.get_command() {
        cli::Commands::Start => {
            commands::start::execute(&args.config).await?;
        }
        cli::Commands::Test => {
            commands::test::execute(&args.config)?;
        }
        cli::Commands::Config { action } => match action {
            cli::ConfigCommands::Show => commands::config::show(&args.config)?,
        },
        cli::Commands::Price {
            provider,
            region,
            instance_type,
            zones,
        } => {
            commands::price::execute(&args.config, &provider, &region, &instance_type, &zones).await?;
        }
        cli::Commands::Version => {
            println!("Product Info v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
