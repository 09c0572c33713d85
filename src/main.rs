use clap::Parser;
use colored::Colorize;

use skafolio::cli::{Cli, Commands};
use skafolio::config::{StaticConfig, get_config, init_config};
use skafolio::errors::SkafolioError;
use skafolio::runtime::modes::run_server;
use skafolio::system::logging::init_logging;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command_or_default() {
        Commands::GenerateConfig { output } => {
            match output {
                Some(path) => {
                    StaticConfig::default()
                        .save_to_file(&path)
                        .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", path, e))?;
                    println!("{} Sample configuration written to {}", "✓".green(), path);
                }
                None => println!("{}", StaticConfig::generate_sample_config()),
            }
            Ok(())
        }
        Commands::Serve => {
            init_config();
            let config = get_config();
            // guard 需要存活到进程退出，否则缓冲的日志会丢失
            let _guard = init_logging(&config.logging)?;

            if let Err(e) = run_server().await {
                match e.downcast_ref::<SkafolioError>() {
                    Some(inner) => eprintln!("{}", inner.format_colored()),
                    None => eprintln!("{} {:#}", "[ERROR]".red().bold(), e),
                }
                return Err(e);
            }
            Ok(())
        }
    }
}
