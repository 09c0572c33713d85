//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

/// Skafolio - digital business card service
#[derive(Parser)]
#[command(name = "skafolio")]
#[command(version)]
#[command(about = "Digital business cards with analytics and NFC card orders", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Print a sample config.toml, or write it to a file
    GenerateConfig {
        /// Output file path (default: stdout)
        output: Option<String>,
    },
}

impl Cli {
    /// 未指定子命令时默认启动服务器
    pub fn command_or_default(self) -> Commands {
        self.command.unwrap_or(Commands::Serve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_serve() {
        let cli = Cli::parse_from(["skafolio"]);
        assert_eq!(cli.command_or_default(), Commands::Serve);
    }

    #[test]
    fn test_generate_config_with_output() {
        let cli = Cli::parse_from(["skafolio", "generate-config", "out.toml"]);
        assert_eq!(
            cli.command_or_default(),
            Commands::GenerateConfig {
                output: Some("out.toml".into())
            }
        );
    }
}
