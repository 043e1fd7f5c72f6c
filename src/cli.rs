use clap::{Parser, Subcommand};

/// Warehouse 231 / Contents Manager backend
#[derive(Parser, Clone)]
#[command(name = "warehouse231_backend")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Contents Manager server with inventory, spaces and sales dashboard")]
#[command(long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, default_value = ".env")]
    pub config: String,

    /// Database connection string override
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Server port override
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Server host override
    #[arg(long)]
    pub host: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Start the web server (default action)
    Serve,
    /// Database management commands
    Db {
        #[command(subcommand)]
        action: DbCommands,
    },
}

#[derive(Subcommand, Clone)]
pub enum DbCommands {
    /// Test database connection
    Test,
    /// Create the inventory/spaces tables if they do not exist
    Init,
    /// Truncate and reload inventory_items from a CSV file
    Import {
        /// CSV file path (defaults to the configured import path)
        #[arg(short, long)]
        input: Option<String>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn is_server_mode(&self) -> bool {
        matches!(self.command, None | Some(Commands::Serve))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["warehouse231_backend"]);
        assert!(!cli.verbose);
        assert_eq!(cli.config, ".env");
        assert!(cli.host.is_none());
        assert!(cli.is_server_mode());
    }

    #[test]
    fn test_db_test_command() {
        let cli = Cli::parse_from(["warehouse231_backend", "db", "test"]);
        assert!(!cli.is_server_mode());
        match cli.command {
            Some(Commands::Db {
                action: DbCommands::Test,
            }) => {}
            _ => panic!("Expected db test command"),
        }
    }

    #[test]
    fn test_db_import_command() {
        let cli = Cli::parse_from(["warehouse231_backend", "db", "import", "--input", "items.csv"]);
        match cli.command {
            Some(Commands::Db {
                action: DbCommands::Import { input },
            }) => {
                assert_eq!(input.as_deref(), Some("items.csv"));
            }
            _ => panic!("Expected db import command"),
        }
    }
}
