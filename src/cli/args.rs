//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

use tola_resources::config::Config;

/// Serve versioned resource sets over HTTP
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Print debug output (cache evictions, content failures, requests)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (default: resources.toml)
    #[arg(short = 'C', long, default_value = "resources.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Serve the configured resource set
    #[command(visible_alias = "s")]
    Serve {
        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Path prefix every resource is served under
        #[arg(long)]
        context_path: Option<String>,
    },

    /// Print the configured resource set in its JSON wire format
    Serialize {
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
}

impl Cli {
    /// Apply command-specific options on top of the loaded config.
    pub fn apply_to(&self, config: &mut Config) {
        if let Commands::Serve {
            interface,
            port,
            context_path,
        } = &self.command
        {
            update_option(&mut config.serve.interface, interface.as_ref());
            update_option(&mut config.serve.port, port.as_ref());
            update_option(&mut config.serve.context_path, context_path.as_ref());
        }
    }
}

/// Update config option if CLI value is provided.
fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
    if let Some(option) = cli_option {
        *config_option = option.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_overrides() {
        let cli = Cli::parse_from([
            "tola-resources",
            "serve",
            "--port",
            "9000",
            "--context-path",
            "/app",
        ]);
        let mut config = Config::default();
        cli.apply_to(&mut config);
        assert_eq!(config.serve.port, 9000);
        assert_eq!(config.serve.context_path, "/app");
        assert_eq!(config.serve.interface.to_string(), "127.0.0.1");
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["tola-resources", "-C", "x.toml", "serialize", "--verbose"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("x.toml"));
        assert!(matches!(cli.command, Commands::Serialize { pretty: false }));
    }
}
