//! CLI argument definitions for PromptFlow.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// PromptFlow -- turn plain-language requests into n8n workflows.
#[derive(Parser)]
#[command(
    name = "promptflow",
    version,
    about = "PromptFlow -- plain-language to n8n workflow generator",
    long_about = "Generates importable n8n workflows from natural-language automation \
                  requests, using a hosted model when an API key is configured and a \
                  deterministic rule engine otherwise."
)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true, default_value = "config/default.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server.
    Serve {
        /// Address to bind the HTTP server to (overrides the config file).
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on (overrides the config file).
        #[arg(long, short)]
        port: Option<u16>,

        /// Keep users and workflows in memory instead of on disk.
        #[arg(long)]
        in_memory: bool,
    },

    /// Generate a workflow and print it as JSON.
    Generate {
        /// The automation request.
        prompt: String,

        /// Ask for credential setup in the generated workflow.
        #[arg(long)]
        include_auth: bool,

        /// Ask for error handling nodes in the generated workflow.
        #[arg(long)]
        include_error_handling: bool,

        /// Enhance the prompt before remote generation.
        #[arg(long)]
        enhance: bool,

        /// Skip the remote model even when one is configured.
        #[arg(long)]
        local: bool,

        /// Print the full generation result instead of only the importable
        /// workflow.
        #[arg(long)]
        full: bool,

        /// Write the JSON to a file instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Rewrite a prompt into a more detailed automation request.
    Enhance {
        /// The prompt to enhance.
        prompt: String,
    },

    /// Browse the service catalog.
    Services {
        #[command(subcommand)]
        action: ServiceAction,
    },

    /// Show configuration, database and remote model availability.
    Status,
}

/// Actions for browsing the service catalog.
#[derive(Subcommand)]
pub enum ServiceAction {
    /// List all categories.
    Categories,
    /// List services, optionally limited to one category.
    List {
        #[arg(long, short)]
        category: Option<String>,
    },
    /// List quick-setup popular services.
    Popular {
        #[arg(long, short, default_value_t = promptflow_catalog::DEFAULT_POPULAR_LIMIT)]
        limit: usize,
    },
    /// Search names, descriptions and use cases.
    Search {
        query: String,
    },
    /// Show one service in detail.
    Show {
        /// Service name (case-insensitive).
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_generate_flags() {
        let cli = Cli::try_parse_from([
            "promptflow",
            "generate",
            "Send a Slack message every morning",
            "--include-auth",
            "--local",
            "--full",
            "-o",
            "out.json",
        ])
        .unwrap();
        match cli.command {
            Commands::Generate {
                prompt,
                include_auth,
                include_error_handling,
                enhance,
                local,
                full,
                output,
            } => {
                assert_eq!(prompt, "Send a Slack message every morning");
                assert!(include_auth && local && full);
                assert!(!include_error_handling && !enhance);
                assert_eq!(output, Some(PathBuf::from("out.json")));
            }
            _ => panic!("expected generate"),
        }
        assert_eq!(cli.config, PathBuf::from("config/default.toml"));
    }

    #[test]
    fn parses_services_popular_default_limit() {
        let cli = Cli::try_parse_from(["promptflow", "services", "popular"]).unwrap();
        match cli.command {
            Commands::Services {
                action: ServiceAction::Popular { limit },
            } => assert_eq!(limit, 10),
            _ => panic!("expected services popular"),
        }
    }

    #[test]
    fn global_config_flag() {
        let cli =
            Cli::try_parse_from(["promptflow", "status", "--config", "/etc/promptflow.toml"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/promptflow.toml"));
        assert!(matches!(cli.command, Commands::Status));
    }
}
