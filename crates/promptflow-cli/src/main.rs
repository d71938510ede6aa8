//! CLI entry point for PromptFlow.
//!
//! This binary provides the `promptflow` command with subcommands for
//! running the HTTP API, generating and enhancing from the terminal,
//! browsing the service catalog, and checking configuration.

mod cli;
mod config;
mod helpers;

use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Parser;
use promptflow_agent::SynthesisSource;
use promptflow_catalog::ServiceCatalog;
use promptflow_intent::SynthesisRequest;
use promptflow_store::{Database, UserStore};
use promptflow_web::{AppState, TokenSigner, WebServer, auth::TOKEN_SECRET_ENV};
use tracing::info;

use cli::{Cli, Commands, ServiceAction};
use config::AppConfig;
use helpers::{build_orchestrator, init_tracing, load_catalog, open_storage, remote_settings};

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; the real environment still applies.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Long-running server logs at info; one-shot commands stay quiet.
    init_tracing(match cli.command {
        Commands::Serve { .. } => "info",
        _ => "warn",
    });

    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Commands::Serve {
            bind,
            port,
            in_memory,
        } => cmd_serve(config, bind, port, in_memory).await,
        Commands::Generate {
            prompt,
            include_auth,
            include_error_handling,
            enhance,
            local,
            full,
            output,
        } => {
            let request = SynthesisRequest::new(prompt)
                .with_auth(include_auth)
                .with_error_handling(include_error_handling)
                .with_enhancement(enhance);
            cmd_generate(&config, &request, local, full, output.as_deref()).await
        }
        Commands::Enhance { prompt } => cmd_enhance(&config, &prompt).await,
        Commands::Services { action } => cmd_services(action),
        Commands::Status => cmd_status(&cli.config, &config).await,
    }
}

// ---------------------------------------------------------------------------
// Subcommand: serve
// ---------------------------------------------------------------------------

async fn cmd_serve(
    mut config: AppConfig,
    bind: Option<String>,
    port: Option<u16>,
    in_memory: bool,
) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind_addr = bind;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config.database.in_memory |= in_memory;

    info!("starting PromptFlow");

    let catalog = load_catalog()?;
    info!(services = catalog.len(), categories = catalog.categories().len(), "catalog loaded");

    let orchestrator = build_orchestrator(catalog, &config, false)?;
    if !orchestrator.remote_configured() {
        info!("no remote API key configured, using local synthesis only");
    }

    let (users, workflows) = open_storage(&config.database).await?;
    let tokens = TokenSigner::from_env(config.auth.token_lifetime())
        .context("failed to initialise token signing")?;

    let state = AppState::new(config.server.clone(), orchestrator, users, workflows, tokens);
    let server = WebServer::new(state);

    println!("PromptFlow API listening on http://{}", server.addr());

    server
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("web server error: {e}"))
}

// ---------------------------------------------------------------------------
// Subcommand: generate
// ---------------------------------------------------------------------------

async fn cmd_generate(
    config: &AppConfig,
    request: &SynthesisRequest,
    local: bool,
    full: bool,
    output: Option<&Path>,
) -> Result<()> {
    if request.prompt.trim().is_empty() {
        bail!("the prompt must not be empty");
    }

    let orchestrator = build_orchestrator(load_catalog()?, config, local)?;
    let generation = orchestrator.generate_detailed(request, None).await;

    let json = if full {
        serde_json::to_string_pretty(&generation.workflow)
    } else {
        serde_json::to_string_pretty(&generation.workflow.workflow_json)
    }
    .context("failed to serialize workflow")?;

    match output {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!(
                "Wrote \"{}\" ({} nodes, {} synthesis) to {}",
                generation.workflow.name,
                generation.workflow.node_count,
                generation.source.as_str(),
                path.display()
            );
        }
        None => println!("{json}"),
    }

    if generation.source == SynthesisSource::Local && orchestrator.remote_configured() {
        eprintln!("note: the remote model was unavailable; this workflow came from local synthesis");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: enhance
// ---------------------------------------------------------------------------

async fn cmd_enhance(config: &AppConfig, prompt: &str) -> Result<()> {
    if prompt.trim().is_empty() {
        bail!("the prompt must not be empty");
    }
    let orchestrator = build_orchestrator(load_catalog()?, config, false)?;
    println!("{}", orchestrator.enhance_prompt(prompt).await);
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: services
// ---------------------------------------------------------------------------

fn cmd_services(action: ServiceAction) -> Result<()> {
    let catalog = load_catalog()?;
    let output = services_output(&catalog, action)?;
    println!("{output}");
    Ok(())
}

fn services_output(catalog: &ServiceCatalog, action: ServiceAction) -> Result<String> {
    let services = match action {
        ServiceAction::Categories => return Ok(catalog.categories().join("\n")),
        ServiceAction::Show { name } => {
            return catalog
                .lookup_by_name(&name)
                .map(helpers::format_service_detail)
                .with_context(|| format!("no service named '{name}'"));
        }
        ServiceAction::List { category: Some(category) } => catalog.list_by_category(&category),
        ServiceAction::List { category: None } => catalog.services().iter().collect(),
        ServiceAction::Popular { limit } => catalog.list_popular(limit),
        ServiceAction::Search { query } => catalog.search(&query),
    };

    if services.is_empty() {
        return Ok("No matching services.".to_owned());
    }
    Ok(helpers::format_service_rows(&services))
}

// ---------------------------------------------------------------------------
// Subcommand: status
// ---------------------------------------------------------------------------

async fn cmd_status(config_path: &Path, config: &AppConfig) -> Result<()> {
    println!("PromptFlow v{}", env!("CARGO_PKG_VERSION"));
    println!("=================");
    println!();

    // Configuration.
    if config_path.exists() {
        println!("  Config:    {}", config_path.display());
    } else {
        println!("  Config:    {} (not found, using defaults)", config_path.display());
    }
    println!("  Server:    http://{}:{}", config.server.bind_addr, config.server.port);

    // Catalog.
    let catalog = load_catalog()?;
    println!(
        "  Catalog:   {} services in {} categories",
        catalog.len(),
        catalog.categories().len()
    );

    // Database.
    if config.database.in_memory {
        println!("  Database:  in-memory");
    } else if config.database.path.exists() {
        let db = Database::open_and_migrate(config.database.path.clone())
            .await
            .context("failed to open database")?;
        let version = db.schema_version().await?;
        let users = UserStore::new(db).count().await?;
        println!(
            "  Database:  {} (schema v{version}, {users} users)",
            config.database.path.display()
        );
    } else {
        println!(
            "  Database:  {} (not yet created)",
            config.database.path.display()
        );
    }

    // Remote model.
    match remote_settings(config, false) {
        Some(settings) => println!(
            "  Remote:    {} ({}, timeout {}s)",
            settings.provider,
            settings.model,
            settings.timeout.as_secs()
        ),
        None => println!("  Remote:    not configured (local synthesis only)"),
    }

    // Auth.
    let secret_set = std::env::var(TOKEN_SECRET_ENV).is_ok_and(|s| !s.trim().is_empty());
    println!(
        "  Tokens:    {} ({}h lifetime)",
        if secret_set { "persistent secret" } else { "random per-process secret" },
        config.auth.token_lifetime_hours
    );

    println!();
    println!("Use `promptflow serve` to start the API.");

    Ok(())
}
