//! Broadcast Link Enrichment Service
//!
//! Combines scraped match schedules, fetches the channel registry, resolves
//! each match's channel labels and writes the enriched matches plus a
//! channel → links table.

use anyhow::Result;
use link_enricher::config::Config;
use link_enricher::health;
use link_enricher::pipeline::EnrichmentService;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Optional local overrides; real deployments set the environment directly
    let _ = dotenvy::dotenv();

    // Initialize tracing
    let default_directive: tracing_subscriber::filter::Directive = "link_enricher=info"
        .parse()
        .expect("static tracing directive is valid");
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_directive),
        )
        .init();

    info!("Broadcast Link Enrichment Service v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    let health_port = config.health_port;
    let run_once = config.run_once;

    info!(
        "Registry: {} | schedules: {} | output: {}",
        config.registry_url,
        config.pre_data_dir.display(),
        config.data_dir.display()
    );

    let service = EnrichmentService::new(config)?;

    // Start health check server
    let app = health::router(service.health.clone());
    let health_addr = format!("0.0.0.0:{}", health_port);
    info!("Health endpoint listening on {}", health_addr);

    let listener = tokio::net::TcpListener::bind(&health_addr).await?;

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Health server stopped: {:?}", e);
        }
    });

    // Check if running in one-shot mode (manual trigger)
    if run_once {
        info!("Running in one-shot mode (RUN_ONCE=true)");
        match service.run_once().await {
            Ok(summary) => {
                info!(
                    "One-shot run completed: {} matches, {} with links",
                    summary.matches, summary.linked_matches
                );
            }
            Err(e) => {
                error!("One-shot run failed: {:?}", e);
                return Err(e);
            }
        }
        return Ok(());
    }

    // Handle shutdown gracefully (continuous mode)
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    tokio::select! {
        result = service.run() => {
            if let Err(e) = result {
                error!("Service error: {:?}", e);
            }
        }
        _ = ctrl_c => {
            info!("Shutting down...");
        }
    }

    Ok(())
}
