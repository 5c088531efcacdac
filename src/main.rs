use promptcanvas::{logger, Config, ProviderChain, Studio};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_loaded = dotenv::dotenv().is_ok();

    logger::init()?;
    if env_loaded {
        log::info!("✅ .env file loaded");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    let config = Config::from_env();
    let port = config.port.unwrap_or(8080);

    logger::log_startup_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), port);
    logger::log_config_info(&config);

    log::info!("🖼️  Available image providers:");
    for (id, name, output) in ProviderChain::supported_providers() {
        log::info!("  {} - {} ({})", id, name, output);
    }

    let studio = match Studio::new(config).await {
        Ok(studio) => studio,
        Err(e) => {
            log::error!("❌ Failed to initialize studio: {}", e);
            return Err(e.into());
        }
    };

    promptcanvas::server::run(studio, port).await?;
    Ok(())
}
