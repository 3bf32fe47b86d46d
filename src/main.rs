use tandem::{config::Config, startup};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = startup::init_logging(&config.log) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    let maintenance_mode = config.maintenance_mode;
    let state = match startup::build_state(config).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Startup failed: {}", e);
            std::process::exit(1);
        }
    };

    if maintenance_mode {
        tracing::warn!("Maintenance mode enabled, writes are disabled");
    }
    tracing::info!(
        id_source = if state.config.id_gen.is_remote() { "remote" } else { "snowflake" },
        "Account core ready"
    );
}
