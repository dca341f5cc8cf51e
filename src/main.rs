//! userhub HTTP server
//!
//! ```text
//! userhub [--env <name>] [--port <port>]
//! ```
//!
//! Reads `config/<env>.yaml` (default `dev`). Without `postgres_url` the
//! server runs on an in-memory store filled from `seed_users`.

use std::sync::Arc;

use anyhow::Context;

use userhub::config::{AppConfig, SeedUser};
use userhub::db::Database;
use userhub::gateway::{run_server, state::AppState};
use userhub::user_auth::{build_auth_service, hash_password};
use userhub::users::{InMemoryUserStore, NewUser, PgUserStore, UserStore};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

#[tokio::main]
async fn main() {
    let env = get_env();
    let app_config = match AppConfig::load(&env) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            std::process::exit(1);
        }
    };
    let _log_guard = userhub::logging::init_logging(&app_config);

    tracing::info!("Starting userhub in {} mode", env);

    if let Err(e) = run(app_config, env).await {
        tracing::error!("userhub exited with error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(app_config: AppConfig, env: String) -> anyhow::Result<()> {
    let store = open_store(&app_config).await?;
    let auth = build_auth_service(&app_config.auth, &env, store.clone())?;

    let port = get_port_override().unwrap_or(app_config.gateway.port);
    let state = Arc::new(AppState::new(Arc::new(auth), store, env));

    run_server(&app_config.gateway.host, port, state).await
}

async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn UserStore>> {
    match &config.postgres_url {
        Some(url) => {
            let db = Database::connect(url, config.postgres_max_connections)
                .await
                .context("Failed to connect to PostgreSQL")?;
            db.init_schema().await.context("Failed to apply schema")?;
            tracing::info!("[STORE] PostgreSQL connected");
            if !config.seed_users.is_empty() {
                tracing::warn!("[STORE] seed_users ignored with PostgreSQL");
            }
            Ok(Arc::new(PgUserStore::new(Arc::new(db))))
        }
        None => {
            let store = InMemoryUserStore::new();
            seed(&store, &config.seed_users).await?;
            tracing::info!("[STORE] in-memory, {} seeded user(s)", store.len());
            Ok(Arc::new(store))
        }
    }
}

async fn seed(store: &InMemoryUserStore, users: &[SeedUser]) -> anyhow::Result<()> {
    for user in users {
        let password = user.password.clone();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .context("hash task panicked")??;
        store
            .create_user(NewUser {
                username: user.username.clone(),
                email: user.email.clone(),
                password_hash,
                role: user.role,
            })
            .await
            .with_context(|| format!("Failed to seed user {}", user.username))?;
    }
    Ok(())
}
