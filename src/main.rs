use std::sync::Arc;

use fitsync::auth::gotrue::GoTrueClient;
use fitsync::config::SyncConfig;
use fitsync::nav::LogNavigator;
use fitsync::profile::display_name;
use fitsync::profile::postgres::PgProfileStore;
use fitsync::services::workout;
use fitsync::sync::Synchronizer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = SyncConfig::from_env().expect("invalid configuration");
    let pool = fitsync::db::init_pool(&config.database_url, config.db_max_connections)
        .await
        .expect("database init failed");
    let provider = GoTrueClient::new(&config.auth).expect("auth client init failed");

    let sync = Arc::new(Synchronizer::new(
        Arc::new(provider),
        Arc::new(PgProfileStore::new(pool.clone())),
        Arc::new(LogNavigator),
        config.profile_timeout(),
    ));
    let watcher = sync.initialize().await;

    // Optional headless sign-in for smoke testing a deployment.
    if let (Ok(email), Ok(password)) = (std::env::var("FITSYNC_EMAIL"), std::env::var("FITSYNC_PASSWORD")) {
        match sync.sign_in(&email, &password).await {
            Ok(profile) => {
                tracing::info!(user = %display_name(&profile), "signed in");
                match workout::workout_stats(&pool, profile.id, time::OffsetDateTime::now_utc()).await {
                    Ok(stats) => tracing::info!(
                        total = stats.total_workouts,
                        this_month = stats.this_month_workouts,
                        strength_increase_pct = stats.strength_increase_pct,
                        "workout stats"
                    ),
                    Err(e) => tracing::warn!(error = %e, "workout stats unavailable"),
                }
            }
            Err(e) => tracing::error!(error = %e, code = e.error_code(), "sign-in failed"),
        }
    }

    let mut state = sync.subscribe();
    tracing::info!("fitsync running; ctrl-c to exit");
    loop {
        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = state.borrow_and_update().clone();
                tracing::info!(
                    user = snapshot.user.as_ref().map(display_name).as_deref(),
                    loading = snapshot.loading,
                    "auth state changed"
                );
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    if let Err(e) = sync.sign_out().await {
        tracing::warn!(error = %e, "sign-out on shutdown failed");
    }
    watcher.abort();
}
