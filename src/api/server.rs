use anyhow::Result;
use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::api::{guard, handlers};
use crate::auth::{AuthGateway, AuthProvider, SessionContext};
use crate::config::Config;
use crate::engine::{AuditLog, MissionService, ProfileService};
use crate::i18n::DictionaryLoader;
use crate::storage::Storage;

#[derive(Clone)]
pub struct AppState {
    pub auth: AuthGateway,
    pub missions: MissionService,
    pub profiles: ProfileService,
    pub audit: AuditLog,
    pub dictionaries: DictionaryLoader,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>, provider: Arc<dyn AuthProvider>, config: Config) -> Self {
        let audit = AuditLog::new(storage.clone());
        Self {
            auth: AuthGateway::new(provider, storage.clone(), SessionContext::new()),
            missions: MissionService::new(storage.clone(), audit.clone()),
            profiles: ProfileService::new(storage, audit.clone()),
            audit,
            dictionaries: DictionaryLoader::new(config.locales_dir.clone()),
            config: Arc::new(config),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    // Page views reachable under a locale prefix, e.g. `/zh-TW/dashboard`.
    let localized = Router::new()
        .route("/login", get(handlers::localized_login_page))
        .route("/missions", get(handlers::list_missions))
        .route("/profile", get(handlers::get_profile))
        .route("/dashboard", get(handlers::dashboard))
        .route("/logs", get(handlers::list_logs))
        .route("/settings", get(handlers::settings));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/", get(handlers::root))
        .route("/:lang", get(handlers::landing))
        .route("/signup", post(handlers::sign_up))
        .route("/login", get(handlers::login_page).post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route("/session", get(handlers::current_session))
        .route("/session/events", get(handlers::session_events))
        .route("/missions", get(handlers::list_missions).post(handlers::create_mission))
        .route("/missions/:id", delete(handlers::delete_mission))
        .route("/missions/:id/toggle", post(handlers::toggle_mission))
        .route("/missions/:id/start", post(handlers::start_mission))
        .route(
            "/missions/:id/evidence",
            get(handlers::list_evidence).post(handlers::submit_evidence),
        )
        .route("/missions/:id/verify", post(handlers::verify_mission))
        .route("/profile", get(handlers::get_profile).patch(handlers::rename_profile))
        .route("/dashboard", get(handlers::dashboard))
        .route("/logs", get(handlers::list_logs))
        .route("/settings", get(handlers::settings))
        .nest("/:lang", localized)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            guard::require_session,
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    log::info!("Sole Protocol API listening on port {}", port);

    axum::serve(listener, app).await?;
    Ok(())
}
