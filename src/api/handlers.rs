use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        AppendHeaders, IntoResponse, Redirect,
    },
    Extension, Json,
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

use crate::api::error::ApiError;
use crate::api::guard::{self, CurrentUser, RouteGuard};
use crate::api::server::AppState;
use crate::engine::{DashboardStats, MissionUpdate, LOGS_PAGE_SIZE};
use crate::i18n::LoadedDictionary;
use crate::types::{
    AuthUser, Evidence, EvidenceDraft, LogEntry, Mission, MissionDraft, MissionId, Profile,
};

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SignUpResponse {
    pub user: AuthUser,
    pub profile: Profile,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub user: Option<AuthUser>,
}

#[derive(Serialize)]
pub struct LandingResponse {
    pub user: Option<AuthUser>,
    #[serde(flatten)]
    pub dictionary: LoadedDictionary,
}

#[derive(Serialize)]
pub struct EvidenceResponse {
    pub mission: Mission,
    pub evidence: Evidence,
}

#[derive(Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Deserialize)]
pub struct RenameRequest {
    pub full_name: String,
}

#[derive(Serialize)]
pub struct SettingsResponse {
    pub provider: String,
    pub backend_url: Option<String>,
    pub backend_key: Option<String>,
    pub active_sessions: usize,
    pub version: &'static str,
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn optional_user(state: &AppState, headers: &HeaderMap) -> Result<Option<AuthUser>, ApiError> {
    match guard::access_token(headers) {
        Some(token) => Ok(state.auth.current_user(&token).await?),
        None => Ok(None),
    }
}

pub async fn root() -> Redirect {
    let target = RouteGuard::localize("/").unwrap_or_else(|| "/en".to_string());
    Redirect::to(&target)
}

pub async fn landing(
    State(state): State<AppState>,
    Path(lang): Path<String>,
    headers: HeaderMap,
) -> Result<Json<LandingResponse>, ApiError> {
    let dictionary = state.dictionaries.load(&lang).await;
    let user = optional_user(&state, &headers).await?;
    Ok(Json(LandingResponse { user, dictionary }))
}

pub async fn login_page(State(state): State<AppState>) -> Json<LoadedDictionary> {
    Json(state.dictionaries.load_locale(Default::default()).await)
}

pub async fn localized_login_page(
    State(state): State<AppState>,
    Path(lang): Path<String>,
) -> Json<LoadedDictionary> {
    Json(state.dictionaries.load(&lang).await)
}

pub async fn sign_up(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<SignUpResponse>), ApiError> {
    let (user, profile) = state.auth.sign_up(&request.email, &request.password).await?;
    Ok((StatusCode::CREATED, Json(SignUpResponse { user, profile })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.auth.sign_in(&request.email, &request.password).await?;
    let cookie = guard::session_cookie(&session.access_token);
    Ok((AppendHeaders([(header::SET_COOKIE, cookie)]), Json(session)))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = guard::access_token(&headers) {
        state.auth.sign_out(&token).await?;
    }
    Ok((
        AppendHeaders([(header::SET_COOKIE, guard::cleared_session_cookie())]),
        StatusCode::NO_CONTENT,
    ))
}

pub async fn current_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, ApiError> {
    let user = optional_user(&state, &headers).await?;
    Ok(Json(SessionResponse { user }))
}

/// Server-sent auth events for the caller's own account.
pub async fn session_events(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let user = optional_user(&state, &headers)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("sign in to follow session events".to_string()))?;

    let mut subscription = state.auth.subscribe();
    let stream = async_stream::stream! {
        while let Some(event) = subscription.recv().await {
            if event.user().id != user.id {
                continue;
            }
            match Event::default().event("auth").json_data(&event) {
                Ok(sse) => yield Ok(sse),
                Err(e) => log::warn!("failed to encode auth event: {}", e),
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

pub async fn list_missions(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<Vec<Mission>>, ApiError> {
    let missions = state.missions.list(&user).await?;
    Ok(Json(missions.to_vec()))
}

pub async fn create_mission(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(draft): Json<MissionDraft>,
) -> Result<(StatusCode, Json<Mission>), ApiError> {
    let mission = state.missions.create(&user, draft).await?;
    Ok((StatusCode::CREATED, Json(mission)))
}

pub async fn toggle_mission(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<MissionId>,
) -> Result<Json<MissionUpdate>, ApiError> {
    Ok(Json(state.missions.toggle(&user, id).await?))
}

pub async fn start_mission(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<MissionId>,
) -> Result<Json<MissionUpdate>, ApiError> {
    Ok(Json(state.missions.start(&user, id).await?))
}

pub async fn submit_evidence(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<MissionId>,
    Json(draft): Json<EvidenceDraft>,
) -> Result<(StatusCode, Json<EvidenceResponse>), ApiError> {
    let (mission, evidence) = state.missions.submit_evidence(&user, id, draft).await?;
    Ok((StatusCode::CREATED, Json(EvidenceResponse { mission, evidence })))
}

pub async fn list_evidence(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<MissionId>,
) -> Result<Json<Vec<Evidence>>, ApiError> {
    Ok(Json(state.missions.evidence(&user, id).await?))
}

pub async fn verify_mission(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<MissionId>,
) -> Result<Json<MissionUpdate>, ApiError> {
    Ok(Json(state.missions.confirm_verification(&user, id).await?))
}

pub async fn delete_mission(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<MissionId>,
    Query(params): Query<DeleteParams>,
) -> Result<Json<Mission>, ApiError> {
    Ok(Json(state.missions.delete(&user, id, params.confirm).await?))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<Profile>, ApiError> {
    Ok(Json(state.profiles.get(&user).await?))
}

pub async fn rename_profile(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(request): Json<RenameRequest>,
) -> Result<Json<Profile>, ApiError> {
    Ok(Json(state.profiles.rename(&user, &request.full_name).await?))
}

pub async fn dashboard(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<DashboardStats>, ApiError> {
    let missions = state.missions.list(&user).await?;
    let log_count = state.audit.count().await?;
    Ok(Json(DashboardStats::compute(&missions, log_count)))
}

pub async fn list_logs(State(state): State<AppState>) -> Result<Json<Vec<LogEntry>>, ApiError> {
    Ok(Json(state.audit.recent(LOGS_PAGE_SIZE).await?))
}

pub async fn settings(State(state): State<AppState>) -> Json<SettingsResponse> {
    Json(SettingsResponse {
        provider: state.config.backend.as_str().to_string(),
        backend_url: state.config.masked_backend_url(),
        backend_key: state.config.masked_backend_key(),
        active_sessions: state.auth.sessions().active_sessions(),
        version: env!("CARGO_PKG_VERSION"),
    })
}
