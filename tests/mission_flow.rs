//! End-to-end mission flow over the in-memory backends.
//!
//! Covers sign-up defaults, credibility accrual and its cap, the evidence
//! path, audit logging of deletes and session event fan-out.

use std::sync::Arc;

use sole_protocol::api::{AppState, GuardDecision, RouteGuard};
use sole_protocol::auth::memory::InMemoryAuth;
use sole_protocol::auth::{AuthEvent, AuthGateway, SessionContext};
use sole_protocol::engine::DashboardStats;
use sole_protocol::i18n::Locale;
use sole_protocol::storage::memory::InMemoryStore;
use sole_protocol::storage::Storage;
use sole_protocol::types::{AuthUser, EventType, EvidenceDraft, MissionDraft, MissionStatus};
use sole_protocol::{Config, ServiceError};

fn setup() -> (AppState, Arc<InMemoryStore>) {
    let storage = Arc::new(InMemoryStore::new());
    let state = AppState::new(
        storage.clone() as Arc<dyn Storage>,
        Arc::new(InMemoryAuth::new()),
        Config::default(),
    );
    (state, storage)
}

async fn enlist(state: &AppState, email: &str) -> AuthUser {
    let (user, _) = state.auth.sign_up(email, "hunter22").await.unwrap();
    state.auth.sign_in(email, "hunter22").await.unwrap();
    user
}

fn draft(title: &str) -> MissionDraft {
    MissionDraft {
        title: title.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_sign_up_creates_default_profile() {
    let (state, _) = setup();

    let (user, profile) = state.auth.sign_up("new@sole.io", "hunter22").await.unwrap();

    assert_eq!(profile.id, user.id);
    assert_eq!(profile.full_name, "新進特務");
    assert_eq!(profile.credibility_score, 50);
}

#[tokio::test]
async fn test_credibility_accrues_and_caps() {
    let (state, _) = setup();
    let user = enlist(&state, "agent@sole.io").await;

    let mut scores = Vec::new();
    for n in 0..7 {
        let mission = state
            .missions
            .create(&user, draft(&format!("Op {}", n)))
            .await
            .unwrap();
        let update = state.missions.toggle(&user, mission.id).await.unwrap();
        scores.push(update.credibility_score.unwrap());
    }

    assert_eq!(scores, vec![60, 70, 80, 90, 100, 100, 100]);

    let profile = state.profiles.get(&user).await.unwrap();
    assert_eq!(profile.credibility_score, 100);
}

#[tokio::test]
async fn test_toggle_back_does_not_deduct() {
    let (state, _) = setup();
    let user = enlist(&state, "agent@sole.io").await;
    let mission = state.missions.create(&user, draft("Recon")).await.unwrap();

    state.missions.toggle(&user, mission.id).await.unwrap();
    let update = state.missions.toggle(&user, mission.id).await.unwrap();

    assert_eq!(update.mission.status, MissionStatus::Pending);
    assert_eq!(update.credibility_score, None);
    assert_eq!(state.profiles.get(&user).await.unwrap().credibility_score, 60);
}

#[tokio::test]
async fn test_evidence_path_to_completion() {
    let (state, storage) = setup();
    let user = enlist(&state, "agent@sole.io").await;
    let mission = state.missions.create(&user, draft("Extraction")).await.unwrap();

    state.missions.start(&user, mission.id).await.unwrap();

    let (verifying, evidence) = state
        .missions
        .submit_evidence(
            &user,
            mission.id,
            EvidenceDraft {
                evidence_url: "https://intel.sole.io/photo.jpg".to_string(),
                note: Some("target located".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(verifying.status, MissionStatus::Verifying);
    assert_eq!(evidence.agent_email, "agent@sole.io");

    let update = state
        .missions
        .confirm_verification(&user, mission.id)
        .await
        .unwrap();
    assert_eq!(update.mission.status, MissionStatus::Completed);
    assert_eq!(update.credibility_score, Some(60));

    assert_eq!(storage.list_evidence(mission.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_bad_evidence_leaves_mission_untouched() {
    let (state, _) = setup();
    let user = enlist(&state, "agent@sole.io").await;
    let mission = state.missions.create(&user, draft("Extraction")).await.unwrap();

    let result = state
        .missions
        .submit_evidence(
            &user,
            mission.id,
            EvidenceDraft {
                evidence_url: "not a url".to_string(),
                note: None,
            },
        )
        .await;
    assert!(matches!(result, Err(ServiceError::Validation(_))));

    let missions = state.missions.list(&user).await.unwrap();
    assert_eq!(missions[0].status, MissionStatus::Pending);
}

#[tokio::test]
async fn test_each_delete_logs_once() {
    let (state, storage) = setup();
    let user = enlist(&state, "agent@sole.io").await;

    let first = state.missions.create(&user, draft("One")).await.unwrap();
    let second = state.missions.create(&user, draft("Two")).await.unwrap();

    assert!(matches!(
        state.missions.delete(&user, first.id, false).await,
        Err(ServiceError::ConfirmationRequired)
    ));
    state.missions.delete(&user, first.id, true).await.unwrap();
    state.missions.delete(&user, second.id, true).await.unwrap();

    let deletes = storage
        .recent_logs(50)
        .await
        .unwrap()
        .into_iter()
        .filter(|entry| entry.event_type == EventType::MissionDeleted)
        .count();
    assert_eq!(deletes, 2);
    assert!(state.missions.list(&user).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missions_scoped_to_owner() {
    let (state, _) = setup();
    let alice = enlist(&state, "alice@sole.io").await;
    let bob = enlist(&state, "bob@sole.io").await;

    let mission = state.missions.create(&alice, draft("Alice only")).await.unwrap();

    assert!(state.missions.list(&bob).await.unwrap().is_empty());
    assert!(matches!(
        state.missions.toggle(&bob, mission.id).await,
        Err(ServiceError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_dashboard_stats() {
    let (state, _) = setup();
    let user = enlist(&state, "agent@sole.io").await;

    for title in ["A", "B", "C"] {
        state.missions.create(&user, draft(title)).await.unwrap();
    }
    let missions = state.missions.list(&user).await.unwrap();
    state.missions.toggle(&user, missions[0].id).await.unwrap();

    let missions = state.missions.list(&user).await.unwrap();
    let stats = DashboardStats::compute(&missions, state.audit.count().await.unwrap());

    assert_eq!(stats.total_missions, 3);
    assert_eq!(stats.completed_missions, 1);
    assert_eq!(stats.completion_rate, 33);
    assert_eq!(stats.log_count, 4);
}

#[tokio::test]
async fn test_sign_in_and_out_are_broadcast() {
    let (state, _) = setup();
    state.auth.sign_up("agent@sole.io", "hunter22").await.unwrap();

    let mut subscription = state.auth.subscribe();
    let session = state.auth.sign_in("agent@sole.io", "hunter22").await.unwrap();
    state.auth.sign_out(&session.access_token).await.unwrap();

    assert!(matches!(
        subscription.recv().await,
        Some(AuthEvent::SignedIn { .. })
    ));
    assert!(matches!(
        subscription.recv().await,
        Some(AuthEvent::SignedOut { .. })
    ));
    assert_eq!(state.auth.current_user(&session.access_token).await.unwrap(), None);
}

#[tokio::test]
async fn test_unknown_locale_falls_back_to_english() {
    let (state, _) = setup();

    let loaded = state.dictionaries.load("fr").await;

    assert_eq!(loaded.locale, Locale::En);
    assert_eq!(loaded.dictionary["STVS"]["btn_logout"], "DISCONNECT");
}

#[test]
fn test_guard_redirects_anonymous_visitors() {
    assert_eq!(
        RouteGuard::evaluate("/missions", false),
        GuardDecision::Redirect("/login".to_string())
    );
    assert_eq!(RouteGuard::evaluate("/en", false), GuardDecision::Allow);
}

#[tokio::test]
async fn test_second_instance_drops_revoked_token() {
    let provider = Arc::new(InMemoryAuth::new());
    let storage = Arc::new(InMemoryStore::new()) as Arc<dyn Storage>;
    let primary = AuthGateway::new(provider.clone(), storage.clone(), SessionContext::new());
    let secondary = AuthGateway::new(
        provider,
        storage,
        SessionContext::with_remember_ttl(chrono::Duration::zero()),
    );

    primary.sign_up("agent@sole.io", "hunter22").await.unwrap();
    let session = primary.sign_in("agent@sole.io", "hunter22").await.unwrap();
    assert_eq!(
        secondary.current_user(&session.access_token).await.unwrap(),
        Some(session.user.clone())
    );

    primary.sign_out(&session.access_token).await.unwrap();

    assert_eq!(secondary.current_user(&session.access_token).await.unwrap(), None);
}

#[test]
fn test_localized_guard_keeps_prefix() {
    assert_eq!(
        RouteGuard::evaluate("/zh-TW/dashboard", false),
        GuardDecision::Redirect("/zh-TW/login".to_string())
    );
    assert_eq!(RouteGuard::evaluate("/zh-TW/login", false), GuardDecision::Allow);
}
