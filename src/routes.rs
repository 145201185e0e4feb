//! The five request handlers. Each one is a single stateless
//! read-modify-write cycle over the guest document; failures surface as
//! [`AppError`] and nothing is retried.
use std::sync::Arc;

use axum::extract::{Query, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::{AppError, Json},
    guests::{GuestCollection, GuestPatch, GuestRecord, RsvpUpdate},
    seed::load_seed,
    state::AppState,
    utils::constant_time_eq,
};

const DATA_NOT_FOUND: &str = "Data not found";
const DATA_NOT_INITIALIZED: &str = "Data not found. Please initialize the data first.";
const RSVP_SAVED: &str = "Dziękujemy! Twoje potwierdzenie zostało zapisane.";

#[derive(Deserialize)]
pub struct CheckTokenRequest {
    #[serde(default)]
    token: String,
}

#[derive(Debug, Serialize)]
pub struct CheckTokenResponse {
    success: bool,
    guest: GuestRecord,
}

pub async fn check_token_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CheckTokenRequest>,
) -> Result<Json<CheckTokenResponse>, AppError> {
    if payload.token.is_empty() {
        return Err(AppError::BadRequest("Token is required"));
    }

    let collection = require_document(&state, DATA_NOT_INITIALIZED).await?;

    let guest = collection
        .find_by_token(&payload.token)
        .ok_or(AppError::NotFound("Invalid token"))?;

    Ok(Json(CheckTokenResponse {
        success: true,
        guest: guest.clone(),
    }))
}

#[derive(Deserialize)]
pub struct SubmitRsvpRequest {
    #[serde(default)]
    token: String,
    #[serde(flatten)]
    update: RsvpUpdate,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    success: bool,
    message: String,
}

pub async fn submit_rsvp_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SubmitRsvpRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    if payload.token.is_empty() {
        return Err(AppError::BadRequest("Token is required"));
    }

    let mut collection = require_document(&state, DATA_NOT_FOUND).await?;

    let index = collection
        .position_by_token(&payload.token)
        .ok_or(AppError::NotFound("Guest not found"))?;

    collection.guests[index].apply_rsvp(payload.update);
    collection.touch();
    state.store.set(&collection).await?;

    Ok(Json(MessageResponse {
        success: true,
        message: RSVP_SAVED.to_string(),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminViewRequest {
    #[serde(default)]
    admin_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminViewResponse {
    success: bool,
    guests: Vec<GuestRecord>,
    metadata: AdminMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AdminMetadata {
    total_guests: u32,
    last_updated: Option<DateTime<Utc>>,
}

pub async fn admin_view_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AdminViewRequest>,
) -> Result<Json<AdminViewResponse>, AppError> {
    verify_admin(&state, &payload.admin_token)?;

    let collection = require_document(&state, DATA_NOT_INITIALIZED).await?;

    Ok(Json(AdminViewResponse {
        success: true,
        metadata: AdminMetadata {
            total_guests: collection.metadata.total_guests,
            last_updated: collection.last_updated,
        },
        guests: collection.guests,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUpdateRequest {
    #[serde(default)]
    admin_token: String,
    guest_id: Option<u32>,
    updates: Option<GuestPatch>,
}

pub async fn admin_update_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AdminUpdateRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    verify_admin(&state, &payload.admin_token)?;

    // id 0 counts as missing
    let (Some(guest_id @ 1..), Some(updates)) = (payload.guest_id, payload.updates) else {
        return Err(AppError::BadRequest("Guest ID and updates are required"));
    };

    let mut collection = require_document(&state, DATA_NOT_FOUND).await?;

    let index = collection
        .position_by_id(guest_id)
        .ok_or(AppError::NotFound("Guest not found"))?;

    collection.guests[index].apply_patch(updates);
    collection.touch();
    state.store.set(&collection).await?;

    info!("Guest {guest_id} updated");

    Ok(Json(MessageResponse {
        success: true,
        message: "Guest updated successfully".to_string(),
    }))
}

#[derive(Deserialize)]
pub struct InitQuery {
    #[serde(default)]
    force: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitDataResponse {
    success: bool,
    message: String,
    guest_count: usize,
}

pub async fn init_data_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<InitQuery>,
) -> Result<Json<InitDataResponse>, AppError> {
    if !query.force && state.store.get().await?.is_some() {
        return Err(AppError::BadRequest(
            "Data already initialized. Use force=true to reinitialize.",
        ));
    }

    let collection = load_seed(&state.config.seed_path)?;
    let guest_count = collection.guests.len();
    state.store.set(&collection).await?;

    info!("Guest data initialized with {guest_count} guests");

    Ok(Json(InitDataResponse {
        success: true,
        message: "Data initialized successfully".to_string(),
        guest_count,
    }))
}

/// Per-route fallback so unsupported methods still get the shared error
/// envelope instead of axum's bare 405.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

fn verify_admin(state: &AppState, supplied: &str) -> Result<(), AppError> {
    if constant_time_eq(
        supplied.as_bytes(),
        state.config.admin_token.as_bytes(),
    ) {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}

async fn require_document(
    state: &AppState,
    missing: &'static str,
) -> Result<GuestCollection, AppError> {
    state.store.get().await?.ok_or(AppError::NotFound(missing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Config,
        guests::{RsvpStatus, sample_collection},
        store::MemoryStore,
    };
    use serde_json::json;
    use std::{env, fs};

    const ADMIN: &str = "test-admin";

    fn test_state(seed_path: &str) -> Arc<AppState> {
        Arc::new(AppState {
            config: Config {
                port: 0,
                redis_url: String::new(),
                store_key: "wedding-guests".to_string(),
                seed_path: seed_path.to_string(),
                admin_token: ADMIN.to_string(),
            },
            store: Arc::new(MemoryStore::empty()),
        })
    }

    async fn seeded_state() -> Arc<AppState> {
        let state = test_state("unused");
        state.store.set(&sample_collection()).await.unwrap();
        state
    }

    fn rsvp_request(body: serde_json::Value) -> SubmitRsvpRequest {
        serde_json::from_value(body).unwrap()
    }

    #[tokio::test]
    async fn check_token_is_case_insensitive() {
        let state = seeded_state().await;

        let response = check_token_handler(
            State(state),
            Json(CheckTokenRequest {
                token: "abc123xy".to_string(),
            }),
        )
        .await
        .unwrap();

        assert!(response.0.success);
        assert_eq!(response.0.guest.token, "ABC123XY");
        assert_eq!(response.0.guest.status, RsvpStatus::Pending);
    }

    #[tokio::test]
    async fn check_token_requires_a_token() {
        let state = seeded_state().await;

        let error = check_token_handler(
            State(state),
            Json(CheckTokenRequest {
                token: String::new(),
            }),
        )
        .await
        .unwrap_err();

        assert!(matches!(error, AppError::BadRequest("Token is required")));
    }

    #[tokio::test]
    async fn check_token_before_init_reports_missing_data() {
        let state = test_state("unused");

        let error = check_token_handler(
            State(state),
            Json(CheckTokenRequest {
                token: "ABC123XY".to_string(),
            }),
        )
        .await
        .unwrap_err();

        assert!(matches!(error, AppError::NotFound(DATA_NOT_INITIALIZED)));
    }

    #[tokio::test]
    async fn check_token_rejects_unknown_tokens() {
        let state = seeded_state().await;

        let error = check_token_handler(
            State(state),
            Json(CheckTokenRequest {
                token: "NOPE0000".to_string(),
            }),
        )
        .await
        .unwrap_err();

        assert!(matches!(error, AppError::NotFound("Invalid token")));
    }

    #[tokio::test]
    async fn submitted_rsvp_is_visible_on_the_next_check() {
        let state = seeded_state().await;

        submit_rsvp_handler(
            State(state.clone()),
            Json(rsvp_request(json!({
                "token": "ABC123XY",
                "status": "TAK",
                "email": "a@b.com",
            }))),
        )
        .await
        .unwrap();

        let response = check_token_handler(
            State(state),
            Json(CheckTokenRequest {
                token: "abc123xy".to_string(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.0.guest.status, RsvpStatus::Attending);
        assert_eq!(response.0.guest.email.as_deref(), Some("a@b.com"));
        assert!(response.0.guest.updated_at.is_some());
    }

    #[tokio::test]
    async fn submit_rsvp_stamps_the_collection() {
        let state = seeded_state().await;

        submit_rsvp_handler(
            State(state.clone()),
            Json(rsvp_request(json!({ "token": "DEF456ZW", "status": "NIE" }))),
        )
        .await
        .unwrap();

        let collection = state.store.get().await.unwrap().unwrap();
        assert!(collection.last_updated.is_some());
        // the other guest is untouched
        assert_eq!(collection.guests[0].status, RsvpStatus::Pending);
        assert!(collection.guests[0].updated_at.is_none());
    }

    #[tokio::test]
    async fn submit_rsvp_for_unknown_guest_is_not_found() {
        let state = seeded_state().await;

        let error = submit_rsvp_handler(
            State(state),
            Json(rsvp_request(json!({ "token": "NOPE0000", "status": "TAK" }))),
        )
        .await
        .unwrap_err();

        assert!(matches!(error, AppError::NotFound("Guest not found")));
    }

    #[tokio::test]
    async fn admin_view_returns_everything() {
        let state = seeded_state().await;

        let response = admin_view_handler(
            State(state),
            Json(AdminViewRequest {
                admin_token: ADMIN.to_string(),
            }),
        )
        .await
        .unwrap();

        assert!(response.0.success);
        assert_eq!(response.0.guests.len(), 2);
        assert_eq!(response.0.metadata.total_guests, 2);
    }

    #[tokio::test]
    async fn admin_endpoints_reject_a_bad_token() {
        let state = seeded_state().await;

        let error = admin_view_handler(
            State(state.clone()),
            Json(AdminViewRequest {
                admin_token: "wrong".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(error, AppError::Unauthorized));

        let error = admin_update_handler(
            State(state),
            Json(AdminUpdateRequest {
                admin_token: String::new(),
                guest_id: Some(1),
                updates: Some(GuestPatch::default()),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(error, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn admin_update_requires_id_and_updates() {
        let state = seeded_state().await;

        let error = admin_update_handler(
            State(state),
            Json(AdminUpdateRequest {
                admin_token: ADMIN.to_string(),
                guest_id: Some(1),
                updates: None,
            }),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            error,
            AppError::BadRequest("Guest ID and updates are required")
        ));
    }

    #[tokio::test]
    async fn admin_update_treats_id_zero_as_missing() {
        let state = seeded_state().await;

        let error = admin_update_handler(
            State(state),
            Json(AdminUpdateRequest {
                admin_token: ADMIN.to_string(),
                guest_id: Some(0),
                updates: Some(GuestPatch::default()),
            }),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            error,
            AppError::BadRequest("Guest ID and updates are required")
        ));
    }

    #[tokio::test]
    async fn admin_update_changes_only_the_named_fields() {
        let state = seeded_state().await;
        let before = state.store.get().await.unwrap().unwrap();

        let updates: GuestPatch =
            serde_json::from_value(json!({ "category": "rodzina", "status": "TAK" })).unwrap();

        admin_update_handler(
            State(state.clone()),
            Json(AdminUpdateRequest {
                admin_token: ADMIN.to_string(),
                guest_id: Some(2),
                updates: Some(updates),
            }),
        )
        .await
        .unwrap();

        let after = state.store.get().await.unwrap().unwrap();
        let guest = &after.guests[1];

        assert_eq!(guest.category.as_deref(), Some("rodzina"));
        assert_eq!(guest.status, RsvpStatus::Attending);
        assert_eq!(guest.name, before.guests[1].name);
        assert_eq!(guest.token, before.guests[1].token);

        assert_eq!(after.guests[0], before.guests[0]);
    }

    #[tokio::test]
    async fn admin_update_with_unknown_id_is_not_found() {
        let state = seeded_state().await;

        let error = admin_update_handler(
            State(state),
            Json(AdminUpdateRequest {
                admin_token: ADMIN.to_string(),
                guest_id: Some(99),
                updates: Some(GuestPatch::default()),
            }),
        )
        .await
        .unwrap_err();

        assert!(matches!(error, AppError::NotFound("Guest not found")));
    }

    fn write_temp_seed(name: &str) -> String {
        let path = env::temp_dir().join(format!("rsvp-routes-{}-{name}", std::process::id()));
        fs::write(
            &path,
            r#"{
                "guests": [
                    {"id": 1, "token": "ABC123XY", "name": "Jan", "status": "OCZEKUJE", "companion": "TAK"},
                    {"id": 2, "token": "DEF456ZW", "name": "Anna", "status": "OCZEKUJE", "companion": ""},
                    {"id": 3, "token": "GHJ789QP", "name": "Piotr", "status": "OCZEKUJE", "companion": ""}
                ],
                "metadata": {"totalGuests": 3}
            }"#,
        )
        .unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn init_then_view_matches_the_seed_count() {
        let seed = write_temp_seed("roundtrip.json");
        let state = test_state(&seed);

        let response = init_data_handler(State(state.clone()), Query(InitQuery { force: false }))
            .await
            .unwrap();
        assert_eq!(response.0.guest_count, 3);

        let view = admin_view_handler(
            State(state),
            Json(AdminViewRequest {
                admin_token: ADMIN.to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(view.0.guests.len(), 3);

        fs::remove_file(&seed).unwrap();
    }

    #[tokio::test]
    async fn second_init_without_force_is_rejected() {
        let seed = write_temp_seed("guard.json");
        let state = test_state(&seed);

        init_data_handler(State(state.clone()), Query(InitQuery { force: false }))
            .await
            .unwrap();

        let error = init_data_handler(State(state.clone()), Query(InitQuery { force: false }))
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            AppError::BadRequest("Data already initialized. Use force=true to reinitialize.")
        ));

        // force overwrites any interim edits with the seed
        submit_rsvp_handler(
            State(state.clone()),
            Json(rsvp_request(json!({ "token": "ABC123XY", "status": "TAK" }))),
        )
        .await
        .unwrap();

        init_data_handler(State(state.clone()), Query(InitQuery { force: true }))
            .await
            .unwrap();

        let collection = state.store.get().await.unwrap().unwrap();
        assert_eq!(collection.guests[0].status, RsvpStatus::Pending);

        fs::remove_file(&seed).unwrap();
    }

    #[tokio::test]
    async fn init_with_a_missing_seed_is_internal() {
        let state = test_state("/nonexistent/guests_data.json");

        let error = init_data_handler(State(state), Query(InitQuery { force: false }))
            .await
            .unwrap_err();

        assert!(matches!(error, AppError::Internal(_)));
    }
}
