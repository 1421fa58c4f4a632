//! Account workflow: register → pending queue → admin approval → login.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use diptych_store::{LoginOutcome, StoreError, UserAccount};

use crate::error::ApiError;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AccountView {
    pub username: String,
    pub active: bool,
    pub pending: bool,
    pub paid: bool,
    pub admin: bool,
}

impl From<UserAccount> for AccountView {
    fn from(a: UserAccount) -> Self {
        Self {
            username: a.username,
            active: a.active,
            pending: a.pending,
            paid: a.paid,
            admin: a.admin,
        }
    }
}

pub async fn register(
    State(state): State<SharedState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<AccountView>, ApiError> {
    if credentials.username.trim().is_empty() || credentials.password.is_empty() {
        return Err(ApiError::bad_request("username and password are required"));
    }
    match state.accounts.register(&credentials.username, &credentials.password) {
        Ok(account) => Ok(Json(account.into())),
        Err(StoreError::AlreadyExists(_)) => Err(ApiError::conflict("username already taken")),
        Err(err) => Err(ApiError::internal(err.to_string())),
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoginResponse {
    Ok { account: AccountView },
    Pending,
}

pub async fn login(
    State(state): State<SharedState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<LoginResponse>, ApiError> {
    match state.accounts.login(&credentials.username, &credentials.password) {
        LoginOutcome::Success(account) => Ok(Json(LoginResponse::Ok { account: account.into() })),
        LoginOutcome::PendingApproval => Ok(Json(LoginResponse::Pending)),
        LoginOutcome::Invalid => Err(ApiError::unauthorized("invalid credentials")),
    }
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub username: String,
}

pub async fn approve(
    State(state): State<SharedState>,
    Json(request): Json<ApproveRequest>,
) -> Result<Json<AccountView>, ApiError> {
    state
        .accounts
        .approve(&request.username)
        .map_err(|e| ApiError::not_found(e.to_string()))?;
    let account = state
        .accounts
        .accounts()
        .into_iter()
        .find(|a| a.username == request.username)
        .ok_or_else(|| ApiError::not_found("account vanished"))?;
    Ok(Json(account.into()))
}

pub async fn pending(State(state): State<SharedState>) -> Json<Vec<AccountView>> {
    Json(
        state
            .accounts
            .pending_accounts()
            .into_iter()
            .map(AccountView::from)
            .collect(),
    )
}
