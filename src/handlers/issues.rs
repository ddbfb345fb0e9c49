// src/handlers/issues.rs

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::session::AdminSession,
    models::issue::{Issue, IssueFilter},
};

#[utoipa::path(
    get,
    path = "/api/issues",
    tag = "Issues",
    params(IssueFilter),
    responses((status = 200, description = "Histórico de não conformidades", body = Vec<Issue>)),
    security(("admin_session" = []))
)]
pub async fn list_issues(
    State(app_state): State<AppState>,
    _admin: AdminSession,
    Query(filter): Query<IssueFilter>,
) -> Result<impl IntoResponse, AppError> {
    let issues = app_state.issue_repo.list(&filter).await?;
    Ok(Json(issues))
}
