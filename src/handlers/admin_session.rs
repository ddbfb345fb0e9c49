// src/handlers/admin_session.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_extra::extract::SignedCookieJar;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::session::{removal_cookie, session_cookie, AdminSession, ADMIN_COOKIE},
    models::auth::{Admin, AdminLoginPayload},
};

#[utoipa::path(
    post,
    path = "/api/admin-session",
    tag = "Sessão",
    request_body = AdminLoginPayload,
    responses(
        (status = 200, description = "Sessão iniciada (cookie admin_session)", body = Admin),
        (status = 401, description = "Credenciais inválidas")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    jar: SignedCookieJar,
    Json(payload): Json<AdminLoginPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let (admin, token) = app_state.admin_auth.login(&payload.email, &payload.password).await?;
    let jar = jar.add(session_cookie(ADMIN_COOKIE, token, app_state.config.cookie_secure));

    Ok((jar, Json(admin)))
}

#[utoipa::path(
    get,
    path = "/api/admin-session",
    tag = "Sessão",
    responses(
        (status = 200, description = "Administrador da sessão atual", body = Admin),
        (status = 401, description = "Sem sessão")
    ),
    security(("admin_session" = []))
)]
pub async fn current(AdminSession(admin): AdminSession) -> Json<Admin> {
    Json(admin)
}

#[utoipa::path(
    delete,
    path = "/api/admin-session",
    tag = "Sessão",
    responses((status = 204, description = "Sessão encerrada"))
)]
pub async fn logout(jar: SignedCookieJar) -> impl IntoResponse {
    (jar.remove(removal_cookie(ADMIN_COOKIE)), StatusCode::NO_CONTENT)
}
