// src/handlers/maint_auth.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_extra::extract::PrivateCookieJar;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::session::{removal_cookie, session_cookie, MaintainerSession, MAINTAINER_COOKIE},
    models::{auth::MaintainerLoginPayload, maintainer::Maintainer},
};

#[utoipa::path(
    post,
    path = "/api/auth/maint/login",
    tag = "Mantenedor",
    request_body = MaintainerLoginPayload,
    responses(
        (status = 200, description = "Sessão iniciada (cookie maint_session)", body = Maintainer),
        (status = 401, description = "Matrícula ou senha inválidas")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    jar: PrivateCookieJar,
    Json(payload): Json<MaintainerLoginPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let (maintainer, token) = app_state.maint_auth.login(&payload.matricula, &payload.senha).await?;
    let jar = jar.add(session_cookie(MAINTAINER_COOKIE, token, app_state.config.cookie_secure));

    Ok((jar, Json(maintainer)))
}

#[utoipa::path(
    get,
    path = "/api/auth/maint/me",
    tag = "Mantenedor",
    responses(
        (status = 200, description = "Mantenedor da sessão atual", body = Maintainer),
        (status = 401, description = "Sem sessão"),
        (status = 403, description = "Mantenedor removido ou inativo")
    ),
    security(("maint_session" = []))
)]
pub async fn me(MaintainerSession(maintainer): MaintainerSession) -> Json<Maintainer> {
    Json(maintainer)
}

#[utoipa::path(
    post,
    path = "/api/auth/maint/logout",
    tag = "Mantenedor",
    responses((status = 204, description = "Sessão encerrada"))
)]
pub async fn logout(jar: PrivateCookieJar) -> impl IntoResponse {
    (jar.remove(removal_cookie(MAINTAINER_COOKIE)), StatusCode::NO_CONTENT)
}
