// src/middleware/session.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::{
    cookie::{Cookie, SameSite},
    PrivateCookieJar, SignedCookieJar,
};

use crate::{
    common::error::AppError,
    config::AppState,
    models::{auth::Admin, maintainer::Maintainer},
    services::auth::{SessionValidator, SESSION_DAYS},
};

pub const ADMIN_COOKIE: &str = "admin_session";
pub const MAINTAINER_COOKIE: &str = "maint_session";

/// Monta o cookie de sessão (HttpOnly, 7 dias).
pub fn session_cookie(name: &'static str, token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(SESSION_DAYS))
        .build()
}

// Remoção precisa do mesmo path usado na criação
pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build(name).path("/").build()
}

/// Extrator para rotas de administrador (cookie assinado).
pub struct AdminSession(pub Admin);

impl<S> FromRequestParts<S> for AdminSession
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let jar = SignedCookieJar::from_headers(&parts.headers, app_state.cookie_key.clone());

        let token = jar
            .get(ADMIN_COOKIE)
            .map(|c| c.value().to_owned())
            .ok_or(AppError::Unauthorized)?;

        // Cookie adulterado ou expirado em rota de admin também é 401
        let admin = app_state
            .admin_auth
            .validate(&token)
            .await
            .map_err(|e| match e {
                AppError::Unauthenticated => AppError::Unauthorized,
                other => other,
            })?;

        Ok(AdminSession(admin))
    }
}

/// Extrator para rotas do mantenedor (cookie criptografado).
pub struct MaintainerSession(pub Maintainer);

impl<S> FromRequestParts<S> for MaintainerSession
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let jar = PrivateCookieJar::from_headers(&parts.headers, app_state.cookie_key.clone());

        let token = jar
            .get(MAINTAINER_COOKIE)
            .map(|c| c.value().to_owned())
            .ok_or(AppError::Unauthenticated)?;

        let maintainer = app_state.maint_auth.validate(&token).await?;
        Ok(MaintainerSession(maintainer))
    }
}
