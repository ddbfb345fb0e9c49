// src/handlers/templates.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::session::AdminSession,
    models::template::{Template, TemplatePayload},
};

#[utoipa::path(
    get,
    path = "/api/templates",
    tag = "Templates",
    responses((status = 200, description = "Lista de templates", body = Vec<Template>)),
    security(("admin_session" = []))
)]
pub async fn list_templates(
    State(app_state): State<AppState>,
    _admin: AdminSession,
) -> Result<impl IntoResponse, AppError> {
    let templates = app_state.template_service.list().await?;
    Ok(Json(templates))
}

#[utoipa::path(
    post,
    path = "/api/templates",
    tag = "Templates",
    request_body = TemplatePayload,
    responses(
        (status = 201, description = "Template criado", body = Template),
        (status = 400, description = "Itens com id repetido")
    ),
    security(("admin_session" = []))
)]
pub async fn create_template(
    State(app_state): State<AppState>,
    _admin: AdminSession,
    Json(payload): Json<TemplatePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let template = app_state.template_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

#[utoipa::path(
    get,
    path = "/api/templates/{id}",
    tag = "Templates",
    params(("id" = Uuid, Path, description = "ID do template")),
    responses(
        (status = 200, description = "Template", body = Template),
        (status = 404, description = "Template não encontrado")
    ),
    security(("admin_session" = []))
)]
pub async fn get_template(
    State(app_state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let template = app_state.template_service.get(id).await?;
    Ok(Json(template))
}

#[utoipa::path(
    put,
    path = "/api/templates/{id}",
    tag = "Templates",
    request_body = TemplatePayload,
    params(("id" = Uuid, Path, description = "ID do template")),
    responses(
        (status = 200, description = "Template atualizado", body = Template),
        (status = 404, description = "Template não encontrado")
    ),
    security(("admin_session" = []))
)]
pub async fn update_template(
    State(app_state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
    Json(payload): Json<TemplatePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let template = app_state.template_service.update(id, payload).await?;
    Ok(Json(template))
}

#[utoipa::path(
    delete,
    path = "/api/templates/{id}",
    tag = "Templates",
    params(("id" = Uuid, Path, description = "ID do template")),
    responses(
        (status = 204, description = "Template removido"),
        (status = 404, description = "Template não encontrado")
    ),
    security(("admin_session" = []))
)]
pub async fn delete_template(
    State(app_state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.template_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
