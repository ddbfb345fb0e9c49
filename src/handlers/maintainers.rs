// src/handlers/maintainers.rs

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
    models::{
        machine::Machine,
        maintainer::{CreateMaintainerPayload, Maintainer, MaintainerMachines, UpdateMaintainerPayload},
    },
};

#[utoipa::path(
    get,
    path = "/api/mantenedores",
    tag = "Mantenedores",
    responses((status = 200, description = "Lista de mantenedores", body = Vec<Maintainer>)),
    security(("admin_session" = []))
)]
pub async fn list_maintainers(
    State(app_state): State<AppState>,
    _admin: AdminSession,
) -> Result<impl IntoResponse, AppError> {
    let maintainers = app_state.maintainer_service.list().await?;
    Ok(Json(maintainers))
}

#[utoipa::path(
    post,
    path = "/api/mantenedores",
    tag = "Mantenedores",
    request_body = CreateMaintainerPayload,
    responses(
        (status = 201, description = "Mantenedor cadastrado", body = Maintainer),
        (status = 409, description = "Matrícula já existe")
    ),
    security(("admin_session" = []))
)]
pub async fn create_maintainer(
    State(app_state): State<AppState>,
    _admin: AdminSession,
    Json(payload): Json<CreateMaintainerPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let maintainer = app_state.maintainer_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(maintainer)))
}

#[utoipa::path(
    get,
    path = "/api/mantenedores/{id}",
    tag = "Mantenedores",
    params(("id" = Uuid, Path, description = "ID do mantenedor")),
    responses(
        (status = 200, description = "Mantenedor", body = Maintainer),
        (status = 404, description = "Mantenedor não encontrado")
    ),
    security(("admin_session" = []))
)]
pub async fn get_maintainer(
    State(app_state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let maintainer = app_state.maintainer_service.get(id).await?;
    Ok(Json(maintainer))
}

#[utoipa::path(
    put,
    path = "/api/mantenedores/{id}",
    tag = "Mantenedores",
    request_body = UpdateMaintainerPayload,
    params(("id" = Uuid, Path, description = "ID do mantenedor")),
    responses(
        (status = 200, description = "Mantenedor atualizado", body = Maintainer),
        (status = 404, description = "Mantenedor não encontrado"),
        (status = 409, description = "Matrícula já existe")
    ),
    security(("admin_session" = []))
)]
pub async fn update_maintainer(
    State(app_state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMaintainerPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let maintainer = app_state.maintainer_service.update(id, payload).await?;
    Ok(Json(maintainer))
}

#[utoipa::path(
    delete,
    path = "/api/mantenedores/{id}",
    tag = "Mantenedores",
    params(("id" = Uuid, Path, description = "ID do mantenedor")),
    responses(
        (status = 204, description = "Mantenedor removido"),
        (status = 404, description = "Mantenedor não encontrado")
    ),
    security(("admin_session" = []))
)]
pub async fn delete_maintainer(
    State(app_state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.maintainer_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/mantenedores/{id}/machines",
    tag = "Mantenedores",
    params(("id" = Uuid, Path, description = "ID do mantenedor")),
    responses((status = 200, description = "Máquinas atribuídas", body = Vec<Machine>)),
    security(("admin_session" = []))
)]
pub async fn get_maintainer_machines(
    State(app_state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let machines = app_state.maintainer_service.machines(id).await?;
    Ok(Json(machines))
}

#[utoipa::path(
    put,
    path = "/api/mantenedores/{id}/machines",
    tag = "Mantenedores",
    request_body = MaintainerMachines,
    params(("id" = Uuid, Path, description = "ID do mantenedor")),
    responses(
        (status = 200, description = "Lista de máquinas substituída", body = Maintainer),
        (status = 404, description = "Mantenedor não encontrado")
    ),
    security(("admin_session" = []))
)]
pub async fn set_maintainer_machines(
    State(app_state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
    Json(payload): Json<MaintainerMachines>,
) -> Result<impl IntoResponse, AppError> {
    let maintainer = app_state.maintainer_service.assign_machines(id, &payload.machines).await?;
    Ok(Json(maintainer))
}
