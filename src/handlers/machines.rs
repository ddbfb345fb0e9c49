// src/handlers/machines.rs

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
    models::machine::{Machine, MachinePayload},
};

#[utoipa::path(
    get,
    path = "/api/machines",
    tag = "Máquinas",
    responses((status = 200, description = "Lista de máquinas", body = Vec<Machine>)),
    security(("admin_session" = []))
)]
pub async fn list_machines(
    State(app_state): State<AppState>,
    _admin: AdminSession,
) -> Result<impl IntoResponse, AppError> {
    let machines = app_state.machine_service.list().await?;
    Ok(Json(machines))
}

#[utoipa::path(
    post,
    path = "/api/machines",
    tag = "Máquinas",
    request_body = MachinePayload,
    responses(
        (status = 201, description = "Máquina cadastrada", body = Machine),
        (status = 409, description = "TAG já existe")
    ),
    security(("admin_session" = []))
)]
pub async fn create_machine(
    State(app_state): State<AppState>,
    _admin: AdminSession,
    Json(payload): Json<MachinePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let machine = app_state.machine_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(machine)))
}

#[utoipa::path(
    get,
    path = "/api/machines/{id}",
    tag = "Máquinas",
    params(("id" = Uuid, Path, description = "ID da máquina")),
    responses(
        (status = 200, description = "Máquina", body = Machine),
        (status = 404, description = "Máquina não encontrada")
    ),
    security(("admin_session" = []))
)]
pub async fn get_machine(
    State(app_state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let machine = app_state.machine_service.get(id).await?;
    Ok(Json(machine))
}

#[utoipa::path(
    put,
    path = "/api/machines/{id}",
    tag = "Máquinas",
    request_body = MachinePayload,
    params(("id" = Uuid, Path, description = "ID da máquina")),
    responses(
        (status = 200, description = "Máquina atualizada", body = Machine),
        (status = 404, description = "Máquina não encontrada"),
        (status = 409, description = "TAG já existe")
    ),
    security(("admin_session" = []))
)]
pub async fn update_machine(
    State(app_state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
    Json(payload): Json<MachinePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let machine = app_state.machine_service.update(id, payload).await?;
    Ok(Json(machine))
}

#[utoipa::path(
    delete,
    path = "/api/machines/{id}",
    tag = "Máquinas",
    params(("id" = Uuid, Path, description = "ID da máquina")),
    responses(
        (status = 204, description = "Máquina removida"),
        (status = 404, description = "Máquina não encontrada")
    ),
    security(("admin_session" = []))
)]
pub async fn delete_machine(
    State(app_state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.machine_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
