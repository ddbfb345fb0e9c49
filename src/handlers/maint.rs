// src/handlers/maint.rs

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::session::MaintainerSession,
    models::machine::{Machine, MachineChecklist},
};

#[utoipa::path(
    get,
    path = "/api/maint/machines",
    tag = "Mantenedor",
    responses((status = 200, description = "Máquinas ativas atribuídas ao mantenedor", body = Vec<Machine>)),
    security(("maint_session" = []))
)]
pub async fn my_machines(
    State(app_state): State<AppState>,
    MaintainerSession(maintainer): MaintainerSession,
) -> Result<impl IntoResponse, AppError> {
    let machines = app_state.machine_service.list_for_maintainer(&maintainer).await?;
    Ok(Json(machines))
}

#[utoipa::path(
    get,
    path = "/api/maint/machines/{tag}",
    tag = "Mantenedor",
    params(("tag" = String, Path, description = "TAG da máquina")),
    responses(
        (status = 200, description = "Máquina, template e issues abertas", body = MachineChecklist),
        (status = 403, description = "Máquina não atribuída ao mantenedor"),
        (status = 404, description = "Máquina não encontrada")
    ),
    security(("maint_session" = []))
)]
pub async fn machine_checklist(
    State(app_state): State<AppState>,
    MaintainerSession(maintainer): MaintainerSession,
    Path(tag): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let checklist = app_state.machine_service.checklist_for_maintainer(&maintainer, &tag).await?;
    Ok(Json(checklist))
}
