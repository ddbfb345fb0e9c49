// src/handlers/inspections.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::session::{AdminSession, MaintainerSession},
    models::inspection::{
        CreateInspectionPayload, Inspection, InspectionFilter, PcmSignPayload, Treatment, TreatmentPayload,
        UpdateInspectionPayload,
    },
};

#[utoipa::path(
    post,
    path = "/api/inspecoes",
    tag = "Inspeções",
    request_body = CreateInspectionPayload,
    responses(
        (status = 201, description = "Inspeção registrada e issues reconciliadas", body = Inspection),
        (status = 400, description = "Item inválido ou repetido"),
        (status = 401, description = "Sem sessão de mantenedor"),
        (status = 403, description = "Mantenedor inativo ou sem permissão para a máquina"),
        (status = 404, description = "Máquina não encontrada"),
        (status = 422, description = "Máquina sem template ou payload inválido")
    ),
    security(("maint_session" = []))
)]
pub async fn create_inspection(
    State(app_state): State<AppState>,
    MaintainerSession(maintainer): MaintainerSession,
    Json(payload): Json<CreateInspectionPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let inspection = app_state.inspection_service.create(&maintainer, payload).await?;
    Ok((StatusCode::CREATED, Json(inspection)))
}

#[utoipa::path(
    get,
    path = "/api/inspecoes",
    tag = "Inspeções",
    params(InspectionFilter),
    responses((status = 200, description = "Inspeções, mais recentes primeiro", body = Vec<Inspection>)),
    security(("admin_session" = []))
)]
pub async fn list_inspections(
    State(app_state): State<AppState>,
    _admin: AdminSession,
    Query(filter): Query<InspectionFilter>,
) -> Result<impl IntoResponse, AppError> {
    let inspections = app_state.inspection_service.list(&filter).await?;
    Ok(Json(inspections))
}

#[utoipa::path(
    get,
    path = "/api/inspecoes/pending-sign",
    tag = "Inspeções",
    responses((status = 200, description = "Inspeções sem assinatura do PCM", body = Vec<Inspection>)),
    security(("admin_session" = []))
)]
pub async fn list_pending_sign(
    State(app_state): State<AppState>,
    _admin: AdminSession,
) -> Result<impl IntoResponse, AppError> {
    let inspections = app_state.inspection_service.list_pending_sign().await?;
    Ok(Json(inspections))
}

#[utoipa::path(
    get,
    path = "/api/inspecoes/{id}",
    tag = "Inspeções",
    params(("id" = Uuid, Path, description = "ID da inspeção")),
    responses(
        (status = 200, description = "Inspeção com respostas normalizadas", body = Inspection),
        (status = 404, description = "Inspeção não encontrada")
    ),
    security(("admin_session" = []))
)]
pub async fn get_inspection(
    State(app_state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let inspection = app_state.inspection_service.get(id).await?;
    Ok(Json(inspection))
}

#[utoipa::path(
    patch,
    path = "/api/inspecoes/{id}",
    tag = "Inspeções",
    request_body = UpdateInspectionPayload,
    params(("id" = Uuid, Path, description = "ID da inspeção")),
    responses(
        (status = 200, description = "Inspeção editada e issues reconciliadas", body = Inspection),
        (status = 404, description = "Inspeção não encontrada")
    ),
    security(("admin_session" = []))
)]
pub async fn update_inspection(
    State(app_state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateInspectionPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let inspection = app_state.inspection_service.update(id, payload).await?;
    Ok(Json(inspection))
}

#[utoipa::path(
    patch,
    path = "/api/inspecoes/{id}/pcm-sign",
    tag = "Inspeções",
    request_body = PcmSignPayload,
    params(("id" = Uuid, Path, description = "ID da inspeção")),
    responses(
        (status = 200, description = "Inspeção assinada pelo PCM", body = Inspection),
        (status = 404, description = "Inspeção não encontrada")
    ),
    security(("admin_session" = []))
)]
pub async fn pcm_sign(
    State(app_state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
    Json(payload): Json<PcmSignPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let inspection = app_state.inspection_service.pcm_sign(id, payload).await?;
    Ok(Json(inspection))
}

#[utoipa::path(
    patch,
    path = "/api/inspecoes/{id}/treatments",
    tag = "Inspeções",
    request_body = TreatmentPayload,
    params(("id" = Uuid, Path, description = "ID da inspeção")),
    responses(
        (status = 200, description = "Tratativas da inspeção após a atualização", body = Vec<Treatment>),
        (status = 404, description = "Inspeção ou pergunta não encontrada")
    ),
    security(("admin_session" = []))
)]
pub async fn update_treatment(
    State(app_state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
    Json(payload): Json<TreatmentPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let treatments = app_state.inspection_service.update_treatment(id, payload).await?;
    Ok(Json(treatments))
}
