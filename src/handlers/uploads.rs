// src/handlers/uploads.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::{data_url::validate_data_url, error::AppError},
    config::AppState,
    middleware::session::AdminSession,
    services::image_store::{upload_data_url, FOLDER_MACHINES, FOLDER_TEMPLATES},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadPayload {
    #[validate(custom(function = "validate_data_url"))]
    pub data_url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub url: String,
}

#[utoipa::path(
    post,
    path = "/api/uploads/{folder}",
    tag = "Uploads",
    request_body = UploadPayload,
    params(("folder" = String, Path, description = "machines | templates")),
    responses(
        (status = 201, description = "Imagem salva", body = UploadResponse),
        (status = 404, description = "Pasta desconhecida")
    ),
    security(("admin_session" = []))
)]
pub async fn upload_image(
    State(app_state): State<AppState>,
    _admin: AdminSession,
    Path(folder): Path<String>,
    Json(payload): Json<UploadPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let folder = match folder.as_str() {
        "machines" => FOLDER_MACHINES,
        "templates" => FOLDER_TEMPLATES,
        _ => return Err(AppError::NotFound),
    };

    let url = upload_data_url(app_state.images.as_ref(), folder, &payload.data_url).await?;
    Ok((StatusCode::CREATED, Json(UploadResponse { url })))
}
