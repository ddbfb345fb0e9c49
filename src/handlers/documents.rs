// src/handlers/documents.rs

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::{common::error::AppError, config::AppState, middleware::session::AdminSession};

#[utoipa::path(
    get,
    path = "/api/inspecoes/{id}/pdf",
    tag = "Inspeções",
    params(("id" = Uuid, Path, description = "ID da inspeção")),
    responses(
        (status = 200, description = "Relatório em PDF", content_type = "application/pdf"),
        (status = 404, description = "Inspeção não encontrada")
    ),
    security(("admin_session" = []))
)]
pub async fn inspection_pdf(
    State(app_state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let inspection = app_state.inspection_service.get(id).await?;
    let (filename, pdf_bytes) = app_state.document_service.generate_inspection_pdf(&inspection).await?;

    // O navegador mostra o PDF e usa o nome sugerido ao salvar
    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (header::CONTENT_DISPOSITION, format!("inline; filename=\"{}\"", filename)),
    ];

    Ok((headers, pdf_bytes).into_response())
}
