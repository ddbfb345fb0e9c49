// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] ValidationErrors),

    // Validações manuais (fora do derive), já com a mensagem pronta
    #[error("{0}")]
    InvalidInput(String),

    #[error("Sessão ausente ou expirada")]
    Unauthenticated,

    #[error("Acesso restrito a administradores")]
    Unauthorized,

    #[error("Sem permissão para esta máquina")]
    Forbidden,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Mantenedor não encontrado ou inativo")]
    MaintainerNotFound,

    #[error("Máquina não encontrada")]
    MachineNotFound,

    #[error("Template não encontrado")]
    TemplateNotFound,

    #[error("Inspeção não encontrada")]
    InspectionNotFound,

    #[error("Pergunta {0} não existe nesta inspeção")]
    QuestionNotFound(String),

    #[error("Registro não encontrado")]
    NotFound,

    #[error("A máquina não possui template definido")]
    TemplateNotDefined,

    #[error("Item {0} não pertence ao template da máquina")]
    InvalidTemplateItem(String),

    #[error("Item {0} respondido mais de uma vez")]
    DuplicateTemplateItem(String),

    #[error("Já existe uma máquina com esta TAG")]
    TagAlreadyExists,

    #[error("Já existe um mantenedor com esta matrícula")]
    MatriculaAlreadyExists,

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Erro de E/S: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Fonte não encontrada: {0}")]
    FontNotFound(String),

    #[error("Falha ao gerar PDF: {0}")]
    PdfError(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::TemplateNotDefined => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthenticated | AppError::Unauthorized | AppError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden | AppError::MaintainerNotFound => StatusCode::FORBIDDEN,
            AppError::MachineNotFound
            | AppError::TemplateNotFound
            | AppError::InspectionNotFound
            | AppError::QuestionNotFound(_)
            | AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::InvalidTemplateItem(_) | AppError::DuplicateTemplateItem(_) => StatusCode::BAD_REQUEST,
            AppError::TagAlreadyExists | AppError::MatriculaAlreadyExists | AppError::EmailAlreadyExists => {
                StatusCode::CONFLICT
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Código curto, legível por máquina, devolvido no campo `error`.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) | AppError::InvalidInput(_) => "VALIDATION_ERROR",
            AppError::Unauthenticated => "UNAUTHENTICATED",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::MaintainerNotFound => "MAINTAINER_NOT_FOUND",
            AppError::MachineNotFound => "MACHINE_NOT_FOUND",
            AppError::TemplateNotFound => "TEMPLATE_NOT_FOUND",
            AppError::InspectionNotFound => "INSPECTION_NOT_FOUND",
            AppError::QuestionNotFound(_) => "QUESTION_NOT_FOUND",
            AppError::NotFound => "NOT_FOUND",
            AppError::TemplateNotDefined => "TEMPLATE_NOT_DEFINED",
            AppError::InvalidTemplateItem(_) => "INVALID_TEMPLATE_ITEM",
            AppError::DuplicateTemplateItem(_) => "DUPLICATE_TEMPLATE_ITEM",
            AppError::TagAlreadyExists => "TAG_ALREADY_EXISTS",
            AppError::MatriculaAlreadyExists => "MATRICULA_ALREADY_EXISTS",
            AppError::EmailAlreadyExists => "EMAIL_ALREADY_EXISTS",
            _ => "INTERNAL_ERROR",
        }
    }

    /// Converte violação de chave única no erro de conflito informado.
    pub fn from_unique(e: sqlx::Error, conflict: AppError) -> AppError {
        if let Some(db_err) = e.as_database_error() {
            if db_err.is_unique_violation() {
                return conflict;
            }
        }
        AppError::DatabaseError(e)
    }
}

/// Primeira mensagem de validação, em ordem estável de campos.
pub fn first_validation_message(errors: &ValidationErrors) -> Option<String> {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in fields {
        let found = match kind {
            ValidationErrorsKind::Field(list) => list.first().map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Campo '{}' inválido.", field))
            }),
            ValidationErrorsKind::Struct(inner) => first_validation_message(inner),
            ValidationErrorsKind::List(items) => items.values().find_map(|inner| first_validation_message(inner)),
        };
        if found.is_some() {
            return found;
        }
    }
    None
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::ValidationError(errors) => {
                first_validation_message(errors).unwrap_or_else(|| "Um ou mais campos são inválidos.".to_string())
            }
            e if status == StatusCode::INTERNAL_SERVER_ERROR => {
                // O detalhe fica no log; o cliente recebe só a mensagem do erro
                tracing::error!("Erro Interno do Servidor: {}", e);
                e.to_string()
            }
            e => e.to_string(),
        };

        let body = Json(json!({ "error": self.code(), "message": message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Payload {
        #[validate(length(min = 1, message = "A TAG é obrigatória."))]
        tag: String,
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::MaintainerNotFound.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::MachineNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::TemplateNotDefined.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(AppError::DuplicateTemplateItem("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::TagAlreadyExists.status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::InternalServerError(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_codes() {
        assert_eq!(AppError::MachineNotFound.code(), "MACHINE_NOT_FOUND");
        assert_eq!(AppError::InvalidTemplateItem("a".into()).code(), "INVALID_TEMPLATE_ITEM");
        assert_eq!(AppError::PdfError("x".into()).code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_first_validation_message() {
        let payload = Payload { tag: String::new() };
        let errors = payload.validate().unwrap_err();
        assert_eq!(first_validation_message(&errors).as_deref(), Some("A TAG é obrigatória."));

        let err = AppError::ValidationError(errors);
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
