// src/services/template_service.rs

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::TemplateRepository,
    models::template::{build_template_items, Template, TemplatePayload},
};

#[derive(Clone)]
pub struct TemplateService {
    repo: TemplateRepository,
}

impl TemplateService {
    pub fn new(repo: TemplateRepository) -> Self {
        Self { repo }
    }

    pub async fn list(&self) -> Result<Vec<Template>, AppError> {
        self.repo.list().await
    }

    pub async fn get(&self, id: Uuid) -> Result<Template, AppError> {
        self.repo
            .find_by_id(self.repo.pool(), id)
            .await?
            .ok_or(AppError::TemplateNotFound)
    }

    /// Itens são renumerados (1..n) e ganham id quando não trazem um.
    pub async fn create(&self, payload: TemplatePayload) -> Result<Template, AppError> {
        let nome = payload.nome.trim().to_string();
        let itens = build_template_items(payload.itens)?;

        let template = self.repo.create(&nome, &itens).await?;
        tracing::info!("Template '{}' criado com {} itens", template.nome, itens.len());
        Ok(template)
    }

    // Ids existentes são preservados: respostas e issues antigas continuam apontando para o item
    pub async fn update(&self, id: Uuid, payload: TemplatePayload) -> Result<Template, AppError> {
        let nome = payload.nome.trim().to_string();
        let itens = build_template_items(payload.itens)?;

        self.repo
            .update(id, &nome, &itens)
            .await?
            .ok_or(AppError::TemplateNotFound)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        if !self.repo.delete(id).await? {
            return Err(AppError::TemplateNotFound);
        }
        Ok(())
    }
}
