// src/db/template_repo.rs

use sqlx::{types::Json, Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::template::{Template, TemplateItem},
};

#[derive(Clone)]
pub struct TemplateRepository {
    pool: PgPool,
}

impl TemplateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn list(&self) -> Result<Vec<Template>, AppError> {
        let templates = sqlx::query_as::<_, Template>("SELECT * FROM templates ORDER BY nome ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(templates)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Template>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let template = sqlx::query_as::<_, Template>("SELECT * FROM templates WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(template)
    }

    pub async fn create(&self, nome: &str, itens: &[TemplateItem]) -> Result<Template, AppError> {
        let template = sqlx::query_as::<_, Template>(
            "INSERT INTO templates (id, nome, itens) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(nome)
        .bind(Json(itens))
        .fetch_one(&self.pool)
        .await?;
        Ok(template)
    }

    // Substitui o documento inteiro; os ids dos itens já vêm resolvidos
    pub async fn update(&self, id: Uuid, nome: &str, itens: &[TemplateItem]) -> Result<Option<Template>, AppError> {
        let template = sqlx::query_as::<_, Template>(
            r#"
            UPDATE templates
            SET nome = $2, itens = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(nome)
        .bind(Json(itens))
        .fetch_optional(&self.pool)
        .await?;
        Ok(template)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM templates WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
