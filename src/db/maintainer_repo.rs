// src/db/maintainer_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::maintainer::{CreateMaintainerPayload, Maintainer, UpdateMaintainerPayload},
};

#[derive(Clone)]
pub struct MaintainerRepository {
    pool: PgPool,
}

impl MaintainerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn list(&self) -> Result<Vec<Maintainer>, AppError> {
        let list = sqlx::query_as::<_, Maintainer>("SELECT * FROM mantenedores ORDER BY nome ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(list)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Maintainer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let maintainer = sqlx::query_as::<_, Maintainer>("SELECT * FROM mantenedores WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(maintainer)
    }

    pub async fn find_by_matricula(&self, matricula: &str) -> Result<Option<Maintainer>, AppError> {
        let maintainer = sqlx::query_as::<_, Maintainer>("SELECT * FROM mantenedores WHERE matricula = $1")
            .bind(matricula)
            .fetch_optional(&self.pool)
            .await?;
        Ok(maintainer)
    }

    pub async fn create(&self, input: &CreateMaintainerPayload, password_hash: &str) -> Result<Maintainer, AppError> {
        sqlx::query_as::<_, Maintainer>(
            r#"
            INSERT INTO mantenedores (id, matricula, nome, setor, lac, ativo, password_hash, machines)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.matricula.trim())
        .bind(input.nome.trim())
        .bind(&input.setor)
        .bind(&input.lac)
        .bind(input.ativo)
        .bind(password_hash)
        .bind(&input.machines)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_unique(e, AppError::MatriculaAlreadyExists))
    }

    // `password_hash = None` mantém a senha atual
    pub async fn update(
        &self,
        id: Uuid,
        input: &UpdateMaintainerPayload,
        password_hash: Option<&str>,
    ) -> Result<Option<Maintainer>, AppError> {
        sqlx::query_as::<_, Maintainer>(
            r#"
            UPDATE mantenedores
            SET matricula = $2, nome = $3, setor = $4, lac = $5, ativo = $6,
                password_hash = COALESCE($7, password_hash),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(input.matricula.trim())
        .bind(input.nome.trim())
        .bind(&input.setor)
        .bind(&input.lac)
        .bind(input.ativo)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::from_unique(e, AppError::MatriculaAlreadyExists))
    }

    pub async fn set_machines(&self, id: Uuid, machines: &[Uuid]) -> Result<Option<Maintainer>, AppError> {
        let maintainer = sqlx::query_as::<_, Maintainer>(
            "UPDATE mantenedores SET machines = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(machines)
        .fetch_optional(&self.pool)
        .await?;
        Ok(maintainer)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM mantenedores WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
