// src/db/machine_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::machine::{Machine, MachinePayload},
};

const MACHINE_COLUMNS: &str =
    "id, tag, nome, setor, unidade, local_unidade, lac, foto_url, template_id, ativo, created_at, updated_at";

// Responsável pela tabela 'machines'. A tabela legada 'maquinas' só é lida,
// como fallback quando o registro não existe na tabela nova.
#[derive(Clone)]
pub struct MachineRepository {
    pool: PgPool,
}

impl MachineRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn list(&self) -> Result<Vec<Machine>, AppError> {
        let sql = format!(
            "SELECT {cols} FROM machines
             UNION ALL
             SELECT {cols} FROM maquinas m WHERE NOT EXISTS (SELECT 1 FROM machines WHERE tag = m.tag)
             ORDER BY tag ASC",
            cols = MACHINE_COLUMNS
        );
        let machines = sqlx::query_as::<_, Machine>(&sql).fetch_all(&self.pool).await?;
        Ok(machines)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Machine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {cols} FROM machines WHERE id = $1
             UNION ALL
             SELECT {cols} FROM maquinas WHERE id = $1 AND NOT EXISTS (SELECT 1 FROM machines WHERE id = $1)
             LIMIT 1",
            cols = MACHINE_COLUMNS
        );
        let machine = sqlx::query_as::<_, Machine>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(machine)
    }

    pub async fn find_by_tag<'e, E>(&self, executor: E, tag: &str) -> Result<Option<Machine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {cols} FROM machines WHERE tag = $1
             UNION ALL
             SELECT {cols} FROM maquinas WHERE tag = $1 AND NOT EXISTS (SELECT 1 FROM machines WHERE tag = $1)
             LIMIT 1",
            cols = MACHINE_COLUMNS
        );
        let machine = sqlx::query_as::<_, Machine>(&sql)
            .bind(tag)
            .fetch_optional(executor)
            .await?;
        Ok(machine)
    }

    pub async fn list_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Machine>, AppError> {
        let sql = format!(
            "SELECT {cols} FROM machines WHERE id = ANY($1)
             UNION ALL
             SELECT {cols} FROM maquinas m WHERE m.id = ANY($1) AND NOT EXISTS (SELECT 1 FROM machines WHERE id = m.id)
             ORDER BY tag ASC",
            cols = MACHINE_COLUMNS
        );
        let machines = sqlx::query_as::<_, Machine>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(machines)
    }

    pub async fn create(&self, input: &MachinePayload) -> Result<Machine, AppError> {
        let sql = format!(
            "INSERT INTO machines (id, tag, nome, setor, unidade, local_unidade, lac, foto_url, template_id, ativo)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {}",
            MACHINE_COLUMNS
        );
        sqlx::query_as::<_, Machine>(&sql)
            .bind(Uuid::new_v4())
            .bind(input.tag.trim())
            .bind(input.nome.trim())
            .bind(&input.setor)
            .bind(&input.unidade)
            .bind(&input.local_unidade)
            .bind(&input.lac)
            .bind(&input.foto_url)
            .bind(input.template_id)
            .bind(input.ativo)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::from_unique(e, AppError::TagAlreadyExists))
    }

    pub async fn update(&self, id: Uuid, input: &MachinePayload) -> Result<Option<Machine>, AppError> {
        let sql = format!(
            "UPDATE machines
             SET tag = $2, nome = $3, setor = $4, unidade = $5, local_unidade = $6, lac = $7,
                 foto_url = $8, template_id = $9, ativo = $10, updated_at = NOW()
             WHERE id = $1
             RETURNING {}",
            MACHINE_COLUMNS
        );
        sqlx::query_as::<_, Machine>(&sql)
            .bind(id)
            .bind(input.tag.trim())
            .bind(input.nome.trim())
            .bind(&input.setor)
            .bind(&input.unidade)
            .bind(&input.local_unidade)
            .bind(&input.lac)
            .bind(&input.foto_url)
            .bind(input.template_id)
            .bind(input.ativo)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::from_unique(e, AppError::TagAlreadyExists))
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM machines WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
