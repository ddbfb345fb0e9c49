// src/db/issue_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::issue::{Issue, IssueFilter, IssueStatus},
};

#[derive(Clone)]
pub struct IssueRepository {
    pool: PgPool,
}

impl IssueRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Serializa, até o fim da transação, quem mexe nas issues desta máquina.
    pub async fn lock_machine<'e, E>(&self, executor: E, machine_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(machine_id.to_string())
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn list_open_for_machine<'e, E>(&self, executor: E, machine_id: Uuid) -> Result<Vec<Issue>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let issues = sqlx::query_as::<_, Issue>(
            r#"
            SELECT * FROM issues
            WHERE machine_id = $1 AND status = 'aberta'
            ORDER BY created_at ASC
            "#,
        )
        .bind(machine_id)
        .fetch_all(executor)
        .await?;
        Ok(issues)
    }

    pub async fn list(&self, filter: &IssueFilter) -> Result<Vec<Issue>, AppError> {
        let issues = sqlx::query_as::<_, Issue>(
            r#"
            SELECT * FROM issues
            WHERE ($1::uuid IS NULL OR machine_id = $1)
              AND ($2::issue_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.machine_id)
        .bind(filter.status)
        .fetch_all(&self.pool)
        .await?;
        Ok(issues)
    }

    pub async fn insert<'e, E>(&self, executor: E, issue: &Issue) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO issues (
                id, machine_id, tag, template_item_id, descricao, os_numero, status,
                aberta_em_inspecao_id, resolvida_em_inspecao_id, created_at, updated_at, resolved_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(issue.id)
        .bind(issue.machine_id)
        .bind(&issue.tag)
        .bind(&issue.template_item_id)
        .bind(&issue.descricao)
        .bind(&issue.os_numero)
        .bind(issue.status)
        .bind(issue.aberta_em_inspecao_id)
        .bind(issue.resolvida_em_inspecao_id)
        .bind(issue.created_at)
        .bind(issue.updated_at)
        .bind(issue.resolved_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn update_os_numero<'e, E>(
        &self,
        executor: E,
        issue_id: Uuid,
        os_numero: Option<&str>,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE issues SET os_numero = $2, updated_at = NOW() WHERE id = $1")
            .bind(issue_id)
            .bind(os_numero)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Fecha a issue. Só afeta issues ainda abertas; retorna se houve transição.
    pub async fn resolve<'e, E>(
        &self,
        executor: E,
        issue_id: Uuid,
        inspection_id: Uuid,
        resolved_at: DateTime<Utc>,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE issues
            SET status = $2, resolvida_em_inspecao_id = $3, resolved_at = $4, updated_at = $4
            WHERE id = $1 AND status = 'aberta'
            "#,
        )
        .bind(issue_id)
        .bind(IssueStatus::Resolvida)
        .bind(inspection_id)
        .bind(resolved_at)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
