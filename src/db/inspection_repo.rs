// src/db/inspection_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{types::Json, Executor, FromRow, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::inspection::{
        InspectionFilter, InspectionRecord, LegacyItem, MachineSnapshot, MaintainerSnapshot, PcmSign, StoredAnswer,
        TemplateSnapshot, Treatment,
    },
};

// Linha crua da tabela 'inspecoes'. As colunas JSONB viram tipos explícitos aqui,
// então um documento malformado falha na leitura em vez de vazar pela API.
#[derive(Debug, FromRow)]
struct InspectionRow {
    id: Uuid,
    machine: Json<MachineSnapshot>,
    template: Json<TemplateSnapshot>,
    maintainer: Json<MaintainerSnapshot>,
    os_numero: Option<String>,
    observacoes: Option<String>,
    assinatura_url: Option<String>,
    answers: Json<Vec<StoredAnswer>>,
    itens: Json<Vec<LegacyItem>>,
    qtd_nc: i32,
    pcm_sign_nome: Option<String>,
    pcm_sign_cargo: Option<String>,
    pcm_sign_url: Option<String>,
    pcm_signed_at: Option<DateTime<Utc>>,
    non_conformity_treatments: Json<Vec<Treatment>>,
    issues_criadas: Vec<Uuid>,
    issues_resolvidas: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<InspectionRow> for InspectionRecord {
    fn from(row: InspectionRow) -> Self {
        let pcm_sign = match (row.pcm_sign_nome, row.pcm_sign_url, row.pcm_signed_at) {
            (Some(nome), Some(assinatura_url), Some(signed_at)) => Some(PcmSign {
                nome,
                cargo: row.pcm_sign_cargo,
                assinatura_url,
                signed_at,
            }),
            _ => None,
        };

        InspectionRecord {
            id: row.id,
            machine: row.machine.0,
            template: row.template.0,
            maintainer: row.maintainer.0,
            os_numero: row.os_numero,
            observacoes: row.observacoes,
            assinatura_url: row.assinatura_url,
            answers: row.answers.0,
            itens: row.itens.0,
            qtd_nc: row.qtd_nc,
            pcm_sign,
            treatments: row.non_conformity_treatments.0,
            issues_criadas: row.issues_criadas,
            issues_resolvidas: row.issues_resolvidas,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct InspectionRepository {
    pool: PgPool,
}

impl InspectionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<InspectionRecord>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, InspectionRow>("SELECT * FROM inspecoes WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(row.map(InspectionRecord::from))
    }

    // Versão com lock de linha, usada nas edições
    pub async fn find_for_update<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<InspectionRecord>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, InspectionRow>("SELECT * FROM inspecoes WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(row.map(InspectionRecord::from))
    }

    pub async fn list(&self, filter: &InspectionFilter) -> Result<Vec<InspectionRecord>, AppError> {
        let rows = sqlx::query_as::<_, InspectionRow>(
            r#"
            SELECT * FROM inspecoes
            WHERE ($1::uuid IS NULL OR machine_id = $1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.machine_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(InspectionRecord::from).collect())
    }

    pub async fn list_pending_sign(&self) -> Result<Vec<InspectionRecord>, AppError> {
        let rows = sqlx::query_as::<_, InspectionRow>(
            "SELECT * FROM inspecoes WHERE pcm_signed_at IS NULL ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(InspectionRecord::from).collect())
    }

    pub async fn insert<'e, E>(&self, executor: E, record: &InspectionRecord) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO inspecoes (
                id, machine_id, machine, template, maintainer, os_numero, observacoes, assinatura_url,
                answers, itens, qtd_nc, non_conformity_treatments, issues_criadas, issues_resolvidas,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(record.id)
        .bind(record.machine.id)
        .bind(Json(&record.machine))
        .bind(Json(&record.template))
        .bind(Json(&record.maintainer))
        .bind(&record.os_numero)
        .bind(&record.observacoes)
        .bind(&record.assinatura_url)
        .bind(Json(&record.answers))
        .bind(Json(&record.itens))
        .bind(record.qtd_nc)
        .bind(Json(&record.treatments))
        .bind(&record.issues_criadas)
        .bind(&record.issues_resolvidas)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Grava os campos editáveis (respostas, O.S., notas, assinatura, tratativas e trilha de issues).
    pub async fn update<'e, E>(&self, executor: E, record: &InspectionRecord) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE inspecoes
            SET os_numero = $2, observacoes = $3, assinatura_url = $4,
                answers = $5, itens = $6, qtd_nc = $7, non_conformity_treatments = $8,
                issues_criadas = $9, issues_resolvidas = $10, updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(record.id)
        .bind(&record.os_numero)
        .bind(&record.observacoes)
        .bind(&record.assinatura_url)
        .bind(Json(&record.answers))
        .bind(Json(&record.itens))
        .bind(record.qtd_nc)
        .bind(Json(&record.treatments))
        .bind(&record.issues_criadas)
        .bind(&record.issues_resolvidas)
        .bind(record.updated_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn update_treatments<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        treatments: &[Treatment],
        updated_at: DateTime<Utc>,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE inspecoes SET non_conformity_treatments = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(Json(treatments))
            .bind(updated_at)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn set_pcm_sign(&self, id: Uuid, sign: &PcmSign) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE inspecoes
            SET pcm_sign_nome = $2, pcm_sign_cargo = $3, pcm_sign_url = $4, pcm_signed_at = $5, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&sign.nome)
        .bind(&sign.cargo)
        .bind(&sign.assinatura_url)
        .bind(sign.signed_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
