// src/models/issue.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// Mapeia o CREATE TYPE issue_status do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "issue_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum IssueStatus {
    Aberta,
    Resolvida,
}

// Defeito rastreado por (máquina, item do template).
// Criada e fechada como efeito colateral das respostas das inspeções.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: Uuid,
    pub machine_id: Uuid,
    #[schema(example = "SEC-001")]
    pub tag: String,
    pub template_item_id: String,
    #[schema(example = "Correia com fissuras")]
    pub descricao: String,
    pub os_numero: Option<String>,
    pub status: IssueStatus,
    pub aberta_em_inspecao_id: Uuid,
    pub resolvida_em_inspecao_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Issue {
    pub fn is_open(&self) -> bool {
        self.status == IssueStatus::Aberta
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct IssueFilter {
    pub machine_id: Option<Uuid>,
    pub status: Option<IssueStatus>,
}
