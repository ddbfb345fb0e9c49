// src/models/machine.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{issue::Issue, template::Template};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Machine {
    pub id: Uuid,
    #[schema(example = "SEC-001")]
    pub tag: String,
    #[schema(example = "Secador de Grãos 1")]
    pub nome: String,
    #[schema(example = "Secagem")]
    pub setor: String,
    #[schema(example = "Unidade Matriz")]
    pub unidade: String,
    #[schema(example = "Armazém 2")]
    pub local_unidade: String,
    #[schema(example = "LAC-12")]
    pub lac: String,
    pub foto_url: Option<String>,
    pub template_id: Option<Uuid>,
    pub ativo: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachinePayload {
    #[validate(length(min = 1, max = 50, message = "A TAG é obrigatória (até 50 caracteres)."))]
    pub tag: String,

    #[validate(length(min = 1, message = "O nome da máquina é obrigatório."))]
    pub nome: String,

    #[serde(default)]
    pub setor: String,
    #[serde(default)]
    pub unidade: String,
    #[serde(default)]
    pub local_unidade: String,
    #[serde(default)]
    pub lac: String,

    pub foto_url: Option<String>,
    pub template_id: Option<Uuid>,

    #[serde(default = "default_true")]
    pub ativo: bool,
}

pub(crate) fn default_true() -> bool {
    true
}

// Tudo o que o formulário de checklist precisa para uma máquina
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineChecklist {
    pub machine: Machine,
    pub template: Option<Template>,
    pub open_issues: Vec<Issue>,
}
