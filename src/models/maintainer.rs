// src/models/maintainer.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::machine::default_true;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Maintainer {
    pub id: Uuid,
    #[schema(example = "004512")]
    pub matricula: String,
    #[schema(example = "João da Silva")]
    pub nome: String,
    pub setor: String,
    pub lac: String,
    pub ativo: bool,

    #[serde(skip_serializing)]
    pub password_hash: String,

    // Lista de autorização: só pode inspecionar as máquinas daqui
    pub machines: Vec<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Maintainer {
    pub fn can_inspect(&self, machine_id: Uuid) -> bool {
        self.machines.contains(&machine_id)
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMaintainerPayload {
    #[validate(length(min = 1, message = "A matrícula é obrigatória."))]
    pub matricula: String,

    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub nome: String,

    #[serde(default)]
    pub setor: String,
    #[serde(default)]
    pub lac: String,

    #[serde(default = "default_true")]
    pub ativo: bool,

    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub senha: String,

    #[serde(default)]
    pub machines: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMaintainerPayload {
    #[validate(length(min = 1, message = "A matrícula é obrigatória."))]
    pub matricula: String,

    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub nome: String,

    #[serde(default)]
    pub setor: String,
    #[serde(default)]
    pub lac: String,

    #[serde(default = "default_true")]
    pub ativo: bool,

    // Só troca a senha quando enviada
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub senha: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaintainerMachines {
    pub machines: Vec<Uuid>,
}
