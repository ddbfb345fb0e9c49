// src/models/template.rs

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::error::AppError;

// Um item (pergunta) do checklist.
// O `id` é a chave de junção de todas as respostas históricas: nunca muda.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateItem {
    #[schema(example = "2f0a9c1e-6b7d-4c51-9b1e-0d6f3f2a8c11")]
    pub id: String,
    #[schema(example = "Correia transportadora")]
    pub componente: String,
    #[schema(example = "Tensão e desgaste da correia")]
    pub o_que_checar: String,
    #[serde(default)]
    #[schema(example = "Visual")]
    pub instrumento: String,
    #[serde(default)]
    #[schema(example = "Sem rachaduras ou fios expostos")]
    pub criterio: String,
    #[serde(default)]
    #[schema(example = "Substituir a correia")]
    pub o_que_fazer: String,
    pub imagem_item_url: Option<String>,
    #[schema(example = 1)]
    pub ordem: i32,
}

impl TemplateItem {
    /// Texto exibido para a pergunta: oQueChecar → criterio → componente.
    pub fn display_text(&self) -> Option<&str> {
        [&self.o_que_checar, &self.criterio, &self.componente]
            .into_iter()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: Uuid,
    #[schema(example = "Checklist Secador de Grãos")]
    pub nome: String,
    #[schema(value_type = Vec<TemplateItem>)]
    pub itens: Json<Vec<TemplateItem>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Template {
    pub fn find_item(&self, item_id: &str) -> Option<&TemplateItem> {
        self.itens.iter().find(|item| item.id == item_id)
    }
}

// --- PAYLOADS ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateItemPayload {
    // Ausente = item novo; presente = item existente (id preservado)
    pub id: Option<String>,

    #[validate(length(min = 1, message = "O componente é obrigatório."))]
    pub componente: String,

    #[validate(length(min = 1, message = "O campo 'oQueChecar' é obrigatório."))]
    pub o_que_checar: String,

    #[serde(default)]
    pub instrumento: String,
    #[serde(default)]
    pub criterio: String,
    #[serde(default)]
    pub o_que_fazer: String,
    pub imagem_item_url: Option<String>,

    pub ordem: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplatePayload {
    #[validate(length(min = 1, message = "O nome do template é obrigatório."))]
    pub nome: String,

    #[validate(nested)]
    #[serde(default)]
    pub itens: Vec<TemplateItemPayload>,
}

/// Monta a lista final de itens: preserva ids enviados, gera ids para itens
/// novos e renumera `ordem` de forma contígua (1..n) seguindo a ordem pedida.
pub fn build_template_items(payload: Vec<TemplateItemPayload>) -> Result<Vec<TemplateItem>, AppError> {
    let mut seen = HashSet::new();
    for id in payload.iter().filter_map(|i| i.id.as_deref()) {
        if !seen.insert(id.to_string()) {
            return Err(AppError::DuplicateTemplateItem(id.to_string()));
        }
    }

    // Ordena pela `ordem` pedida; itens sem ordem vão para o fim, mantendo a posição relativa
    let mut indexed: Vec<(usize, TemplateItemPayload)> = payload.into_iter().enumerate().collect();
    indexed.sort_by_key(|(pos, item)| (item.ordem.unwrap_or(i32::MAX), *pos));

    let items = indexed
        .into_iter()
        .enumerate()
        .map(|(idx, (_, item))| TemplateItem {
            id: item
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            componente: item.componente.trim().to_string(),
            o_que_checar: item.o_que_checar.trim().to_string(),
            instrumento: item.instrumento.trim().to_string(),
            criterio: item.criterio.trim().to_string(),
            o_que_fazer: item.o_que_fazer.trim().to_string(),
            imagem_item_url: item.imagem_item_url.filter(|u| !u.is_empty()),
            ordem: idx as i32 + 1,
        })
        .collect();

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: Option<&str>, componente: &str, ordem: Option<i32>) -> TemplateItemPayload {
        TemplateItemPayload {
            id: id.map(String::from),
            componente: componente.into(),
            o_que_checar: format!("Checar {}", componente),
            instrumento: String::new(),
            criterio: String::new(),
            o_que_fazer: String::new(),
            imagem_item_url: None,
            ordem,
        }
    }

    #[test]
    fn test_resequences_ordem() {
        let items = build_template_items(vec![
            item(Some("b"), "Motor", Some(10)),
            item(Some("a"), "Correia", Some(3)),
            item(None, "Mancal", None),
        ])
        .unwrap();

        let ordens: Vec<_> = items.iter().map(|i| (i.componente.as_str(), i.ordem)).collect();
        assert_eq!(ordens, vec![("Correia", 1), ("Motor", 2), ("Mancal", 3)]);
    }

    #[test]
    fn test_preserves_existing_ids() {
        let items = build_template_items(vec![item(Some("abc"), "Motor", None), item(None, "Mancal", None)]).unwrap();
        assert_eq!(items[0].id, "abc");
        assert!(Uuid::parse_str(&items[1].id).is_ok());
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let result = build_template_items(vec![item(Some("x"), "A", None), item(Some("x"), "B", None)]);
        assert!(matches!(result, Err(AppError::DuplicateTemplateItem(id)) if id == "x"));
    }

    #[test]
    fn test_display_text_fallback() {
        let mut t = build_template_items(vec![item(Some("x"), "Motor", None)]).unwrap().remove(0);
        assert_eq!(t.display_text(), Some("Checar Motor"));
        t.o_que_checar.clear();
        t.criterio = "Sem ruído".into();
        assert_eq!(t.display_text(), Some("Sem ruído"));
        t.criterio.clear();
        assert_eq!(t.display_text(), Some("Motor"));
        t.componente.clear();
        assert_eq!(t.display_text(), None);
    }
}
