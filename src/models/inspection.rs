// src/models/inspection.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::common::data_url::{validate_data_url, validate_data_urls};

// --- RESPOSTAS ---

/// Resposta canônica de um item: conforme, não conforme, não se aplica.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Resposta {
    C,
    Nc,
    Na,
}

impl Resposta {
    pub fn is_nc(self) -> bool {
        self == Resposta::Nc
    }

    /// Leitura tolerante do formato legado: valores desconhecidos viram "c".
    pub fn from_legacy(resultado: &str) -> Self {
        match resultado.trim().to_ascii_lowercase().as_str() {
            "nc" => Resposta::Nc,
            "na" => Resposta::Na,
            _ => Resposta::C,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Resposta::C => "C",
            Resposta::Nc => "NC",
            Resposta::Na => "NA",
        }
    }
}

/// Formato recebido na criação (C | NC | NA).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Resultado {
    C,
    Nc,
    Na,
}

impl From<Resultado> for Resposta {
    fn from(value: Resultado) -> Self {
        match value {
            Resultado::C => Resposta::C,
            Resultado::Nc => Resposta::Nc,
            Resultado::Na => Resposta::Na,
        }
    }
}

/// Resposta canônica, já normalizada.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_id: String,
    pub question_text: String,
    pub response: Resposta,
    pub observation: Option<String>,
    #[serde(default)]
    pub photo_urls: Vec<String>,
    // NC repetida enquanto já havia uma issue aberta para o item
    #[serde(default)]
    pub recurrence: bool,
}

// Formato moderno como está gravado (o texto da pergunta pode faltar)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAnswer {
    pub question_id: String,
    pub question_text: Option<String>,
    pub response: Resposta,
    pub observation: Option<String>,
    #[serde(default)]
    pub photo_urls: Vec<String>,
    #[serde(default)]
    pub recurrence: bool,
}

// Formato legado `itens[]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyItem {
    pub template_item_id: String,
    #[serde(default)]
    pub resultado: String,
    pub observacao_item: Option<String>,
    #[serde(default)]
    pub fotos: Vec<String>,
    #[serde(alias = "pergunta")]
    pub question_text: Option<String>,
}

// --- SNAPSHOTS ---
// Copiados na criação: edições posteriores de máquina/template não alteram relatórios antigos.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineSnapshot {
    pub id: Uuid,
    pub tag: String,
    pub nome: String,
    #[serde(default)]
    pub setor: String,
    #[serde(default)]
    pub unidade: String,
    #[serde(default)]
    pub local_unidade: String,
    #[serde(default)]
    pub lac: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSnapshot {
    pub id: Uuid,
    pub nome: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaintainerSnapshot {
    pub id: Uuid,
    pub matricula: String,
    pub nome: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PcmSign {
    pub nome: String,
    pub cargo: Option<String>,
    pub assinatura_url: String,
    pub signed_at: DateTime<Utc>,
}

// --- TRATAMENTO DE NÃO CONFORMIDADE ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TreatmentStatus {
    Open,
    InProgress,
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Treatment {
    pub question_id: String,
    pub summary: Option<String>,
    pub responsible: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: TreatmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

// --- INSPEÇÃO ---

/// Inspeção como está no banco, com os dois formatos de resposta crus.
#[derive(Debug, Clone, PartialEq)]
pub struct InspectionRecord {
    pub id: Uuid,
    pub machine: MachineSnapshot,
    pub template: TemplateSnapshot,
    pub maintainer: MaintainerSnapshot,
    pub os_numero: Option<String>,
    pub observacoes: Option<String>,
    pub assinatura_url: Option<String>,
    pub answers: Vec<StoredAnswer>,
    pub itens: Vec<LegacyItem>,
    pub qtd_nc: i32,
    pub pcm_sign: Option<PcmSign>,
    pub treatments: Vec<Treatment>,
    pub issues_criadas: Vec<Uuid>,
    pub issues_resolvidas: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Inspeção entregue pela API: respostas sempre no formato canônico.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Inspection {
    pub id: Uuid,
    pub machine: MachineSnapshot,
    pub template: TemplateSnapshot,
    pub maintainer: MaintainerSnapshot,
    pub os_numero: Option<String>,
    pub observacoes: Option<String>,
    pub assinatura_url: Option<String>,
    pub answers: Vec<Answer>,
    #[serde(rename = "qtdNC")]
    pub qtd_nc: i32,
    pub pcm_sign: Option<PcmSign>,
    pub non_conformity_treatments: Vec<Treatment>,
    pub issues_criadas: Vec<Uuid>,
    pub issues_resolvidas: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn count_nc(answers: &[Answer]) -> i32 {
    answers.iter().filter(|a| a.response.is_nc()).count() as i32
}

// --- PAYLOADS ---

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInspectionItem {
    #[validate(length(min = 1, message = "O campo 'templateItemId' é obrigatório."))]
    pub template_item_id: String,

    pub resultado: Resultado,

    pub observacao_item: Option<String>,

    #[serde(default)]
    #[validate(length(max = 3, message = "Máximo de 3 fotos por item."))]
    #[validate(custom(function = "validate_data_urls"))]
    pub fotos: Vec<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInspectionPayload {
    #[validate(length(min = 1, message = "A TAG da máquina é obrigatória."))]
    pub tag: String,

    pub os_numero: Option<String>,
    pub observacoes: Option<String>,

    #[validate(custom(function = "validate_data_url"))]
    pub assinatura_data_url: Option<String>,

    #[validate(length(min = 1, message = "Responda ao menos um item do checklist."))]
    #[validate(nested)]
    pub itens: Vec<CreateInspectionItem>,

    // Issues que o mantenedor marcou como resolvidas no envio
    #[serde(default)]
    pub resolve_issues: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PhotoUpload {
    #[validate(custom(function = "validate_data_url"))]
    pub data_url: String,
    pub name: Option<String>,
}

/// Foto de uma edição: URL já existente ou nova imagem em data URL.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum PhotoRef {
    Url(String),
    Upload(PhotoUpload),
}

// O derive não desce no enum: as novas imagens são conferidas aqui
fn validate_photo_refs(photos: &[PhotoRef]) -> Result<(), ValidationError> {
    photos.iter().try_for_each(|photo| match photo {
        PhotoRef::Url(_) => Ok(()),
        PhotoRef::Upload(upload) => validate_data_url(&upload.data_url),
    })
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInspectionItem {
    #[validate(length(min = 1, message = "O campo 'questionId' é obrigatório."))]
    pub question_id: String,

    pub response: Resposta,

    pub observation: Option<String>,

    #[validate(length(max = 5, message = "Máximo de 5 fotos por item."))]
    #[validate(custom(function = "validate_photo_refs"))]
    pub photo_urls: Option<Vec<PhotoRef>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInspectionPayload {
    pub os_numero: Option<String>,
    pub observacoes: Option<String>,

    #[validate(custom(function = "validate_data_url"))]
    pub assinatura_data_url: Option<String>,

    #[validate(nested)]
    pub itens: Option<Vec<UpdateInspectionItem>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PcmSignPayload {
    #[validate(length(min = 1, message = "O nome de quem assina é obrigatório."))]
    pub nome: String,

    pub cargo: Option<String>,

    #[validate(custom(function = "validate_data_url"))]
    pub assinatura_data_url: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentPayload {
    #[validate(length(min = 1, message = "O campo 'questionId' é obrigatório."))]
    pub question_id: String,
    pub summary: Option<String>,
    pub responsible: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: TreatmentStatus,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct InspectionFilter {
    pub machine_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resposta_from_legacy() {
        assert_eq!(Resposta::from_legacy("NC"), Resposta::Nc);
        assert_eq!(Resposta::from_legacy("na"), Resposta::Na);
        assert_eq!(Resposta::from_legacy("C"), Resposta::C);
        assert_eq!(Resposta::from_legacy("OK?"), Resposta::C);
        assert_eq!(Resposta::from_legacy(""), Resposta::C);
    }

    #[test]
    fn test_create_payload_rejects_four_photos() {
        let photo = "data:image/png;base64,AAAA";
        let payload: CreateInspectionPayload = serde_json::from_value(json!({
            "tag": "SEC-001",
            "itens": [{
                "templateItemId": "i1",
                "resultado": "NC",
                "fotos": [photo, photo, photo, photo]
            }]
        }))
        .unwrap();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_create_payload_accepts_three_photos() {
        let photo = "data:image/png;base64,AAAA";
        let payload: CreateInspectionPayload = serde_json::from_value(json!({
            "tag": "SEC-001",
            "itens": [{ "templateItemId": "i1", "resultado": "C", "fotos": [photo, photo, photo] }]
        }))
        .unwrap();
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn test_create_payload_rejects_unknown_resultado() {
        let result = serde_json::from_value::<CreateInspectionPayload>(json!({
            "tag": "SEC-001",
            "itens": [{ "templateItemId": "i1", "resultado": "TALVEZ" }]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_update_payload_photo_refs() {
        let payload: UpdateInspectionPayload = serde_json::from_value(json!({
            "itens": [{
                "questionId": "i1",
                "response": "nc",
                "photoUrls": ["/uploads/a.jpg", { "dataUrl": "data:image/png;base64,AAAA", "name": "b.png" }]
            }]
        }))
        .unwrap();
        let photos = payload.itens.as_ref().unwrap()[0].photo_urls.as_ref().unwrap();
        assert!(matches!(&photos[0], PhotoRef::Url(u) if u == "/uploads/a.jpg"));
        assert!(matches!(&photos[1], PhotoRef::Upload(p) if p.name.as_deref() == Some("b.png")));
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn test_update_payload_rejects_six_photos() {
        let photos: Vec<_> = (0..6).map(|i| format!("/uploads/{}.jpg", i)).collect();
        let payload: UpdateInspectionPayload = serde_json::from_value(json!({
            "itens": [{ "questionId": "i1", "response": "c", "photoUrls": photos }]
        }))
        .unwrap();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_update_payload_rejects_bad_new_photo() {
        let payload: UpdateInspectionPayload = serde_json::from_value(json!({
            "itens": [{
                "questionId": "i1",
                "response": "nc",
                "photoUrls": ["/uploads/a.jpg", { "dataUrl": "/uploads/b.jpg" }]
            }]
        }))
        .unwrap();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_treatment_status_wire_format() {
        assert_eq!(serde_json::to_value(TreatmentStatus::InProgress).unwrap(), json!("in_progress"));
        assert_eq!(serde_json::to_value(Resposta::Nc).unwrap(), json!("nc"));
    }
}
