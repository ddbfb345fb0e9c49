// src/services/answers.rs
//
// Adaptador entre os dois formatos de resposta gravados: `answers[]` (atual)
// e `itens[]` (legado). Funções puras, sem acesso a banco.

use crate::models::{
    inspection::{Answer, Inspection, InspectionRecord, LegacyItem, Resposta, StoredAnswer},
    template::Template,
};

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}

/// Texto da pergunta: o gravado, senão o do item do template, senão "Item {id}".
pub fn resolve_question_text(stored: Option<&str>, question_id: &str, template: Option<&Template>) -> String {
    non_empty(stored)
        .or_else(|| {
            template
                .and_then(|t| t.find_item(question_id))
                .and_then(|item| item.display_text())
                .map(String::from)
        })
        .unwrap_or_else(|| format!("Item {}", question_id))
}

fn from_stored(answer: &StoredAnswer, template: Option<&Template>) -> Answer {
    Answer {
        question_id: answer.question_id.clone(),
        question_text: resolve_question_text(answer.question_text.as_deref(), &answer.question_id, template),
        response: answer.response,
        observation: non_empty(answer.observation.as_deref()),
        photo_urls: answer.photo_urls.clone(),
        recurrence: answer.recurrence,
    }
}

fn from_legacy(item: &LegacyItem, template: Option<&Template>) -> Answer {
    Answer {
        question_id: item.template_item_id.clone(),
        question_text: resolve_question_text(item.question_text.as_deref(), &item.template_item_id, template),
        response: Resposta::from_legacy(&item.resultado),
        observation: non_empty(item.observacao_item.as_deref()),
        photo_urls: item.fotos.clone(),
        recurrence: false,
    }
}

// Uma resposta por pergunta: uma repetição posterior substitui a anterior, na mesma posição
fn dedupe(answers: Vec<Answer>) -> Vec<Answer> {
    let mut out: Vec<Answer> = Vec::with_capacity(answers.len());
    for answer in answers {
        match out.iter_mut().find(|a| a.question_id == answer.question_id) {
            Some(existing) => *existing = answer,
            None => out.push(answer),
        }
    }
    out
}

/// Produz a lista canônica. Se `answers[]` não estiver vazio ele manda e o
/// legado é ignorado; caso contrário cada entrada de `itens[]` é traduzida 1:1.
pub fn normalize_answers(answers: &[StoredAnswer], itens: &[LegacyItem], template: Option<&Template>) -> Vec<Answer> {
    let canonical = if !answers.is_empty() {
        answers.iter().map(|a| from_stored(a, template)).collect()
    } else {
        itens.iter().map(|i| from_legacy(i, template)).collect()
    };
    dedupe(canonical)
}

/// Converte respostas canônicas para o formato gravado.
pub fn to_stored(answers: &[Answer]) -> Vec<StoredAnswer> {
    answers
        .iter()
        .map(|a| StoredAnswer {
            question_id: a.question_id.clone(),
            question_text: Some(a.question_text.clone()),
            response: a.response,
            observation: a.observation.clone(),
            photo_urls: a.photo_urls.clone(),
            recurrence: a.recurrence,
        })
        .collect()
}

pub fn to_view(record: InspectionRecord, template: Option<&Template>) -> Inspection {
    let answers = normalize_answers(&record.answers, &record.itens, template);
    Inspection {
        id: record.id,
        machine: record.machine,
        template: record.template,
        maintainer: record.maintainer,
        os_numero: record.os_numero,
        observacoes: record.observacoes,
        assinatura_url: record.assinatura_url,
        answers,
        qtd_nc: record.qtd_nc,
        pcm_sign: record.pcm_sign,
        non_conformity_treatments: record.treatments,
        issues_criadas: record.issues_criadas,
        issues_resolvidas: record.issues_resolvidas,
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::template::TemplateItem;
    use chrono::Utc;
    use sqlx::types::Json;
    use uuid::Uuid;

    fn template() -> Template {
        let item = |id: &str, componente: &str, o_que_checar: &str, criterio: &str| TemplateItem {
            id: id.into(),
            componente: componente.into(),
            o_que_checar: o_que_checar.into(),
            instrumento: String::new(),
            criterio: criterio.into(),
            o_que_fazer: String::new(),
            imagem_item_url: None,
            ordem: 1,
        };
        Template {
            id: Uuid::new_v4(),
            nome: "Secador".into(),
            itens: Json(vec![
                item("i1", "Correia", "Tensão da correia", "Sem folga"),
                item("i2", "Motor", "", "Sem ruído"),
                item("i3", "Mancal", "", ""),
            ]),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn legacy(id: &str, resultado: &str) -> LegacyItem {
        LegacyItem {
            template_item_id: id.into(),
            resultado: resultado.into(),
            observacao_item: None,
            fotos: vec![],
            question_text: None,
        }
    }

    fn stored(id: &str, response: Resposta) -> StoredAnswer {
        StoredAnswer {
            question_id: id.into(),
            question_text: None,
            response,
            observation: None,
            photo_urls: vec![],
            recurrence: false,
        }
    }

    #[test]
    fn test_legacy_items_translated() {
        let t = template();
        let answers = normalize_answers(&[], &[legacy("i1", "NC"), legacy("i2", "NA"), legacy("i3", "C")], Some(&t));

        let responses: Vec<_> = answers.iter().map(|a| a.response).collect();
        assert_eq!(responses, vec![Resposta::Nc, Resposta::Na, Resposta::C]);
        assert_eq!(answers[0].question_text, "Tensão da correia");
        assert_eq!(answers[1].question_text, "Sem ruído");
        assert_eq!(answers[2].question_text, "Mancal");
    }

    #[test]
    fn test_unknown_legacy_resultado_defaults_to_conform() {
        let answers = normalize_answers(&[], &[legacy("i1", "???")], None);
        assert_eq!(answers[0].response, Resposta::C);
    }

    #[test]
    fn test_modern_answers_win_over_legacy() {
        let answers = normalize_answers(&[stored("i1", Resposta::C)], &[legacy("i1", "NC"), legacy("i2", "NC")], None);
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].response, Resposta::C);
    }

    #[test]
    fn test_placeholder_when_template_item_missing() {
        let t = template();
        let answers = normalize_answers(&[stored("zz", Resposta::Nc)], &[], Some(&t));
        assert_eq!(answers[0].question_text, "Item zz");

        let answers = normalize_answers(&[], &[legacy("i9", "NC")], None);
        assert_eq!(answers[0].question_text, "Item i9");
    }

    #[test]
    fn test_legacy_and_modern_shapes_are_equivalent() {
        let t = template();
        let mut l1 = legacy("i1", "NC");
        l1.observacao_item = Some("Folga excessiva".into());
        l1.fotos = vec!["/uploads/a.jpg".into()];
        let from_legacy = normalize_answers(&[], &[l1, legacy("i2", "NA")], Some(&t));

        let mut s1 = stored("i1", Resposta::Nc);
        s1.observation = Some("Folga excessiva".into());
        s1.photo_urls = vec!["/uploads/a.jpg".into()];
        let from_modern = normalize_answers(&[s1, stored("i2", Resposta::Na)], &[], Some(&t));

        assert_eq!(from_legacy, from_modern);
    }

    #[test]
    fn test_stored_text_is_kept() {
        let t = template();
        let mut s = stored("i1", Resposta::C);
        s.question_text = Some("Texto antigo".into());
        let answers = normalize_answers(&[s], &[], Some(&t));
        assert_eq!(answers[0].question_text, "Texto antigo");
    }

    #[test]
    fn test_duplicate_question_ids_collapse() {
        let answers = normalize_answers(
            &[stored("i1", Resposta::Nc), stored("i2", Resposta::C), stored("i1", Resposta::C)],
            &[],
            None,
        );
        assert_eq!(answers.len(), 2);
        assert_eq!(answers[0].question_id, "i1");
        assert_eq!(answers[0].response, Resposta::C);
    }

    #[test]
    fn test_blank_observation_becomes_none() {
        let mut s = stored("i1", Resposta::Nc);
        s.observation = Some("   ".into());
        let answers = normalize_answers(&[s], &[], None);
        assert_eq!(answers[0].observation, None);
    }
}
