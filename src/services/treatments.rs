// src/services/treatments.rs

use chrono::{DateTime, Utc};

use crate::models::inspection::{Treatment, TreatmentPayload, TreatmentStatus};

/// Substitui (ou acrescenta) a tratativa da pergunta sem tocar nas outras.
/// `createdAt` vem da entrada existente; `updatedAt` é sempre agora.
pub fn merge_treatment(treatments: &mut Vec<Treatment>, incoming: TreatmentPayload, now: DateTime<Utc>) -> Treatment {
    let created_at = treatments
        .iter()
        .find(|t| t.question_id == incoming.question_id)
        .map(|t| t.created_at)
        .unwrap_or(now);

    let merged = Treatment {
        question_id: incoming.question_id,
        summary: incoming.summary,
        responsible: incoming.responsible,
        due_date: incoming.due_date,
        status: incoming.status,
        created_at,
        updated_at: Some(now),
    };

    match treatments.iter_mut().find(|t| t.question_id == merged.question_id) {
        Some(existing) => *existing = merged.clone(),
        None => treatments.push(merged.clone()),
    }

    merged
}

/// Perguntas que deixaram de ser NC têm a tratativa encerrada.
pub fn force_resolve(treatments: &mut [Treatment], question_ids: &[&str], now: DateTime<Utc>) -> usize {
    let mut changed = 0;
    for treatment in treatments.iter_mut() {
        if question_ids.contains(&treatment.question_id.as_str()) && treatment.status != TreatmentStatus::Resolved {
            treatment.status = TreatmentStatus::Resolved;
            treatment.updated_at = Some(now);
            changed += 1;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn payload(id: &str, status: TreatmentStatus) -> TreatmentPayload {
        TreatmentPayload {
            question_id: id.into(),
            summary: Some("Trocar correia".into()),
            responsible: Some("Equipe mecânica".into()),
            due_date: NaiveDate::from_ymd_opt(2026, 11, 30),
            status,
        }
    }

    #[test]
    fn test_appends_new_treatment() {
        let now = Utc::now();
        let mut list = vec![];
        let t = merge_treatment(&mut list, payload("i1", TreatmentStatus::Open), now);
        assert_eq!(list.len(), 1);
        assert_eq!(t.created_at, now);
        assert_eq!(t.updated_at, Some(now));
    }

    #[test]
    fn test_replaces_and_preserves_created_at() {
        let first = Utc::now() - Duration::days(3);
        let later = Utc::now();
        let mut list = vec![];
        merge_treatment(&mut list, payload("i1", TreatmentStatus::Open), first);
        merge_treatment(&mut list, payload("i2", TreatmentStatus::Open), first);

        let mut update = payload("i1", TreatmentStatus::InProgress);
        update.summary = None;
        merge_treatment(&mut list, update, later);

        assert_eq!(list.len(), 2);
        assert_eq!(list[0].status, TreatmentStatus::InProgress);
        assert_eq!(list[0].created_at, first);
        assert_eq!(list[0].updated_at, Some(later));
        assert_eq!(list[0].summary, None);
        // A outra pergunta não é tocada
        assert_eq!(list[1].status, TreatmentStatus::Open);
        assert_eq!(list[1].updated_at, Some(first));
    }

    #[test]
    fn test_force_resolve_only_listed_questions() {
        let then = Utc::now() - Duration::hours(1);
        let now = Utc::now();
        let mut list = vec![];
        merge_treatment(&mut list, payload("i1", TreatmentStatus::InProgress), then);
        merge_treatment(&mut list, payload("i2", TreatmentStatus::Open), then);

        let changed = force_resolve(&mut list, &["i1", "i3"], now);
        assert_eq!(changed, 1);
        assert_eq!(list[0].status, TreatmentStatus::Resolved);
        assert_eq!(list[0].updated_at, Some(now));
        assert_eq!(list[1].status, TreatmentStatus::Open);
    }

    #[test]
    fn test_force_resolve_keeps_resolved_untouched() {
        let then = Utc::now() - Duration::hours(1);
        let mut list = vec![];
        merge_treatment(&mut list, payload("i1", TreatmentStatus::Resolved), then);
        assert_eq!(force_resolve(&mut list, &["i1"], Utc::now()), 0);
        assert_eq!(list[0].updated_at, Some(then));
    }
}
