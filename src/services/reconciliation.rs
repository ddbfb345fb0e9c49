// src/services/reconciliation.rs
//
// Planejamento da abertura/fechamento de issues a partir das respostas.
// O plano é calculado sem I/O; quem aplica é o InspectionService, dentro da
// mesma transação que grava a inspeção.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        inspection::{Answer, Resposta},
        issue::{Issue, IssueStatus},
        template::Template,
    },
    services::answers::resolve_question_text,
};

pub const DEFAULT_ISSUE_DESCRIPTION: &str = "Não conformidade registrada em inspeção";

#[derive(Debug, Clone)]
pub struct ResponseChange<'a> {
    pub question_id: &'a str,
    pub response: Resposta,
    pub observation: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct ReconcileContext<'a> {
    pub machine_id: Uuid,
    pub tag: &'a str,
    pub inspection_id: Uuid,
    pub os_numero: Option<&'a str>,
    pub template: Option<&'a Template>,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IssueAction {
    Open(Issue),
    UpdateOsNumero { issue_id: Uuid, os_numero: String },
    Resolve { issue_id: Uuid },
}

#[derive(Debug, Default)]
pub struct ReconcilePlan {
    pub actions: Vec<IssueAction>,
    pub opened: Vec<Uuid>,
    pub resolved: Vec<Uuid>,
    // Perguntas respondidas NC com issue já aberta
    pub recurrent: HashSet<String>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

fn describe(ctx: &ReconcileContext<'_>, change: &ResponseChange<'_>) -> String {
    if let Some(obs) = change.observation.map(str::trim).filter(|o| !o.is_empty()) {
        return obs.to_string();
    }
    ctx.template
        .and_then(|t| t.find_item(change.question_id))
        .and_then(|item| {
            [&item.criterio, &item.o_que_checar]
                .into_iter()
                .map(|s| s.trim())
                .find(|s| !s.is_empty())
                .map(String::from)
        })
        .unwrap_or_else(|| DEFAULT_ISSUE_DESCRIPTION.to_string())
}

// O.S. só é propagada quando a inspeção traz uma e ela difere da gravada
fn os_changed(current: Option<&str>, issue: &Issue) -> Option<String> {
    let current = current.map(str::trim).filter(|s| !s.is_empty())?;
    if issue.os_numero.as_deref() != Some(current) {
        Some(current.to_string())
    } else {
        None
    }
}

/// Percorre as respostas na ordem de envio mantendo o invariante
/// "no máximo uma issue aberta por (máquina, item)".
pub fn plan(ctx: &ReconcileContext<'_>, open_issues: &[Issue], changes: &[ResponseChange<'_>]) -> ReconcilePlan {
    let mut open: HashMap<String, Issue> = open_issues
        .iter()
        .filter(|i| i.is_open() && i.machine_id == ctx.machine_id)
        .map(|i| (i.template_item_id.clone(), i.clone()))
        .collect();

    let mut result = ReconcilePlan::default();

    for change in changes {
        match change.response {
            Resposta::Nc => {
                if let Some(existing) = open.get_mut(change.question_id) {
                    result.recurrent.insert(change.question_id.to_string());
                    if let Some(os) = os_changed(ctx.os_numero, existing) {
                        existing.os_numero = Some(os.clone());
                        result.actions.push(IssueAction::UpdateOsNumero { issue_id: existing.id, os_numero: os });
                    }
                } else {
                    let issue = Issue {
                        id: Uuid::new_v4(),
                        machine_id: ctx.machine_id,
                        tag: ctx.tag.to_string(),
                        template_item_id: change.question_id.to_string(),
                        descricao: describe(ctx, change),
                        os_numero: ctx.os_numero.map(str::trim).filter(|s| !s.is_empty()).map(String::from),
                        status: IssueStatus::Aberta,
                        aberta_em_inspecao_id: ctx.inspection_id,
                        resolvida_em_inspecao_id: None,
                        created_at: ctx.now,
                        updated_at: ctx.now,
                        resolved_at: None,
                    };
                    result.opened.push(issue.id);
                    open.insert(change.question_id.to_string(), issue.clone());
                    result.actions.push(IssueAction::Open(issue));
                }
            }
            Resposta::C | Resposta::Na => {
                if let Some(existing) = open.remove(change.question_id) {
                    result.resolved.push(existing.id);
                    result.actions.push(IssueAction::Resolve { issue_id: existing.id });
                }
            }
        }
    }

    result
}

/// Na edição, respostas NC que não mudaram só recebem a O.S. nova (sem transição de status).
pub fn plan_os_propagation(ctx: &ReconcileContext<'_>, open_issues: &[Issue], unchanged_nc: &[&str]) -> Vec<IssueAction> {
    open_issues
        .iter()
        .filter(|i| i.is_open() && i.machine_id == ctx.machine_id)
        .filter(|i| unchanged_nc.contains(&i.template_item_id.as_str()))
        .filter_map(|i| {
            os_changed(ctx.os_numero, i).map(|os| IssueAction::UpdateOsNumero { issue_id: i.id, os_numero: os })
        })
        .collect()
}

// --- EDIÇÃO ---

/// Item editado, com as fotos já resolvidas para URLs.
#[derive(Debug, Clone)]
pub struct AnswerEdit {
    pub question_id: String,
    pub response: Resposta,
    // `Some(None)` apaga a observação
    pub observation: Option<Option<String>>,
    pub photo_urls: Option<Vec<String>>,
}

#[derive(Debug, Default, PartialEq)]
pub struct MergeOutcome {
    /// Perguntas cuja resposta final difere da gravada, na ordem de envio
    pub changed: Vec<String>,
    /// Perguntas que eram NC e deixaram de ser
    pub left_nc: Vec<String>,
}

/// Cada pergunta editada aparece uma vez e existe nas respostas gravadas ou no template.
/// Ids históricos (itens já removidos do template) continuam editáveis.
pub fn check_edit_targets<'a>(
    answers: &[Answer],
    question_ids: impl IntoIterator<Item = &'a str>,
    template: Option<&Template>,
) -> Result<(), AppError> {
    let mut seen: HashSet<&str> = HashSet::new();
    for id in question_ids {
        if !seen.insert(id) {
            return Err(AppError::DuplicateTemplateItem(id.to_string()));
        }
        let known = answers.iter().any(|a| a.question_id == id) || template.and_then(|t| t.find_item(id)).is_some();
        if !known {
            return Err(AppError::InvalidTemplateItem(id.to_string()));
        }
    }
    Ok(())
}

/// Aplica os itens editados sobre as respostas normalizadas.
pub fn merge_edits(
    answers: &mut Vec<Answer>,
    edits: Vec<AnswerEdit>,
    template: Option<&Template>,
) -> Result<MergeOutcome, AppError> {
    check_edit_targets(answers, edits.iter().map(|e| e.question_id.as_str()), template)?;

    let original: HashMap<String, Resposta> = answers.iter().map(|a| (a.question_id.clone(), a.response)).collect();
    let mut outcome = MergeOutcome::default();

    for edit in edits {
        let index = match answers.iter().position(|a| a.question_id == edit.question_id) {
            Some(i) => i,
            None => {
                answers.push(Answer {
                    question_text: resolve_question_text(None, &edit.question_id, template),
                    question_id: edit.question_id.clone(),
                    response: edit.response,
                    observation: None,
                    photo_urls: vec![],
                    recurrence: false,
                });
                answers.len() - 1
            }
        };

        let answer = &mut answers[index];
        answer.response = edit.response;
        if let Some(observation) = edit.observation {
            answer.observation = observation;
        }
        if let Some(photo_urls) = edit.photo_urls {
            answer.photo_urls = photo_urls;
        }

        let previous = original.get(&edit.question_id).copied();
        if previous != Some(edit.response) {
            if previous == Some(Resposta::Nc) {
                outcome.left_nc.push(edit.question_id.clone());
            }
            outcome.changed.push(edit.question_id);
        }
    }

    Ok(outcome)
}

/// Plano da edição: só as respostas alteradas passam pela reconciliação.
/// Com O.S. nova, as NCs inalteradas recebem a O.S. sem transição de status.
pub fn plan_edit(
    ctx: &ReconcileContext<'_>,
    open_issues: &[Issue],
    answers: &[Answer],
    changed: &[String],
    os_updated: bool,
) -> ReconcilePlan {
    let changes: Vec<ResponseChange<'_>> = changed
        .iter()
        .filter_map(|q| answers.iter().find(|a| a.question_id == *q))
        .map(|a| ResponseChange {
            question_id: &a.question_id,
            response: a.response,
            observation: a.observation.as_deref(),
        })
        .collect();
    let mut result = plan(ctx, open_issues, &changes);

    if os_updated {
        let unchanged_nc: Vec<&str> = answers
            .iter()
            .filter(|a| a.response.is_nc() && !changed.contains(&a.question_id))
            .map(|a| a.question_id.as_str())
            .collect();
        result.actions.extend(plan_os_propagation(ctx, open_issues, &unchanged_nc));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::template::TemplateItem;
    use sqlx::types::Json;

    struct Tracker {
        issues: Vec<Issue>,
    }

    impl Tracker {
        // Aplica o plano em memória, do mesmo jeito que o serviço aplica no banco
        fn apply(&mut self, actions: &[IssueAction], inspection_id: Uuid) {
            for action in actions {
                match action {
                    IssueAction::Open(issue) => self.issues.push(issue.clone()),
                    IssueAction::UpdateOsNumero { issue_id, os_numero } => {
                        let issue = self.issues.iter_mut().find(|i| i.id == *issue_id).unwrap();
                        issue.os_numero = Some(os_numero.clone());
                    }
                    IssueAction::Resolve { issue_id } => {
                        let issue = self.issues.iter_mut().find(|i| i.id == *issue_id).unwrap();
                        issue.status = IssueStatus::Resolvida;
                        issue.resolvida_em_inspecao_id = Some(inspection_id);
                    }
                }
            }
        }

        fn open(&self) -> Vec<Issue> {
            self.issues.iter().filter(|i| i.is_open()).cloned().collect()
        }

        fn open_count(&self, item: &str) -> usize {
            self.issues.iter().filter(|i| i.is_open() && i.template_item_id == item).count()
        }
    }

    fn template() -> Template {
        Template {
            id: Uuid::new_v4(),
            nome: "Secador".into(),
            itens: Json(vec![TemplateItem {
                id: "i1".into(),
                componente: "Correia".into(),
                o_que_checar: "Tensão da correia".into(),
                instrumento: String::new(),
                criterio: "Sem folga".into(),
                o_que_fazer: String::new(),
                imagem_item_url: None,
                ordem: 1,
            }]),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn ctx<'a>(machine_id: Uuid, template: &'a Template, os: Option<&'a str>) -> ReconcileContext<'a> {
        ReconcileContext {
            machine_id,
            tag: "SEC-001",
            inspection_id: Uuid::new_v4(),
            os_numero: os,
            template: Some(template),
            now: Utc::now(),
        }
    }

    fn change(id: &str, response: Resposta) -> ResponseChange<'_> {
        ResponseChange { question_id: id, response, observation: None }
    }

    #[test]
    fn test_nc_opens_issue() {
        let t = template();
        let c = ctx(Uuid::new_v4(), &t, Some("OS-1"));
        let plan = plan(&c, &[], &[change("i1", Resposta::Nc)]);

        assert_eq!(plan.opened.len(), 1);
        assert!(plan.resolved.is_empty());
        match &plan.actions[0] {
            IssueAction::Open(issue) => {
                assert_eq!(issue.status, IssueStatus::Aberta);
                assert_eq!(issue.aberta_em_inspecao_id, c.inspection_id);
                assert_eq!(issue.descricao, "Sem folga");
                assert_eq!(issue.os_numero.as_deref(), Some("OS-1"));
                assert_eq!(issue.id, plan.opened[0]);
            }
            other => panic!("ação inesperada: {:?}", other),
        }
    }

    #[test]
    fn test_description_prefers_observation() {
        let t = template();
        let c = ctx(Uuid::new_v4(), &t, None);
        let changes = [ResponseChange { question_id: "i1", response: Resposta::Nc, observation: Some("Correia rasgada") }];
        let plan = plan(&c, &[], &changes);
        assert!(matches!(&plan.actions[0], IssueAction::Open(i) if i.descricao == "Correia rasgada"));
    }

    #[test]
    fn test_description_fallback_without_template_item() {
        let t = template();
        let c = ctx(Uuid::new_v4(), &t, None);
        let plan = plan(&c, &[], &[change("desconhecido", Resposta::Nc)]);
        assert!(matches!(&plan.actions[0], IssueAction::Open(i) if i.descricao == DEFAULT_ISSUE_DESCRIPTION));
    }

    #[test]
    fn test_conform_resolves_open_issue() {
        let t = template();
        let machine = Uuid::new_v4();
        let first = plan(&ctx(machine, &t, None), &[], &[change("i1", Resposta::Nc)]);
        let mut tracker = Tracker { issues: vec![] };
        tracker.apply(&first.actions, Uuid::new_v4());

        let second = plan(&ctx(machine, &t, None), &tracker.open(), &[change("i1", Resposta::C)]);
        assert_eq!(second.resolved, first.opened);
        assert!(second.opened.is_empty());
    }

    #[test]
    fn test_na_also_resolves() {
        let t = template();
        let machine = Uuid::new_v4();
        let mut tracker = Tracker { issues: vec![] };
        tracker.apply(&plan(&ctx(machine, &t, None), &[], &[change("i1", Resposta::Nc)]).actions, Uuid::new_v4());

        let p = plan(&ctx(machine, &t, None), &tracker.open(), &[change("i1", Resposta::Na)]);
        assert_eq!(p.resolved.len(), 1);
    }

    #[test]
    fn test_repeated_nc_does_not_duplicate_and_updates_os() {
        let t = template();
        let machine = Uuid::new_v4();
        let mut tracker = Tracker { issues: vec![] };
        let first = plan(&ctx(machine, &t, Some("OS-1")), &[], &[change("i1", Resposta::Nc)]);
        tracker.apply(&first.actions, Uuid::new_v4());

        let second = plan(&ctx(machine, &t, Some("OS-2")), &tracker.open(), &[change("i1", Resposta::Nc)]);
        assert!(second.opened.is_empty());
        assert!(second.recurrent.contains("i1"));
        assert_eq!(
            second.actions,
            vec![IssueAction::UpdateOsNumero { issue_id: first.opened[0], os_numero: "OS-2".into() }]
        );

        tracker.apply(&second.actions, Uuid::new_v4());
        assert_eq!(tracker.open_count("i1"), 1);
        assert_eq!(tracker.open()[0].os_numero.as_deref(), Some("OS-2"));
    }

    #[test]
    fn test_same_os_is_not_rewritten() {
        let t = template();
        let machine = Uuid::new_v4();
        let mut tracker = Tracker { issues: vec![] };
        tracker.apply(&plan(&ctx(machine, &t, Some("OS-1")), &[], &[change("i1", Resposta::Nc)]).actions, Uuid::new_v4());

        let again = plan(&ctx(machine, &t, Some("OS-1")), &tracker.open(), &[change("i1", Resposta::Nc)]);
        assert!(again.is_empty());

        let without_os = plan(&ctx(machine, &t, None), &tracker.open(), &[change("i1", Resposta::Nc)]);
        assert!(without_os.is_empty());
    }

    #[test]
    fn test_conform_without_open_issue_is_noop() {
        let t = template();
        let p = plan(&ctx(Uuid::new_v4(), &t, None), &[], &[change("i1", Resposta::C), change("i2", Resposta::Na)]);
        assert!(p.is_empty());
    }

    #[test]
    fn test_issues_of_other_machines_are_ignored() {
        let t = template();
        let mut tracker = Tracker { issues: vec![] };
        tracker.apply(&plan(&ctx(Uuid::new_v4(), &t, None), &[], &[change("i1", Resposta::Nc)]).actions, Uuid::new_v4());

        let other = plan(&ctx(Uuid::new_v4(), &t, None), &tracker.open(), &[change("i1", Resposta::C)]);
        assert!(other.is_empty());
    }

    #[test]
    fn test_at_most_one_open_issue_across_toggles() {
        let t = template();
        let machine = Uuid::new_v4();
        let mut tracker = Tracker { issues: vec![] };
        let sequence = [
            Resposta::Nc,
            Resposta::Nc,
            Resposta::C,
            Resposta::Na,
            Resposta::Nc,
            Resposta::C,
            Resposta::Nc,
            Resposta::Nc,
        ];

        for response in sequence {
            let c = ctx(machine, &t, Some("OS-9"));
            let p = plan(&c, &tracker.open(), &[change("i1", response)]);
            tracker.apply(&p.actions, c.inspection_id);
            assert!(tracker.open_count("i1") <= 1);
            assert_eq!(tracker.open_count("i1") == 1, response == Resposta::Nc);
        }

        // Três aberturas (NC após estado fechado) e duas resoluções
        assert_eq!(tracker.issues.len(), 3);
    }

    #[test]
    fn test_duplicate_changes_in_one_submission_stay_consistent() {
        let t = template();
        let p = plan(
            &ctx(Uuid::new_v4(), &t, None),
            &[],
            &[change("i1", Resposta::Nc), change("i1", Resposta::Nc), change("i1", Resposta::C)],
        );
        assert_eq!(p.opened.len(), 1);
        assert_eq!(p.resolved, p.opened);
    }

    #[test]
    fn test_os_propagation_for_unchanged_nc() {
        let t = template();
        let machine = Uuid::new_v4();
        let mut tracker = Tracker { issues: vec![] };
        tracker.apply(&plan(&ctx(machine, &t, Some("OS-1")), &[], &[change("i1", Resposta::Nc)]).actions, Uuid::new_v4());

        let c = ctx(machine, &t, Some("OS-7"));
        let actions = plan_os_propagation(&c, &tracker.open(), &["i1"]);
        assert_eq!(actions.len(), 1);
        assert!(plan_os_propagation(&c, &tracker.open(), &["i2"]).is_empty());
        assert!(plan_os_propagation(&ctx(machine, &t, Some("OS-1")), &tracker.open(), &["i1"]).is_empty());
    }

    // --- EDIÇÃO ---

    fn answer(id: &str, response: Resposta) -> Answer {
        Answer {
            question_id: id.into(),
            question_text: format!("Item {}", id),
            response,
            observation: None,
            photo_urls: vec![],
            recurrence: false,
        }
    }

    fn edit(id: &str, response: Resposta) -> AnswerEdit {
        AnswerEdit { question_id: id.into(), response, observation: None, photo_urls: None }
    }

    #[test]
    fn test_edit_with_same_answers_is_idempotent() {
        let t = template();
        let machine = Uuid::new_v4();
        let mut tracker = Tracker { issues: vec![] };
        tracker.apply(&plan(&ctx(machine, &t, Some("OS-1")), &[], &[change("i1", Resposta::Nc)]).actions, Uuid::new_v4());

        let mut answers = vec![answer("i1", Resposta::Nc)];
        let before = answers.clone();
        let outcome = merge_edits(&mut answers, vec![edit("i1", Resposta::Nc)], Some(&t)).unwrap();
        assert_eq!(outcome, MergeOutcome::default());
        assert_eq!(answers, before);

        let p = plan_edit(&ctx(machine, &t, Some("OS-1")), &tracker.open(), &answers, &outcome.changed, false);
        assert!(p.is_empty());
        assert!(p.opened.is_empty() && p.resolved.is_empty());
    }

    #[test]
    fn test_edit_nc_to_c_resolves_issue_and_treatment() {
        use crate::models::inspection::{TreatmentPayload, TreatmentStatus};
        use crate::services::treatments::{force_resolve, merge_treatment};

        let t = template();
        let machine = Uuid::new_v4();
        let mut tracker = Tracker { issues: vec![] };
        let created = plan(&ctx(machine, &t, None), &[], &[change("i1", Resposta::Nc)]);
        tracker.apply(&created.actions, Uuid::new_v4());

        let mut answers = vec![answer("i1", Resposta::Nc)];
        let mut edited = edit("i1", Resposta::C);
        edited.observation = Some(Some("Correia trocada".into()));
        let outcome = merge_edits(&mut answers, vec![edited], Some(&t)).unwrap();
        assert_eq!(outcome.changed, vec!["i1".to_string()]);
        assert_eq!(outcome.left_nc, vec!["i1".to_string()]);
        assert_eq!(answers[0].observation.as_deref(), Some("Correia trocada"));

        let c = ctx(machine, &t, None);
        let p = plan_edit(&c, &tracker.open(), &answers, &outcome.changed, false);
        assert_eq!(p.resolved, created.opened);
        tracker.apply(&p.actions, c.inspection_id);
        assert_eq!(tracker.open_count("i1"), 0);

        let mut treatments = vec![];
        let payload = TreatmentPayload {
            question_id: "i1".into(),
            summary: None,
            responsible: None,
            due_date: None,
            status: TreatmentStatus::InProgress,
        };
        merge_treatment(&mut treatments, payload, Utc::now());
        let left: Vec<&str> = outcome.left_nc.iter().map(String::as_str).collect();
        assert_eq!(force_resolve(&mut treatments, &left, Utc::now()), 1);
        assert_eq!(treatments[0].status, TreatmentStatus::Resolved);
    }

    #[test]
    fn test_edit_new_os_reaches_unchanged_nc() {
        let t = template();
        let machine = Uuid::new_v4();
        let mut tracker = Tracker { issues: vec![] };
        let created = plan(&ctx(machine, &t, Some("OS-1")), &[], &[change("i1", Resposta::Nc)]);
        tracker.apply(&created.actions, Uuid::new_v4());

        let answers = vec![answer("i1", Resposta::Nc)];
        let c = ctx(machine, &t, Some("OS-2"));

        let p = plan_edit(&c, &tracker.open(), &answers, &[], true);
        assert_eq!(
            p.actions,
            vec![IssueAction::UpdateOsNumero { issue_id: created.opened[0], os_numero: "OS-2".into() }]
        );
        assert!(p.opened.is_empty() && p.resolved.is_empty());

        // Sem mudança de O.S., nada acontece
        assert!(plan_edit(&c, &tracker.open(), &answers, &[], false).is_empty());
    }

    #[test]
    fn test_edit_rejects_repeated_question() {
        let t = template();
        let mut answers = vec![answer("i1", Resposta::Nc)];
        let result = merge_edits(&mut answers, vec![edit("i1", Resposta::C), edit("i1", Resposta::Nc)], Some(&t));
        assert!(matches!(result, Err(AppError::DuplicateTemplateItem(id)) if id == "i1"));
        assert_eq!(answers[0].response, Resposta::Nc);
    }

    #[test]
    fn test_edit_rejects_unknown_question() {
        let t = template();
        let mut answers = vec![answer("i1", Resposta::C)];
        let result = merge_edits(&mut answers, vec![edit("zz", Resposta::Nc)], Some(&t));
        assert!(matches!(result, Err(AppError::InvalidTemplateItem(id)) if id == "zz"));
        assert_eq!(answers.len(), 1);
    }

    #[test]
    fn test_edit_keeps_historical_and_adds_template_items() {
        let t = template();
        // "antigo" saiu do template mas está gravado; "i1" existe só no template
        let mut answers = vec![answer("antigo", Resposta::Nc)];
        let outcome = merge_edits(
            &mut answers,
            vec![edit("antigo", Resposta::C), edit("i1", Resposta::Nc)],
            Some(&t),
        )
        .unwrap();

        assert_eq!(outcome.changed, vec!["antigo".to_string(), "i1".to_string()]);
        assert_eq!(outcome.left_nc, vec!["antigo".to_string()]);
        assert_eq!(answers.len(), 2);
        assert_eq!(answers[1].question_text, "Tensão da correia");
        assert_eq!(crate::models::inspection::count_nc(&answers), 1);
    }
}
