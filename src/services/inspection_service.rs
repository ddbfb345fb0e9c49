// src/services/inspection_service.rs

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::{data_url::DecodedImage, error::AppError},
    db::{InspectionRepository, IssueRepository, MachineRepository, TemplateRepository},
    models::{
        inspection::{
            count_nc, Answer, CreateInspectionPayload, Inspection, InspectionFilter, InspectionRecord,
            MachineSnapshot, MaintainerSnapshot, PcmSign, PcmSignPayload, PhotoRef, Resposta, TemplateSnapshot,
            Treatment, TreatmentPayload, UpdateInspectionItem, UpdateInspectionPayload,
        },
        maintainer::Maintainer,
        template::Template,
    },
    services::{
        answers::{normalize_answers, resolve_question_text, to_stored, to_view},
        image_store::{
            prepare_upload, upload_data_url, ImageStore, FOLDER_INSPECTION_PHOTOS, FOLDER_PCM_SIGNATURES,
            FOLDER_SIGNATURES,
        },
        reconciliation::{
            check_edit_targets, merge_edits, plan, plan_edit, AnswerEdit, IssueAction, ReconcileContext,
            ResponseChange,
        },
        treatments::{force_resolve, merge_treatment},
    },
};

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}

fn push_unique(target: &mut Vec<Uuid>, ids: &[Uuid]) {
    for id in ids {
        if !target.contains(id) {
            target.push(*id);
        }
    }
}

// Foto de uma edição depois da decodificação, antes de ir para o storage
enum PendingPhoto {
    Kept(String),
    New(DecodedImage),
}

struct PendingEdit {
    question_id: String,
    response: Resposta,
    observation: Option<Option<String>>,
    photos: Option<Vec<PendingPhoto>>,
}

fn decode_optional(data_url: Option<&str>) -> Result<Option<DecodedImage>, AppError> {
    non_empty(data_url).map(|d| prepare_upload(&d)).transpose()
}

#[derive(Clone)]
pub struct InspectionService {
    pool: PgPool,
    inspection_repo: InspectionRepository,
    machine_repo: MachineRepository,
    template_repo: TemplateRepository,
    issue_repo: IssueRepository,
    images: Arc<dyn ImageStore>,
}

impl InspectionService {
    pub fn new(
        pool: PgPool,
        inspection_repo: InspectionRepository,
        machine_repo: MachineRepository,
        template_repo: TemplateRepository,
        issue_repo: IssueRepository,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        Self { pool, inspection_repo, machine_repo, template_repo, issue_repo, images }
    }

    // Aplica o plano de reconciliação na transação corrente
    async fn apply_actions(
        &self,
        conn: &mut PgConnection,
        inspection_id: Uuid,
        actions: &[IssueAction],
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        for action in actions {
            match action {
                IssueAction::Open(issue) => self.issue_repo.insert(&mut *conn, issue).await?,
                IssueAction::UpdateOsNumero { issue_id, os_numero } => {
                    self.issue_repo
                        .update_os_numero(&mut *conn, *issue_id, Some(os_numero.as_str()))
                        .await?
                }
                IssueAction::Resolve { issue_id } => {
                    self.issue_repo.resolve(&mut *conn, *issue_id, inspection_id, now).await?;
                }
            }
        }
        Ok(())
    }

    // --- CRIAÇÃO (mantenedor) ---

    pub async fn create(&self, maintainer: &Maintainer, payload: CreateInspectionPayload) -> Result<Inspection, AppError> {
        // 1. Máquina, permissão e template
        let machine = self
            .machine_repo
            .find_by_tag(&self.pool, payload.tag.trim())
            .await?
            .ok_or(AppError::MachineNotFound)?;

        if !maintainer.can_inspect(machine.id) {
            tracing::warn!("Mantenedor {} tentou inspecionar {} sem permissão", maintainer.matricula, machine.tag);
            return Err(AppError::Forbidden);
        }

        let template_id = machine.template_id.ok_or(AppError::TemplateNotDefined)?;
        let template = self
            .template_repo
            .find_by_id(&self.pool, template_id)
            .await?
            .ok_or(AppError::TemplateNotDefined)?;

        // 2. Cada item tem que existir no template e aparecer uma única vez
        let mut seen: HashSet<&str> = HashSet::new();
        for item in &payload.itens {
            if template.find_item(&item.template_item_id).is_none() {
                return Err(AppError::InvalidTemplateItem(item.template_item_id.clone()));
            }
            if !seen.insert(item.template_item_id.as_str()) {
                return Err(AppError::DuplicateTemplateItem(item.template_item_id.clone()));
            }
        }

        // 3. Uploads (fora da transação). Tudo é decodificado antes do primeiro arquivo gravado.
        let assinatura = decode_optional(payload.assinatura_data_url.as_deref())?;
        let fotos = payload
            .itens
            .iter()
            .map(|item| item.fotos.iter().map(|f| prepare_upload(f)).collect::<Result<Vec<_>, _>>())
            .collect::<Result<Vec<_>, _>>()?;

        let assinatura_url = match assinatura {
            Some(image) => Some(self.images.store(FOLDER_SIGNATURES, image).await?),
            None => None,
        };

        let mut answers: Vec<Answer> = Vec::with_capacity(payload.itens.len());
        for (item, images) in payload.itens.iter().zip(fotos) {
            let mut photo_urls = Vec::with_capacity(images.len());
            for image in images {
                photo_urls.push(self.images.store(FOLDER_INSPECTION_PHOTOS, image).await?);
            }
            answers.push(Answer {
                question_id: item.template_item_id.clone(),
                question_text: resolve_question_text(None, &item.template_item_id, Some(&template)),
                response: item.resultado.into(),
                observation: non_empty(item.observacao_item.as_deref()),
                photo_urls,
                recurrence: false,
            });
        }

        let now = Utc::now();
        let inspection_id = Uuid::new_v4();
        let os_numero = non_empty(payload.os_numero.as_deref());

        // 4. Transação: issues + inspeção
        let mut tx = self.pool.begin().await?;
        self.issue_repo.lock_machine(&mut *tx, machine.id).await?;

        let mut open_issues = self.issue_repo.list_open_for_machine(&mut *tx, machine.id).await?;

        // Resoluções explícitas primeiro, só de issues abertas desta máquina
        let mut explicitly_resolved = 0;
        for issue_id in &payload.resolve_issues {
            if let Some(pos) = open_issues.iter().position(|i| i.id == *issue_id) {
                self.issue_repo.resolve(&mut *tx, *issue_id, inspection_id, now).await?;
                open_issues.remove(pos);
                explicitly_resolved += 1;
            }
        }

        let ctx = ReconcileContext {
            machine_id: machine.id,
            tag: &machine.tag,
            inspection_id,
            os_numero: os_numero.as_deref(),
            template: Some(&template),
            now,
        };
        let changes: Vec<ResponseChange<'_>> = answers
            .iter()
            .map(|a| ResponseChange {
                question_id: &a.question_id,
                response: a.response,
                observation: a.observation.as_deref(),
            })
            .collect();
        let result = plan(&ctx, &open_issues, &changes);
        drop(changes);

        self.apply_actions(&mut tx, inspection_id, &result.actions, now).await?;

        for answer in answers.iter_mut() {
            answer.recurrence = result.recurrent.contains(&answer.question_id);
        }

        let record = InspectionRecord {
            id: inspection_id,
            machine: MachineSnapshot {
                id: machine.id,
                tag: machine.tag.clone(),
                nome: machine.nome.clone(),
                setor: machine.setor.clone(),
                unidade: machine.unidade.clone(),
                local_unidade: machine.local_unidade.clone(),
                lac: machine.lac.clone(),
            },
            template: TemplateSnapshot { id: template.id, nome: template.nome.clone() },
            maintainer: MaintainerSnapshot {
                id: maintainer.id,
                matricula: maintainer.matricula.clone(),
                nome: maintainer.nome.clone(),
            },
            os_numero,
            observacoes: non_empty(payload.observacoes.as_deref()),
            assinatura_url,
            answers: to_stored(&answers),
            itens: vec![],
            qtd_nc: count_nc(&answers),
            pcm_sign: None,
            treatments: vec![],
            issues_criadas: result.opened.clone(),
            issues_resolvidas: result.resolved.clone(),
            created_at: now,
            updated_at: now,
        };
        self.inspection_repo.insert(&mut *tx, &record).await?;

        tx.commit().await?;

        tracing::info!(
            "Inspeção {} criada para {}: {} NC, {} issue(s) aberta(s), {} resolvida(s), {} resolvida(s) manualmente",
            record.id,
            record.machine.tag,
            record.qtd_nc,
            result.opened.len(),
            result.resolved.len(),
            explicitly_resolved
        );

        Ok(to_view(record, Some(&template)))
    }

    // --- LEITURA ---

    async fn template_for(&self, template_id: Uuid) -> Result<Option<Template>, AppError> {
        self.template_repo.find_by_id(&self.pool, template_id).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Inspection, AppError> {
        let record = self
            .inspection_repo
            .find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::InspectionNotFound)?;
        let template = self.template_for(record.template.id).await?;
        Ok(to_view(record, template.as_ref()))
    }

    async fn to_views(&self, records: Vec<InspectionRecord>) -> Result<Vec<Inspection>, AppError> {
        let mut templates: HashMap<Uuid, Option<Template>> = HashMap::new();
        let mut views = Vec::with_capacity(records.len());
        for record in records {
            let template_id = record.template.id;
            if !templates.contains_key(&template_id) {
                let template = self.template_for(template_id).await?;
                templates.insert(template_id, template);
            }
            let template = templates.get(&template_id).and_then(|t| t.as_ref());
            views.push(to_view(record, template));
        }
        Ok(views)
    }

    pub async fn list(&self, filter: &InspectionFilter) -> Result<Vec<Inspection>, AppError> {
        let records = self.inspection_repo.list(filter).await?;
        self.to_views(records).await
    }

    pub async fn list_pending_sign(&self) -> Result<Vec<Inspection>, AppError> {
        let records = self.inspection_repo.list_pending_sign().await?;
        self.to_views(records).await
    }

    // --- EDIÇÃO (admin) ---

    // Decodifica as fotos novas sem gravar nada
    fn decode_items(items: Vec<UpdateInspectionItem>) -> Result<Vec<PendingEdit>, AppError> {
        let mut pending = Vec::with_capacity(items.len());
        for item in items {
            let photos = match item.photo_urls {
                Some(photos) => {
                    let mut decoded = Vec::with_capacity(photos.len());
                    for photo in photos {
                        match photo {
                            PhotoRef::Url(url) => {
                                if let Some(url) = non_empty(Some(&url)) {
                                    decoded.push(PendingPhoto::Kept(url));
                                }
                            }
                            PhotoRef::Upload(upload) => {
                                decoded.push(PendingPhoto::New(prepare_upload(&upload.data_url)?));
                            }
                        }
                    }
                    Some(decoded)
                }
                None => None,
            };
            pending.push(PendingEdit {
                question_id: item.question_id,
                response: item.response,
                observation: item.observation.map(|o| non_empty(Some(&o))),
                photos,
            });
        }
        Ok(pending)
    }

    async fn store_edits(&self, pending: Vec<PendingEdit>) -> Result<Vec<AnswerEdit>, AppError> {
        let mut edits = Vec::with_capacity(pending.len());
        for item in pending {
            let photo_urls = match item.photos {
                Some(photos) => {
                    let mut urls = Vec::with_capacity(photos.len());
                    for photo in photos {
                        match photo {
                            PendingPhoto::Kept(url) => urls.push(url),
                            PendingPhoto::New(image) => {
                                urls.push(self.images.store(FOLDER_INSPECTION_PHOTOS, image).await?)
                            }
                        }
                    }
                    Some(urls)
                }
                None => None,
            };
            edits.push(AnswerEdit {
                question_id: item.question_id,
                response: item.response,
                observation: item.observation,
                photo_urls,
            });
        }
        Ok(edits)
    }

    pub async fn update(&self, id: Uuid, payload: UpdateInspectionPayload) -> Result<Inspection, AppError> {
        // Inspeção e perguntas conferidas antes de subir qualquer imagem
        let existing = self
            .inspection_repo
            .find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::InspectionNotFound)?;
        let items = payload.itens.unwrap_or_default();
        {
            let template = self.template_for(existing.template.id).await?;
            let answers = normalize_answers(&existing.answers, &existing.itens, template.as_ref());
            check_edit_targets(&answers, items.iter().map(|i| i.question_id.as_str()), template.as_ref())?;
        }

        let assinatura = decode_optional(payload.assinatura_data_url.as_deref())?;
        let pending = Self::decode_items(items)?;

        let assinatura_url = match assinatura {
            Some(image) => Some(self.images.store(FOLDER_SIGNATURES, image).await?),
            None => None,
        };
        let edits = self.store_edits(pending).await?;

        let mut tx = self.pool.begin().await?;

        let mut record = self
            .inspection_repo
            .find_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::InspectionNotFound)?;
        self.issue_repo.lock_machine(&mut *tx, record.machine.id).await?;

        let template = self.template_repo.find_by_id(&mut *tx, record.template.id).await?;
        let mut answers = normalize_answers(&record.answers, &record.itens, template.as_ref());

        let previous_os = record.os_numero.clone();
        if let Some(os) = payload.os_numero.as_deref() {
            record.os_numero = non_empty(Some(os));
        }
        if let Some(obs) = payload.observacoes.as_deref() {
            record.observacoes = non_empty(Some(obs));
        }
        if assinatura_url.is_some() {
            record.assinatura_url = assinatura_url;
        }

        let outcome = merge_edits(&mut answers, edits, template.as_ref())?;

        let now = Utc::now();
        let open_issues = self.issue_repo.list_open_for_machine(&mut *tx, record.machine.id).await?;

        let ctx = ReconcileContext {
            machine_id: record.machine.id,
            tag: &record.machine.tag,
            inspection_id: record.id,
            os_numero: record.os_numero.as_deref(),
            template: template.as_ref(),
            now,
        };
        let result = plan_edit(&ctx, &open_issues, &answers, &outcome.changed, record.os_numero != previous_os);

        self.apply_actions(&mut tx, record.id, &result.actions, now).await?;

        for answer in answers.iter_mut().filter(|a| outcome.changed.contains(&a.question_id)) {
            answer.recurrence = result.recurrent.contains(&answer.question_id);
        }

        let left_nc: Vec<&str> = outcome.left_nc.iter().map(String::as_str).collect();
        let closed_treatments = force_resolve(&mut record.treatments, &left_nc, now);

        push_unique(&mut record.issues_criadas, &result.opened);
        push_unique(&mut record.issues_resolvidas, &result.resolved);
        record.answers = to_stored(&answers);
        record.qtd_nc = count_nc(&answers);
        record.updated_at = now;

        self.inspection_repo.update(&mut *tx, &record).await?;
        tx.commit().await?;

        tracing::info!(
            "Inspeção {} editada: {} resposta(s) alterada(s), {} issue(s) aberta(s), {} resolvida(s), {} tratativa(s) encerrada(s)",
            record.id,
            outcome.changed.len(),
            result.opened.len(),
            result.resolved.len(),
            closed_treatments
        );

        Ok(to_view(record, template.as_ref()))
    }

    // --- ASSINATURA PCM ---

    /// Reassinar sobrescreve a assinatura anterior.
    pub async fn pcm_sign(&self, id: Uuid, payload: PcmSignPayload) -> Result<Inspection, AppError> {
        if self.inspection_repo.find_by_id(&self.pool, id).await?.is_none() {
            return Err(AppError::InspectionNotFound);
        }

        let assinatura_url =
            upload_data_url(self.images.as_ref(), FOLDER_PCM_SIGNATURES, &payload.assinatura_data_url).await?;

        let sign = PcmSign {
            nome: payload.nome.trim().to_string(),
            cargo: non_empty(payload.cargo.as_deref()),
            assinatura_url,
            signed_at: Utc::now(),
        };

        if !self.inspection_repo.set_pcm_sign(id, &sign).await? {
            return Err(AppError::InspectionNotFound);
        }
        tracing::info!("Inspeção {} assinada pelo PCM ({})", id, sign.nome);

        self.get(id).await
    }

    // --- TRATATIVAS ---

    /// Não mexe nas issues: a tratativa é um registro independente.
    pub async fn update_treatment(&self, id: Uuid, payload: TreatmentPayload) -> Result<Vec<Treatment>, AppError> {
        let mut tx = self.pool.begin().await?;

        let mut record = self
            .inspection_repo
            .find_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::InspectionNotFound)?;

        let template = self.template_repo.find_by_id(&mut *tx, record.template.id).await?;
        let answers = normalize_answers(&record.answers, &record.itens, template.as_ref());
        if !answers.iter().any(|a| a.question_id == payload.question_id) {
            return Err(AppError::QuestionNotFound(payload.question_id));
        }

        let now = Utc::now();
        let merged = merge_treatment(&mut record.treatments, payload, now);
        self.inspection_repo
            .update_treatments(&mut *tx, record.id, &record.treatments, now)
            .await?;
        tx.commit().await?;

        tracing::info!("Tratativa da pergunta {} na inspeção {} atualizada", merged.question_id, record.id);
        Ok(record.treatments)
    }
}
