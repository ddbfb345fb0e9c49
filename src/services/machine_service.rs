// src/services/machine_service.rs

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{IssueRepository, MachineRepository, TemplateRepository},
    models::{
        machine::{Machine, MachineChecklist, MachinePayload},
        maintainer::Maintainer,
    },
};

#[derive(Clone)]
pub struct MachineService {
    machine_repo: MachineRepository,
    template_repo: TemplateRepository,
    issue_repo: IssueRepository,
}

impl MachineService {
    pub fn new(machine_repo: MachineRepository, template_repo: TemplateRepository, issue_repo: IssueRepository) -> Self {
        Self { machine_repo, template_repo, issue_repo }
    }

    pub async fn list(&self) -> Result<Vec<Machine>, AppError> {
        self.machine_repo.list().await
    }

    pub async fn get(&self, id: Uuid) -> Result<Machine, AppError> {
        self.machine_repo
            .find_by_id(self.machine_repo.pool(), id)
            .await?
            .ok_or(AppError::MachineNotFound)
    }

    async fn ensure_template(&self, template_id: Option<Uuid>) -> Result<(), AppError> {
        if let Some(id) = template_id {
            self.template_repo
                .find_by_id(self.template_repo.pool(), id)
                .await?
                .ok_or(AppError::TemplateNotFound)?;
        }
        Ok(())
    }

    pub async fn create(&self, payload: MachinePayload) -> Result<Machine, AppError> {
        self.ensure_template(payload.template_id).await?;
        let machine = self.machine_repo.create(&payload).await?;
        tracing::info!("Máquina {} cadastrada", machine.tag);
        Ok(machine)
    }

    pub async fn update(&self, id: Uuid, payload: MachinePayload) -> Result<Machine, AppError> {
        self.ensure_template(payload.template_id).await?;
        self.machine_repo
            .update(id, &payload)
            .await?
            .ok_or(AppError::MachineNotFound)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        if !self.machine_repo.delete(id).await? {
            return Err(AppError::MachineNotFound);
        }
        Ok(())
    }

    /// Máquinas ativas atribuídas ao mantenedor.
    pub async fn list_for_maintainer(&self, maintainer: &Maintainer) -> Result<Vec<Machine>, AppError> {
        if maintainer.machines.is_empty() {
            return Ok(vec![]);
        }
        let machines = self.machine_repo.list_by_ids(&maintainer.machines).await?;
        Ok(machines.into_iter().filter(|m| m.ativo).collect())
    }

    /// Tudo o que o formulário de checklist precisa: máquina, template e issues abertas.
    pub async fn checklist_for_maintainer(&self, maintainer: &Maintainer, tag: &str) -> Result<MachineChecklist, AppError> {
        let pool = self.machine_repo.pool();

        let machine = self
            .machine_repo
            .find_by_tag(pool, tag.trim())
            .await?
            .ok_or(AppError::MachineNotFound)?;

        if !maintainer.can_inspect(machine.id) {
            return Err(AppError::Forbidden);
        }

        let template = match machine.template_id {
            Some(template_id) => self.template_repo.find_by_id(pool, template_id).await?,
            None => None,
        };

        let open_issues = self.issue_repo.list_open_for_machine(pool, machine.id).await?;

        Ok(MachineChecklist { machine, template, open_issues })
    }
}
