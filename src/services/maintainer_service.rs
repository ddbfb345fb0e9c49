// src/services/maintainer_service.rs

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{MachineRepository, MaintainerRepository},
    models::{
        machine::Machine,
        maintainer::{CreateMaintainerPayload, Maintainer, UpdateMaintainerPayload},
    },
    services::auth::hash_password,
};

#[derive(Clone)]
pub struct MaintainerService {
    repo: MaintainerRepository,
    machine_repo: MachineRepository,
}

impl MaintainerService {
    pub fn new(repo: MaintainerRepository, machine_repo: MachineRepository) -> Self {
        Self { repo, machine_repo }
    }

    pub async fn list(&self) -> Result<Vec<Maintainer>, AppError> {
        self.repo.list().await
    }

    pub async fn get(&self, id: Uuid) -> Result<Maintainer, AppError> {
        self.repo
            .find_by_id(self.repo.pool(), id)
            .await?
            .ok_or(AppError::NotFound)
    }

    // Ids de máquina que não existem são descartados
    async fn known_machines(&self, ids: &[Uuid]) -> Result<Vec<Uuid>, AppError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let found = self.machine_repo.list_by_ids(ids).await?;
        let mut known: Vec<Uuid> = Vec::with_capacity(found.len());
        for id in ids {
            if found.iter().any(|m| m.id == *id) && !known.contains(id) {
                known.push(*id);
            }
        }
        Ok(known)
    }

    pub async fn create(&self, mut payload: CreateMaintainerPayload) -> Result<Maintainer, AppError> {
        payload.machines = self.known_machines(&payload.machines).await?;
        let password_hash = hash_password(&payload.senha).await?;

        let maintainer = self.repo.create(&payload, &password_hash).await?;
        tracing::info!("Mantenedor {} cadastrado", maintainer.matricula);
        Ok(maintainer)
    }

    /// Senha vazia ou ausente mantém a atual.
    pub async fn update(&self, id: Uuid, payload: UpdateMaintainerPayload) -> Result<Maintainer, AppError> {
        let password_hash = match payload.senha.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(senha) => Some(hash_password(senha).await?),
            None => None,
        };

        self.repo
            .update(id, &payload, password_hash.as_deref())
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        if !self.repo.delete(id).await? {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    pub async fn machines(&self, id: Uuid) -> Result<Vec<Machine>, AppError> {
        let maintainer = self.get(id).await?;
        if maintainer.machines.is_empty() {
            return Ok(vec![]);
        }
        self.machine_repo.list_by_ids(&maintainer.machines).await
    }

    /// Substitui a lista de máquinas que o mantenedor pode inspecionar.
    pub async fn assign_machines(&self, id: Uuid, machines: &[Uuid]) -> Result<Maintainer, AppError> {
        let known = self.known_machines(machines).await?;
        let maintainer = self
            .repo
            .set_machines(id, &known)
            .await?
            .ok_or(AppError::NotFound)?;

        tracing::info!("Mantenedor {}: {} máquina(s) atribuída(s)", maintainer.matricula, known.len());
        Ok(maintainer)
    }
}
