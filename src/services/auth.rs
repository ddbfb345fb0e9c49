// src/services/auth.rs

use async_trait::async_trait;
use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{AdminRepository, MaintainerRepository},
    models::{
        auth::{Admin, Claims, SessionRole},
        maintainer::Maintainer,
    },
};

/// Validade das sessões (os dois cookies)
pub const SESSION_DAYS: i64 = 7;

/// Capacidade de validar o conteúdo de um cookie de sessão.
/// Cada papel (admin, mantenedor) tem a sua implementação, injetada via AppState.
#[async_trait]
pub trait SessionValidator: Send + Sync {
    type Principal: Send;

    async fn validate(&self, token: &str) -> Result<Self::Principal, AppError>;
}

pub async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
    Ok(hashed)
}

async fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let password = password.to_owned();
    let password_hash = password_hash.to_owned();

    // Executa a verificação em um thread separado
    let valid = tokio::task::spawn_blocking(move || verify(&password, &password_hash))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;
    Ok(valid)
}

// JWT gravado dentro dos cookies
#[derive(Clone)]
pub struct TokenCodec {
    secret: String,
}

impl TokenCodec {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    pub fn issue(&self, sub: Uuid, role: SessionRole) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(SESSION_DAYS);

        let claims = Claims {
            sub,
            role,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )?)
    }

    pub fn decode(&self, token: &str, expected: SessionRole) -> Result<Claims, AppError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::Unauthenticated)?;

        // Um cookie de mantenedor nunca vale como sessão de admin (e vice-versa)
        if data.claims.role != expected {
            return Err(AppError::Unauthenticated);
        }
        Ok(data.claims)
    }
}

#[derive(Clone)]
pub struct AdminAuthService {
    repo: AdminRepository,
    tokens: TokenCodec,
}

impl AdminAuthService {
    pub fn new(repo: AdminRepository, tokens: TokenCodec) -> Self {
        Self { repo, tokens }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(Admin, String), AppError> {
        let admin = self
            .repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(password, &admin.password_hash).await? {
            return Err(AppError::InvalidCredentials);
        }

        let token = self.tokens.issue(admin.id, SessionRole::Admin)?;
        tracing::info!("Sessão de administrador iniciada: {}", admin.email);
        Ok((admin, token))
    }

    /// Cria o primeiro administrador quando a tabela está vazia.
    pub async fn seed(&self, email: &str, password: &str) -> Result<(), AppError> {
        if self.repo.count().await? > 0 {
            return Ok(());
        }
        let password_hash = hash_password(password).await?;
        let admin = self.repo.create(email, "Administrador", &password_hash).await?;
        tracing::info!("✅ Administrador inicial criado: {}", admin.email);
        Ok(())
    }
}

#[async_trait]
impl SessionValidator for AdminAuthService {
    type Principal = Admin;

    async fn validate(&self, token: &str) -> Result<Admin, AppError> {
        let claims = self.tokens.decode(token, SessionRole::Admin)?;
        self.repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::Unauthenticated)
    }
}

#[derive(Clone)]
pub struct MaintainerAuthService {
    repo: MaintainerRepository,
    tokens: TokenCodec,
}

impl MaintainerAuthService {
    pub fn new(repo: MaintainerRepository, tokens: TokenCodec) -> Self {
        Self { repo, tokens }
    }

    pub async fn login(&self, matricula: &str, senha: &str) -> Result<(Maintainer, String), AppError> {
        let maintainer = self
            .repo
            .find_by_matricula(matricula.trim())
            .await?
            .filter(|m| m.ativo)
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(senha, &maintainer.password_hash).await? {
            return Err(AppError::InvalidCredentials);
        }

        let token = self.tokens.issue(maintainer.id, SessionRole::Maintainer)?;
        tracing::info!("Sessão de mantenedor iniciada: matrícula {}", maintainer.matricula);
        Ok((maintainer, token))
    }
}

#[async_trait]
impl SessionValidator for MaintainerAuthService {
    type Principal = Maintainer;

    // Sessão válida mas cadastro removido/inativado → MAINTAINER_NOT_FOUND
    async fn validate(&self, token: &str) -> Result<Maintainer, AppError> {
        let claims = self.tokens.decode(token, SessionRole::Maintainer)?;
        self.repo
            .find_by_id(self.repo.pool(), claims.sub)
            .await?
            .filter(|m| m.ativo)
            .ok_or(AppError::MaintainerNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        let codec = TokenCodec::new("segredo-de-teste".into());
        let id = Uuid::new_v4();
        let token = codec.issue(id, SessionRole::Maintainer).unwrap();

        let claims = codec.decode(&token, SessionRole::Maintainer).unwrap();
        assert_eq!(claims.sub, id);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_role_mismatch_is_rejected() {
        let codec = TokenCodec::new("segredo-de-teste".into());
        let token = codec.issue(Uuid::new_v4(), SessionRole::Maintainer).unwrap();
        assert!(matches!(codec.decode(&token, SessionRole::Admin), Err(AppError::Unauthenticated)));
    }

    #[test]
    fn test_foreign_secret_is_rejected() {
        let token = TokenCodec::new("a".into()).issue(Uuid::new_v4(), SessionRole::Admin).unwrap();
        let other = TokenCodec::new("b".into());
        assert!(matches!(other.decode(&token, SessionRole::Admin), Err(AppError::Unauthenticated)));
        assert!(matches!(other.decode("lixo", SessionRole::Admin), Err(AppError::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_password_hash_and_verify() {
        let hashed = hash_password("senha123").await.unwrap();
        assert!(verify_password("senha123", &hashed).await.unwrap());
        assert!(!verify_password("outra", &hashed).await.unwrap());
    }
}
