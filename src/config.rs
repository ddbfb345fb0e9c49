// src/config.rs

use std::{env, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Context};
use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{AdminRepository, InspectionRepository, IssueRepository, MachineRepository, MaintainerRepository, TemplateRepository},
    services::{
        auth::{AdminAuthService, MaintainerAuthService, TokenCodec},
        document_service::DocumentService,
        image_store::{ImageStore, LocalImageStore},
        inspection_service::InspectionService,
        machine_service::MachineService,
        maintainer_service::MaintainerService,
        template_service::TemplateService,
    },
};

// Chave de cookies do axum-extra exige pelo menos 64 bytes
const MIN_SESSION_SECRET_LEN: usize = 64;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub session_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub uploads_dir: PathBuf,
    pub uploads_public_url: String,
    pub fonts_dir: PathBuf,
    pub font_family: String,
    pub cookie_secure: bool,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| get(key).filter(|v| !v.trim().is_empty()).with_context(|| format!("{} deve ser definida", key));
        let or_default = |key: &str, default: &str| get(key).filter(|v| !v.trim().is_empty()).unwrap_or_else(|| default.to_string());

        let session_secret = required("SESSION_SECRET")?;
        if session_secret.len() < MIN_SESSION_SECRET_LEN {
            bail!("SESSION_SECRET deve ter no mínimo {} bytes", MIN_SESSION_SECRET_LEN);
        }

        let db_max_connections = or_default("DB_MAX_CONNECTIONS", "5")
            .parse::<u32>()
            .context("DB_MAX_CONNECTIONS deve ser um número")?;

        let cookie_secure = matches!(or_default("COOKIE_SECURE", "false").to_ascii_lowercase().as_str(), "1" | "true" | "yes");

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            session_secret,
            bind_addr: or_default("BIND_ADDR", "0.0.0.0:3000"),
            db_max_connections,
            uploads_dir: PathBuf::from(or_default("UPLOADS_DIR", "./uploads")),
            uploads_public_url: or_default("UPLOADS_PUBLIC_URL", "/uploads"),
            fonts_dir: PathBuf::from(or_default("FONTS_DIR", "./fonts")),
            font_family: or_default("FONT_FAMILY", "Roboto"),
            cookie_secure,
            admin_email: get("ADMIN_EMAIL").filter(|v| !v.trim().is_empty()),
            admin_password: get("ADMIN_PASSWORD").filter(|v| !v.is_empty()),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<Config>,
    pub cookie_key: Key,
    pub images: Arc<dyn ImageStore>,

    // Sessões
    pub admin_auth: AdminAuthService,
    pub maint_auth: MaintainerAuthService,

    pub template_service: TemplateService,
    pub machine_service: MachineService,
    pub maintainer_service: MaintainerService,
    pub inspection_service: InspectionService,
    pub document_service: DocumentService,
    pub issue_repo: IssueRepository,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = Config::from_env()?;

        let cookie_key = Key::try_from(config.session_secret.as_bytes())
            .map_err(|e| anyhow::anyhow!("SESSION_SECRET inválida: {}", e))?;

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let images: Arc<dyn ImageStore> =
            Arc::new(LocalImageStore::new(config.uploads_dir.clone(), &config.uploads_public_url));

        // --- Monta o gráfico de dependências ---
        let admin_repo = AdminRepository::new(db_pool.clone());
        let template_repo = TemplateRepository::new(db_pool.clone());
        let machine_repo = MachineRepository::new(db_pool.clone());
        let maintainer_repo = MaintainerRepository::new(db_pool.clone());
        let inspection_repo = InspectionRepository::new(db_pool.clone());
        let issue_repo = IssueRepository::new(db_pool.clone());

        let tokens = TokenCodec::new(config.jwt_secret.clone());
        let admin_auth = AdminAuthService::new(admin_repo, tokens.clone());
        let maint_auth = MaintainerAuthService::new(maintainer_repo.clone(), tokens);

        let template_service = TemplateService::new(template_repo.clone());
        let machine_service = MachineService::new(machine_repo.clone(), template_repo.clone(), issue_repo.clone());
        let maintainer_service = MaintainerService::new(maintainer_repo, machine_repo.clone());
        let inspection_service = InspectionService::new(
            db_pool.clone(),
            inspection_repo,
            machine_repo,
            template_repo,
            issue_repo.clone(),
            images.clone(),
        );
        let document_service =
            DocumentService::new(images.clone(), config.fonts_dir.clone(), config.font_family.clone());

        Ok(Self {
            db_pool,
            config: Arc::new(config),
            cookie_key,
            images,
            admin_auth,
            maint_auth,
            template_service,
            machine_service,
            maintainer_service,
            inspection_service,
            document_service,
            issue_repo,
        })
    }
}

// Os cookie jars assinados/criptografados buscam a chave no estado
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    fn secret() -> String {
        "s".repeat(64)
    }

    #[test]
    fn test_defaults() {
        let secret = secret();
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/pcm"),
            ("JWT_SECRET", "jwt"),
            ("SESSION_SECRET", &secret),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.uploads_public_url, "/uploads");
        assert_eq!(config.font_family, "Roboto");
        assert!(!config.cookie_secure);
        assert!(config.admin_email.is_none());
    }

    #[test]
    fn test_short_session_secret_is_rejected() {
        let result = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/pcm"),
            ("JWT_SECRET", "jwt"),
            ("SESSION_SECRET", "curta"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_database_url() {
        let secret = secret();
        let result = Config::from_lookup(lookup(&[("JWT_SECRET", "jwt"), ("SESSION_SECRET", &secret)]));
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides() {
        let secret = secret();
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/pcm"),
            ("JWT_SECRET", "jwt"),
            ("SESSION_SECRET", &secret),
            ("DB_MAX_CONNECTIONS", "12"),
            ("COOKIE_SECURE", "true"),
            ("ADMIN_EMAIL", "pcm@coop.com.br"),
        ]))
        .unwrap();
        assert_eq!(config.db_max_connections, 12);
        assert!(config.cookie_secure);
        assert_eq!(config.admin_email.as_deref(), Some("pcm@coop.com.br"));
    }
}
