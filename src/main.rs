//src/main.rs

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::{common::data_url::MAX_IMAGE_BYTES, config::AppState, docs::ApiDoc};

// Imagens chegam em base64 (+1/3 do tamanho) dentro do JSON
const fn base64_len(bytes: usize) -> usize {
    bytes.div_ceil(3) * 4
}

/// Uma imagem por requisição (uploads avulsos e assinatura PCM).
const UPLOAD_BODY_LIMIT: usize = base64_len(MAX_IMAGE_BYTES) + 64 * 1024;

/// Checklist completo: assinatura + fotos de vários itens.
const INSPECTION_BODY_LIMIT: usize = 16 * UPLOAD_BODY_LIMIT;

fn limit_body<S>(router: Router<S>, limit: usize) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(DefaultBodyLimit::max(limit))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG controla o nível; padrão "info"
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new().await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    if let (Some(email), Some(password)) = (&app_state.config.admin_email, &app_state.config.admin_password) {
        app_state.admin_auth.seed(email, password).await?;
    }

    // Sessão do administrador
    let admin_session_routes = Router::new().route(
        "/",
        post(handlers::admin_session::login)
            .get(handlers::admin_session::current)
            .delete(handlers::admin_session::logout),
    );

    // Sessão e área do mantenedor
    let maint_auth_routes = Router::new()
        .route("/login", post(handlers::maint_auth::login))
        .route("/me", get(handlers::maint_auth::me))
        .route("/logout", post(handlers::maint_auth::logout));

    let maint_routes = Router::new()
        .route("/machines", get(handlers::maint::my_machines))
        .route("/machines/{tag}", get(handlers::maint::machine_checklist));

    let inspection_routes = Router::new()
        .route(
            "/",
            post(handlers::inspections::create_inspection).get(handlers::inspections::list_inspections),
        )
        .route("/pending-sign", get(handlers::inspections::list_pending_sign))
        .route(
            "/{id}",
            get(handlers::inspections::get_inspection).patch(handlers::inspections::update_inspection),
        )
        .route("/{id}/pcm-sign", patch(handlers::inspections::pcm_sign))
        .route("/{id}/treatments", patch(handlers::inspections::update_treatment))
        .route("/{id}/pdf", get(handlers::documents::inspection_pdf));
    let inspection_routes = limit_body(inspection_routes, INSPECTION_BODY_LIMIT);

    let upload_routes = limit_body(
        Router::new().route("/{folder}", post(handlers::uploads::upload_image)),
        UPLOAD_BODY_LIMIT,
    );

    let machine_routes = Router::new()
        .route(
            "/",
            get(handlers::machines::list_machines).post(handlers::machines::create_machine),
        )
        .route(
            "/{id}",
            get(handlers::machines::get_machine)
                .put(handlers::machines::update_machine)
                .delete(handlers::machines::delete_machine),
        );

    let template_routes = Router::new()
        .route(
            "/",
            get(handlers::templates::list_templates).post(handlers::templates::create_template),
        )
        .route(
            "/{id}",
            get(handlers::templates::get_template)
                .put(handlers::templates::update_template)
                .delete(handlers::templates::delete_template),
        );

    let maintainer_routes = Router::new()
        .route(
            "/",
            get(handlers::maintainers::list_maintainers).post(handlers::maintainers::create_maintainer),
        )
        .route(
            "/{id}",
            get(handlers::maintainers::get_maintainer)
                .put(handlers::maintainers::update_maintainer)
                .delete(handlers::maintainers::delete_maintainer),
        )
        .route(
            "/{id}/machines",
            get(handlers::maintainers::get_maintainer_machines).put(handlers::maintainers::set_maintainer_machines),
        );

    let uploads_dir = app_state.config.uploads_dir.clone();
    let uploads_public_url = app_state.config.uploads_public_url.trim_end_matches('/').to_string();
    let bind_addr = app_state.config.bind_addr.clone();

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/issues", get(handlers::issues::list_issues))
        .nest("/api/admin-session", admin_session_routes)
        .nest("/api/auth/maint", maint_auth_routes)
        .nest("/api/maint", maint_routes)
        .nest("/api/inspecoes", inspection_routes)
        .nest("/api/uploads", upload_routes)
        .nest("/api/machines", machine_routes)
        .nest("/api/templates", template_routes)
        .nest("/api/mantenedores", maintainer_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest_service(&uploads_public_url, ServeDir::new(uploads_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Json,
    };
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use tower::ServiceExt;

    use crate::models::inspection::CreateInspectionPayload;

    async fn accept(Json(payload): Json<CreateInspectionPayload>) -> String {
        payload.tag
    }

    fn inspection_body(photos: usize, photo_bytes: usize) -> String {
        let foto = format!("data:image/jpeg;base64,{}", STANDARD.encode(vec![7u8; photo_bytes]));
        let fotos: Vec<&str> = (0..photos).map(|_| foto.as_str()).collect();
        serde_json::json!({
            "tag": "PRENSA-01",
            "assinaturaDataUrl": foto,
            "itens": [
                { "templateItemId": "i1", "resultado": "NC", "fotos": fotos },
                { "templateItemId": "i2", "resultado": "NC", "fotos": fotos }
            ]
        })
        .to_string()
    }

    async fn post_json(router: Router, body: String) -> StatusCode {
        let request = Request::post("/")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        router.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_inspection_routes_accept_full_size_photos() {
        let router = limit_body(Router::new().route("/", post(accept)), INSPECTION_BODY_LIMIT);
        // Assinatura + 3 fotos em 2 itens, cada uma com 3MB
        let status = post_json(router, inspection_body(3, 3 * 1024 * 1024)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_upload_route_accepts_max_image_and_rejects_beyond() {
        async fn echo(body: String) -> StatusCode {
            assert!(!body.is_empty());
            StatusCode::OK
        }
        let router = limit_body(Router::new().route("/", post(echo)), UPLOAD_BODY_LIMIT);

        let max = format!(
            "{{\"dataUrl\":\"data:image/png;base64,{}\"}}",
            STANDARD.encode(vec![1u8; MAX_IMAGE_BYTES])
        );
        assert_eq!(post_json(router.clone(), max).await, StatusCode::OK);

        let too_big = "a".repeat(UPLOAD_BODY_LIMIT + 1);
        assert_eq!(post_json(router, too_big).await, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_base64_len() {
        assert_eq!(base64_len(3), 4);
        assert_eq!(base64_len(4), 8);
        assert!(INSPECTION_BODY_LIMIT > 7 * base64_len(3 * 1024 * 1024));
    }
}
