// src/docs.rs

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Sessões ---
        handlers::admin_session::login,
        handlers::admin_session::current,
        handlers::admin_session::logout,
        handlers::maint_auth::login,
        handlers::maint_auth::me,
        handlers::maint_auth::logout,

        // --- Área do mantenedor ---
        handlers::maint::my_machines,
        handlers::maint::machine_checklist,

        // --- Inspeções ---
        handlers::inspections::create_inspection,
        handlers::inspections::list_inspections,
        handlers::inspections::list_pending_sign,
        handlers::inspections::get_inspection,
        handlers::inspections::update_inspection,
        handlers::inspections::pcm_sign,
        handlers::inspections::update_treatment,
        handlers::documents::inspection_pdf,

        // --- Issues ---
        handlers::issues::list_issues,

        // --- Cadastros ---
        handlers::machines::list_machines,
        handlers::machines::create_machine,
        handlers::machines::get_machine,
        handlers::machines::update_machine,
        handlers::machines::delete_machine,
        handlers::templates::list_templates,
        handlers::templates::create_template,
        handlers::templates::get_template,
        handlers::templates::update_template,
        handlers::templates::delete_template,
        handlers::maintainers::list_maintainers,
        handlers::maintainers::create_maintainer,
        handlers::maintainers::get_maintainer,
        handlers::maintainers::update_maintainer,
        handlers::maintainers::delete_maintainer,
        handlers::maintainers::get_maintainer_machines,
        handlers::maintainers::set_maintainer_machines,

        // --- Uploads ---
        handlers::uploads::upload_image,
    ),
    components(
        schemas(
            // --- Sessões ---
            models::auth::Admin,
            models::auth::AdminLoginPayload,
            models::auth::MaintainerLoginPayload,

            // --- Cadastros ---
            models::machine::Machine,
            models::machine::MachinePayload,
            models::machine::MachineChecklist,
            models::template::Template,
            models::template::TemplateItem,
            models::template::TemplatePayload,
            models::template::TemplateItemPayload,
            models::maintainer::Maintainer,
            models::maintainer::CreateMaintainerPayload,
            models::maintainer::UpdateMaintainerPayload,
            models::maintainer::MaintainerMachines,

            // --- Inspeções ---
            models::inspection::Inspection,
            models::inspection::Answer,
            models::inspection::Resposta,
            models::inspection::Resultado,
            models::inspection::MachineSnapshot,
            models::inspection::TemplateSnapshot,
            models::inspection::MaintainerSnapshot,
            models::inspection::PcmSign,
            models::inspection::Treatment,
            models::inspection::TreatmentStatus,
            models::inspection::CreateInspectionItem,
            models::inspection::CreateInspectionPayload,
            models::inspection::UpdateInspectionItem,
            models::inspection::UpdateInspectionPayload,
            models::inspection::PhotoRef,
            models::inspection::PhotoUpload,
            models::inspection::PcmSignPayload,
            models::inspection::TreatmentPayload,

            // --- Issues ---
            models::issue::Issue,
            models::issue::IssueStatus,

            // --- Uploads ---
            handlers::uploads::UploadPayload,
            handlers::uploads::UploadResponse,
        )
    ),
    tags(
        (name = "Sessão", description = "Sessão do administrador (PCM)"),
        (name = "Mantenedor", description = "Sessão e área de trabalho do mantenedor"),
        (name = "Inspeções", description = "Checklists, assinaturas, tratativas e relatório PDF"),
        (name = "Issues", description = "Histórico de não conformidades por máquina"),
        (name = "Máquinas", description = "Cadastro de máquinas"),
        (name = "Templates", description = "Templates de checklist"),
        (name = "Mantenedores", description = "Cadastro de mantenedores e máquinas atribuídas"),
        (name = "Uploads", description = "Imagens de máquinas e templates")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "admin_session",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("admin_session"))),
        );
        components.add_security_scheme(
            "maint_session",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("maint_session"))),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_inspection_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/inspecoes"));
        assert!(doc.paths.paths.contains_key("/api/inspecoes/{id}/pdf"));
        assert!(doc.paths.paths.contains_key("/api/auth/maint/login"));
    }
}
