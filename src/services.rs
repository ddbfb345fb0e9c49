// src/services.rs

pub mod answers;
pub mod auth;
pub mod document_service;
pub mod image_store;
pub mod inspection_service;
pub mod machine_service;
pub mod maintainer_service;
pub mod reconciliation;
pub mod template_service;
pub mod treatments;
