// src/handlers.rs

pub mod admin_session;
pub mod documents;
pub mod inspections;
pub mod issues;
pub mod machines;
pub mod maint;
pub mod maint_auth;
pub mod maintainers;
pub mod templates;
pub mod uploads;
