pub mod admin_repo;
pub use admin_repo::AdminRepository;
pub mod template_repo;
pub use template_repo::TemplateRepository;
pub mod machine_repo;
pub use machine_repo::MachineRepository;
pub mod maintainer_repo;
pub use maintainer_repo::MaintainerRepository;
pub mod inspection_repo;
pub use inspection_repo::InspectionRepository;
pub mod issue_repo;
pub use issue_repo::IssueRepository;
