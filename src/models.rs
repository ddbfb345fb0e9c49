pub mod auth;
pub mod inspection;
pub mod issue;
pub mod machine;
pub mod maintainer;
pub mod template;
