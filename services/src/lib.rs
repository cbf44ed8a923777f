pub mod actor;
pub mod block;
pub mod email;
pub mod error;
pub mod relay_service;
pub mod settings_service;
pub mod submission_service;
