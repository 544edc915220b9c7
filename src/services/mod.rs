pub mod health_service;
pub mod submission_service;
pub mod templates;
