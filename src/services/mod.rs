pub mod event_service;
pub mod manager_service;

use std::collections::HashMap;

/// Field-level validation failure; nothing is persisted when one is raised.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
    pub field_errors: HashMap<String, String>,
}

impl ValidationError {
    pub fn new(field_errors: HashMap<String, String>) -> Self {
        Self {
            message: "Validation failed".to_string(),
            field_errors,
        }
    }
}
