use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// A request for a bespoke capture session, submitted from the intake form.
#[derive(Debug, Clone, Serialize)]
pub struct CustomRequest {
    pub id: String,
    pub name: String,
    pub email: String,
    pub project_type: String,
    pub description: String,
    pub budget: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub project_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub budget: Option<String>,
}

impl CreateCustomRequest {
    /// Trim all fields, treat a blank budget as absent, and reject blank
    /// required fields or an implausible email.
    pub fn normalized(self) -> Result<Self> {
        let required = |field: &str, value: String| -> Result<String> {
            let trimmed = value.trim().to_string();
            if trimmed.is_empty() {
                return Err(AppError::BadRequest(format!("{} is required", field)));
            }
            Ok(trimmed)
        };

        let email = required("email", self.email)?;
        if !looks_like_email(&email) {
            return Err(AppError::BadRequest("Invalid email address".into()));
        }

        Ok(Self {
            name: required("name", self.name)?,
            email,
            project_type: required("projectType", self.project_type)?,
            description: required("description", self.description)?,
            budget: self
                .budget
                .map(|b| b.trim().to_string())
                .filter(|b| !b.is_empty()),
        })
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}
