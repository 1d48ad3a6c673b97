//! Input payloads for creating and editing applications, and their checks.
//!
//! Payloads arrive loosely typed (status and dates as text) so that a bad
//! value produces a field-level message instead of a deserialization failure.
//! [`NewApplication::validate`] and [`ApplicationPatch::validate`] collect
//! every failing field before returning.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{FieldError, Result, TrackerError};
use crate::tracker::application::ApplicationStatus;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Body of a create request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewApplication {
    pub company_name: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub applied_date: String,
}

/// A create payload that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidApplication {
    pub company_name: String,
    pub role: String,
    pub status: ApplicationStatus,
    pub applied_date: NaiveDate,
}

impl NewApplication {
    pub fn new(
        company_name: impl Into<String>,
        role: impl Into<String>,
        applied_date: impl Into<String>,
    ) -> Self {
        Self {
            company_name: company_name.into(),
            role: role.into(),
            status: None,
            applied_date: applied_date.into(),
        }
    }

    pub fn with_status(mut self, status: ApplicationStatus) -> Self {
        self.status = Some(status.to_string());
        self
    }

    pub fn validate(&self) -> Result<ValidApplication> {
        let mut errors = Vec::new();

        let company_name = required_text(
            &self.company_name,
            "companyName",
            "Company name is required",
            &mut errors,
        );
        let role = required_text(&self.role, "role", "Role is required", &mut errors);
        let status = optional_status(self.status.as_deref(), &mut errors).unwrap_or_default();
        let applied_date = collect(parse_date(&self.applied_date, "appliedDate"), &mut errors);

        match (company_name, role, applied_date) {
            (Some(company_name), Some(role), Some(applied_date)) if errors.is_empty() => {
                Ok(ValidApplication {
                    company_name,
                    role,
                    status,
                    applied_date,
                })
            }
            _ => Err(TrackerError::Validation(errors)),
        }
    }
}

/// Body of a partial update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_date: Option<String>,
}

/// A patch that passed validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidPatch {
    pub company_name: Option<String>,
    pub role: Option<String>,
    pub status: Option<ApplicationStatus>,
    pub applied_date: Option<NaiveDate>,
}

impl ApplicationPatch {
    /// A patch that changes only the status, as issued by a board drop.
    pub fn status(status: ApplicationStatus) -> Self {
        Self {
            status: Some(status.to_string()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.company_name.is_none()
            && self.role.is_none()
            && self.status.is_none()
            && self.applied_date.is_none()
    }

    pub fn validate(&self) -> Result<ValidPatch> {
        let mut errors = Vec::new();

        let company_name = self.company_name.as_deref().and_then(|value| {
            required_text(value, "companyName", "Company name is required", &mut errors)
        });
        let role = self
            .role
            .as_deref()
            .and_then(|value| required_text(value, "role", "Role is required", &mut errors));
        let status = match self.status.as_deref() {
            Some(value) => collect(
                value
                    .parse::<ApplicationStatus>()
                    .map_err(|message| FieldError::new("status", message)),
                &mut errors,
            ),
            None => None,
        };
        let applied_date = self
            .applied_date
            .as_deref()
            .and_then(|value| collect(parse_date(value, "appliedDate"), &mut errors));

        if errors.is_empty() {
            Ok(ValidPatch {
                company_name,
                role,
                status,
                applied_date,
            })
        } else {
            Err(TrackerError::Validation(errors))
        }
    }
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (keeping its date).
pub fn parse_date(value: &str, field: &str) -> std::result::Result<NaiveDate, FieldError> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.date_naive()))
        .map_err(|_| FieldError::new(field, "Invalid date format"))
}

fn required_text(
    value: &str,
    field: &str,
    message: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(FieldError::new(field, message));
        None
    } else {
        Some(trimmed.to_string())
    }
}

// An empty status on create means "use the default".
fn optional_status(
    value: Option<&str>,
    errors: &mut Vec<FieldError>,
) -> Option<ApplicationStatus> {
    match value.map(str::trim) {
        None | Some("") => None,
        Some(value) => collect(
            value
                .parse::<ApplicationStatus>()
                .map_err(|message| FieldError::new("status", message)),
            errors,
        ),
    }
}

fn collect<T>(
    result: std::result::Result<T, FieldError>,
    errors: &mut Vec<FieldError>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            errors.push(e);
            None
        }
    }
}
