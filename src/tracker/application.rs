use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tracker::validation::{ValidApplication, ValidPatch};

const TEMP_ID_PREFIX: &str = "temp_";

/// Where an application currently stands. Doubles as the Kanban column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationStatus {
    #[default]
    Applied,
    Interview,
    Offer,
    Rejected,
}

impl ApplicationStatus {
    /// Board column order.
    pub const ALL: [ApplicationStatus; 4] = [
        ApplicationStatus::Applied,
        ApplicationStatus::Interview,
        ApplicationStatus::Offer,
        ApplicationStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "Applied",
            ApplicationStatus::Interview => "Interview",
            ApplicationStatus::Offer => "Offer",
            ApplicationStatus::Rejected => "Rejected",
        }
    }

    /// Position of this status in [`ApplicationStatus::ALL`].
    pub fn index(&self) -> usize {
        match self {
            ApplicationStatus::Applied => 0,
            ApplicationStatus::Interview => 1,
            ApplicationStatus::Offer => 2,
            ApplicationStatus::Rejected => 3,
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "Invalid status '{}'. Expected one of Applied, Interview, Offer, Rejected",
                    s
                )
            })
    }
}

/// Opaque record identifier. Server ids are UUIDs; the client mints
/// `temp_`-prefixed placeholders for records it has not yet saved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(String);

impl ApplicationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn temporary() -> Self {
        Self(format!("{}{}", TEMP_ID_PREFIX, Uuid::new_v4().simple()))
    }

    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMP_ID_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<String> for ApplicationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ApplicationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// The user a record belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedApplication {
    pub id: ApplicationId,
    pub owner_id: OwnerId,
    pub company_name: String,
    pub role: String,
    pub status: ApplicationStatus,
    pub applied_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set while a local change awaits server confirmation. Never leaves the client.
    #[serde(skip)]
    pub is_optimistic: bool,
}

impl TrackedApplication {
    pub fn new(owner_id: OwnerId, fields: ValidApplication) -> Self {
        Self::with_id(ApplicationId::generate(), owner_id, fields, Utc::now())
    }

    pub fn with_id(
        id: ApplicationId,
        owner_id: OwnerId,
        fields: ValidApplication,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_id,
            company_name: fields.company_name,
            role: fields.role,
            status: fields.status,
            applied_date: fields.applied_date,
            created_at,
            updated_at: created_at,
            is_optimistic: false,
        }
    }

    /// Client-side placeholder shown until the server confirms the create.
    pub fn provisional(owner_id: OwnerId, fields: ValidApplication) -> Self {
        Self {
            is_optimistic: true,
            ..Self::with_id(ApplicationId::temporary(), owner_id, fields, Utc::now())
        }
    }

    /// Overwrite the fields present in `patch` and bump `updated_at`.
    pub fn apply_patch(&mut self, patch: &ValidPatch, now: DateTime<Utc>) {
        if let Some(company_name) = &patch.company_name {
            self.company_name = company_name.clone();
        }
        if let Some(role) = &patch.role {
            self.role = role.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(applied_date) = patch.applied_date {
            self.applied_date = applied_date;
        }
        self.updated_at = now;
    }

    /// Case-insensitive substring match on company name or role.
    /// `needle` must already be lowercase.
    pub fn matches_search(&self, needle: &str) -> bool {
        needle.is_empty()
            || self.company_name.to_lowercase().contains(needle)
            || self.role.to_lowercase().contains(needle)
    }
}
