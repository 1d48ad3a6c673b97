use std::cmp::Reverse;
use std::collections::HashMap;

use chrono::Utc;

use crate::error::{Result, TrackerError};
use crate::tracker::application::{ApplicationId, OwnerId, TrackedApplication};
use crate::tracker::query::{paginate, ListQuery, Page};
use crate::tracker::validation::{ValidApplication, ValidPatch};

const DEFAULT_MAX_APPLICATIONS: usize = 10_000;

#[derive(Debug, Clone)]
struct StoredApplication {
    /// Insertion order, used to break `created_at` ties.
    seq: u64,
    record: TrackedApplication,
}

/// Holds every tracked application. All lookups are owner-scoped: a record
/// owned by someone else behaves exactly like a missing one.
#[derive(Debug)]
pub struct ApplicationStore {
    records: HashMap<ApplicationId, StoredApplication>,
    next_seq: u64,
    max_applications: usize,
}

impl Default for ApplicationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_APPLICATIONS)
    }

    pub fn with_capacity(max_applications: usize) -> Self {
        Self {
            records: HashMap::new(),
            next_seq: 0,
            max_applications,
        }
    }

    /// Create a record for `owner` from validated fields.
    pub fn create(
        &mut self,
        owner: &OwnerId,
        fields: ValidApplication,
    ) -> Result<TrackedApplication> {
        self.insert(TrackedApplication::new(owner.clone(), fields))
    }

    /// Insert a fully formed record. Fails when the store is full or the id is taken.
    pub fn insert(&mut self, record: TrackedApplication) -> Result<TrackedApplication> {
        if self.is_full() {
            tracing::warn!(
                max_applications = self.max_applications,
                "Rejecting application, store is at capacity"
            );
            return Err(TrackerError::CapacityExceeded);
        }
        if self.records.contains_key(&record.id) {
            return Err(TrackerError::Internal(format!(
                "duplicate application id {}",
                record.id
            )));
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        tracing::debug!(id = %record.id, owner = %record.owner_id, seq, "Application stored");
        self.records.insert(
            record.id.clone(),
            StoredApplication {
                seq,
                record: record.clone(),
            },
        );
        Ok(record)
    }

    pub fn get(&self, owner: &OwnerId, id: &ApplicationId) -> Option<&TrackedApplication> {
        self.records
            .get(id)
            .map(|stored| &stored.record)
            .filter(|record| &record.owner_id == owner)
    }

    /// Apply a partial update and return the stored result.
    pub fn update(
        &mut self,
        owner: &OwnerId,
        id: &ApplicationId,
        patch: &ValidPatch,
    ) -> Result<TrackedApplication> {
        match self.records.get_mut(id) {
            Some(stored) if &stored.record.owner_id == owner => {
                stored.record.apply_patch(patch, Utc::now());
                Ok(stored.record.clone())
            }
            _ => Err(TrackerError::NotFound(id.to_string())),
        }
    }

    pub fn remove(&mut self, owner: &OwnerId, id: &ApplicationId) -> Result<TrackedApplication> {
        match self.records.get(id) {
            Some(stored) if &stored.record.owner_id == owner => self
                .records
                .remove(id)
                .map(|stored| stored.record)
                .ok_or_else(|| TrackerError::NotFound(id.to_string())),
            _ => Err(TrackerError::NotFound(id.to_string())),
        }
    }

    /// Newest first: `created_at` descending, later insertions ahead on ties.
    pub fn query(&self, owner: &OwnerId, query: &ListQuery) -> Page<TrackedApplication> {
        let mut matching: Vec<&StoredApplication> = self
            .records
            .values()
            .filter(|stored| &stored.record.owner_id == owner)
            .filter(|stored| query.filter.matches(&stored.record))
            .collect();
        matching.sort_by_key(|stored| (Reverse(stored.record.created_at), Reverse(stored.seq)));

        paginate(
            matching
                .into_iter()
                .map(|stored| stored.record.clone())
                .collect(),
            query,
        )
    }

    /// Number of records owned by `owner`.
    pub fn count_for_owner(&self, owner: &OwnerId) -> usize {
        self.records
            .values()
            .filter(|stored| &stored.record.owner_id == owner)
            .count()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= self.max_applications
    }
}
