use crate::error::RegistryError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Occupancy status of a single locker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockerStatus {
    Closed,
    Open,
    /// Reserved for out-of-band administrative action; no operation of this
    /// service transitions a locker into or out of maintenance.
    Maintenance,
}

/// State of one physical locker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Locker {
    pub id: u32,
    pub status: LockerStatus,
    /// Stamped on every transition to `Open`, including re-opens
    pub last_opened: Option<DateTime<Utc>>,
}

/// Authoritative in-memory store of locker state.
///
/// Every id in `[1, count]` has exactly one record from construction until
/// process exit; ids outside the range never exist. All lockers start
/// closed. Closing is an out-of-band physical action and is not modeled
/// here, so the only transition this registry performs is to `Open`.
pub struct LockerRegistry {
    lockers: BTreeMap<u32, Locker>,
}

impl LockerRegistry {
    /// Create a registry with `count` lockers, ids `1..=count`, all closed
    pub fn new(count: u32) -> Self {
        let lockers = (1..=count)
            .map(|id| {
                (
                    id,
                    Locker {
                        id,
                        status: LockerStatus::Closed,
                        last_opened: None,
                    },
                )
            })
            .collect();

        debug!("Created locker registry with {} lockers", count);

        Self { lockers }
    }

    /// Number of lockers in the registry
    pub fn len(&self) -> usize {
        self.lockers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lockers.is_empty()
    }

    /// All locker records, ordered by id. Always returns every record,
    /// even before any activity.
    pub fn list_all(&self) -> Vec<Locker> {
        self.lockers.values().cloned().collect()
    }

    /// The record for `id`, or `NotFound` when the id is outside the range
    pub fn get(&self, id: u32) -> Result<Locker, RegistryError> {
        self.lockers
            .get(&id)
            .cloned()
            .ok_or(RegistryError::NotFound { id })
    }

    /// Transition the locker to `Open` and stamp `last_opened` with the
    /// current time.
    ///
    /// The prior status is overwritten unconditionally: repeated opens
    /// simply re-stamp the timestamp, there is no "already open" error.
    /// Returns the updated record.
    pub fn mark_opened(&mut self, id: u32) -> Result<Locker, RegistryError> {
        let locker = self
            .lockers
            .get_mut(&id)
            .ok_or(RegistryError::NotFound { id })?;

        locker.status = LockerStatus::Open;
        locker.last_opened = Some(Utc::now());

        trace!("Locker {} marked open", id);

        Ok(locker.clone())
    }

    /// Iterate over all records in id order without cloning
    pub fn iter(&self) -> impl Iterator<Item = &Locker> {
        self.lockers.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_all_closed() {
        let registry = LockerRegistry::new(15);

        assert_eq!(registry.len(), 15);
        let all = registry.list_all();
        assert_eq!(all.len(), 15);

        for (index, locker) in all.iter().enumerate() {
            assert_eq!(locker.id, index as u32 + 1);
            assert_eq!(locker.status, LockerStatus::Closed);
            assert!(locker.last_opened.is_none());
        }
    }

    #[test]
    fn test_get_in_range() {
        let registry = LockerRegistry::new(15);

        for id in 1..=15 {
            let locker = registry.get(id).unwrap();
            assert_eq!(locker.id, id);
        }
    }

    #[test]
    fn test_get_out_of_range() {
        let registry = LockerRegistry::new(15);

        assert_eq!(registry.get(0), Err(RegistryError::NotFound { id: 0 }));
        assert_eq!(registry.get(16), Err(RegistryError::NotFound { id: 16 }));
        assert_eq!(
            registry.get(u32::MAX),
            Err(RegistryError::NotFound { id: u32::MAX })
        );
    }

    #[test]
    fn test_mark_opened_sets_status_and_timestamp() {
        let mut registry = LockerRegistry::new(15);

        let opened = registry.mark_opened(5).unwrap();
        assert_eq!(opened.status, LockerStatus::Open);
        assert!(opened.last_opened.is_some());

        // The registry reflects the transition on subsequent reads
        let read_back = registry.get(5).unwrap();
        assert_eq!(read_back.status, LockerStatus::Open);
        assert_eq!(read_back.last_opened, opened.last_opened);
    }

    #[test]
    fn test_mark_opened_restamps_monotonically() {
        let mut registry = LockerRegistry::new(15);

        let first = registry.mark_opened(5).unwrap();
        let second = registry.mark_opened(5).unwrap();

        assert_eq!(second.status, LockerStatus::Open);
        assert!(second.last_opened.unwrap() >= first.last_opened.unwrap());
    }

    #[test]
    fn test_mark_opened_out_of_range() {
        let mut registry = LockerRegistry::new(15);

        assert_eq!(
            registry.mark_opened(16),
            Err(RegistryError::NotFound { id: 16 })
        );
        // No record was created by the failed call
        assert_eq!(registry.len(), 15);
        assert!(registry.get(16).is_err());
    }

    #[test]
    fn test_list_all_is_read_only() {
        let registry = LockerRegistry::new(3);

        let before = registry.list_all();
        let _ = registry.list_all();
        let after = registry.list_all();

        assert_eq!(before.len(), after.len());
        for (a, b) in before.iter().zip(after.iter()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.status, b.status);
            assert_eq!(a.last_opened, b.last_opened);
        }
    }

    #[test]
    fn test_locker_wire_format() {
        let locker = Locker {
            id: 3,
            status: LockerStatus::Closed,
            last_opened: None,
        };

        let json = serde_json::to_value(&locker).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["status"], "closed");
        assert!(json["lastOpened"].is_null());
    }
}
