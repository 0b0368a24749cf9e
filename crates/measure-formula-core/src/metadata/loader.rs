//! One-shot loading boundary for structure members

use super::MetadataSnapshot;
use crate::error::{Error, Result};
use std::sync::Arc;
use tokio::sync::watch;

/// Structure members that become available exactly once
///
/// Compilation is gated on the members being loaded: before [`complete`] is
/// called, [`snapshot`] returns [`Error::MetadataNotLoaded`]. Later completions
/// are ignored.
///
/// [`complete`]: StructureMembers::complete
/// [`snapshot`]: StructureMembers::snapshot
#[derive(Debug)]
pub struct StructureMembers {
    state: watch::Sender<Option<Arc<MetadataSnapshot>>>,
}

impl StructureMembers {
    pub fn new() -> Self {
        let (state, _) = watch::channel(None);
        Self { state }
    }

    /// Create already loaded members
    pub fn loaded(snapshot: MetadataSnapshot) -> Self {
        let members = Self::new();
        members.complete(snapshot);
        members
    }

    /// Publish the loaded snapshot. Returns `false` if members were already loaded.
    pub fn complete(&self, snapshot: MetadataSnapshot) -> bool {
        let mut snapshot = Some(Arc::new(snapshot));
        let published = self.state.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = snapshot.take();
            true
        });
        if published {
            tracing::debug!("structure members loaded");
        } else {
            tracing::warn!("structure members already loaded; ignoring second completion");
        }
        published
    }

    pub fn is_ready(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// The loaded snapshot, or [`Error::MetadataNotLoaded`]
    pub fn snapshot(&self) -> Result<Arc<MetadataSnapshot>> {
        self.state.borrow().clone().ok_or(Error::MetadataNotLoaded)
    }

    /// Wait until the members are loaded
    pub async fn ready(&self) -> Result<Arc<MetadataSnapshot>> {
        let mut rx = self.state.subscribe();
        let loaded = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| Error::MetadataNotLoaded)?;
        loaded.clone().ok_or(Error::MetadataNotLoaded)
    }
}

impl Default for StructureMembers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{Backend, Measure, MetadataProvider};
    use std::sync::Arc;

    #[test]
    fn test_snapshot_before_load_fails() {
        let members = StructureMembers::new();
        assert!(!members.is_ready());
        assert_eq!(members.snapshot().unwrap_err(), Error::MetadataNotLoaded);
    }

    #[test]
    fn test_second_completion_is_ignored() {
        let members = StructureMembers::new();
        assert!(members.complete(MetadataSnapshot::new(Backend::Hana)));
        assert!(!members.complete(MetadataSnapshot::new(Backend::Bw)));
        assert_eq!(members.snapshot().unwrap().backend(), Backend::Hana);
    }

    #[tokio::test]
    async fn test_ready_resolves_after_completion() {
        let members = Arc::new(StructureMembers::new());
        let waiter = {
            let members = Arc::clone(&members);
            tokio::spawn(async move { members.ready().await })
        };
        tokio::task::yield_now().await;
        members.complete(MetadataSnapshot::new(Backend::Bw).with_measure(Measure::new("Sales")));

        let snapshot = waiter.await.unwrap().unwrap();
        assert_eq!(snapshot.backend(), Backend::Bw);
        assert!(snapshot.resolve_measure("Sales").is_some());
    }

    #[tokio::test]
    async fn test_ready_when_already_loaded() {
        let members = StructureMembers::loaded(MetadataSnapshot::new(Backend::Hana));
        assert_eq!(members.ready().await.unwrap().backend(), Backend::Hana);
    }
}
