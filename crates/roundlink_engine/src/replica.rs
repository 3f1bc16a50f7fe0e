//! One replica: explicit wiring of store, queue, coordinator, and
//! transport.

use crate::config::{DeviceRole, SyncConfig};
use crate::coordinator::SyncCoordinator;
use crate::error::{SyncError, SyncResult};
use crate::location::LocationProvider;
use crate::queue::PendingOperationQueue;
use crate::transport::Transport;
use roundlink_model::{ClubId, Round, Stroke, StrokeAnnotations};
use roundlink_store::{Persistence, RoundStore};
use std::sync::Arc;
use tracing::info;

/// One process instance of the replication stack.
///
/// Construction is explicit dependency injection: one store, one queue,
/// one coordinator, and one transport per process, with no globally
/// reachable shared state. Two `Replica`s — one
/// [`Primary`](DeviceRole::Primary), one
/// [`Secondary`](DeviceRole::Secondary) — connected by a single logical
/// transport channel form the full system.
pub struct Replica {
    role: DeviceRole,
    store: Arc<RoundStore>,
    coordinator: Arc<SyncCoordinator>,
}

impl Replica {
    /// Opens the store and queue from persistence and wires the
    /// coordinator to the transport.
    pub fn new(
        config: SyncConfig,
        persistence: Arc<dyn Persistence>,
        transport: Arc<dyn Transport>,
    ) -> SyncResult<Self> {
        let role = config.role;
        let store = Arc::new(RoundStore::open(Arc::clone(&persistence))?);
        let queue = PendingOperationQueue::open(persistence)?;
        let coordinator = SyncCoordinator::start(config, Arc::clone(&store), queue, transport);

        info!(role = role.as_str(), "replica started");
        Ok(Self {
            role,
            store,
            coordinator,
        })
    }

    /// Returns this replica's role.
    pub fn role(&self) -> DeviceRole {
        self.role
    }

    /// Returns the round store.
    pub fn store(&self) -> &Arc<RoundStore> {
        &self.store
    }

    /// Returns the sync coordinator.
    pub fn coordinator(&self) -> &Arc<SyncCoordinator> {
        &self.coordinator
    }

    /// Records a stroke at the device's current location.
    pub fn add_stroke_here(
        &self,
        hole_number: u32,
        club_id: ClubId,
        annotations: StrokeAnnotations,
        location: &dyn LocationProvider,
    ) -> SyncResult<Stroke> {
        let point = location
            .current_location()
            .ok_or(SyncError::LocationUnavailable)?;
        Ok(self
            .store
            .add_stroke(hole_number, point, club_id, annotations)?)
    }

    /// Fully synchronizes, then retires the round and returns its final
    /// value.
    ///
    /// Fails without retiring if the peer cannot be reached within the
    /// configured retry budget; the round stays active so it can be
    /// ended once connectivity returns.
    pub fn end_round(&self) -> SyncResult<Round> {
        self.coordinator.sync_now()?;
        Ok(self.store.end_round()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::location::FixedLocationProvider;
    use crate::transport::MockTransport;
    use roundlink_model::{GeoPoint, Hole};
    use roundlink_store::{MemoryPersistence, RoundPhase};
    use std::time::Duration;

    fn quick_retry() -> RetryConfig {
        RetryConfig::new(2)
            .with_initial_delay(Duration::from_millis(1))
            .without_jitter()
    }

    fn replica(transport: Arc<MockTransport>) -> Replica {
        Replica::new(
            SyncConfig::new(DeviceRole::Primary).with_retry(quick_retry()),
            Arc::new(MemoryPersistence::new()),
            transport,
        )
        .unwrap()
    }

    #[test]
    fn add_stroke_here_uses_the_location_provider() {
        let transport = MockTransport::new();
        let replica = replica(transport);
        replica
            .store()
            .start_round("c1", "Course", vec![Hole::new(
                1,
                GeoPoint::new(0.0, 0.0),
                None,
            )])
            .unwrap();

        let provider = FixedLocationProvider::new();
        let result = replica.add_stroke_here(
            1,
            ClubId::new(),
            StrokeAnnotations::default(),
            &provider,
        );
        assert!(matches!(result, Err(SyncError::LocationUnavailable)));

        provider.set(Some(GeoPoint::new(36.5, -121.9)));
        let stroke = replica
            .add_stroke_here(1, ClubId::new(), StrokeAnnotations::default(), &provider)
            .unwrap();
        assert_eq!(stroke.location, GeoPoint::new(36.5, -121.9));
    }

    #[test]
    fn end_round_synchronizes_then_retires() {
        let transport = MockTransport::new();
        let replica = replica(transport.clone());
        replica
            .store()
            .start_round("c1", "Course", vec![Hole::new(
                1,
                GeoPoint::new(0.0, 0.0),
                None,
            )])
            .unwrap();

        let ended = replica.end_round().unwrap();
        assert_eq!(ended.course_id, "c1");
        assert_eq!(replica.store().phase(), RoundPhase::Retired);

        // start_round snapshot + the final sync_now broadcast.
        assert!(transport.sent().len() >= 2);
    }

    #[test]
    fn end_round_fails_without_retiring_when_unreachable() {
        let transport = MockTransport::new();
        let replica = replica(transport.clone());
        replica
            .store()
            .start_round("c1", "Course", Vec::new())
            .unwrap();

        transport.set_reachable(false);
        let result = replica.end_round();
        assert!(matches!(
            result,
            Err(SyncError::TransportUnavailable { .. })
        ));
        assert_eq!(replica.store().phase(), RoundPhase::Active);

        transport.set_reachable(true);
        replica.end_round().unwrap();
        assert_eq!(replica.store().phase(), RoundPhase::Retired);
    }
}
