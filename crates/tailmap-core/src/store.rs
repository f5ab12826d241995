// ── Authoritative topology state ──
//
// One `RwLock` guards the whole table set: writers are strictly
// serialized (a reconciliation replace and a user edit can never
// interleave), readers observe a consistent snapshot. Stats are
// recomputed and events published inside the write guard, so both are
// done before any mutating call returns.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock};

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::config::{AbsentDevicePolicy, TopologyPolicy};
use crate::error::{CoreError, EntityKind};
use crate::events::{EVENT_CHANNEL_SIZE, EventStream, TopologyEvent};
use crate::layout::LayoutEngine;
use crate::model::{
    Connection, ConnectionDraft, ConnectionId, ConnectionPatch, ConnectionStatus, Device,
    DeviceDraft, DeviceId, DevicePatch, DeviceStatus, NetworkStats, Position, TopologySnapshot,
};

#[derive(Debug)]
struct Tables {
    devices: BTreeMap<DeviceId, Arc<Device>>,
    by_external_id: HashMap<String, DeviceId>,
    connections: BTreeMap<ConnectionId, Arc<Connection>>,
    stats: NetworkStats,
    next_device_id: u64,
    next_connection_id: u64,
}

impl Tables {
    fn new() -> Self {
        Self {
            devices: BTreeMap::new(),
            by_external_id: HashMap::new(),
            connections: BTreeMap::new(),
            stats: NetworkStats::empty(),
            next_device_id: 1,
            next_connection_id: 1,
        }
    }

    fn snapshot(&self) -> TopologySnapshot {
        TopologySnapshot {
            devices: self.devices.values().cloned().collect(),
            connections: self.connections.values().cloned().collect(),
            stats: self.stats,
        }
    }

    fn recompute_stats(&mut self) {
        self.stats = NetworkStats::compute(self.devices.values());
    }

    fn insert_device(&mut self, draft: DeviceDraft) -> Result<Arc<Device>, CoreError> {
        validate_draft(&draft)?;
        if self.by_external_id.contains_key(&draft.external_id) {
            return Err(CoreError::Conflict(format!(
                "external id {:?} already present",
                draft.external_id
            )));
        }

        let id = DeviceId(self.next_device_id);
        self.next_device_id += 1;

        let device = Arc::new(Device {
            id,
            external_id: draft.external_id,
            name: draft.name,
            hostname: draft.hostname,
            address: draft.address,
            class: draft.class,
            os: draft.os,
            status: draft.status,
            last_seen: draft.last_seen.unwrap_or_else(Utc::now),
            tags: draft.tags,
            coordinator: draft.coordinator,
            position: Position::default(),
        });
        self.by_external_id
            .insert(device.external_id.clone(), id);
        self.devices.insert(id, Arc::clone(&device));
        Ok(device)
    }
}

/// The authoritative in-memory device/connection/stats state.
///
/// Constructed explicitly by the composition root and shared via
/// `Arc` — there is no process-wide singleton.
pub struct TopologyStore {
    tables: RwLock<Tables>,
    events: broadcast::Sender<TopologyEvent>,
}

impl Default for TopologyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TopologyStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            tables: RwLock::new(Tables::new()),
            events,
        }
    }

    // ── Queries ──────────────────────────────────────────────────

    /// All live devices.
    pub fn devices(&self) -> Vec<Arc<Device>> {
        self.read().devices.values().cloned().collect()
    }

    /// Device by internal id.
    pub fn device(&self, id: DeviceId) -> Option<Arc<Device>> {
        self.read().devices.get(&id).cloned()
    }

    /// Device by source-provided external id.
    pub fn device_by_external_id(&self, external_id: &str) -> Option<Arc<Device>> {
        let tables = self.read();
        let id = tables.by_external_id.get(external_id)?;
        tables.devices.get(id).cloned()
    }

    /// All live connections.
    pub fn connections(&self) -> Vec<Arc<Connection>> {
        self.read().connections.values().cloned().collect()
    }

    /// Current aggregate counts.
    pub fn stats(&self) -> NetworkStats {
        self.read().stats
    }

    /// Devices, connections, and stats read atomically together.
    pub fn snapshot(&self) -> TopologySnapshot {
        self.read().snapshot()
    }

    /// Subscribe to change events.
    ///
    /// The receiver is registered and the initial snapshot taken under
    /// one read guard, so the first yielded `FullTopologyReplaced`
    /// cannot race a mutation published in between.
    pub fn subscribe(&self) -> EventStream {
        let tables = self.read();
        let rx = self.events.subscribe();
        let initial = TopologyEvent::FullTopologyReplaced(Arc::new(tables.snapshot()));
        EventStream::new(initial, rx)
    }

    // ── Device mutations ─────────────────────────────────────────

    /// Create a device. Rejects a duplicate external id with
    /// [`CoreError::Conflict`]; assigns the id, a placeholder position,
    /// and `last_seen` = now unless the draft carries one.
    pub fn create_device(&self, draft: DeviceDraft) -> Result<Arc<Device>, CoreError> {
        let mut tables = self.write();
        let device = tables.insert_device(draft)?;
        tables.recompute_stats();
        self.publish(TopologyEvent::DeviceAdded(Arc::clone(&device)));
        self.publish(TopologyEvent::StatsUpdated(tables.stats));
        Ok(device)
    }

    /// Apply a partial patch. Refreshes `last_seen`; fails with
    /// [`CoreError::NotFound`] on an unknown id and with
    /// [`CoreError::Conflict`] if the patch renames the external id
    /// onto another live device.
    pub fn update_device(
        &self,
        id: DeviceId,
        patch: DevicePatch,
    ) -> Result<Arc<Device>, CoreError> {
        let mut tables = self.write();
        let existing = tables
            .devices
            .get(&id)
            .ok_or(CoreError::NotFound {
                kind: EntityKind::Device,
                id: id.0,
            })?
            .as_ref()
            .clone();

        if let Some(ref new_external) = patch.external_id {
            if new_external.is_empty() {
                return Err(CoreError::Validation("external id must not be empty".into()));
            }
            match tables.by_external_id.get(new_external) {
                Some(&owner) if owner != id => {
                    return Err(CoreError::Conflict(format!(
                        "external id {new_external:?} already present"
                    )));
                }
                _ => {}
            }
        }
        if patch.name.as_deref() == Some("") {
            return Err(CoreError::Validation("name must not be empty".into()));
        }
        if patch.hostname.as_deref() == Some("") {
            return Err(CoreError::Validation("hostname must not be empty".into()));
        }

        let previous_status = existing.status;
        let mut updated = existing;
        if let Some(external_id) = patch.external_id {
            tables.by_external_id.remove(&updated.external_id);
            tables.by_external_id.insert(external_id.clone(), id);
            updated.external_id = external_id;
        }
        if let Some(name) = patch.name {
            updated.name = name;
        }
        if let Some(hostname) = patch.hostname {
            updated.hostname = hostname;
        }
        if let Some(address) = patch.address {
            updated.address = address;
        }
        if let Some(class) = patch.class {
            updated.class = class;
        }
        if let Some(os) = patch.os {
            updated.os = os;
        }
        if let Some(status) = patch.status {
            updated.status = status;
        }
        if let Some(tags) = patch.tags {
            updated.tags = tags;
        }
        if let Some(coordinator) = patch.coordinator {
            updated.coordinator = coordinator;
        }
        updated.last_seen = Utc::now();

        let device = Arc::new(updated);
        tables.devices.insert(id, Arc::clone(&device));
        tables.recompute_stats();

        if device.status != previous_status {
            self.publish(TopologyEvent::DeviceStatusChanged {
                device: Arc::clone(&device),
                previous: previous_status,
            });
        }
        self.publish(TopologyEvent::StatsUpdated(tables.stats));
        Ok(device)
    }

    /// Delete a device, cascading to every connection that references it.
    pub fn delete_device(&self, id: DeviceId) -> Result<(), CoreError> {
        let mut tables = self.write();
        let Some(device) = tables.devices.remove(&id) else {
            return Err(CoreError::NotFound {
                kind: EntityKind::Device,
                id: id.0,
            });
        };
        tables.by_external_id.remove(&device.external_id);

        let cascade: Vec<ConnectionId> = tables
            .connections
            .values()
            .filter(|c| c.touches(id))
            .map(|c| c.id)
            .collect();
        for conn_id in &cascade {
            tables.connections.remove(conn_id);
        }
        debug!(device = %id, cascaded = cascade.len(), "deleted device");

        tables.recompute_stats();
        self.publish(TopologyEvent::DeviceRemoved(device));
        self.publish(TopologyEvent::StatsUpdated(tables.stats));
        Ok(())
    }

    // ── Connection mutations ─────────────────────────────────────

    /// Create a connection. Both endpoints must be live devices.
    pub fn create_connection(&self, draft: ConnectionDraft) -> Result<Arc<Connection>, CoreError> {
        let mut tables = self.write();
        for endpoint in [draft.from, draft.to] {
            if !tables.devices.contains_key(&endpoint) {
                return Err(CoreError::NotFound {
                    kind: EntityKind::Device,
                    id: endpoint.0,
                });
            }
        }
        if draft.from == draft.to {
            return Err(CoreError::Validation(
                "connection endpoints must differ".into(),
            ));
        }

        let id = ConnectionId(tables.next_connection_id);
        tables.next_connection_id += 1;
        let connection = Arc::new(Connection {
            id,
            from: draft.from,
            to: draft.to,
            status: draft.status,
            last_updated: Utc::now(),
        });
        tables.connections.insert(id, Arc::clone(&connection));
        Ok(connection)
    }

    /// Patch a connection's status.
    pub fn update_connection(
        &self,
        id: ConnectionId,
        patch: ConnectionPatch,
    ) -> Result<Arc<Connection>, CoreError> {
        let mut tables = self.write();
        let existing = tables
            .connections
            .get(&id)
            .ok_or(CoreError::NotFound {
                kind: EntityKind::Connection,
                id: id.0,
            })?
            .as_ref()
            .clone();

        let mut updated = existing;
        if let Some(status) = patch.status {
            updated.status = status;
        }
        updated.last_updated = Utc::now();

        let connection = Arc::new(updated);
        tables.connections.insert(id, Arc::clone(&connection));
        Ok(connection)
    }

    /// Delete a connection.
    pub fn delete_connection(&self, id: ConnectionId) -> Result<(), CoreError> {
        let mut tables = self.write();
        if tables.connections.remove(&id).is_none() {
            return Err(CoreError::NotFound {
                kind: EntityKind::Connection,
                id: id.0,
            });
        }
        Ok(())
    }

    // ── Reconciliation replace ───────────────────────────────────

    /// Install a freshly normalized device set, replacing everything.
    ///
    /// Clears devices and connections, inserts the incoming set,
    /// generates edges per the topology policy, lays out positions, and
    /// recomputes stats — all under one write guard, with
    /// `FullTopologyReplaced` and `StatsUpdated` published before the
    /// guard is released. Internal ids are not continuous across a
    /// replace.
    ///
    /// Duplicate external ids inside the incoming set are first-wins;
    /// later duplicates are dropped with a warning.
    pub fn replace_all(
        &self,
        drafts: Vec<DeviceDraft>,
        policy: TopologyPolicy,
        absent_policy: AbsentDevicePolicy,
        layout: &LayoutEngine,
    ) -> Result<(), CoreError> {
        let mut tables = self.write();

        let mut incoming = drafts;
        // Reject the whole snapshot before the live tables are touched:
        // a failed replace must leave last-known-good state intact.
        for draft in &incoming {
            validate_draft(draft)?;
        }

        if absent_policy == AbsentDevicePolicy::RetainDisconnected {
            let incoming_ids: HashSet<&str> =
                incoming.iter().map(|d| d.external_id.as_str()).collect();
            let retained: Vec<DeviceDraft> = tables
                .devices
                .values()
                .filter(|d| !incoming_ids.contains(d.external_id.as_str()))
                .map(|d| retain_as_disconnected(d))
                .collect();
            incoming.extend(retained);
        }

        tables.devices.clear();
        tables.by_external_id.clear();
        tables.connections.clear();

        let mut installed: Vec<Arc<Device>> = Vec::with_capacity(incoming.len());
        for draft in incoming {
            match tables.insert_device(draft) {
                Ok(device) => installed.push(device),
                Err(CoreError::Conflict(reason)) => {
                    warn!(%reason, "dropping duplicate record from source snapshot");
                }
                Err(e) => return Err(e),
            }
        }

        // Imported-star: promote the first record if nothing is flagged.
        if policy == TopologyPolicy::ImportedStar
            && !installed.iter().any(|d| d.coordinator)
        {
            if let Some(first) = installed.first() {
                let mut promoted = first.as_ref().clone();
                promoted.coordinator = true;
                let promoted = Arc::new(promoted);
                tables.devices.insert(promoted.id, Arc::clone(&promoted));
                installed[0] = promoted;
            }
        }

        for (from, to, status) in generate_edges(policy, &installed) {
            let id = ConnectionId(tables.next_connection_id);
            tables.next_connection_id += 1;
            tables.connections.insert(
                id,
                Arc::new(Connection {
                    id,
                    from,
                    to,
                    status,
                    last_updated: Utc::now(),
                }),
            );
        }

        // Position write-back happens before the replace is broadcast.
        let devices: Vec<Arc<Device>> = tables.devices.values().cloned().collect();
        let connections: Vec<Arc<Connection>> = tables.connections.values().cloned().collect();
        for (id, position) in layout.layout(&devices, &connections) {
            if let Some(device) = tables.devices.get(&id) {
                let mut placed = device.as_ref().clone();
                placed.position = position;
                tables.devices.insert(id, Arc::new(placed));
            }
        }

        tables.recompute_stats();
        debug!(
            devices = tables.devices.len(),
            connections = tables.connections.len(),
            "installed reconciled topology"
        );

        self.publish(TopologyEvent::FullTopologyReplaced(Arc::new(
            tables.snapshot(),
        )));
        self.publish(TopologyEvent::StatsUpdated(tables.stats));
        Ok(())
    }

    /// Recompute positions for the current topology.
    ///
    /// Presentation-only: no stats change and no event.
    pub fn relayout(&self, layout: &LayoutEngine) {
        let mut tables = self.write();
        let devices: Vec<Arc<Device>> = tables.devices.values().cloned().collect();
        let connections: Vec<Arc<Connection>> = tables.connections.values().cloned().collect();
        for (id, position) in layout.layout(&devices, &connections) {
            if let Some(device) = tables.devices.get(&id) {
                let mut placed = device.as_ref().clone();
                placed.position = position;
                tables.devices.insert(id, Arc::new(placed));
            }
        }
    }

    // ── Private helpers ──────────────────────────────────────────

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Tables> {
        self.tables.read().expect("topology lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Tables> {
        self.tables.write().expect("topology lock poisoned")
    }

    fn publish(&self, event: TopologyEvent) {
        // Zero receivers is fine; send never blocks.
        let _ = self.events.send(event);
    }
}

fn validate_draft(draft: &DeviceDraft) -> Result<(), CoreError> {
    if draft.external_id.is_empty() {
        return Err(CoreError::Validation("external id must not be empty".into()));
    }
    if draft.name.is_empty() {
        return Err(CoreError::Validation("name must not be empty".into()));
    }
    if draft.hostname.is_empty() {
        return Err(CoreError::Validation("hostname must not be empty".into()));
    }
    Ok(())
}

fn retain_as_disconnected(device: &Device) -> DeviceDraft {
    DeviceDraft {
        external_id: device.external_id.clone(),
        name: device.name.clone(),
        hostname: device.hostname.clone(),
        address: device.address.clone(),
        class: device.class,
        os: device.os.clone(),
        status: DeviceStatus::Disconnected,
        tags: device.tags.clone(),
        coordinator: device.coordinator,
        last_seen: Some(device.last_seen),
    }
}

/// Edge generation per topology policy.
fn generate_edges(
    policy: TopologyPolicy,
    devices: &[Arc<Device>],
) -> Vec<(DeviceId, DeviceId, ConnectionStatus)> {
    let edge_status = |device: &Device| {
        if device.status.is_connected() {
            ConnectionStatus::Active
        } else {
            ConnectionStatus::Inactive
        }
    };

    match policy {
        TopologyPolicy::Hub | TopologyPolicy::ImportedStar => {
            let Some(hub) = devices.iter().find(|d| d.coordinator) else {
                return Vec::new();
            };
            devices
                .iter()
                .filter(|d| d.id != hub.id)
                .map(|d| (hub.id, d.id, edge_status(d)))
                .collect()
        }
        TopologyPolicy::Mesh => {
            let connected: Vec<&Arc<Device>> = devices
                .iter()
                .filter(|d| d.status.is_connected())
                .collect();
            let mut edges = Vec::new();
            for (i, a) in connected.iter().enumerate() {
                for b in connected.iter().skip(i + 1) {
                    edges.push((a.id, b.id, ConnectionStatus::Active));
                }
            }
            edges
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{Canvas, LayoutConfig};

    fn draft(external_id: &str, status: DeviceStatus) -> DeviceDraft {
        DeviceDraft {
            external_id: external_id.to_owned(),
            name: format!("dev-{external_id}"),
            hostname: format!("dev-{external_id}.ts.net"),
            address: "100.64.0.1".to_owned(),
            class: crate::model::DeviceClass::Desktop,
            os: "macOS".to_owned(),
            status,
            tags: Vec::new(),
            coordinator: false,
            last_seen: None,
        }
    }

    fn engine() -> LayoutEngine {
        LayoutEngine::new(Canvas::default(), LayoutConfig::default())
    }

    #[test]
    fn create_assigns_id_and_updates_stats() {
        let store = TopologyStore::new();
        let d = store.create_device(draft("a", DeviceStatus::Connected)).unwrap();

        assert_eq!(d.id, DeviceId(1));
        let stats = store.stats();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.online, 1);
    }

    #[test]
    fn create_duplicate_external_id_conflicts() {
        let store = TopologyStore::new();
        store.create_device(draft("a", DeviceStatus::Connected)).unwrap();
        let err = store
            .create_device(draft("a", DeviceStatus::Disconnected))
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[test]
    fn create_rejects_empty_fields() {
        let store = TopologyStore::new();
        let mut bad = draft("", DeviceStatus::Connected);
        bad.external_id = String::new();
        assert!(matches!(
            store.create_device(bad),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn update_unknown_device_is_not_found() {
        let store = TopologyStore::new();
        let err = store
            .update_device(DeviceId(99), DevicePatch::status(DeviceStatus::Unstable))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::NotFound {
                kind: EntityKind::Device,
                id: 99
            }
        ));
    }

    #[test]
    fn update_refreshes_last_seen_and_recomputes_stats() {
        let store = TopologyStore::new();
        let d = store.create_device(draft("a", DeviceStatus::Connected)).unwrap();

        let updated = store
            .update_device(d.id, DevicePatch::status(DeviceStatus::Disconnected))
            .unwrap();

        assert_eq!(updated.status, DeviceStatus::Disconnected);
        assert!(updated.last_seen >= d.last_seen);
        let stats = store.stats();
        assert_eq!(stats.online, 0);
        assert_eq!(stats.offline, 1);
    }

    #[test]
    fn rename_external_id_onto_other_device_conflicts() {
        let store = TopologyStore::new();
        store.create_device(draft("a", DeviceStatus::Connected)).unwrap();
        let b = store.create_device(draft("b", DeviceStatus::Connected)).unwrap();

        let patch = DevicePatch {
            external_id: Some("a".into()),
            ..DevicePatch::default()
        };
        assert!(matches!(
            store.update_device(b.id, patch),
            Err(CoreError::Conflict(_))
        ));
    }

    #[test]
    fn delete_cascades_connections() {
        let store = TopologyStore::new();
        let a = store.create_device(draft("a", DeviceStatus::Connected)).unwrap();
        let b = store.create_device(draft("b", DeviceStatus::Connected)).unwrap();
        let c = store.create_device(draft("c", DeviceStatus::Connected)).unwrap();

        store
            .create_connection(ConnectionDraft {
                from: a.id,
                to: b.id,
                status: ConnectionStatus::Active,
            })
            .unwrap();
        store
            .create_connection(ConnectionDraft {
                from: b.id,
                to: c.id,
                status: ConnectionStatus::Active,
            })
            .unwrap();
        store
            .create_connection(ConnectionDraft {
                from: a.id,
                to: c.id,
                status: ConnectionStatus::Active,
            })
            .unwrap();

        store.delete_device(b.id).unwrap();

        let remaining = store.connections();
        assert_eq!(remaining.len(), 1);
        assert!(remaining.iter().all(|conn| !conn.touches(b.id)));
        assert_eq!(store.stats().total, 2);
    }

    #[test]
    fn connection_requires_live_endpoints() {
        let store = TopologyStore::new();
        let a = store.create_device(draft("a", DeviceStatus::Connected)).unwrap();

        let err = store
            .create_connection(ConnectionDraft {
                from: a.id,
                to: DeviceId(42),
                status: ConnectionStatus::Active,
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn self_connection_is_invalid() {
        let store = TopologyStore::new();
        let a = store.create_device(draft("a", DeviceStatus::Connected)).unwrap();

        let err = store
            .create_connection(ConnectionDraft {
                from: a.id,
                to: a.id,
                status: ConnectionStatus::Active,
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn stats_invariant_holds_after_each_mutation() {
        let store = TopologyStore::new();
        let check = |store: &TopologyStore| {
            let s = store.stats();
            assert_eq!(s.total, s.online + s.offline + s.unstable);
            assert_eq!(s.total, store.devices().len());
        };

        let a = store.create_device(draft("a", DeviceStatus::Connected)).unwrap();
        check(&store);
        store.create_device(draft("b", DeviceStatus::Unstable)).unwrap();
        check(&store);
        store
            .update_device(a.id, DevicePatch::status(DeviceStatus::Disconnected))
            .unwrap();
        check(&store);
        store.delete_device(a.id).unwrap();
        check(&store);
    }

    #[test]
    fn replace_all_hub_topology() {
        let store = TopologyStore::new();
        let mut coord = draft("hub", DeviceStatus::Connected);
        coord.coordinator = true;
        let drafts = vec![
            coord,
            draft("a", DeviceStatus::Connected),
            draft("b", DeviceStatus::Disconnected),
        ];

        store
            .replace_all(
                drafts,
                TopologyPolicy::Hub,
                AbsentDevicePolicy::Remove,
                &engine(),
            )
            .unwrap();

        let snap = store.snapshot();
        assert_eq!(snap.devices.len(), 3);
        assert_eq!(snap.connections.len(), 2);

        let hub = snap.devices.iter().find(|d| d.coordinator).unwrap();
        assert!(snap.connections.iter().all(|c| c.from == hub.id));
        let inactive = snap
            .connections
            .iter()
            .filter(|c| c.status == ConnectionStatus::Inactive)
            .count();
        assert_eq!(inactive, 1);
    }

    #[test]
    fn replace_all_mesh_links_connected_pairs() {
        let store = TopologyStore::new();
        let drafts = vec![
            draft("a", DeviceStatus::Connected),
            draft("b", DeviceStatus::Connected),
            draft("c", DeviceStatus::Connected),
            draft("d", DeviceStatus::Disconnected),
        ];

        store
            .replace_all(
                drafts,
                TopologyPolicy::Mesh,
                AbsentDevicePolicy::Remove,
                &engine(),
            )
            .unwrap();

        // 3 connected devices -> C(3,2) edges, the offline one excluded.
        let snap = store.snapshot();
        assert_eq!(snap.connections.len(), 3);
        assert!(
            snap.connections
                .iter()
                .all(|c| c.status == ConnectionStatus::Active)
        );
    }

    #[test]
    fn replace_all_imported_star_promotes_first_record() {
        let store = TopologyStore::new();
        let drafts = vec![
            draft("first", DeviceStatus::Connected),
            draft("second", DeviceStatus::Connected),
        ];

        store
            .replace_all(
                drafts,
                TopologyPolicy::ImportedStar,
                AbsentDevicePolicy::Remove,
                &engine(),
            )
            .unwrap();

        let coord = store.device_by_external_id("first").unwrap();
        assert!(coord.coordinator);
        assert_eq!(store.connections().len(), 1);
    }

    #[test]
    fn replace_all_retain_disconnected_keeps_absent_devices() {
        let store = TopologyStore::new();
        store
            .replace_all(
                vec![
                    draft("stays", DeviceStatus::Connected),
                    draft("vanishes", DeviceStatus::Connected),
                ],
                TopologyPolicy::Mesh,
                AbsentDevicePolicy::Remove,
                &engine(),
            )
            .unwrap();

        store
            .replace_all(
                vec![draft("stays", DeviceStatus::Connected)],
                TopologyPolicy::Mesh,
                AbsentDevicePolicy::RetainDisconnected,
                &engine(),
            )
            .unwrap();

        let retained = store.device_by_external_id("vanishes").unwrap();
        assert_eq!(retained.status, DeviceStatus::Disconnected);
        assert_eq!(store.stats().total, 2);
        assert_eq!(store.stats().offline, 1);
    }

    #[test]
    fn replace_all_remove_drops_absent_devices() {
        let store = TopologyStore::new();
        store
            .replace_all(
                vec![
                    draft("stays", DeviceStatus::Connected),
                    draft("vanishes", DeviceStatus::Connected),
                ],
                TopologyPolicy::Mesh,
                AbsentDevicePolicy::Remove,
                &engine(),
            )
            .unwrap();

        store
            .replace_all(
                vec![draft("stays", DeviceStatus::Connected)],
                TopologyPolicy::Mesh,
                AbsentDevicePolicy::Remove,
                &engine(),
            )
            .unwrap();

        assert!(store.device_by_external_id("vanishes").is_none());
        assert_eq!(store.stats().total, 1);
    }

    #[test]
    fn replace_all_duplicate_external_ids_first_wins() {
        let store = TopologyStore::new();
        let mut dup = draft("a", DeviceStatus::Disconnected);
        dup.name = "impostor".into();

        store
            .replace_all(
                vec![draft("a", DeviceStatus::Connected), dup],
                TopologyPolicy::Mesh,
                AbsentDevicePolicy::Remove,
                &engine(),
            )
            .unwrap();

        let kept = store.device_by_external_id("a").unwrap();
        assert_eq!(kept.name, "dev-a");
        assert_eq!(store.stats().total, 1);
    }

    #[tokio::test]
    async fn subscriber_gets_snapshot_first_then_publish_order() {
        let store = TopologyStore::new();
        store.create_device(draft("a", DeviceStatus::Connected)).unwrap();

        let mut stream = store.subscribe();

        // Mutations after subscription.
        let b = store.create_device(draft("b", DeviceStatus::Connected)).unwrap();
        store
            .update_device(b.id, DevicePatch::status(DeviceStatus::Unstable))
            .unwrap();

        let first = stream.recv().await.unwrap();
        match first {
            TopologyEvent::FullTopologyReplaced(snap) => {
                // Snapshot reflects subscription time: only "a".
                assert_eq!(snap.devices.len(), 1);
            }
            other => panic!("expected snapshot first, got {other:?}"),
        }

        assert!(matches!(
            stream.recv().await.unwrap(),
            TopologyEvent::DeviceAdded(_)
        ));
        assert!(matches!(
            stream.recv().await.unwrap(),
            TopologyEvent::StatsUpdated(_)
        ));
        assert!(matches!(
            stream.recv().await.unwrap(),
            TopologyEvent::DeviceStatusChanged { .. }
        ));
        assert!(matches!(
            stream.recv().await.unwrap(),
            TopologyEvent::StatsUpdated(_)
        ));
    }

    #[tokio::test]
    async fn replace_all_broadcasts_snapshot_with_positions_applied() {
        let store = TopologyStore::new();
        let mut stream = store.subscribe();
        // Consume the subscription snapshot.
        let _ = stream.recv().await.unwrap();

        let mut coord = draft("hub", DeviceStatus::Connected);
        coord.coordinator = true;
        store
            .replace_all(
                vec![coord, draft("a", DeviceStatus::Connected)],
                TopologyPolicy::Hub,
                AbsentDevicePolicy::Remove,
                &engine(),
            )
            .unwrap();

        match stream.recv().await.unwrap() {
            TopologyEvent::FullTopologyReplaced(snap) => {
                // Layout ran before the broadcast: nothing at the origin.
                assert!(
                    snap.devices
                        .iter()
                        .all(|d| d.position != Position::default())
                );
            }
            other => panic!("expected replace event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_replace_keeps_last_known_good_state() {
        let store = TopologyStore::new();
        store
            .replace_all(
                vec![
                    draft("a", DeviceStatus::Connected),
                    draft("b", DeviceStatus::Connected),
                ],
                TopologyPolicy::Mesh,
                AbsentDevicePolicy::Remove,
                &engine(),
            )
            .unwrap();
        let before = store.snapshot();
        let mut stream = store.subscribe();
        let _ = stream.recv().await.unwrap();

        let mut bad = draft("c", DeviceStatus::Connected);
        bad.name = String::new();
        let err = store
            .replace_all(
                vec![draft("a", DeviceStatus::Connected), bad],
                TopologyPolicy::Mesh,
                AbsentDevicePolicy::Remove,
                &engine(),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        // Nothing changed, nothing was broadcast.
        let after = store.snapshot();
        assert_eq!(after.devices.len(), before.devices.len());
        assert_eq!(after.connections.len(), before.connections.len());
        assert_eq!(after.stats, before.stats);
        assert!(stream.try_recv().is_none());
    }

    #[test]
    fn update_rejects_empty_patched_fields() {
        let store = TopologyStore::new();
        let d = store.create_device(draft("a", DeviceStatus::Connected)).unwrap();

        for patch in [
            DevicePatch {
                name: Some(String::new()),
                ..DevicePatch::default()
            },
            DevicePatch {
                hostname: Some(String::new()),
                ..DevicePatch::default()
            },
        ] {
            assert!(matches!(
                store.update_device(d.id, patch),
                Err(CoreError::Validation(_))
            ));
        }
        // The device is untouched.
        assert_eq!(store.device(d.id).unwrap().name, "dev-a");
    }

    #[test]
    fn connection_update_and_delete() {
        let store = TopologyStore::new();
        let a = store.create_device(draft("a", DeviceStatus::Connected)).unwrap();
        let b = store.create_device(draft("b", DeviceStatus::Connected)).unwrap();
        let conn = store
            .create_connection(ConnectionDraft {
                from: a.id,
                to: b.id,
                status: ConnectionStatus::Active,
            })
            .unwrap();

        let updated = store
            .update_connection(
                conn.id,
                ConnectionPatch {
                    status: Some(ConnectionStatus::Inactive),
                },
            )
            .unwrap();
        assert_eq!(updated.status, ConnectionStatus::Inactive);
        assert!(updated.last_updated >= conn.last_updated);

        store.delete_connection(conn.id).unwrap();
        assert!(store.connections().is_empty());

        // Both operations report NotFound once the connection is gone.
        assert!(matches!(
            store.update_connection(conn.id, ConnectionPatch::default()),
            Err(CoreError::NotFound {
                kind: EntityKind::Connection,
                ..
            })
        ));
        assert!(matches!(
            store.delete_connection(conn.id),
            Err(CoreError::NotFound {
                kind: EntityKind::Connection,
                ..
            })
        ));
    }

    #[test]
    fn relayout_places_manually_created_devices() {
        let store = TopologyStore::new();
        let mut coord = draft("hub", DeviceStatus::Connected);
        coord.coordinator = true;
        store.create_device(coord).unwrap();
        store.create_device(draft("a", DeviceStatus::Connected)).unwrap();

        // Manual creates leave the placeholder position.
        assert!(
            store
                .devices()
                .iter()
                .all(|d| d.position == Position::default())
        );

        store.relayout(&engine());

        assert!(
            store
                .devices()
                .iter()
                .all(|d| d.position != Position::default())
        );
        // Presentation-only: stats unchanged.
        assert_eq!(store.stats().total, 2);
    }

    #[tokio::test]
    async fn try_recv_yields_snapshot_then_nothing_pending() {
        let store = TopologyStore::new();
        store.create_device(draft("a", DeviceStatus::Connected)).unwrap();

        let mut stream = store.subscribe();
        assert!(matches!(
            stream.try_recv(),
            Some(TopologyEvent::FullTopologyReplaced(_))
        ));
        assert!(stream.try_recv().is_none());

        store.create_device(draft("b", DeviceStatus::Connected)).unwrap();
        assert!(matches!(
            stream.try_recv(),
            Some(TopologyEvent::DeviceAdded(_))
        ));
    }
}
