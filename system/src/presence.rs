use crate::geofence::containment;
use crate::message::{ConnectionId, GeofenceRegion, LatLng, PresenceView};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Capability that grants host privileges within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostToken(Uuid);

impl HostToken {
    pub fn issue() -> Self {
        Self(Uuid::new_v4())
    }
}

#[derive(Debug, Clone)]
pub struct UserPresence {
    pub connection_id: ConnectionId,
    pub display_name: String,
    pub is_host: bool,
    pub location: Option<LatLng>,
    pub update_interval_ms: u64,
    host_grant: Option<HostToken>,
}

impl UserPresence {
    pub fn new(connection_id: ConnectionId, display_name: String, update_interval_ms: u64) -> Self {
        Self {
            connection_id,
            display_name,
            is_host: false,
            location: None,
            update_interval_ms,
            host_grant: None,
        }
    }

    pub fn grant_host(&mut self, token: HostToken) {
        self.is_host = true;
        self.host_grant = Some(token);
    }

    pub fn holds(&self, token: &HostToken) -> bool {
        self.host_grant.as_ref() == Some(token)
    }

    /// Stored location unless it is the `{0, 0}` placeholder.
    pub fn fix(&self) -> Option<&LatLng> {
        self.location
            .as_ref()
            .filter(|location| !location.is_null_island())
    }

    pub fn view<'a, I>(&self, regions: I) -> PresenceView
    where
        I: IntoIterator<Item = &'a GeofenceRegion>,
    {
        PresenceView {
            display_name: self.display_name.clone(),
            location: self.fix().cloned(),
            is_host: self.is_host,
            update_interval_ms: self.update_interval_ms,
            inside_fence: containment(self.fix(), regions),
        }
    }
}

/// Connection id to presence, for a single session.
#[derive(Debug, Clone, Default)]
pub struct PresenceTable {
    users: HashMap<ConnectionId, UserPresence>,
}

impl PresenceTable {
    pub fn new() -> Self {
        Self {
            users: HashMap::new(),
        }
    }

    /// Inserts or overwrites; returns the previous record for the connection.
    pub fn upsert(&mut self, presence: UserPresence) -> Option<UserPresence> {
        self.users.insert(presence.connection_id, presence)
    }

    pub fn remove(&mut self, connection_id: &ConnectionId) -> Option<UserPresence> {
        self.users.remove(connection_id)
    }

    pub fn get(&self, connection_id: &ConnectionId) -> Option<&UserPresence> {
        self.users.get(connection_id)
    }

    pub fn get_mut(&mut self, connection_id: &ConnectionId) -> Option<&mut UserPresence> {
        self.users.get_mut(connection_id)
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.users.contains_key(connection_id)
    }

    pub fn set_update_interval(&mut self, update_interval_ms: u64) {
        for user in self.users.values_mut() {
            user.update_interval_ms = update_interval_ms;
        }
    }

    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<_> = self.users.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    pub fn snapshot(&self, regions: &[GeofenceRegion]) -> BTreeMap<ConnectionId, PresenceView> {
        self.users
            .iter()
            .map(|(connection_id, user)| (*connection_id, user.view(regions)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
