use crate::error::LobbyError;
use crate::geofence::containment;
use crate::message::*;
use crate::presence::{HostToken, PresenceTable, UserPresence};
use crate::region_history::RegionHistory;
use std::convert::TryFrom;

pub const DEFAULT_INTERVAL_FLOOR_MS: u64 = 10_000;
pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 5_000;

/// Update cadence rules shared by every session of a process.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LobbyPolicy {
    pub interval_floor_ms: u64,
    pub default_interval_ms: u64,
}

impl LobbyPolicy {
    pub fn clamp_interval(&self, requested_ms: u64) -> u64 {
        requested_ms.max(self.interval_floor_ms)
    }
}

impl Default for LobbyPolicy {
    fn default() -> Self {
        Self {
            interval_floor_ms: DEFAULT_INTERVAL_FLOOR_MS,
            default_interval_ms: DEFAULT_UPDATE_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Everyone,
    Only(ConnectionId),
}

/// A message the session wants delivered, and to whom.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub audience: Audience,
    pub message: ServerMessage,
}

impl Outbound {
    pub fn everyone(message: ServerMessage) -> Self {
        Self {
            audience: Audience::Everyone,
            message,
        }
    }

    pub fn only(connection_id: ConnectionId, message: ServerMessage) -> Self {
        Self {
            audience: Audience::Only(connection_id),
            message,
        }
    }
}

#[derive(Debug)]
pub struct JoinResult {
    pub outbound: Vec<Outbound>,
    pub host_token: Option<HostToken>,
}

/// Presence and geofence state of one lobby. Operations are plain method
/// calls; the caller is responsible for running them one at a time.
pub struct LobbySession {
    session_id: SessionId,
    policy: LobbyPolicy,
    presence: PresenceTable,
    regions: RegionHistory,
    host_interval_ms: Option<u64>,
    host_token: Option<HostToken>,
}

impl LobbySession {
    pub fn new(session_id: SessionId, policy: LobbyPolicy) -> Self {
        Self {
            session_id,
            policy,
            presence: PresenceTable::new(),
            regions: RegionHistory::new(),
            host_interval_ms: None,
            host_token: None,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn presence(&self) -> &PresenceTable {
        &self.presence
    }

    pub fn regions(&self) -> &RegionHistory {
        &self.regions
    }

    /// The first host's interval, or the clamped default before any host.
    pub fn effective_interval_ms(&self) -> u64 {
        self.host_interval_ms
            .unwrap_or_else(|| self.policy.clamp_interval(self.policy.default_interval_ms))
    }

    pub fn is_host(&self, connection_id: &ConnectionId) -> bool {
        match (&self.host_token, self.presence.get(connection_id)) {
            (Some(token), Some(user)) => user.holds(token),
            _ => false,
        }
    }

    /// `None` when the connection is unknown or has no real fix.
    pub fn is_inside(&self, connection_id: &ConnectionId) -> Option<bool> {
        self.presence
            .get(connection_id)
            .and_then(|user| containment(user.fix(), &self.regions))
    }

    pub fn join(
        &mut self,
        from: ConnectionId,
        request: &JoinRequest,
    ) -> Result<JoinResult, LobbyError> {
        let display_name = request.display_name().ok_or(LobbyError::InvalidJoin)?;

        let mut outbound = Vec::new();
        let mut user = UserPresence::new(from, display_name.to_owned(), 0);

        if let Some(raw) = request.location {
            match LatLng::try_from(raw) {
                Ok(location) => user.location = Some(location),
                Err(e) => log::warn!("Ignoring initial location of {}: {}", from, e),
            }
        }

        let host_token = if request.is_host {
            let token = *self.host_token.get_or_insert_with(HostToken::issue);
            user.grant_host(token);
            Some(token)
        } else {
            None
        };

        let mut interval_changed = false;
        if request.is_host && self.host_interval_ms.is_none() {
            let declared = request
                .update_interval_ms
                .unwrap_or(self.policy.default_interval_ms);
            self.host_interval_ms = Some(self.policy.clamp_interval(declared));
            interval_changed = true;
        }

        let interval_ms = self.effective_interval_ms();
        user.update_interval_ms = interval_ms;
        if interval_changed {
            self.presence.set_update_interval(interval_ms);
        }
        self.presence.upsert(user);

        log::info!(
            "Connection {} joined session {:?} as {:?}{}",
            from,
            self.session_id,
            display_name,
            if request.is_host { " (host)" } else { "" }
        );

        outbound.push(Outbound::only(
            from,
            ServerMessage::Joined {
                connection_id: from,
                session_id: self.session_id.clone(),
                is_host: request.is_host,
            },
        ));

        if request.is_host {
            // a host joining starts a new round
            self.regions.clear();
            outbound.push(Outbound::everyone(self.region_history()));
        } else {
            outbound.push(Outbound::only(from, self.region_history()));
        }

        let interval = ServerMessage::IntervalChanged { ms: interval_ms };
        if interval_changed {
            outbound.push(Outbound::everyone(interval));
        } else {
            outbound.push(Outbound::only(from, interval));
        }

        outbound.push(Outbound::everyone(self.presence_snapshot()));

        Ok(JoinResult {
            outbound,
            host_token,
        })
    }

    pub fn update_location(
        &mut self,
        from: ConnectionId,
        location: RawLocation,
    ) -> Result<Vec<Outbound>, LobbyError> {
        if !self.presence.contains(&from) {
            return Err(LobbyError::UnknownConnection(from));
        }
        let location = LatLng::try_from(location)?;
        if let Some(user) = self.presence.get_mut(&from) {
            user.location = Some(location);
        }
        Ok(vec![Outbound::everyone(self.presence_snapshot())])
    }

    pub fn set_update_interval(
        &mut self,
        from: ConnectionId,
        requested_ms: u64,
    ) -> Result<Vec<Outbound>, LobbyError> {
        self.authorize(from)?;

        let interval_ms = self.policy.clamp_interval(requested_ms);
        self.host_interval_ms = Some(interval_ms);
        self.presence.set_update_interval(interval_ms);
        log::info!(
            "Session {:?} update interval set to {}ms by {}",
            self.session_id,
            interval_ms,
            from
        );

        Ok(vec![Outbound::everyone(ServerMessage::IntervalChanged {
            ms: interval_ms,
        })])
    }

    pub fn record_region(
        &mut self,
        from: ConnectionId,
        region: GeofenceRegion,
    ) -> Result<Vec<Outbound>, LobbyError> {
        self.authorize(from)?;

        let region = GeofenceRegion::new(region.south_west, region.north_east)?;
        if let Some(evicted) = self.regions.push(region) {
            log::debug!("Session {:?} evicted region {:?}", self.session_id, evicted);
        }

        Ok(vec![
            Outbound::everyone(ServerMessage::RegionAdded { region }),
            Outbound::everyone(self.region_history()),
            // verdicts may have changed
            Outbound::everyone(self.presence_snapshot()),
        ])
    }

    /// Idempotent. Session settings survive the last member leaving.
    pub fn leave(&mut self, from: ConnectionId) -> Vec<Outbound> {
        match self.presence.remove(&from) {
            Some(user) => {
                log::info!(
                    "Connection {} ({:?}) left session {:?}",
                    from,
                    user.display_name,
                    self.session_id
                );
                vec![Outbound::everyone(self.presence_snapshot())]
            }
            None => Vec::new(),
        }
    }

    pub fn presence_snapshot(&self) -> ServerMessage {
        ServerMessage::PresenceSnapshot {
            users: self.presence.snapshot(&self.regions.to_vec()),
        }
    }

    pub fn region_history(&self) -> ServerMessage {
        ServerMessage::RegionHistory {
            regions: self.regions.to_vec(),
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            members: self.presence.len(),
            regions: self.regions.len(),
            effective_interval_ms: self.effective_interval_ms(),
            has_host: self
                .presence
                .connection_ids()
                .iter()
                .any(|id| self.is_host(id)),
        }
    }

    fn authorize(&self, from: ConnectionId) -> Result<(), LobbyError> {
        if !self.presence.contains(&from) {
            Err(LobbyError::UnknownConnection(from))
        } else if self.is_host(&from) {
            Ok(())
        } else {
            Err(LobbyError::Unauthorized(from))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> LobbySession {
        LobbySession::new("X".into(), LobbyPolicy::default())
    }

    fn square(n: f64) -> GeofenceRegion {
        GeofenceRegion {
            south_west: LatLng::new(n, n),
            north_east: LatLng::new(n + 10.0, n + 10.0),
        }
    }

    #[test]
    fn it_rejects_join_without_name() {
        let mut session = session();
        let mut request = JoinRequest::new("X", "", true);
        assert_eq!(session.join(1, &request).err(), Some(LobbyError::InvalidJoin));

        request.display_name = None;
        assert_eq!(session.join(1, &request).err(), Some(LobbyError::InvalidJoin));

        assert!(session.presence().is_empty());
        assert!(!session.summary().has_host);
    }

    #[test]
    fn it_restores_presence_size_after_join_and_leave() {
        let mut session = session();
        session.join(1, &JoinRequest::new("X", "Alice", true)).expect("");
        let before = session.presence().len();

        session.join(2, &JoinRequest::new("X", "Bob", false)).expect("");
        assert_eq!(session.presence().len(), before + 1);

        assert_eq!(session.leave(2).len(), 1);
        assert_eq!(session.presence().len(), before);
        assert!(session.leave(2).is_empty());
        assert_eq!(session.presence().len(), before);
    }

    #[test]
    fn it_sends_history_and_interval_to_non_host_joiner_only() {
        let mut session = session();
        session.join(1, &JoinRequest::new("X", "Alice", true)).expect("");
        session.record_region(1, square(0.0)).expect("");

        let result = session.join(2, &JoinRequest::new("X", "Bob", false)).expect("");
        assert_eq!(result.host_token, None);
        assert_eq!(
            result.outbound[1],
            Outbound::only(
                2,
                ServerMessage::RegionHistory {
                    regions: vec![square(0.0)]
                }
            )
        );
        assert_eq!(
            result.outbound[2],
            Outbound::only(2, ServerMessage::IntervalChanged { ms: 10_000 })
        );
        assert_eq!(result.outbound[3].audience, Audience::Everyone);
    }

    #[test]
    fn it_clears_regions_when_a_host_joins() {
        let mut session = session();
        session.join(1, &JoinRequest::new("X", "Alice", true)).expect("");
        for n in 0..5 {
            session.record_region(1, square(n as f64)).expect("");
        }
        assert_eq!(session.regions().len(), 5);

        let result = session.join(3, &JoinRequest::new("X", "Carol", true)).expect("");
        assert!(session.regions().is_empty());
        assert!(result.outbound.contains(&Outbound::everyone(
            ServerMessage::RegionHistory { regions: vec![] }
        )));
    }

    #[test]
    fn it_lets_the_first_host_decide_the_interval() {
        let mut session = session();
        assert_eq!(session.effective_interval_ms(), 10_000);

        let mut first = JoinRequest::new("X", "Alice", true);
        first.update_interval_ms = Some(20_000);
        session.join(1, &first).expect("");
        assert_eq!(session.effective_interval_ms(), 20_000);

        let mut second = JoinRequest::new("X", "Carol", true);
        second.update_interval_ms = Some(60_000);
        let result = session.join(2, &second).expect("");
        assert_eq!(session.effective_interval_ms(), 20_000);
        assert!(result.outbound.contains(&Outbound::only(
            2,
            ServerMessage::IntervalChanged { ms: 20_000 }
        )));
    }

    #[test]
    fn it_grants_every_self_declared_host_the_same_token() {
        let mut session = session();
        let a = session.join(1, &JoinRequest::new("X", "Alice", true)).expect("");
        let c = session.join(3, &JoinRequest::new("X", "Carol", true)).expect("");
        assert!(a.host_token.is_some());
        assert_eq!(a.host_token, c.host_token);
        assert!(session.is_host(&1));
        assert!(session.is_host(&3));
    }

    #[test]
    fn it_drops_host_rights_when_rejoining_as_guest() {
        let mut session = session();
        session.join(1, &JoinRequest::new("X", "Alice", true)).expect("");
        session.join(1, &JoinRequest::new("X", "Alice", false)).expect("");
        assert!(!session.is_host(&1));
        assert_eq!(
            session.set_update_interval(1, 30_000).err(),
            Some(LobbyError::Unauthorized(1))
        );
    }

    #[test]
    fn it_ignores_interval_from_non_host() {
        let mut session = session();
        session.join(1, &JoinRequest::new("X", "Alice", true)).expect("");
        session.join(2, &JoinRequest::new("X", "Bob", false)).expect("");
        let before = session.effective_interval_ms();

        assert_eq!(
            session.set_update_interval(2, 60_000).err(),
            Some(LobbyError::Unauthorized(2))
        );
        assert_eq!(session.effective_interval_ms(), before);
    }

    #[test]
    fn it_applies_interval_floor() {
        let mut session = session();
        session.join(1, &JoinRequest::new("X", "Alice", true)).expect("");
        session.join(2, &JoinRequest::new("X", "Bob", false)).expect("");

        let outbound = session.set_update_interval(1, 500).expect("");
        assert_eq!(session.effective_interval_ms(), 10_000);
        assert_eq!(
            outbound,
            vec![Outbound::everyone(ServerMessage::IntervalChanged { ms: 10_000 })]
        );
        assert_eq!(
            session.presence().get(&2).map(|u| u.update_interval_ms),
            Some(10_000)
        );
    }

    #[test]
    fn it_ignores_regions_from_non_host() {
        let mut session = session();
        session.join(2, &JoinRequest::new("X", "Bob", false)).expect("");
        assert_eq!(
            session.record_region(2, square(0.0)).err(),
            Some(LobbyError::Unauthorized(2))
        );
        assert!(session.regions().is_empty());
    }

    #[test]
    fn it_broadcasts_new_region_and_full_history() {
        let mut session = session();
        session.join(1, &JoinRequest::new("X", "Alice", true)).expect("");
        session.record_region(1, square(0.0)).expect("");
        let outbound = session.record_region(1, square(20.0)).expect("");

        assert_eq!(
            outbound[0],
            Outbound::everyone(ServerMessage::RegionAdded {
                region: square(20.0)
            })
        );
        assert_eq!(
            outbound[1],
            Outbound::everyone(ServerMessage::RegionHistory {
                regions: vec![square(0.0), square(20.0)]
            })
        );
    }

    #[test]
    fn it_keeps_previous_location_on_malformed_update() {
        let mut session = session();
        session.join(2, &JoinRequest::new("X", "Bob", false)).expect("");
        session
            .update_location(2, RawLocation::new(1.0, 2.0))
            .expect("");

        let malformed = RawLocation {
            lat: None,
            lng: Some(3.0),
        };
        assert_eq!(
            session.update_location(2, malformed).err(),
            Some(LobbyError::MalformedCoordinate)
        );
        assert_eq!(
            session.presence().get(&2).and_then(|u| u.location),
            Some(LatLng::new(1.0, 2.0))
        );
    }

    #[test]
    fn it_reports_unknown_connection_on_late_update() {
        let mut session = session();
        assert_eq!(
            session.update_location(9, RawLocation::new(1.0, 2.0)).err(),
            Some(LobbyError::UnknownConnection(9))
        );
    }

    #[test]
    fn it_stores_placeholder_location_without_evaluating_it() {
        let mut session = session();
        session.join(1, &JoinRequest::new("X", "Alice", true)).expect("");
        session.record_region(1, square(5.0)).expect("");
        session.join(2, &JoinRequest::new("X", "Bob", false)).expect("");

        session
            .update_location(2, RawLocation::new(0.0, 0.0))
            .expect("");
        assert_eq!(session.is_inside(&2), None);
        assert_eq!(
            session.presence().get(&2).and_then(|u| u.location),
            Some(LatLng::new(0.0, 0.0))
        );
    }

    #[test]
    fn it_preserves_settings_when_everyone_leaves() {
        let mut session = session();
        let mut request = JoinRequest::new("X", "Alice", true);
        request.update_interval_ms = Some(45_000);
        session.join(1, &request).expect("");
        session.record_region(1, square(0.0)).expect("");

        session.leave(1);
        assert!(session.presence().is_empty());
        assert_eq!(session.regions().len(), 1);
        assert_eq!(session.effective_interval_ms(), 45_000);

        let result = session.join(2, &JoinRequest::new("X", "Bob", false)).expect("");
        assert!(result.outbound.contains(&Outbound::only(
            2,
            ServerMessage::RegionHistory {
                regions: vec![square(0.0)]
            }
        )));
        assert!(result.outbound.contains(&Outbound::only(
            2,
            ServerMessage::IntervalChanged { ms: 45_000 }
        )));
    }
}
