use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type ConnectionId = u32;
pub type SessionId = String;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// `{0, 0}` is what clients report before they get a real fix.
    pub fn is_null_island(&self) -> bool {
        self.lat == 0.0 && self.lng == 0.0
    }
}

/// Location as it arrives from a client. Either coordinate may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RawLocation {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}

impl RawLocation {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat: Some(lat),
            lng: Some(lng),
        }
    }
}

impl From<LatLng> for RawLocation {
    fn from(location: LatLng) -> Self {
        Self::new(location.lat, location.lng)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceRegion {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub session_id: SessionId,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub is_host: bool,
    #[serde(default)]
    pub location: Option<RawLocation>,
    #[serde(default)]
    pub update_interval_ms: Option<u64>,
}

impl JoinRequest {
    pub fn new(session_id: &str, display_name: &str, is_host: bool) -> Self {
        Self {
            session_id: session_id.to_owned(),
            display_name: Some(display_name.to_owned()),
            is_host,
            location: None,
            update_interval_ms: None,
        }
    }

    /// Trimmed display name, if one was given.
    pub fn display_name(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Ingress frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    Join(JoinRequest),
    LocationUpdate(RawLocation),
    SetUpdateInterval { ms: u64 },
    DrawRegion(GeofenceRegion),
    Leave,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceView {
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LatLng>,
    pub is_host: bool,
    pub update_interval_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inside_fence: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    InvalidJoin,
    Unauthorized,
    MalformedCoordinate,
    UnknownConnection,
}

/// Egress frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    Joined {
        connection_id: ConnectionId,
        session_id: SessionId,
        is_host: bool,
    },
    PresenceSnapshot {
        users: BTreeMap<ConnectionId, PresenceView>,
    },
    RegionHistory {
        regions: Vec<GeofenceRegion>,
    },
    RegionAdded {
        region: GeofenceRegion,
    },
    IntervalChanged {
        ms: u64,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub members: usize,
    pub regions: usize,
    pub effective_interval_ms: u64,
    pub has_host: bool,
}
