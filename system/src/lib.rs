pub extern crate serde;
pub extern crate serde_json;

mod error;
pub mod geofence;
mod lobby;
mod message;
mod presence;
mod region_history;

pub use error::LobbyError;
pub use geofence::{containment, is_inside};
pub use lobby::*;
pub use message::*;
pub use presence::{HostToken, PresenceTable, UserPresence};
pub use region_history::{RegionHistory, REGION_HISTORY_CAPACITY};
