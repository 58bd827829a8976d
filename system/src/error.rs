use crate::message::{ConnectionId, ErrorKind};
use thiserror::Error;

/// Every failure a lobby operation can report. None of them is fatal: the
/// command that caused it simply has no effect.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LobbyError {
    #[error("join requires a non-empty display name")]
    InvalidJoin,
    #[error("connection {0} is not a host of this session")]
    Unauthorized(ConnectionId),
    #[error("coordinate is missing or not finite")]
    MalformedCoordinate,
    #[error("connection {0} is not in this session")]
    UnknownConnection(ConnectionId),
}

impl LobbyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidJoin => ErrorKind::InvalidJoin,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::MalformedCoordinate => ErrorKind::MalformedCoordinate,
            Self::UnknownConnection(_) => ErrorKind::UnknownConnection,
        }
    }
}
