use bd_core::{BridgeId, Direction};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetourError {
    #[error("direction {0} has no destination that snaps onto the network")]
    NoDestinations(Direction),

    #[error("detour record for direction {direction} names unknown bridge {bridge}")]
    UnknownBridge {
        bridge:    BridgeId,
        direction: Direction,
    },
}

pub type DetourResult<T> = Result<T, DetourError>;
