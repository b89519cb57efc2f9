use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::{Animation, CableType, ConnectorType, MountPosition};

/// Stage coordinates in the surface's own units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn offset_by(self, mount: MountPosition) -> Self {
        let (dx, dy) = mount.offset();
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(pub u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "equipment-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connection-{}", self.0)
    }
}

/// A connector on a placed instance, addressed by its index in the
/// equipment's connector list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectorRef {
    pub instance: InstanceId,
    pub connector: usize,
}

impl ConnectorRef {
    #[must_use]
    pub const fn new(instance: InstanceId, connector: usize) -> Self {
        Self {
            instance,
            connector,
        }
    }
}

/// Resolved connector: where it is and what it carries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub at: ConnectorRef,
    pub kind: ConnectorType,
    pub position: Position,
}

/// An accepted link between two connectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub from: Endpoint,
    pub to: Endpoint,
    pub cable: CableType,
    pub animation: Animation,
}

/// A rejected attempt. Never stored and never counted toward progress.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InvalidConnection {
    pub from: Endpoint,
    pub to: Endpoint,
    pub cable: CableType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_positions_follow_mount_offsets() {
        let origin = Position::new(100.0, 200.0);
        assert_eq!(origin.offset_by(MountPosition::Left), Position::new(60.0, 200.0));
        assert_eq!(origin.offset_by(MountPosition::Top), Position::new(100.0, 170.0));
        assert_eq!(origin.offset_by(MountPosition::Bottom), Position::new(100.0, 230.0));
    }

    #[test]
    fn ids_render_with_prefix() {
        assert_eq!(InstanceId(3).to_string(), "equipment-3");
        assert_eq!(ConnectionId(7).to_string(), "connection-7");
    }
}
