use serde::Serialize;

use crate::catalog::{Animation, CableType, ConnectorType};
use crate::completion::CompletionReport;
use crate::connection::{ConnectionId, InstanceId};
use crate::store::PersistFailure;

/// Notifications a presentation layer reacts to. Collected by the session
/// and handed out through `drain_events`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionEvent {
    LevelLoaded {
        level_id: String,
    },
    LevelExited {
        level_id: String,
    },
    EquipmentPlaced {
        instance: InstanceId,
        name: String,
    },
    ConnectionMade {
        connection: ConnectionId,
        cable: CableType,
        animation: Animation,
    },
    ConnectionRejected {
        from: ConnectorType,
        to: ConnectorType,
        cable: CableType,
    },
    LevelCompleted(CompletionReport),
    HintShown {
        detailed: bool,
        cost: u32,
    },
    ProgressNotSaved(PersistFailure),
}
