// shared id aliases + small enums
use serde::{Deserialize, Serialize};

pub type KindId = u32;
pub type DeviceId = u32;
pub type VDeviceId = u32;
pub type FeatureId = u32;
pub type GroupId = u32;

/// Whether a connection carries traffic one way or both ways.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Bidirectional,
    Unidirectional,
}

/// The two container flavors: a Scenario declares a required topology, a
/// Setup declares the topology that is actually available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupKind {
    Scenario,
    Setup,
}
