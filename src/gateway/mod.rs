pub mod client;
pub mod error;
pub mod resource;

pub use client::{HttpGateway, SnapshotSource};
pub use error::{GatewayError, GatewayErrorKind};
pub use resource::{Resource, SnapshotData, SnapshotPayload};
