pub mod history;
pub mod snapshot;
pub mod view_model;

pub use history::{HistoryBuffer, HistoryEntry};
pub use view_model::{ChannelState, MirrorState, StoreWrite, ViewModelStore};
