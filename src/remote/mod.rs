pub mod ai;
pub mod socket;

mod catalog;
mod client;
mod units;

pub use ai::{AiOperation, AiOperationKind, AiTask, AiTaskStatus, TaskState};
pub use client::{RemoteClient, RemoteError};
pub use socket::{SocketClient, SocketError, SocketMessage, SocketState};
pub use units::{RestChapters, RestScenes, RestUnits, UnitService};
