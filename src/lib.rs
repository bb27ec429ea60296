//! Client core for a novel and screenplay writing service: typed content
//! models, the REST and WebSocket bindings, and the editor controller that
//! keeps a locally edited chapter or scene in sync with the server.

pub mod config;
pub mod content;
pub mod editor;
pub mod remote;

pub use config::AppConfig;
pub use editor::{EditorController, EditorError};
pub use remote::{RemoteClient, RemoteError};
