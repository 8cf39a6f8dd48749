//! Cache session management

pub mod activation;
pub mod journal;
pub mod manager;
pub mod state;

pub use activation::{ActivationState, CacheDir};
pub use journal::SessionJournal;
pub use manager::{CacheContext, CacheSession, SessionHook};
pub use state::{SessionExit, SessionReport};
