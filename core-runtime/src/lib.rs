//! # Core Runtime
//!
//! Ambient infrastructure shared by every engine crate:
//! - structured logging setup over `tracing`/`tracing-subscriber`
//! - the typed event bus UI layers subscribe to

pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
pub use events::{EventBus, EventSeverity, PlayerEvent};
pub use logging::{init_logging, LogFormat, LoggingConfig};
