//! Observability: structured logging through `tracing`

mod logging;

pub use logging::{init_logging, LogFormat, LoggingConfig};
