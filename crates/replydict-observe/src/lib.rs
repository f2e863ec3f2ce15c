//! Observability setup for replydict: structured logging through `tracing`.

pub mod tracing_setup;
