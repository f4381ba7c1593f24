//! Toast sinks.

mod in_memory;
mod tracing_sink;

pub use in_memory::InMemoryToastSink;
pub use tracing_sink::TracingToastSink;
