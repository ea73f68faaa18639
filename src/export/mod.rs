//! Export: asynchronous, cancellable rendering of a composition plan to an encoded file.
//!
//! [`coordinator::ExportCoordinator`] owns the state machine, [`pipeline`] the chunked render loop
//! and [`task::ExportTask`] the caller's handle on one run.

/// Single-flight export state machine.
pub mod coordinator;
/// Output file naming.
pub mod naming;
/// Export options and the render/encode loop.
pub mod pipeline;
/// Export handles and terminal results.
pub mod task;
