//! Scheduler: links and the pipeline orchestrator.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Pipeline                            │
//! │  ┌────────┐   link 1   ┌────────┐   link 2   ┌────────┐      │
//! │  │ stage1 │───────────▶│ stage2 │───────────▶│ stage3 │──▶ sink
//! │  └────────┘  bounded   └────────┘  bounded   └────────┘      │
//! │      ▲                                                       │
//! │   source                                                     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! All stage futures are polled together; a stage blocked on a full or empty
//! link yields to the others.

pub mod pipe_stream;
mod pipeline;

pub use pipe_stream::{is_pipe_closed, pipe_link, PipeReader, PipeWriter, PIPE_BUFFER_SIZE};
pub use pipeline::{Pipeline, PipelineError};
