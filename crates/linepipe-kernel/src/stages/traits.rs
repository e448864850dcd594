//! The stage contract.

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncWrite};

use super::{StageContext, StageError};

/// Line source handed to a stage.
pub type StageInput<'a> = dyn AsyncBufRead + Unpin + Send + 'a;

/// Byte sink handed to a stage.
pub type StageOutput<'a> = dyn AsyncWrite + Unpin + Send + 'a;

/// One named transformation step of a pipeline.
///
/// `process` reads `input` until it is exhausted (or until the stage decides to
/// stop) and writes its result to `output`. Anything compiled or opened for a
/// run, such as a regex or the tee file, lives inside that call, so one stage
/// value can serve several runs.
///
/// Return `Ok(())` on exhaustion or a deliberate early stop, including a write
/// refused because the consumer closed its end. Return an error for invalid
/// configuration, I/O failure and cancellation.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Name used in diagnostics, e.g. `grep-v` or `map(upper)`.
    fn name(&self) -> &str;

    /// Run the stage over one input stream.
    async fn process(
        &self,
        ctx: &StageContext,
        input: &mut StageInput<'_>,
        output: &mut StageOutput<'_>,
    ) -> Result<(), StageError>;

    /// Whether the stage reads its whole input before writing anything.
    fn is_buffering(&self) -> bool {
        false
    }
}

impl std::fmt::Debug for dyn Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Stage").field(&self.name()).finish()
    }
}
