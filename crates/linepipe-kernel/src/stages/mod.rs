//! Stages: the unit of work a pipeline is built from.
//!
//! - **Contract**: [`Stage`], run with a [`StageContext`] and failing with [`StageError`]
//! - **Streaming builtins**: one line in, at most one line out, constant memory
//! - **Buffering builtins**: read everything, then emit (sort, tail, tac, wc)

mod context;
mod error;
pub(crate) mod lines;
mod traits;

pub mod builtin;

pub use builtin::{
    Contains, Cut, Filter, Grep, Head, Map, Nl, Replace, Rev, Sed, Skip, Sort, Tac, Tail, Tee, Tr,
    Uniq, Wc,
};
pub use context::StageContext;
pub use error::StageError;
pub use traits::{Stage, StageInput, StageOutput};

#[cfg(test)]
pub(crate) mod test_support {
    use super::{Stage, StageContext, StageError};

    /// Run one stage over `input` and return what it wrote.
    pub(crate) async fn run_stage(stage: &dyn Stage, input: &str) -> Result<String, StageError> {
        let ctx = StageContext::new();
        let mut source = input.as_bytes();
        let mut sink = Vec::new();
        stage.process(&ctx, &mut source, &mut sink).await?;
        Ok(String::from_utf8(sink).expect("stage output is UTF-8"))
    }
}
