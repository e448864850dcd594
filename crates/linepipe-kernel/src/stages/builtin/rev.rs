//! rev — reverse each line.

use async_trait::async_trait;

use crate::stages::lines::map_lines;
use crate::stages::{Stage, StageContext, StageError, StageInput, StageOutput};

/// Rev stage: reverse by code point, so multi-byte chars stay intact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rev;

#[async_trait]
impl Stage for Rev {
    fn name(&self) -> &str {
        "rev"
    }

    async fn process(
        &self,
        ctx: &StageContext,
        input: &mut StageInput<'_>,
        output: &mut StageOutput<'_>,
    ) -> Result<(), StageError> {
        map_lines(ctx, input, output, |line| Some(line.chars().rev().collect())).await
    }
}
