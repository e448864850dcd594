//! tac — emit lines in reverse order.

use async_trait::async_trait;

use crate::stages::lines::{emit_lines, read_all_lines};
use crate::stages::{Stage, StageContext, StageError, StageInput, StageOutput};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tac;

#[async_trait]
impl Stage for Tac {
    fn name(&self) -> &str {
        "tac"
    }

    async fn process(
        &self,
        ctx: &StageContext,
        input: &mut StageInput<'_>,
        output: &mut StageOutput<'_>,
    ) -> Result<(), StageError> {
        let lines = read_all_lines(ctx, input).await?;
        emit_lines(ctx, output, lines.into_iter().rev()).await
    }

    fn is_buffering(&self) -> bool {
        true
    }
}
