//! head — pass the first N lines, then drain the rest.

use async_trait::async_trait;

use super::DEFAULT_COUNT;
use crate::stages::lines::map_lines;
use crate::stages::{Stage, StageContext, StageError, StageInput, StageOutput};

/// Head stage: emit the first `count` lines (10 when `count` is 0).
///
/// After the limit the remaining input is still read and discarded, so the
/// producer never sees its writes refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Head {
    pub count: usize,
}

impl Head {
    pub fn new(count: usize) -> Self {
        Self { count }
    }

    pub fn limit(&self) -> usize {
        if self.count == 0 {
            DEFAULT_COUNT
        } else {
            self.count
        }
    }
}

impl Default for Head {
    fn default() -> Self {
        Self::new(DEFAULT_COUNT)
    }
}

#[async_trait]
impl Stage for Head {
    fn name(&self) -> &str {
        "head"
    }

    async fn process(
        &self,
        ctx: &StageContext,
        input: &mut StageInput<'_>,
        output: &mut StageOutput<'_>,
    ) -> Result<(), StageError> {
        let limit = self.limit();
        let mut seen = 0usize;
        map_lines(ctx, input, output, |line| {
            seen += 1;
            (seen <= limit).then_some(line)
        })
        .await
    }
}
