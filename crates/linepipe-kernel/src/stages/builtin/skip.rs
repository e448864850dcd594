//! skip — drop the first N lines.

use async_trait::async_trait;

use crate::stages::lines::map_lines;
use crate::stages::{Stage, StageContext, StageError, StageInput, StageOutput};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Skip {
    pub count: usize,
}

impl Skip {
    pub fn new(count: usize) -> Self {
        Self { count }
    }
}

#[async_trait]
impl Stage for Skip {
    fn name(&self) -> &str {
        "skip"
    }

    async fn process(
        &self,
        ctx: &StageContext,
        input: &mut StageInput<'_>,
        output: &mut StageOutput<'_>,
    ) -> Result<(), StageError> {
        let mut remaining = self.count;
        map_lines(ctx, input, output, |line| {
            if remaining > 0 {
                remaining -= 1;
                None
            } else {
                Some(line)
            }
        })
        .await
    }
}
