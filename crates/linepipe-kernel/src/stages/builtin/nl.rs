//! nl — number lines.

use async_trait::async_trait;

use crate::stages::lines::map_lines;
use crate::stages::{Stage, StageContext, StageError, StageInput, StageOutput};

/// Width of the right-aligned line number column.
const NUMBER_WIDTH: usize = 6;

/// Nl stage: prefix each line with `{number:>6}\t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nl {
    /// First number; values below 1 start at 1.
    pub start: i64,
}

impl Nl {
    pub fn new(start: i64) -> Self {
        Self { start }
    }
}

impl Default for Nl {
    fn default() -> Self {
        Self::new(1)
    }
}

#[async_trait]
impl Stage for Nl {
    fn name(&self) -> &str {
        "nl"
    }

    async fn process(
        &self,
        ctx: &StageContext,
        input: &mut StageInput<'_>,
        output: &mut StageOutput<'_>,
    ) -> Result<(), StageError> {
        let mut number = self.start.max(1);
        map_lines(ctx, input, output, |line| {
            let numbered = format!("{number:>NUMBER_WIDTH$}\t{line}");
            number = number.wrapping_add(1);
            Some(numbered)
        })
        .await
    }
}
