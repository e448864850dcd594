//! sort — order all lines, lexically or numerically.

use std::cmp::Ordering;

use async_trait::async_trait;

use crate::stages::lines::{emit_lines, read_all_lines};
use crate::stages::{Stage, StageContext, StageError, StageInput, StageOutput};

/// Sort stage. The sort is stable, so equal keys keep their input order in
/// both directions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sort {
    pub reverse: bool,
    pub numeric: bool,
}

impl Sort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }

    pub fn numeric(mut self) -> Self {
        self.numeric = true;
        self
    }

    fn direction(&self, ord: Ordering) -> Ordering {
        if self.reverse {
            ord.reverse()
        } else {
            ord
        }
    }
}

/// Numeric key of a line: surrounding whitespace trimmed, unparsable lines sort as 0.
pub(crate) fn numeric_key(line: &str) -> f64 {
    line.trim().parse().unwrap_or(0.0)
}

#[async_trait]
impl Stage for Sort {
    fn name(&self) -> &str {
        "sort"
    }

    async fn process(
        &self,
        ctx: &StageContext,
        input: &mut StageInput<'_>,
        output: &mut StageOutput<'_>,
    ) -> Result<(), StageError> {
        let mut lines = read_all_lines(ctx, input).await?;

        if self.numeric {
            let mut keyed: Vec<(f64, String)> =
                lines.into_iter().map(|l| (numeric_key(&l), l)).collect();
            keyed.sort_by(|a, b| self.direction(a.0.total_cmp(&b.0)));
            lines = keyed.into_iter().map(|(_, l)| l).collect();
        } else {
            lines.sort_by(|a, b| self.direction(a.cmp(b)));
        }

        emit_lines(ctx, output, lines).await
    }

    fn is_buffering(&self) -> bool {
        true
    }
}
