//! tail — keep the last N lines.

use std::collections::VecDeque;

use async_trait::async_trait;

use super::DEFAULT_COUNT;
use crate::stages::lines::{emit_lines, LineReader};
use crate::stages::{Stage, StageContext, StageError, StageInput, StageOutput};

/// Tail stage: emit the last `count` lines (10 when `count` is 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tail {
    pub count: usize,
}

impl Tail {
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

impl Default for Tail {
    fn default() -> Self {
        Self::new(DEFAULT_COUNT)
    }
}

#[async_trait]
impl Stage for Tail {
    fn name(&self) -> &str {
        "tail"
    }

    async fn process(
        &self,
        ctx: &StageContext,
        input: &mut StageInput<'_>,
        output: &mut StageOutput<'_>,
    ) -> Result<(), StageError> {
        let limit = self.limit();
        // Ring of the newest `limit` lines; memory stays bounded by the count.
        let mut window = VecDeque::with_capacity(limit.min(1024));
        let mut lines = LineReader::new(input);
        loop {
            ctx.check()?;
            let Some(line) = lines.next_line().await? else {
                break;
            };
            if window.len() == limit {
                window.pop_front();
            }
            window.push_back(line);
        }
        emit_lines(ctx, output, window).await
    }

    fn is_buffering(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::test_support::run_stage;

    #[tokio::test]
    async fn test_tail_last_n() {
        let out = run_stage(&Tail::new(2), "a\nb\nc\nd\n").await.unwrap();
        assert_eq!(out, "c\nd\n");
    }

    #[tokio::test]
    async fn test_tail_zero_means_ten() {
        let input: String = (1..=15).map(|i| format!("{i}\n")).collect();
        let out = run_stage(&Tail::new(0), &input).await.unwrap();
        let expected: String = (6..=15).map(|i| format!("{i}\n")).collect();
        assert_eq!(out, expected);
    }

    #[tokio::test]
    async fn test_tail_short_input() {
        assert_eq!(run_stage(&Tail::new(5), "x\ny\n").await.unwrap(), "x\ny\n");
    }
}
