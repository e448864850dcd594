//! uniq — collapse runs of identical adjacent lines.

use async_trait::async_trait;

use crate::stages::lines::map_lines;
use crate::stages::{Stage, StageContext, StageError, StageInput, StageOutput};

/// Uniq stage. Only consecutive duplicates are removed; sort first for a
/// global dedup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Uniq {
    pub ignore_case: bool,
}

impl Uniq {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }
}

#[async_trait]
impl Stage for Uniq {
    fn name(&self) -> &str {
        "uniq"
    }

    async fn process(
        &self,
        ctx: &StageContext,
        input: &mut StageInput<'_>,
        output: &mut StageOutput<'_>,
    ) -> Result<(), StageError> {
        let ignore_case = self.ignore_case;
        let mut previous: Option<String> = None;
        map_lines(ctx, input, output, |line| {
            let key = if ignore_case {
                line.to_lowercase()
            } else {
                line.clone()
            };
            if previous.as_deref() == Some(key.as_str()) {
                return None;
            }
            previous = Some(key);
            Some(line)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::test_support::run_stage;

    #[tokio::test]
    async fn test_uniq_consecutive_only() {
        assert_eq!(run_stage(&Uniq::new(), "a\na\nb\na\n").await.unwrap(), "a\nb\na\n");
    }

    #[tokio::test]
    async fn test_uniq_ignore_case_keeps_first_spelling() {
        let out = run_stage(&Uniq::new().ignore_case(), "Foo\nfoo\nFOO\nbar\n")
            .await
            .unwrap();
        assert_eq!(out, "Foo\nbar\n");
    }

    #[tokio::test]
    async fn test_uniq_blank_lines() {
        assert_eq!(run_stage(&Uniq::new(), "\n\nx\n").await.unwrap(), "\nx\n");
    }
}
