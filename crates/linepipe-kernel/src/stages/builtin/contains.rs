//! contains — keep lines containing a literal substring.

use async_trait::async_trait;

use crate::stages::lines::map_lines;
use crate::stages::{Stage, StageContext, StageError, StageInput, StageOutput};

/// Contains stage: literal substring filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contains {
    pub substr: String,
    /// Compare lower-cased line against lower-cased `substr`.
    pub ignore_case: bool,
}

impl Contains {
    pub fn new(substr: impl Into<String>) -> Self {
        Self {
            substr: substr.into(),
            ignore_case: false,
        }
    }

    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }
}

#[async_trait]
impl Stage for Contains {
    fn name(&self) -> &str {
        "contains"
    }

    async fn process(
        &self,
        ctx: &StageContext,
        input: &mut StageInput<'_>,
        output: &mut StageOutput<'_>,
    ) -> Result<(), StageError> {
        let ignore_case = self.ignore_case;
        let needle = if ignore_case {
            self.substr.to_lowercase()
        } else {
            self.substr.clone()
        };

        map_lines(ctx, input, output, |line| {
            let found = if ignore_case {
                line.to_lowercase().contains(&needle)
            } else {
                line.contains(&needle)
            };
            found.then_some(line)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::test_support::run_stage;

    #[tokio::test]
    async fn test_contains_literal() {
        let out = run_stage(&Contains::new("hello"), "hello world\nfoo bar\nhello there\n")
            .await
            .unwrap();
        assert_eq!(out, "hello world\nhello there\n");
    }

    #[tokio::test]
    async fn test_contains_is_not_a_regex() {
        let out = run_stage(&Contains::new("a.c"), "abc\na.c\n").await.unwrap();
        assert_eq!(out, "a.c\n");
    }

    #[tokio::test]
    async fn test_contains_ignore_case() {
        let out = run_stage(&Contains::new("HeLLo").ignore_case(), "HELLO\nbye\nhello\n")
            .await
            .unwrap();
        assert_eq!(out, "HELLO\nhello\n");
    }
}
