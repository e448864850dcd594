//! replace — literal substitution of every occurrence.

use async_trait::async_trait;

use crate::stages::lines::map_lines;
use crate::stages::{Stage, StageContext, StageError, StageInput, StageOutput};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Replace {
    pub old: String,
    pub new: String,
}

impl Replace {
    pub fn new(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            old: old.into(),
            new: new.into(),
        }
    }
}

#[async_trait]
impl Stage for Replace {
    fn name(&self) -> &str {
        "replace"
    }

    async fn process(
        &self,
        ctx: &StageContext,
        input: &mut StageInput<'_>,
        output: &mut StageOutput<'_>,
    ) -> Result<(), StageError> {
        map_lines(ctx, input, output, |line| {
            Some(line.replace(&self.old, &self.new))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::test_support::run_stage;

    #[tokio::test]
    async fn test_replace_all_occurrences() {
        let out = run_stage(&Replace::new("hello", "hi"), "hello world\nhello hello\n")
            .await
            .unwrap();
        assert_eq!(out, "hi world\nhi hi\n");
    }

    #[tokio::test]
    async fn test_replace_with_empty() {
        let out = run_stage(&Replace::new("-", ""), "a-b-c\n").await.unwrap();
        assert_eq!(out, "abc\n");
    }

    #[tokio::test]
    async fn test_replace_empty_old_inserts_everywhere() {
        let out = run_stage(&Replace::new("", "x"), "abc\n").await.unwrap();
        assert_eq!(out, "xaxbxcx\n");
    }
}
