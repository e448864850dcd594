//! grep — keep lines matching a regular expression.

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};

use crate::stages::lines::map_lines;
use crate::stages::{Stage, StageContext, StageError, StageInput, StageOutput};

/// Grep stage: keep (or with `invert`, drop) lines matching `pattern`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grep {
    pub pattern: String,
    pub ignore_case: bool,
    pub invert: bool,
}

impl Grep {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Self::default()
        }
    }

    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    pub fn invert(mut self) -> Self {
        self.invert = true;
        self
    }

    /// Compile the pattern for one run.
    pub fn compile(&self) -> Result<Regex, StageError> {
        RegexBuilder::new(&self.pattern)
            .case_insensitive(self.ignore_case)
            .build()
            .map_err(|source| StageError::InvalidPattern {
                stage: "grep",
                pattern: self.pattern.clone(),
                source,
            })
    }
}

#[async_trait]
impl Stage for Grep {
    fn name(&self) -> &str {
        if self.invert {
            "grep-v"
        } else {
            "grep"
        }
    }

    async fn process(
        &self,
        ctx: &StageContext,
        input: &mut StageInput<'_>,
        output: &mut StageOutput<'_>,
    ) -> Result<(), StageError> {
        let re = self.compile()?;
        let invert = self.invert;
        map_lines(ctx, input, output, |line| {
            (re.is_match(&line) != invert).then_some(line)
        })
        .await
    }
}
