//! sed — regex substitution per line.

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};

use crate::stages::lines::map_lines;
use crate::stages::{Stage, StageContext, StageError, StageInput, StageOutput};

/// Sed stage: one `s/pattern/replacement/` command.
///
/// The replacement uses `regex` expansion syntax (`$1`, `${name}`). Without
/// `global` only the first match is rewritten; text after it is never re-matched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sed {
    pub pattern: String,
    pub replacement: String,
    pub global: bool,
    pub ignore_case: bool,
}

impl Sed {
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
            ..Self::default()
        }
    }

    pub fn global(mut self) -> Self {
        self.global = true;
        self
    }

    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    pub fn compile(&self) -> Result<Regex, StageError> {
        RegexBuilder::new(&self.pattern)
            .case_insensitive(self.ignore_case)
            .build()
            .map_err(|source| StageError::InvalidPattern {
                stage: "sed",
                pattern: self.pattern.clone(),
                source,
            })
    }
}

#[async_trait]
impl Stage for Sed {
    fn name(&self) -> &str {
        "sed"
    }

    async fn process(
        &self,
        ctx: &StageContext,
        input: &mut StageInput<'_>,
        output: &mut StageOutput<'_>,
    ) -> Result<(), StageError> {
        let re = self.compile()?;
        let limit = if self.global { 0 } else { 1 };
        map_lines(ctx, input, output, |line| {
            Some(re.replacen(&line, limit, self.replacement.as_str()).into_owned())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::test_support::run_stage;

    #[tokio::test]
    async fn test_sed_global() {
        let out = run_stage(&Sed::new("foo", "baz").global(), "foo bar foo\n").await.unwrap();
        assert_eq!(out, "baz bar baz\n");
    }

    #[tokio::test]
    async fn test_sed_first_only() {
        let out = run_stage(&Sed::new("o", "0"), "foo boo\n").await.unwrap();
        assert_eq!(out, "f0o boo\n");
    }

    #[tokio::test]
    async fn test_sed_capture_groups() {
        let out = run_stage(&Sed::new(r"(\w+)=(\w+)", "$2=$1"), "key=value\n")
            .await
            .unwrap();
        assert_eq!(out, "value=key\n");
    }

    #[tokio::test]
    async fn test_sed_unmatched_line_unchanged() {
        let out = run_stage(&Sed::new("zzz", "y"), "abc\n").await.unwrap();
        assert_eq!(out, "abc\n");
    }

    #[tokio::test]
    async fn test_sed_invalid_pattern() {
        let err = run_stage(&Sed::new("[", "x"), "abc\n").await.unwrap_err();
        assert!(matches!(err, StageError::InvalidPattern { stage: "sed", .. }));
    }
}
