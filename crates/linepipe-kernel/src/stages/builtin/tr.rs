//! tr — translate characters.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::stages::lines::map_lines;
use crate::stages::{Stage, StageContext, StageError, StageInput, StageOutput};

/// Tr stage: map each char of `from` to the char at the same position in `to`.
///
/// When `to` is shorter, its last char is repeated for the rest of `from`.
/// Characters outside `from` pass through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tr {
    pub from: String,
    pub to: String,
}

impl Tr {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Build the translation table. Later duplicates in `from` win.
    pub fn mapping(&self) -> HashMap<char, char> {
        let to: Vec<char> = self.to.chars().collect();
        let Some(&last) = to.last() else {
            return HashMap::new();
        };
        self.from
            .chars()
            .enumerate()
            .map(|(i, c)| (c, to.get(i).copied().unwrap_or(last)))
            .collect()
    }
}

/// Apply a translation table to one line.
pub(crate) fn translate(line: &str, mapping: &HashMap<char, char>) -> String {
    line.chars()
        .map(|c| mapping.get(&c).copied().unwrap_or(c))
        .collect()
}

#[async_trait]
impl Stage for Tr {
    fn name(&self) -> &str {
        "tr"
    }

    async fn process(
        &self,
        ctx: &StageContext,
        input: &mut StageInput<'_>,
        output: &mut StageOutput<'_>,
    ) -> Result<(), StageError> {
        let mapping = self.mapping();
        map_lines(ctx, input, output, |line| Some(translate(&line, &mapping))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::test_support::run_stage;

    #[tokio::test]
    async fn test_tr_one_to_one() {
        let out = run_stage(&Tr::new("aeiou", "AEIOU"), "hello\n").await.unwrap();
        assert_eq!(out, "hEllO\n");
    }

    #[tokio::test]
    async fn test_tr_pads_with_last_target() {
        let out = run_stage(&Tr::new("abcde", "xy"), "abcde\n").await.unwrap();
        assert_eq!(out, "xyyyy\n");
    }

    #[tokio::test]
    async fn test_tr_empty_target_is_identity() {
        let out = run_stage(&Tr::new("abc", ""), "abc\n").await.unwrap();
        assert_eq!(out, "abc\n");
    }

    #[test]
    fn test_translate_multibyte() {
        let mapping = Tr::new("é", "e").mapping();
        assert_eq!(translate("café", &mapping), "cafe");
    }
}
