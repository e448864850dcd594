//! cut — select delimited fields.

use async_trait::async_trait;

use crate::stages::lines::map_lines;
use crate::stages::{Stage, StageContext, StageError, StageInput, StageOutput};

/// Cut stage: split on `delimiter` and keep `fields` (1-based, in the given
/// order), re-joined with the same delimiter. Fields past the end of a line
/// are skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cut {
    /// Empty means tab.
    pub delimiter: String,
    pub fields: Vec<usize>,
}

impl Cut {
    pub fn new(delimiter: impl Into<String>, fields: Vec<usize>) -> Self {
        Self {
            delimiter: delimiter.into(),
            fields,
        }
    }

    fn effective_delimiter(&self) -> &str {
        if self.delimiter.is_empty() {
            "\t"
        } else {
            &self.delimiter
        }
    }
}

impl Default for Cut {
    fn default() -> Self {
        Self::new("\t", Vec::new())
    }
}

#[async_trait]
impl Stage for Cut {
    fn name(&self) -> &str {
        "cut"
    }

    async fn process(
        &self,
        ctx: &StageContext,
        input: &mut StageInput<'_>,
        output: &mut StageOutput<'_>,
    ) -> Result<(), StageError> {
        let delim = self.effective_delimiter();
        map_lines(ctx, input, output, |line| {
            let parts: Vec<&str> = line.split(delim).collect();
            let selected: Vec<&str> = self
                .fields
                .iter()
                .filter_map(|&f| f.checked_sub(1).and_then(|i| parts.get(i).copied()))
                .collect();
            Some(selected.join(delim))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::test_support::run_stage;

    #[tokio::test]
    async fn test_cut_fields() {
        let out = run_stage(&Cut::new(":", vec![1, 3]), "a:b:c\nd:e:f\n").await.unwrap();
        assert_eq!(out, "a:c\nd:f\n");
    }

    #[tokio::test]
    async fn test_cut_default_tab() {
        let out = run_stage(&Cut::new("", vec![2]), "x\ty\tz\n").await.unwrap();
        assert_eq!(out, "y\n");
    }

    #[tokio::test]
    async fn test_cut_reorders_and_drops_out_of_range() {
        let out = run_stage(&Cut::new(",", vec![3, 0, 1, 9]), "a,b,c\nshort\n")
            .await
            .unwrap();
        assert_eq!(out, "c,a\nshort\n");
    }
}
