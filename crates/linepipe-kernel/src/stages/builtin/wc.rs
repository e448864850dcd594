//! wc — count lines, words and characters.

use async_trait::async_trait;

use crate::stages::lines::{emit_lines, LineReader};
use crate::stages::{Stage, StageContext, StageError, StageInput, StageOutput};

/// Word count stage. With no count selected, all three are reported.
///
/// Characters are counted as the line's byte length plus one for its newline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Wc {
    pub lines: bool,
    pub words: bool,
    pub chars: bool,
}

impl Wc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(mut self) -> Self {
        self.lines = true;
        self
    }

    pub fn words(mut self) -> Self {
        self.words = true;
        self
    }

    pub fn chars(mut self) -> Self {
        self.chars = true;
        self
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Counts {
    lines: usize,
    words: usize,
    chars: usize,
}

impl Counts {
    fn add(&mut self, line: &str) {
        self.lines += 1;
        self.words += line.split_whitespace().count();
        self.chars += line.len() + 1;
    }

    fn render(&self, wc: &Wc) -> String {
        let all = !(wc.lines || wc.words || wc.chars);
        let mut parts = Vec::with_capacity(3);
        if all || wc.lines {
            parts.push(self.lines.to_string());
        }
        if all || wc.words {
            parts.push(self.words.to_string());
        }
        if all || wc.chars {
            parts.push(self.chars.to_string());
        }
        parts.join("\t")
    }
}

#[async_trait]
impl Stage for Wc {
    fn name(&self) -> &str {
        "wc"
    }

    async fn process(
        &self,
        ctx: &StageContext,
        input: &mut StageInput<'_>,
        output: &mut StageOutput<'_>,
    ) -> Result<(), StageError> {
        let mut counts = Counts::default();
        let mut lines = LineReader::new(input);
        loop {
            ctx.check()?;
            match lines.next_line().await? {
                Some(line) => counts.add(&line),
                None => break,
            }
        }
        emit_lines(ctx, output, [counts.render(self)]).await
    }

    fn is_buffering(&self) -> bool {
        true
    }
}
