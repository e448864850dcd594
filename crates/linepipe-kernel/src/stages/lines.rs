//! Line framing shared by the builtin stages.
//!
//! A line is everything up to `\n`, with the `\n` and one trailing `\r`
//! removed. Invalid UTF-8 is replaced rather than rejected. Every line written
//! gets a `\n`, including a final line that arrived without one.

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt};

use super::{StageContext, StageError, StageInput, StageOutput};
use crate::scheduler::pipe_stream::is_pipe_closed;

/// Reads one line at a time, reusing a single buffer.
pub(crate) struct LineReader<'r, 'a> {
    input: &'r mut StageInput<'a>,
    buf: Vec<u8>,
}

impl<'r, 'a> LineReader<'r, 'a> {
    pub(crate) fn new(input: &'r mut StageInput<'a>) -> Self {
        Self {
            input,
            buf: Vec::new(),
        }
    }

    pub(crate) async fn next_line(&mut self) -> io::Result<Option<String>> {
        self.buf.clear();
        if self.input.read_until(b'\n', &mut self.buf).await? == 0 {
            return Ok(None);
        }
        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
        }
        if self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }
        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }
}

/// Whether the consumer is still taking lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Closed,
}

/// Write `line` plus a newline. A consumer that closed early yields `Flow::Closed`.
pub(crate) async fn write_line(output: &mut StageOutput<'_>, line: &str) -> Result<Flow, StageError> {
    let written = async {
        output.write_all(line.as_bytes()).await?;
        output.write_all(b"\n").await
    }
    .await;

    match written {
        Ok(()) => Ok(Flow::Continue),
        Err(err) if is_pipe_closed(&err) => {
            tracing::trace!("downstream closed, stopping early");
            Ok(Flow::Closed)
        }
        Err(err) => Err(StageError::Io(err)),
    }
}

/// Drive a per-line transform: `Some` lines are written, `None` lines dropped.
///
/// Input is always read to the end unless the consumer closes, so a transform
/// that stops emitting still drains its producer.
pub(crate) async fn map_lines<F>(
    ctx: &StageContext,
    input: &mut StageInput<'_>,
    output: &mut StageOutput<'_>,
    mut transform: F,
) -> Result<(), StageError>
where
    F: FnMut(String) -> Option<String> + Send,
{
    let mut lines = LineReader::new(input);
    loop {
        ctx.check()?;
        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };
        if let Some(out) = transform(line) {
            if write_line(output, &out).await? == Flow::Closed {
                return Ok(());
            }
        }
    }
}

/// Materialize the whole input.
pub(crate) async fn read_all_lines(
    ctx: &StageContext,
    input: &mut StageInput<'_>,
) -> Result<Vec<String>, StageError> {
    let mut lines = LineReader::new(input);
    let mut all = Vec::new();
    loop {
        ctx.check()?;
        match lines.next_line().await? {
            Some(line) => all.push(line),
            None => return Ok(all),
        }
    }
}

/// Write materialized lines, polling cancellation between them.
pub(crate) async fn emit_lines<I, S>(
    ctx: &StageContext,
    output: &mut StageOutput<'_>,
    lines: I,
) -> Result<(), StageError>
where
    I: IntoIterator<Item = S>,
    I::IntoIter: Send,
    S: AsRef<str> + Send,
{
    for line in lines {
        ctx.check()?;
        if write_line(output, line.as_ref()).await? == Flow::Closed {
            break;
        }
    }
    Ok(())
}
