//! Pipeline execution.
//!
//! Runs N stages connected by N−1 bounded links. The first stage reads the
//! caller's source, the last writes the caller's sink, and every stage runs as
//! its own future so a slow stage only stalls its neighbours through
//! backpressure.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::join_all;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadBuf};

use super::pipe_stream::{is_pipe_closed, pipe_link, PipeReader, PipeWriter, PIPE_BUFFER_SIZE};
use crate::config::PipelineConfig;
use crate::parser::{parse_all, ParseError};
use crate::stages::{Stage, StageContext, StageError};

/// Why a pipeline run failed.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A stage failed. `position` is 1-based.
    #[error("stage {position} ({name}): {source}")]
    Stage {
        position: usize,
        name: String,
        #[source]
        source: StageError,
    },

    /// Cancelled while every stage was blocked on I/O.
    #[error("pipeline cancelled")]
    Cancelled,

    /// The deadline passed while every stage was blocked on I/O.
    #[error("pipeline deadline exceeded")]
    DeadlineExceeded,

    /// Copying source to sink failed in a pipeline with no stages.
    #[error("pipeline i/o: {0}")]
    Io(#[from] io::Error),
}

impl PipelineError {
    /// The failing stage's error, if a stage failed.
    pub fn stage_error(&self) -> Option<&StageError> {
        match self {
            PipelineError::Stage { source, .. } => Some(source),
            _ => None,
        }
    }

    /// True when the run stopped because of cancellation or a deadline.
    pub fn is_cancellation(&self) -> bool {
        match self {
            PipelineError::Stage { source, .. } => source.is_cancellation(),
            PipelineError::Cancelled | PipelineError::DeadlineExceeded => true,
            PipelineError::Io(_) => false,
        }
    }
}

/// An ordered list of stages, run as one concurrent pipeline.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    pipe_capacity: usize,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// An empty pipeline; running it copies source to sink.
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            pipe_capacity: PIPE_BUFFER_SIZE,
        }
    }

    /// Build from already constructed stages.
    pub fn from_stages(stages: Vec<Box<dyn Stage>>) -> Self {
        Self {
            stages,
            ..Self::new()
        }
    }

    /// Parse each descriptor and build a pipeline from the results.
    ///
    /// Nothing is constructed if any descriptor fails to parse.
    pub fn from_descriptors<S: AsRef<str>>(descriptors: &[S]) -> Result<Self, ParseError> {
        Ok(Self::from_stages(parse_all(descriptors)?))
    }

    /// Set the per-link capacity in bytes (minimum 1).
    pub fn with_pipe_capacity(mut self, capacity: usize) -> Self {
        self.pipe_capacity = capacity.max(1);
        self
    }

    pub fn with_config(self, config: &PipelineConfig) -> Self {
        self.with_pipe_capacity(config.capacity())
    }

    /// Append a stage.
    pub fn add(&mut self, stage: impl Stage + 'static) -> &mut Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Append an already boxed stage, e.g. one returned by the parser.
    pub fn push(&mut self, stage: Box<dyn Stage>) -> &mut Self {
        self.stages.push(stage);
        self
    }

    pub fn stages(&self) -> &[Box<dyn Stage>] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names in order.
    pub fn names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn pipe_capacity(&self) -> usize {
        self.pipe_capacity
    }

    /// Run every stage concurrently from `source` to `sink`.
    ///
    /// Returns once all stages have finished. The reported error is the first
    /// in stage order, ignoring stages that only stopped because their consumer
    /// closed. Output already written is not rolled back.
    #[tracing::instrument(level = "debug", skip_all, fields(stage_count = self.stages.len()))]
    pub async fn run<R, W>(
        &self,
        ctx: &StageContext,
        source: &mut R,
        sink: &mut W,
    ) -> Result<(), PipelineError>
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        if self.stages.is_empty() {
            return copy_through(ctx, source, sink).await;
        }

        let links = self.stages.len() - 1;
        let mut writers = Vec::with_capacity(links);
        let mut readers = Vec::with_capacity(links);
        for _ in 0..links {
            let (writer, reader) = pipe_link(self.pipe_capacity);
            writers.push(Outbound::Link(writer));
            readers.push(Inbound::Link(reader));
        }

        let inbound = std::iter::once(Inbound::Source(source)).chain(readers);
        let outbound = writers.into_iter().chain(std::iter::once(Outbound::Sink(sink)));

        let tasks = self
            .stages
            .iter()
            .zip(inbound)
            .zip(outbound)
            .map(|((stage, input), output)| run_stage(stage.as_ref(), ctx, input, output));

        tokio::select! {
            biased;
            outcomes = join_all(tasks) => self.first_failure(outcomes),
            err = interrupted(ctx) => {
                tracing::warn!(error = %err, "pipeline interrupted while blocked");
                Err(err)
            }
        }
    }

    /// [`run`](Self::run) with a deadline `timeout` from now.
    pub async fn run_with_timeout<R, W>(
        &self,
        ctx: &StageContext,
        timeout: Duration,
        source: &mut R,
        sink: &mut W,
    ) -> Result<(), PipelineError>
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        let ctx = ctx.clone().with_timeout(timeout);
        self.run(&ctx, source, sink).await
    }

    fn first_failure(&self, outcomes: Vec<Result<(), StageError>>) -> Result<(), PipelineError> {
        let mut first = None;
        for (index, (stage, outcome)) in self.stages.iter().zip(outcomes).enumerate() {
            let position = index + 1;
            match outcome {
                Ok(()) => tracing::debug!(position, stage = stage.name(), "stage finished"),
                Err(err) if err.is_pipe_closed() => {
                    tracing::trace!(position, stage = stage.name(), "stage stopped by closed consumer");
                }
                Err(err) => {
                    tracing::debug!(position, stage = stage.name(), error = %err, "stage failed");
                    if first.is_none() {
                        first = Some(PipelineError::Stage {
                            position,
                            name: stage.name().to_string(),
                            source: err,
                        });
                    }
                }
            }
        }
        first.map_or(Ok(()), Err)
    }
}

impl FromIterator<Box<dyn Stage>> for Pipeline {
    fn from_iter<I: IntoIterator<Item = Box<dyn Stage>>>(iter: I) -> Self {
        Self::from_stages(iter.into_iter().collect())
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.names())
            .field("pipe_capacity", &self.pipe_capacity)
            .finish()
    }
}

/// Run one stage, then close both of its ends.
async fn run_stage(
    stage: &dyn Stage,
    ctx: &StageContext,
    inbound: Inbound<'_>,
    mut outbound: Outbound<'_>,
) -> Result<(), StageError> {
    let mut input = BufReader::new(inbound);
    let mut result = stage.process(ctx, &mut input, &mut outbound).await;

    if result.is_ok() {
        if let Err(err) = outbound.flush().await {
            if !is_pipe_closed(&err) {
                result = Err(StageError::Io(err));
            }
        }
    }

    // Dropping the read half unblocks a producer that is still writing.
    drop(input);
    outbound.close(result.as_ref().err().map(ToString::to_string));
    result
}

/// Byte copy for a pipeline with no stages, still bounded by `ctx`.
async fn copy_through<R, W>(
    ctx: &StageContext,
    source: &mut R,
    sink: &mut W,
) -> Result<(), PipelineError>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    ctx.check().map_err(|err| match err {
        StageError::DeadlineExceeded => PipelineError::DeadlineExceeded,
        _ => PipelineError::Cancelled,
    })?;

    let copy = async {
        tokio::io::copy(source, sink).await?;
        sink.flush().await?;
        Ok::<(), PipelineError>(())
    };

    tokio::select! {
        biased;
        err = interrupted(ctx) => {
            tracing::warn!(error = %err, "copy interrupted");
            Err(err)
        }
        result = copy => result,
    }
}

/// Resolves only if the run is cancelled or its deadline passes.
async fn interrupted(ctx: &StageContext) -> PipelineError {
    match ctx.deadline() {
        Some(deadline) => tokio::select! {
            _ = ctx.token().cancelled() => PipelineError::Cancelled,
            _ = tokio::time::sleep_until(deadline) => PipelineError::DeadlineExceeded,
        },
        None => {
            ctx.token().cancelled().await;
            PipelineError::Cancelled
        }
    }
}

/// Where a stage reads from.
enum Inbound<'a> {
    Source(&'a mut (dyn AsyncRead + Unpin + Send)),
    Link(PipeReader),
}

impl AsyncRead for Inbound<'_> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Inbound::Source(source) => Pin::new(&mut **source).poll_read(cx, buf),
            Inbound::Link(reader) => Pin::new(reader).poll_read(cx, buf),
        }
    }
}

/// Where a stage writes to.
enum Outbound<'a> {
    Sink(&'a mut (dyn AsyncWrite + Unpin + Send)),
    Link(PipeWriter),
}

impl Outbound<'_> {
    fn close(self, error: Option<String>) {
        if let Outbound::Link(writer) = self {
            writer.close_with_error(error);
        }
    }
}

impl AsyncWrite for Outbound<'_> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Outbound::Sink(sink) => Pin::new(&mut **sink).poll_write(cx, buf),
            Outbound::Link(writer) => Pin::new(writer).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Outbound::Sink(sink) => Pin::new(&mut **sink).poll_flush(cx),
            Outbound::Link(writer) => Pin::new(writer).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Outbound::Sink(sink) => Pin::new(&mut **sink).poll_shutdown(cx),
            Outbound::Link(writer) => Pin::new(writer).poll_shutdown(cx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::{Grep, Head, Sort};

    #[tokio::test]
    async fn test_empty_pipeline_copies() {
        let pipeline = Pipeline::new();
        let mut source: &[u8] = b"raw bytes\nno change";
        let mut sink = Vec::new();

        pipeline
            .run(&StageContext::new(), &mut source, &mut sink)
            .await
            .unwrap();

        assert_eq!(sink, b"raw bytes\nno change");
    }

    #[tokio::test]
    async fn test_single_stage() {
        let mut pipeline = Pipeline::new();
        pipeline.add(Sort::new());
        let mut source: &[u8] = b"b\na\n";
        let mut sink = Vec::new();

        pipeline
            .run(&StageContext::new(), &mut source, &mut sink)
            .await
            .unwrap();

        assert_eq!(sink, b"a\nb\n");
    }

    #[tokio::test]
    async fn test_tiny_links_still_deliver() {
        let mut pipeline = Pipeline::new().with_pipe_capacity(1);
        pipeline.add(Grep::new("keep")).add(Head::new(2));
        let mut source: &[u8] = b"keep 1\ndrop\nkeep 2\nkeep 3\n";
        let mut sink = Vec::new();

        pipeline
            .run(&StageContext::new(), &mut source, &mut sink)
            .await
            .unwrap();

        assert_eq!(sink, b"keep 1\nkeep 2\n");
    }

    #[tokio::test]
    async fn test_error_names_position() {
        let mut pipeline = Pipeline::new();
        pipeline.add(Sort::new()).add(Grep::new("("));
        let mut source: &[u8] = b"x\n";
        let mut sink = Vec::new();

        let err = pipeline
            .run(&StageContext::new(), &mut source, &mut sink)
            .await
            .unwrap_err();

        match err {
            PipelineError::Stage { position, ref name, .. } => {
                assert_eq!(position, 2);
                assert_eq!(name, "grep");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_names_and_len() {
        let pipeline = Pipeline::from_descriptors(&["grep -v x", "sort", "head 3"]).unwrap();
        assert_eq!(pipeline.len(), 3);
        assert_eq!(pipeline.names(), vec!["grep-v", "sort", "head"]);
        assert!(!pipeline.is_empty());
    }
}
