//! Bounded byte link between two pipeline stages.
//!
//! A link has a write half owned by the producing stage and a read half owned
//! by the consuming stage. The writer blocks when the buffer is full, the reader
//! blocks when it is empty, so a slow consumer pushes back on every producer
//! upstream of it.
//!
//! ```text
//!   PipeWriter ──▶ [VecDeque<u8>, bounded] ──▶ PipeReader
//!                  ├── writer waits when full (backpressure)
//!                  ├── reader waits when empty
//!                  ├── close writer       → EOF once drained
//!                  ├── close writer + err → reader sees the error once drained
//!                  └── close reader       → writer fails with PipeClosed
//! ```
//!
//! Closed flags are `AtomicBool` so `Drop` never needs the lock to make progress.
//! Wakers are stored under the lock to prevent lost wakeups.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Default link capacity (matches the Linux kernel pipe default).
pub const PIPE_BUFFER_SIZE: usize = 64 * 1024;

/// Payload of the error a writer sees once the read half is gone.
///
/// This is the only error treated as an expected early closure.
/// Use [`is_pipe_closed`] to test for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("pipe already closed")]
pub struct PipeClosed;

/// Payload of the error a reader sees after its producer closed with a failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("upstream stage failed: {0}")]
pub struct UpstreamFailed(pub String);

/// True only for the write error produced by a link whose reader closed.
///
/// An OS-level `BrokenPipe` (stdout closed, socket reset) does not match.
pub fn is_pipe_closed(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::BrokenPipe
        && err.get_ref().is_some_and(|inner| inner.is::<PipeClosed>())
}

fn pipe_closed() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, PipeClosed)
}

struct LinkBuffer {
    buffer: VecDeque<u8>,
    capacity: usize,
    /// Set by `close_with_error`; returned to the reader after the buffer drains.
    close_error: Option<String>,
    reader_waker: Option<Waker>,
    writer_waker: Option<Waker>,
}

struct LinkShared {
    buf: Mutex<LinkBuffer>,
    writer_closed: AtomicBool,
    reader_closed: AtomicBool,
}

impl LinkShared {
    fn lock(&self) -> std::sync::MutexGuard<'_, LinkBuffer> {
        self.buf.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Write half of a link.
pub struct PipeWriter {
    shared: Arc<LinkShared>,
}

/// Read half of a link.
pub struct PipeReader {
    shared: Arc<LinkShared>,
}

/// Create a link whose buffer holds at most `capacity` bytes (minimum 1).
pub fn pipe_link(capacity: usize) -> (PipeWriter, PipeReader) {
    let capacity = capacity.max(1);
    let shared = Arc::new(LinkShared {
        buf: Mutex::new(LinkBuffer {
            buffer: VecDeque::with_capacity(capacity.min(8192)),
            capacity,
            close_error: None,
            reader_waker: None,
            writer_waker: None,
        }),
        writer_closed: AtomicBool::new(false),
        reader_closed: AtomicBool::new(false),
    });

    (
        PipeWriter {
            shared: shared.clone(),
        },
        PipeReader { shared },
    )
}

impl PipeWriter {
    /// Close the write half, attaching the producer's failure if there was one.
    ///
    /// Consuming `self` means a link is closed exactly once.
    pub fn close_with_error(self, error: Option<String>) {
        let mut inner = self.shared.lock();
        if error.is_some() {
            inner.close_error = error;
        }
        self.shared.writer_closed.store(true, Ordering::Release);
        if let Some(waker) = inner.reader_waker.take() {
            waker.wake();
        }
        // Drop repeats the flag store and wake; both are idempotent.
    }

    fn poll_write_impl(&self, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        if buf.is_empty() {
            return Poll::Ready(Ok(0));
        }

        if self.shared.reader_closed.load(Ordering::Acquire) {
            return Poll::Ready(Err(pipe_closed()));
        }

        let mut inner = self.shared.lock();

        // The reader may have closed between the check above and taking the lock.
        if self.shared.reader_closed.load(Ordering::Acquire) {
            return Poll::Ready(Err(pipe_closed()));
        }

        let available = inner.capacity.saturating_sub(inner.buffer.len());
        if available == 0 {
            inner.writer_waker = Some(cx.waker().clone());
            return Poll::Pending;
        }

        let to_write = buf.len().min(available);
        inner.buffer.extend(&buf[..to_write]);
        if let Some(waker) = inner.reader_waker.take() {
            waker.wake();
        }
        Poll::Ready(Ok(to_write))
    }
}

impl AsyncWrite for PipeWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.poll_write_impl(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.shared.writer_closed.store(true, Ordering::Release);
        let mut inner = self.shared.lock();
        if let Some(waker) = inner.reader_waker.take() {
            waker.wake();
        }
        Poll::Ready(Ok(()))
    }
}

impl Drop for PipeWriter {
    fn drop(&mut self) {
        self.shared.writer_closed.store(true, Ordering::Release);
        if let Ok(mut inner) = self.shared.buf.lock() {
            if let Some(waker) = inner.reader_waker.take() {
                waker.wake();
            }
        }
    }
}

impl PipeReader {
    /// Close the read half. A producer still writing gets [`PipeClosed`].
    pub fn close(self) {}
}

impl AsyncRead for PipeReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let mut inner = self.shared.lock();

        if !inner.buffer.is_empty() {
            let to_read = buf.remaining().min(inner.buffer.len());
            let (front, back) = inner.buffer.as_slices();

            if to_read <= front.len() {
                buf.put_slice(&front[..to_read]);
            } else {
                buf.put_slice(front);
                buf.put_slice(&back[..to_read - front.len()]);
            }

            inner.buffer.drain(..to_read);
            if let Some(waker) = inner.writer_waker.take() {
                waker.wake();
            }
            return Poll::Ready(Ok(()));
        }

        if self.shared.writer_closed.load(Ordering::Acquire) {
            return match &inner.close_error {
                Some(message) => Poll::Ready(Err(io::Error::other(UpstreamFailed(
                    message.clone(),
                )))),
                None => Poll::Ready(Ok(())),
            };
        }

        inner.reader_waker = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl Drop for PipeReader {
    fn drop(&mut self) {
        self.shared.reader_closed.store(true, Ordering::Release);
        if let Ok(mut inner) = self.shared.buf.lock() {
            if let Some(waker) = inner.writer_waker.take() {
                waker.wake();
            }
        }
    }
}

impl std::fmt::Debug for PipeWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeWriter").finish_non_exhaustive()
    }
}

impl std::fmt::Debug for PipeReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeReader").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_write_then_read() {
        let (mut writer, mut reader) = pipe_link(1024);

        writer.write_all(b"hello").await.unwrap();
        writer.close_with_error(None);

        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"hello");
    }

    #[tokio::test]
    async fn test_small_buffer_carries_large_payload() {
        let (mut writer, mut reader) = pipe_link(32);

        let data: Vec<u8> = (0..10_000).map(|i| (i % 251) as u8).collect();
        let expected = data.clone();

        let write_task = tokio::spawn(async move {
            writer.write_all(&data).await.unwrap();
        });

        let mut output = Vec::new();
        reader.read_to_end(&mut output).await.unwrap();
        write_task.await.unwrap();
        assert_eq!(output, expected);
    }

    #[tokio::test]
    async fn test_writer_waits_while_full() {
        let (mut writer, mut reader) = pipe_link(4);

        writer.write_all(b"abcd").await.unwrap();
        let blocked =
            tokio::time::timeout(Duration::from_millis(20), writer.write_all(b"e")).await;
        assert!(blocked.is_err(), "write into a full link should wait");

        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf).await.unwrap();
        writer.write_all(b"e").await.unwrap();
    }

    #[tokio::test]
    async fn test_close_with_error_reaches_reader_after_data() {
        let (mut writer, mut reader) = pipe_link(1024);

        writer.write_all(b"partial\n").await.unwrap();
        writer.close_with_error(Some("grep: bad pattern".to_string()));

        let mut buf = [0u8; 64];
        let n = reader.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"partial\n");

        let err = reader.read(&mut buf).await.unwrap_err();
        let upstream = err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<UpstreamFailed>())
            .expect("upstream payload");
        assert_eq!(upstream.0, "grep: bad pattern");
    }

    #[tokio::test]
    async fn test_plain_close_is_eof() {
        let (writer, mut reader) = pipe_link(16);
        writer.close_with_error(None);

        let mut buf = [0u8; 8];
        assert_eq!(reader.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reader_close_fails_writer_with_pipe_closed() {
        let (mut writer, reader) = pipe_link(1024);
        reader.close();

        let err = writer.write_all(b"data").await.unwrap_err();
        assert!(is_pipe_closed(&err));
    }

    #[test]
    fn test_os_broken_pipe_is_not_pipe_closed() {
        let err = io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed");
        assert!(!is_pipe_closed(&err));
        assert!(!is_pipe_closed(&io::Error::other(PipeClosed)));
    }

    /// Reader goes away while the writer is parked on a full buffer.
    #[tokio::test]
    async fn test_reader_close_wakes_blocked_writer() {
        let (mut writer, reader) = pipe_link(8);

        let write_task = tokio::spawn(async move {
            let data = vec![0u8; 1024];
            writer.write_all(&data).await
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        reader.close();

        let result = tokio::time::timeout(Duration::from_secs(2), write_task)
            .await
            .expect("writer hung after reader closed")
            .unwrap();
        assert!(is_pipe_closed(&result.unwrap_err()));
    }

    #[tokio::test]
    async fn test_writer_drop_wakes_waiting_reader() {
        let (writer, mut reader) = pipe_link(1024);

        let read_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf).await.map(|_| buf)
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(writer);

        let result = tokio::time::timeout(Duration::from_secs(2), read_task)
            .await
            .expect("reader hung after writer dropped");
        assert!(result.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_lost_wakeups_under_contention() {
        let result = tokio::time::timeout(Duration::from_secs(5), async {
            let (mut writer, mut reader) = pipe_link(16);

            let write_task = tokio::spawn(async move {
                let chunk = [0xABu8; 37];
                for _ in 0..2000 {
                    writer.write_all(&chunk).await.unwrap();
                }
            });

            let mut total = 0usize;
            let mut buf = [0u8; 128];
            loop {
                match reader.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => total += n,
                    Err(e) => panic!("unexpected read error: {e}"),
                }
            }

            write_task.await.unwrap();
            total
        })
        .await;

        assert_eq!(result.expect("link stress test timed out"), 37 * 2000);
    }
}
