//! Streaming body capture.
//!
//! [`CaptureBody`] wraps a body and copies each data frame into a shared
//! [`CaptureBuffer`] as it flows through, without buffering the stream or
//! delaying its consumer. Capture is capped; a payload past the cap is
//! retained truncated and flagged as such.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};
use parking_lot::Mutex;

use crate::types::BoxBody;

/// Shared sink the capture body copies frames into.
#[derive(Debug)]
pub struct CaptureBuffer {
    inner: Mutex<BufferInner>,
    max_bytes: usize,
}

#[derive(Debug)]
struct BufferInner {
    bytes: Vec<u8>,
    truncated: bool,
    complete: bool,
}

impl CaptureBuffer {
    /// Creates a buffer retaining at most `max_bytes` of payload.
    #[must_use]
    pub fn new(max_bytes: usize) -> Self {
        Self {
            inner: Mutex::new(BufferInner {
                bytes: Vec::new(),
                truncated: false,
                complete: false,
            }),
            max_bytes,
        }
    }

    /// Appends one data frame, respecting the retention cap.
    pub fn push(&self, data: &Bytes) {
        let mut inner = self.inner.lock();
        let remaining = self.max_bytes.saturating_sub(inner.bytes.len());
        if data.len() > remaining {
            inner.bytes.extend_from_slice(&data[..remaining]);
            inner.truncated = true;
        } else {
            inner.bytes.extend_from_slice(data);
        }
    }

    /// Marks the stream as finished.
    pub fn mark_complete(&self) {
        self.inner.lock().complete = true;
    }

    /// Whether the stream finished.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.inner.lock().complete
    }

    /// Whether the cap cut the captured payload short.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.inner.lock().truncated
    }

    /// The captured payload rendered as text, lossily for non-UTF-8 bytes.
    #[must_use]
    pub fn snapshot(&self) -> String {
        let inner = self.inner.lock();
        let mut rendered = String::from_utf8_lossy(&inner.bytes).into_owned();
        if inner.truncated {
            rendered.push_str("...[truncated]");
        }
        rendered
    }
}

/// A body that tees its data frames into a [`CaptureBuffer`].
///
/// The optional completion hook runs exactly once, when the inner stream
/// reports its end. A body dropped mid-stream never runs the hook; callers
/// that must observe abandonment hold their own guard.
pub struct CaptureBody {
    inner: BoxBody,
    buffer: Arc<CaptureBuffer>,
    on_complete: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl CaptureBody {
    /// Wraps a body so its frames are copied into `buffer`.
    #[must_use]
    pub fn new(inner: BoxBody, buffer: Arc<CaptureBuffer>) -> Self {
        Self {
            inner,
            buffer,
            on_complete: None,
        }
    }

    /// Runs `hook` once the stream ends.
    #[must_use]
    pub fn on_complete(mut self, hook: impl FnOnce() + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Box::new(hook));
        self
    }
}

impl Body for CaptureBody {
    type Data = Bytes;
    type Error = std::convert::Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.buffer.push(data);
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(None) => {
                this.buffer.mark_complete();
                if let Some(hook) = this.on_complete.take() {
                    hook();
                }
                Poll::Ready(None)
            }
            Poll::Ready(Some(Err(never))) => match never {},
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::full_body;
    use http_body_util::BodyExt;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_capture_does_not_alter_the_stream() {
        let buffer = Arc::new(CaptureBuffer::new(1024));
        let body = CaptureBody::new(full_body("{\"amount\":10}"), buffer.clone());

        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(collected, Bytes::from("{\"amount\":10}"));
        assert_eq!(buffer.snapshot(), "{\"amount\":10}");
        assert!(buffer.is_complete());
    }

    #[tokio::test]
    async fn test_capture_respects_the_cap() {
        let buffer = Arc::new(CaptureBuffer::new(4));
        let body = CaptureBody::new(full_body("abcdefgh"), buffer.clone());

        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(collected, Bytes::from("abcdefgh"));
        assert!(buffer.is_truncated());
        assert_eq!(buffer.snapshot(), "abcd...[truncated]");
    }

    #[tokio::test]
    async fn test_completion_hook_runs_once_at_end() {
        let fired = Arc::new(AtomicBool::new(false));
        let fired_clone = fired.clone();
        let buffer = Arc::new(CaptureBuffer::new(1024));
        let body = CaptureBody::new(full_body("done"), buffer)
            .on_complete(move || fired_clone.store(true, Ordering::SeqCst));

        let _ = body.collect().await.unwrap();
        assert!(fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_dropped_body_leaves_buffer_incomplete() {
        let buffer = Arc::new(CaptureBuffer::new(1024));
        let body = CaptureBody::new(full_body("pending"), buffer.clone());
        drop(body);
        assert!(!buffer.is_complete());
    }
}
