//! SSE frame decoder.
//!
//! Turns a stream of raw byte chunks into a stream of [`Event`]s. Text is
//! buffered until a blank line completes a frame; every complete frame in
//! the buffer is emitted before the next chunk is pulled. `\r\n` and lone
//! `\r` line endings are folded to `\n` before framing.

use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::Bytes;
use futures::stream::FusedStream;
use futures::Stream;

use super::frame::{Frame, DELIMITER};
use super::newline::NewlineNormalizer;
use super::utf8::Utf8Decoder;
use crate::error::Result;
use crate::types::Event;

/// Decode an SSE byte stream into events.
pub fn decode<S>(source: S) -> EventStream<S>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    EventStream::new(source)
}

/// Lazy, single-pass stream of decoded events.
///
/// Ends after a `done` event, after the source ends, or after yielding a
/// source error. Once ended it yields nothing and the source has been
/// dropped, which releases the connection.
pub struct EventStream<S> {
    source: Option<S>,
    utf8: Utf8Decoder,
    newlines: NewlineNormalizer,
    /// Decoded text of the current chunk, before newline folding.
    text: String,
    /// Normalized text. Only `buffer[consumed..]` is still unresolved.
    buffer: String,
    /// Start of the first frame not yet emitted.
    consumed: usize,
    /// Offset where the next delimiter search resumes.
    scanned: usize,
    frames: usize,
}

impl<S> EventStream<S>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    /// Wrap a byte stream.
    pub fn new(source: S) -> Self {
        Self {
            source: Some(source),
            utf8: Utf8Decoder::new(),
            newlines: NewlineNormalizer::new(),
            text: String::new(),
            buffer: String::new(),
            consumed: 0,
            scanned: 0,
            frames: 0,
        }
    }

    /// Whether the stream has finished.
    pub fn is_closed(&self) -> bool {
        self.source.is_none()
    }

    /// Drop the source and any unscanned text.
    pub fn close(&mut self) {
        if self.source.take().is_some() {
            tracing::debug!(
                frames = self.frames,
                discarded = self.buffer.len() - self.consumed + self.utf8.pending(),
                "Closing event stream"
            );
        }
        self.text = String::new();
        self.buffer = String::new();
        self.consumed = 0;
        self.scanned = 0;
        self.utf8 = Utf8Decoder::new();
        self.newlines = NewlineNormalizer::new();
    }

    /// Append a chunk of bytes to the unresolved text.
    ///
    /// Emitted frames are compacted away first, once per chunk, so the cost
    /// stays proportional to the bytes received.
    fn push_chunk(&mut self, chunk: &[u8]) {
        if self.consumed > 0 {
            self.buffer.drain(..self.consumed);
            self.scanned -= self.consumed;
            self.consumed = 0;
        }

        self.text.clear();
        self.utf8.decode(chunk, &mut self.text);
        self.newlines.push(&self.text, &mut self.buffer);
    }

    /// Take the next complete frame from the buffer.
    ///
    /// Only text not searched before is scanned, except for one byte of
    /// overlap so a delimiter split across chunks is still found.
    fn next_frame(&mut self) -> Option<Frame> {
        let from = self.scanned.max(self.consumed);
        let Some(pos) = find_delimiter(&self.buffer.as_bytes()[from..]) else {
            self.scanned = self.buffer.len().saturating_sub(1).max(self.consumed);
            return None;
        };

        let end = from + pos;
        let frame = Frame::parse(&self.buffer[self.consumed..end]);
        self.consumed = end + DELIMITER.len();
        self.scanned = self.consumed;
        self.frames += 1;
        Some(frame)
    }

    /// Next event already available in the buffer.
    fn next_buffered_event(&mut self) -> Option<Event> {
        while let Some(frame) = self.next_frame() {
            tracing::trace!(?frame, "Decoded frame");
            if let Some(event) = frame.into_event() {
                return Some(event);
            }
        }
        None
    }
}

fn find_delimiter(haystack: &[u8]) -> Option<usize> {
    haystack
        .windows(DELIMITER.len())
        .position(|window| window == DELIMITER.as_bytes())
}

impl<S> Stream for EventStream<S>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    type Item = Result<Event>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if this.source.is_none() {
                return Poll::Ready(None);
            }

            if let Some(event) = this.next_buffered_event() {
                if event.is_terminal() {
                    tracing::debug!("Received terminal event");
                    this.close();
                }
                return Poll::Ready(Some(Ok(event)));
            }

            let Some(source) = this.source.as_mut() else {
                return Poll::Ready(None);
            };

            match ready!(Pin::new(source).poll_next(cx)) {
                Some(Ok(chunk)) => {
                    this.push_chunk(&chunk);
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Event stream interrupted");
                    this.close();
                    return Poll::Ready(Some(Err(e)));
                }
                None => {
                    // A trailing `\r` can complete one last frame.
                    let last = if this.newlines.finish(&mut this.buffer) {
                        this.next_buffered_event()
                    } else {
                        None
                    };
                    this.close();
                    return Poll::Ready(last.map(Ok));
                }
            }
        }
    }
}

impl<S> FusedStream for EventStream<S>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    fn is_terminated(&self) -> bool {
        self.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::EventKind;
    use futures::stream;
    use futures::StreamExt;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Sets its flag when dropped.
    struct Guard(Arc<AtomicBool>);

    impl Drop for Guard {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    fn chunks(parts: &[&[u8]]) -> stream::Iter<std::vec::IntoIter<Result<Bytes>>> {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::copy_from_slice(p)))
                .collect::<Vec<_>>(),
        )
    }

    async fn collect<S>(source: S) -> Vec<Event>
    where
        S: Stream<Item = Result<Bytes>> + Unpin,
    {
        decode(source)
            .map(|event| event.unwrap())
            .collect::<Vec<_>>()
            .await
    }

    fn summarize(events: &[Event]) -> Vec<serde_json::Value> {
        events.iter().map(|e| json!(e)).collect()
    }

    const TRANSCRIPT: &str = concat!(
        "event: message.start\ndata: {\"id\":\"m1\"}\n\n",
        "event: content\ndata: {\"text\":\"héllo 🦀\"}\n\n",
        ": keepalive\n\n",
        "event: tool.start\ndata: {\"tool\":\"search\"}\n\n",
        "event: tool.complete\n\n",
        "data: {\"text\":\"über\"}\n\n",
        "event: message.complete\ndata: {\"text\":\"a\"}\ndata: {\"bad\n\n",
        "event: done\ndata: {}\n\n",
    );

    #[tokio::test]
    async fn test_split_json_across_chunks() {
        let events = collect(chunks(&[
            b"event: content\ndata: {\"te",
            b"xt\":\"chunk1\"}\n\nevent: done\ndata: {}\n\n",
        ]))
        .await;

        assert_eq!(
            summarize(&events),
            vec![
                json!({"type": "content", "data": {"text": "chunk1"}}),
                json!({"type": "done", "data": {}}),
            ]
        );
    }

    #[tokio::test]
    async fn test_output_independent_of_chunking() {
        let bytes = TRANSCRIPT.as_bytes();
        let expected = summarize(&collect(chunks(&[bytes])).await);
        assert_eq!(expected.len(), 7);

        for split in 1..bytes.len() {
            let events = collect(chunks(&[&bytes[..split], &bytes[split..]])).await;
            assert_eq!(summarize(&events), expected, "split at byte {}", split);
        }

        let one_at_a_time = bytes.chunks(1).collect::<Vec<_>>();
        let events = collect(chunks(&one_at_a_time)).await;
        assert_eq!(summarize(&events), expected);

        let three_at_a_time = bytes.chunks(3).collect::<Vec<_>>();
        let events = collect(chunks(&three_at_a_time)).await;
        assert_eq!(summarize(&events), expected);
    }

    #[tokio::test]
    async fn test_crlf_and_cr_line_endings_match_lf() {
        let expected = summarize(&collect(chunks(&[TRANSCRIPT.as_bytes()])).await);

        for transcript in [TRANSCRIPT.replace('\n', "\r\n"), TRANSCRIPT.replace('\n', "\r")] {
            let bytes = transcript.as_bytes();
            let events = collect(chunks(&[bytes])).await;
            assert_eq!(summarize(&events), expected);

            for split in 1..bytes.len() {
                let events = collect(chunks(&[&bytes[..split], &bytes[split..]])).await;
                assert_eq!(summarize(&events), expected, "split at byte {}", split);
            }

            let one_at_a_time = bytes.chunks(1).collect::<Vec<_>>();
            let events = collect(chunks(&one_at_a_time)).await;
            assert_eq!(summarize(&events), expected);
        }
    }

    #[tokio::test]
    async fn test_crlf_delimiter_completes_frame() {
        let events = collect(chunks(&[
            b"event: content\r\ndata: {\"text\":\"x\"}\r\n\r\n",
            b"event: done\r\ndata: {}\r\n\r\n",
        ]))
        .await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].text(), Some("x"));
        assert_eq!(events[1].kind, EventKind::Done);
    }

    #[tokio::test]
    async fn test_large_frame_in_small_chunks() {
        let text = "x".repeat(4 * 1024 * 1024);
        let body = format!(
            "event: content\ndata: {{\"text\":\"{}\"}}\n\nevent: done\ndata: {{}}\n\n",
            text
        );
        let small = body.as_bytes().chunks(256).collect::<Vec<_>>();

        let started = std::time::Instant::now();
        let events = collect(chunks(&small)).await;
        let elapsed = started.elapsed();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].text().map(str::len), Some(text.len()));
        assert_eq!(events[1].kind, EventKind::Done);
        assert!(
            elapsed < std::time::Duration::from_secs(10),
            "decoding took {:?}",
            elapsed
        );
    }

    #[tokio::test]
    async fn test_many_frames_in_one_large_chunk() {
        let body = "data: {\"text\":\"a\"}\n\n".repeat(100_000);

        let started = std::time::Instant::now();
        let events = collect(chunks(&[body.as_bytes()])).await;
        let elapsed = started.elapsed();

        assert_eq!(events.len(), 100_000);
        assert!(
            elapsed < std::time::Duration::from_secs(10),
            "decoding took {:?}",
            elapsed
        );
    }

    #[tokio::test]
    async fn test_multiple_frames_in_one_chunk() {
        let events = collect(chunks(&[
            b"data: {\"text\":\"a\"}\n\ndata: {\"text\":\"b\"}\n\ndata: {\"text\":\"c\"}\n\n",
        ]))
        .await;
        let texts: Vec<_> = events.iter().filter_map(Event::text).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_frames_emitted_before_next_chunk_is_pulled() {
        let source = stream::iter(vec![
            Ok(Bytes::from_static(b"data: {\"text\":\"a\"}\n\ndata: {\"text\":\"b\"}\n\n")),
            Err(Error::TransportInterrupted("connection reset".into())),
        ]);
        let mut events = decode(source);

        assert_eq!(events.next().await.unwrap().unwrap().text(), Some("a"));
        assert_eq!(events.next().await.unwrap().unwrap().text(), Some("b"));
        assert!(matches!(
            events.next().await,
            Some(Err(Error::TransportInterrupted(_)))
        ));
    }

    #[tokio::test]
    async fn test_stops_after_done() {
        let mut events = decode(chunks(&[
            b"event: content\ndata: {\"text\":\"a\"}\n\nevent: done\ndata: {}\n\nevent: content\ndata: {\"text\":\"late\"}\n\n",
            b"event: content\ndata: {\"text\":\"later\"}\n\n",
        ]));

        assert_eq!(events.next().await.unwrap().unwrap().kind, EventKind::Content);
        assert_eq!(events.next().await.unwrap().unwrap().kind, EventKind::Done);
        assert!(events.is_terminated());
        assert!(events.next().await.is_none());
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn test_graceful_end_without_done() {
        let mut events = decode(chunks(&[
            b"event: content\ndata: {\"text\":\"a\"}\n\n",
            b"event: tool.start\ndata: {}\n\nevent: content\ndata: {\"text\":\"trailing",
        ]));

        let mut count = 0;
        while let Some(event) = events.next().await {
            event.unwrap();
            count += 1;
        }
        assert_eq!(count, 2);
        assert!(events.is_closed());
    }

    #[tokio::test]
    async fn test_delimiter_split_across_chunks() {
        let events = collect(chunks(&[
            b"event: content\ndata: {\"text\":\"x\"}\n",
            b"\nevent: done\n",
            b"\n",
        ]))
        .await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].text(), Some("x"));
        assert_eq!(events[1].kind, EventKind::Done);
        assert!(events[1].data.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payload_does_not_abort() {
        let events = collect(chunks(&[
            b"event: content\ndata: not-json-{{{\n\nevent: content\ndata: {\"text\":\"ok\"}\n\n",
        ]))
        .await;
        assert_eq!(events.len(), 2);
        assert_eq!(json!(events[0].data), json!({"raw": "not-json-{{{"}));
        assert_eq!(events[1].text(), Some("ok"));
    }

    #[tokio::test]
    async fn test_transport_error_ends_stream() {
        let source = stream::iter(vec![
            Ok(Bytes::from_static(b"event: content\ndata: {\"text\":\"partial\"")),
            Err(Error::TransportInterrupted("eof".into())),
            Ok(Bytes::from_static(b"}\n\n")),
        ]);
        let mut events = decode(source);

        let err = events.next().await.unwrap().unwrap_err();
        assert!(err.is_transport());
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn test_dropping_stream_releases_source() {
        let released = Arc::new(AtomicBool::new(false));
        let guard = Guard(released.clone());
        let source = stream::iter(vec![Ok(Bytes::from_static(
            b"data: {\"text\":\"a\"}\n\ndata: {\"text\":\"b\"}\n\n",
        ))])
        .map(move |chunk| {
            let _keep = &guard;
            chunk
        });

        let mut events = decode(source);
        assert_eq!(events.next().await.unwrap().unwrap().text(), Some("a"));
        assert!(!released.load(Ordering::SeqCst));
        drop(events);
        assert!(released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_done_releases_source_immediately() {
        let released = Arc::new(AtomicBool::new(false));
        let guard = Guard(released.clone());
        let source = stream::iter(vec![Ok(Bytes::from_static(b"event: done\n\n"))])
            .chain(stream::pending())
            .map(move |chunk| {
                let _keep = &guard;
                chunk
            });

        let mut events = decode(Box::pin(source));
        assert_eq!(events.next().await.unwrap().unwrap().kind, EventKind::Done);
        assert!(released.load(Ordering::SeqCst));
        assert!(events.next().await.is_none());
    }
}
