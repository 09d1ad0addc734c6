use std::fmt::Display;
use std::pin::Pin;

use futures::{Stream, StreamExt};

use crate::error::{Result, StreamError};
use crate::frame::{FrameBuffer, SseFrame};

/// Turn a raw byte stream into SSE frames.
///
/// Generic over the chunk type so both `reqwest::Response::bytes_stream()`
/// and in-memory test streams can be fed through the same path. A transport
/// error ends the stream after being yielded once.
pub fn parse_sse_frames<S, B, E>(byte_stream: S) -> Pin<Box<dyn Stream<Item = Result<SseFrame>> + Send>>
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: Display + Send,
{
    Box::pin(async_stream::stream! {
        let mut byte_chunks = Box::pin(byte_stream);
        let mut buffer = FrameBuffer::with_capacity(4096);

        while let Some(chunk_result) = byte_chunks.next().await {
            match chunk_result {
                Ok(bytes) => {
                    buffer.extend(bytes.as_ref());

                    while let Some(frame_result) = buffer.next_frame() {
                        yield frame_result;
                    }
                }
                Err(e) => {
                    yield Err(StreamError::Connection(format!("Stream error: {}", e)));
                    break;
                }
            }
        }

        if !buffer.is_empty() {
            tracing::debug!(leftover = buffer.len(), "Discarding unterminated SSE frame");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunks(parts: Vec<&'static str>) -> impl Stream<Item = std::result::Result<Vec<u8>, std::io::Error>> {
        stream::iter(parts.into_iter().map(|p| Ok(p.as_bytes().to_vec())))
    }

    #[tokio::test]
    async fn test_frames_in_order() {
        let frames: Vec<_> = parse_sse_frames(chunks(vec!["data: a\n\nda", "ta: b\n\n", "data: c\n\n"]))
            .collect()
            .await;

        let data: Vec<String> = frames.into_iter().map(|f| f.unwrap().data).collect();
        assert_eq!(data, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_transport_error_ends_stream() {
        let input = stream::iter(vec![
            Ok(b"data: a\n\n".to_vec()),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
            Ok(b"data: never\n\n".to_vec()),
        ]);

        let frames: Vec<_> = parse_sse_frames(input).collect().await;
        assert_eq!(frames.len(), 2);
        assert!(frames[0].is_ok());
        assert!(matches!(frames[1], Err(StreamError::Connection(_))));
    }
}
