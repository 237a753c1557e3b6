use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::Client;

use crate::error::ChatServiceError;
use crate::models::{ChatRequest, StreamChunk};

/// Client for an OpenAI-compatible chat-completions endpoint.
pub struct ChatClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ChatClient {
    pub fn new(client: Client, base_url: &str, api_key: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Starts a streamed completion. Deltas arrive through the returned
    /// stream in order; the caller is the single consumer.
    pub async fn stream_chat(
        &self,
        request: &ChatRequest,
    ) -> Result<CompletionStream, ChatServiceError> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(ChatServiceError::Api { status, body });
        }

        Ok(CompletionStream::new(
            response
                .bytes_stream()
                .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
                .boxed(),
        ))
    }

    /// Probes the upstream model listing as a liveness signal.
    pub async fn health_check(&self) -> Result<bool, ChatServiceError> {
        let url = format!("{}/models", self.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        Ok(response.status().is_success())
    }
}

/// Incremental content deltas from one streamed completion.
///
/// Bytes are buffered until a complete `data:` event is available, so UTF-8
/// sequences split across network chunks reassemble before decoding.
pub struct CompletionStream {
    bytes: BoxStream<'static, Result<Vec<u8>, reqwest::Error>>,
    buffer: Vec<u8>,
    done: bool,
}

enum SseEvent {
    Delta(String),
    Done,
    Ignored,
}

impl CompletionStream {
    fn new(bytes: BoxStream<'static, Result<Vec<u8>, reqwest::Error>>) -> Self {
        Self {
            bytes,
            buffer: Vec::new(),
            done: false,
        }
    }

    /// Returns the next content delta, or `None` once the stream has ended.
    ///
    /// A transport failure mid-stream ends the stream rather than erroring;
    /// whatever text the caller accumulated so far stands as the final
    /// answer. Only a malformed event is surfaced as an error.
    pub async fn next_delta(&mut self) -> Result<Option<String>, ChatServiceError> {
        loop {
            if self.done {
                return Ok(None);
            }

            // drain complete events already buffered before reading more
            while let Some(pos) = self.buffer.windows(2).position(|w| w == b"\n\n") {
                let event_bytes: Vec<u8> = self.buffer.drain(..pos + 2).collect();
                let event = String::from_utf8_lossy(&event_bytes);
                match parse_event(event.trim())? {
                    SseEvent::Delta(content) => return Ok(Some(content)),
                    SseEvent::Done => {
                        self.done = true;
                        return Ok(None);
                    }
                    SseEvent::Ignored => {}
                }
            }

            match self.bytes.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    tracing::warn!("completion stream ended early: {}", e);
                    self.done = true;
                    return Ok(None);
                }
                None => {
                    self.done = true;
                    return Ok(None);
                }
            }
        }
    }
}

/// Parses one SSE event body. Comment/empty events are ignored; a delta
/// without a content field yields an empty string.
fn parse_event(event: &str) -> Result<SseEvent, ChatServiceError> {
    let Some(data) = event.strip_prefix("data:") else {
        return Ok(SseEvent::Ignored);
    };

    let data = data.trim();
    if data == "[DONE]" {
        return Ok(SseEvent::Done);
    }

    let chunk: StreamChunk = serde_json::from_str(data)?;
    let content = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .unwrap_or_default();
    Ok(SseEvent::Delta(content))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_of(chunks: Vec<&[u8]>) -> CompletionStream {
        let owned: Vec<Result<Vec<u8>, reqwest::Error>> =
            chunks.into_iter().map(|c| Ok(c.to_vec())).collect();
        CompletionStream::new(futures::stream::iter(owned).boxed())
    }

    fn delta_event(content: &str) -> String {
        format!(
            "data: {{\"choices\":[{{\"delta\":{{\"content\":{}}},\"finish_reason\":null}}]}}\n\n",
            serde_json::to_string(content).unwrap()
        )
    }

    #[test]
    fn content_delta_parses() {
        let event = delta_event("안녕");
        match parse_event(event.trim()).unwrap() {
            SseEvent::Delta(content) => assert_eq!(content, "안녕"),
            _ => panic!("expected a delta"),
        }
    }

    #[test]
    fn missing_content_defaults_to_empty() {
        let event = r#"data: {"choices":[{"delta":{"role":"assistant"},"finish_reason":null}]}"#;
        match parse_event(event).unwrap() {
            SseEvent::Delta(content) => assert_eq!(content, ""),
            _ => panic!("expected a delta"),
        }
    }

    #[test]
    fn done_marker_terminates() {
        assert!(matches!(parse_event("data: [DONE]").unwrap(), SseEvent::Done));
    }

    #[test]
    fn comment_events_are_ignored() {
        assert!(matches!(parse_event(": keepalive").unwrap(), SseEvent::Ignored));
        assert!(matches!(parse_event("").unwrap(), SseEvent::Ignored));
    }

    #[test]
    fn malformed_event_is_an_error() {
        assert!(parse_event("data: {not json").is_err());
    }

    #[test]
    fn deltas_arrive_in_order_until_done() {
        let body = format!("{}{}data: [DONE]\n\n", delta_event("수학"), delta_event(" 교육과정"));
        let mut stream = stream_of(vec![body.as_bytes()]);

        tokio_test::block_on(async {
            assert_eq!(stream.next_delta().await.unwrap().as_deref(), Some("수학"));
            assert_eq!(
                stream.next_delta().await.unwrap().as_deref(),
                Some(" 교육과정")
            );
            assert_eq!(stream.next_delta().await.unwrap(), None);
            // the stream stays terminal after [DONE]
            assert_eq!(stream.next_delta().await.unwrap(), None);
        });
    }

    #[test]
    fn events_split_across_chunks_reassemble() {
        let body = delta_event("도움이 필요하신가요");
        let bytes = body.as_bytes();
        // split inside a multibyte character to exercise byte buffering
        let mid = bytes.len() / 2;
        let mut stream = stream_of(vec![&bytes[..mid], &bytes[mid..]]);

        tokio_test::block_on(async {
            assert_eq!(
                stream.next_delta().await.unwrap().as_deref(),
                Some("도움이 필요하신가요")
            );
            assert_eq!(stream.next_delta().await.unwrap(), None);
        });
    }

    #[test]
    fn truncated_stream_ends_without_error() {
        // no [DONE], stream just stops mid-turn
        let mut stream = stream_of(vec![delta_event("부분 응답").as_bytes()]);

        tokio_test::block_on(async {
            assert_eq!(
                stream.next_delta().await.unwrap().as_deref(),
                Some("부분 응답")
            );
            assert_eq!(stream.next_delta().await.unwrap(), None);
        });
    }
}
