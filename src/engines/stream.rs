/*!
 * Streaming response parsers.
 *
 * Generative engines answer with server-sent events. The HTTP body is first
 * cut into lines, then a provider-specific parser turns lines into text
 * deltas. Every parser is lazy and yields control at each line, so a
 * cancelled job stops reading promptly.
 */

use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde_json::Value;

use crate::errors::EngineError;

/// Incremental translation output
pub type TextStream = BoxStream<'static, Result<String, EngineError>>;

/// Line stream consumed by the parsers
pub type LineStream = BoxStream<'static, Result<String, EngineError>>;

/// Split a byte stream into text lines, tolerating chunk boundaries anywhere
pub fn lines<S, E>(bytes: S) -> LineStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = (Box::pin(bytes), Vec::<u8>::new(), false);
    stream::unfold(state, |(mut bytes, mut buffer, mut finished)| async move {
        loop {
            if let Some(position) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=position).collect();
                let line = String::from_utf8_lossy(&line).trim_end_matches(['\r', '\n']).to_string();
                return Some((Ok(line), (bytes, buffer, finished)));
            }
            if finished {
                if buffer.is_empty() {
                    return None;
                }
                let line = String::from_utf8_lossy(&buffer).trim_end_matches('\r').to_string();
                buffer.clear();
                return Some((Ok(line), (bytes, buffer, finished)));
            }
            match bytes.next().await {
                Some(Ok(chunk)) => buffer.extend_from_slice(&chunk),
                Some(Err(error)) => {
                    finished = true;
                    buffer.clear();
                    return Some((
                        Err(EngineError::RequestFailed(error.to_string())),
                        (bytes, buffer, finished),
                    ));
                }
                None => finished = true,
            }
        }
    })
    .boxed()
}

/// What a single event line means to a parser
#[derive(Debug, PartialEq)]
pub enum Frame {
    Delta(String),
    Skip,
    Done,
    Error(String),
}

/// Drive `parse` over `lines` until it reports `Done` or input ends
pub fn parse_frames<F>(lines: LineStream, parse: F) -> TextStream
where
    F: Fn(&str) -> Frame + Send + Sync + 'static,
{
    stream::unfold((lines, parse, false), |(mut lines, parse, done)| async move {
        if done {
            return None;
        }
        loop {
            let line = match lines.next().await? {
                Ok(line) => line,
                Err(error) => return Some((Err(error), (lines, parse, true))),
            };
            match parse(&line) {
                Frame::Delta(text) => return Some((Ok(text), (lines, parse, false))),
                Frame::Skip => continue,
                Frame::Done => return None,
                Frame::Error(message) => {
                    return Some((Err(EngineError::UnexpectedResult(message)), (lines, parse, true)));
                }
            }
        }
    })
    .boxed()
}

/// Payload of a `data:` line, if any
fn data_payload(line: &str) -> Option<&str> {
    line.trim().strip_prefix("data:").map(str::trim)
}

/// ChatGPT-family frames: `data: {"choices":[{"delta":{"content":"X"}}]}` until `data: [DONE]`
pub fn chatgpt_frame(line: &str) -> Frame {
    let Some(payload) = data_payload(line) else {
        return Frame::Skip;
    };
    if payload == "[DONE]" {
        return Frame::Done;
    }
    let Ok(value) = serde_json::from_str::<Value>(payload) else {
        return Frame::Skip;
    };
    if let Some(error) = value.get("error") {
        return Frame::Error(error_message(error));
    }
    let choice = &value["choices"][0];
    match choice["delta"]["content"].as_str() {
        Some(text) if !text.is_empty() => Frame::Delta(text.to_string()),
        _ if choice["finish_reason"].as_str().is_some_and(|r| r == "length") => {
            Frame::Error("Response truncated by the token limit".to_string())
        }
        _ => Frame::Skip,
    }
}

/// Claude events: text comes from `content_block_delta`, `message_stop` ends the stream
pub fn claude_frame(line: &str) -> Frame {
    let Some(payload) = data_payload(line) else {
        return Frame::Skip;
    };
    let Ok(value) = serde_json::from_str::<Value>(payload) else {
        return Frame::Skip;
    };
    match value["type"].as_str().unwrap_or_default() {
        "content_block_delta" => match value["delta"]["text"].as_str() {
            Some(text) if !text.is_empty() => Frame::Delta(text.to_string()),
            _ => Frame::Skip,
        },
        "message_stop" => Frame::Done,
        "error" => Frame::Error(error_message(&value["error"])),
        // ping, message_start, content_block_start, content_block_stop, message_delta
        _ => Frame::Skip,
    }
}

/// Gemini `alt=sse` frames; the stream simply ends after the last candidate
pub fn gemini_frame(line: &str) -> Frame {
    let Some(payload) = data_payload(line) else {
        return Frame::Skip;
    };
    let Ok(value) = serde_json::from_str::<Value>(payload) else {
        return Frame::Skip;
    };
    if let Some(error) = value.get("error") {
        return Frame::Error(error_message(error));
    }
    let text: String = value["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| parts.iter().filter_map(|part| part["text"].as_str()).collect())
        .unwrap_or_default();
    if text.is_empty() { Frame::Skip } else { Frame::Delta(text) }
}

fn error_message(error: &Value) -> String {
    error["message"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string())
}

/// Collect a delta stream into one string
pub async fn drain(mut deltas: TextStream) -> Result<String, EngineError> {
    let mut text = String::new();
    while let Some(delta) = deltas.next().await {
        text.push_str(&delta?);
    }
    Ok(text)
}
