//! Streaming trace decoder.

use std::io::{self, BufRead, ErrorKind};
use std::path::Path;

use crate::error::{AnalysisError, Result};

use super::notification::Notification;

/// On-disk encoding of a recorded trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceFormat {
    /// One JSON object per line. Blank lines are skipped.
    JsonLines,
    /// Concatenated MessagePack maps, no framing.
    MessagePack,
}

impl TraceFormat {
    /// Guess the format from a file extension. Anything unrecognized is
    /// treated as JSON Lines.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        match path.as_ref().extension().and_then(|ext| ext.to_str()) {
            Some("msgpack" | "mpk" | "mp") => TraceFormat::MessagePack,
            _ => TraceFormat::JsonLines,
        }
    }
}

/// Iterator over the notifications of a trace.
///
/// Decoding stops at the first error; the iterator is fused afterwards.
pub struct TraceReader<R> {
    reader: R,
    format: TraceFormat,
    line: usize,
    buf: String,
    done: bool,
}

impl<R: BufRead> TraceReader<R> {
    pub fn new(reader: R, format: TraceFormat) -> Self {
        Self {
            reader,
            format,
            line: 0,
            buf: String::new(),
            done: false,
        }
    }

    pub fn json_lines(reader: R) -> Self {
        Self::new(reader, TraceFormat::JsonLines)
    }

    pub fn message_pack(reader: R) -> Self {
        Self::new(reader, TraceFormat::MessagePack)
    }

    pub fn format(&self) -> TraceFormat {
        self.format
    }

    fn next_json(&mut self) -> Option<Result<Notification>> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
            self.line += 1;

            let text = self.buf.trim();
            if text.is_empty() {
                continue;
            }
            return Some(
                serde_json::from_str(text).map_err(|source| AnalysisError::Decode {
                    line: self.line,
                    source,
                }),
            );
        }
    }

    fn next_msgpack(&mut self) -> Option<Result<Notification>> {
        match rmp_serde::from_read(&mut self.reader) {
            Ok(notification) => Some(Ok(notification)),
            Err(rmp_serde::decode::Error::InvalidMarkerRead(e)) if is_eof(&e) => None,
            Err(e) => Some(Err(e.into())),
        }
    }
}

fn is_eof(e: &io::Error) -> bool {
    e.kind() == ErrorKind::UnexpectedEof
}

impl<R: BufRead> Iterator for TraceReader<R> {
    type Item = Result<Notification>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = match self.format {
            TraceFormat::JsonLines => self.next_json(),
            TraceFormat::MessagePack => self.next_msgpack(),
        };
        if !matches!(item, Some(Ok(_))) {
            self.done = true;
        }
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Handle, Value};
    use std::io::Cursor;

    #[test]
    fn reads_json_lines_and_skips_blanks() {
        let text = r#"{"kind":"event_start","event_type":"tick","receiver":1}

{"kind":"branch"}
{"kind":"event_end"}
"#;
        let items: Vec<_> = TraceReader::json_lines(Cursor::new(text))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[1], Notification::Branch);
    }

    #[test]
    fn decode_error_reports_line_and_stops() {
        let text = "{\"kind\":\"branch\"}\n\nnot json\n{\"kind\":\"branch\"}\n";
        let mut reader = TraceReader::json_lines(Cursor::new(text));

        assert!(reader.next().unwrap().is_ok());
        match reader.next() {
            Some(Err(AnalysisError::Decode { line, .. })) => assert_eq!(line, 3),
            other => panic!("expected decode error, got {other:?}"),
        }
        assert!(reader.next().is_none());
    }

    #[test]
    fn reads_concatenated_message_pack() {
        let notifications = vec![
            Notification::EventStart {
                event_type: "data".into(),
                receiver: Handle::new(4),
                payload: vec![Value::Object(Handle::new(11)), Value::Primitive],
                at: Some(5),
            },
            Notification::Write {
                name: "buf".into(),
                value: Value::Null,
            },
            Notification::EventEnd { at: Some(8) },
        ];

        let mut bytes = Vec::new();
        for n in &notifications {
            bytes.extend(rmp_serde::to_vec_named(n).unwrap());
        }

        let decoded: Vec<_> = TraceReader::message_pack(Cursor::new(bytes))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(decoded, notifications);
    }

    #[test]
    fn empty_message_pack_stream_is_empty() {
        let mut reader = TraceReader::message_pack(Cursor::new(Vec::<u8>::new()));
        assert!(reader.next().is_none());
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(TraceFormat::from_path("run.msgpack"), TraceFormat::MessagePack);
        assert_eq!(TraceFormat::from_path("run.jsonl"), TraceFormat::JsonLines);
        assert_eq!(TraceFormat::from_path("run"), TraceFormat::JsonLines);
    }
}
