//! Incremental reader for files holding either one JSON object or an array of
//! objects.
//!
//! Input is pulled in fixed-size chunks. The internal buffer only grows while
//! the element currently being parsed is incomplete, and the consumed prefix
//! is dropped before each refill, so memory stays bounded by the largest
//! element plus one chunk.

use crate::file::error::FileError;
use model::core::value::json_type_name;
use serde_json::Value;
use std::io::Read;

/// Size of each read from the underlying stream.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

pub struct JsonStreamDecoder<R> {
    reader: R,
    buf: Vec<u8>,
    pos: usize,
    chunk_size: usize,
}

impl<R: Read> JsonStreamDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            pos: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Decodes the whole stream, calling `on_element` once per top-level
    /// element in source order. An error returned by the callback stops
    /// decoding and is passed through unchanged.
    pub fn for_each<F, E>(mut self, mut on_element: F) -> Result<(), E>
    where
        F: FnMut(Value) -> Result<(), E>,
        E: From<FileError>,
    {
        match self.peek_token()? {
            Some(b'[') => {
                self.pos += 1;
                self.read_array(&mut on_element)?;
            }
            Some(b'{') => {
                let value = self.read_value()?;
                on_element(value)?;
            }
            _ => {
                return Err(
                    FileError::format("file does not begin with an object or array").into(),
                );
            }
        }

        if self.peek_token()?.is_some() {
            return Err(FileError::format("extra characters found after end of data").into());
        }
        Ok(())
    }

    fn read_array<F, E>(&mut self, on_element: &mut F) -> Result<(), E>
    where
        F: FnMut(Value) -> Result<(), E>,
        E: From<FileError>,
    {
        match self.peek_token()? {
            Some(b']') => {
                self.pos += 1;
                return Ok(());
            }
            None => return Err(FileError::format("unexpected end of data inside array").into()),
            Some(_) => {}
        }

        loop {
            let value = self.read_value()?;
            if !value.is_object() {
                return Err(FileError::InvalidShape {
                    message: format!(
                        "Invalid input, expected an object, but got {}",
                        json_type_name(&value)
                    ),
                    line: None,
                }
                .into());
            }
            on_element(value)?;

            match self.peek_token()? {
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(_) => {
                    return Err(
                        FileError::format("expected ',' or ']' after object").into(),
                    );
                }
                None => {
                    return Err(FileError::format("unexpected end of data inside array").into());
                }
            }
        }
    }

    /// Parses one complete value starting at the current position, pulling
    /// more input while the value is incomplete.
    fn read_value(&mut self) -> Result<Value, FileError> {
        loop {
            let mut stream =
                serde_json::Deserializer::from_slice(&self.buf[self.pos..]).into_iter::<Value>();
            match stream.next() {
                Some(Ok(value)) => {
                    self.pos += stream.byte_offset();
                    return Ok(value);
                }
                Some(Err(err)) if !err.is_eof() => {
                    return Err(FileError::format(err.to_string()));
                }
                _ => {}
            }

            if !self.fill()? {
                return Err(FileError::format("unexpected end of data"));
            }
        }
    }

    /// Skips whitespace and returns the next significant byte without
    /// consuming it, or `None` at end of input.
    fn peek_token(&mut self) -> Result<Option<u8>, FileError> {
        loop {
            while let Some(&byte) = self.buf.get(self.pos) {
                if is_whitespace(byte) {
                    self.pos += 1;
                } else {
                    return Ok(Some(byte));
                }
            }
            if !self.fill()? {
                return Ok(None);
            }
        }
    }

    /// Drops the consumed prefix and appends up to one chunk of input.
    /// Returns `false` once the stream is exhausted.
    fn fill(&mut self) -> Result<bool, FileError> {
        if self.pos > 0 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
        let read = self
            .reader
            .by_ref()
            .take(self.chunk_size as u64)
            .read_to_end(&mut self.buf)?;
        Ok(read > 0)
    }
}

fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(input: &str, chunk_size: usize) -> Result<Vec<Value>, FileError> {
        let mut out = Vec::new();
        JsonStreamDecoder::new(input.as_bytes())
            .with_chunk_size(chunk_size)
            .for_each(|value| {
                out.push(value);
                Ok::<_, FileError>(())
            })?;
        Ok(out)
    }

    const SAMPLE: &str = r#"
      [ {"id": 1, "name": "Ada", "tags": ["x", "y,z"], "nested": {"a": [1, {"b": null}]}},
        {"id": 2, "text": "brackets ] and } and \"quotes\" and \\ slashes"},
        {"id": 3.25e2, "flag": true, "unicode": "héllo"} ,
        {}
      ]
    "#;

    #[test]
    fn test_array_of_objects() {
        let values = decode(SAMPLE, DEFAULT_CHUNK_SIZE).unwrap();
        assert_eq!(values.len(), 4);
        assert_eq!(values[0]["name"], json!("Ada"));
        assert_eq!(values[3], json!({}));
    }

    #[test]
    fn test_chunk_size_does_not_change_output() {
        let whole = decode(SAMPLE, DEFAULT_CHUNK_SIZE).unwrap();
        for chunk_size in [1, 2, 3, 5, 7, 16, 31, 64] {
            assert_eq!(decode(SAMPLE, chunk_size).unwrap(), whole, "chunk size {chunk_size}");
        }
    }

    #[test]
    fn test_single_object() {
        let values = decode("  {\"id\": \"a\"}\n\n", 3).unwrap();
        assert_eq!(values, vec![json!({"id": "a"})]);
    }

    #[test]
    fn test_empty_array() {
        assert!(decode(" [ ] ", 1).unwrap().is_empty());
    }

    #[test]
    fn test_top_level_scalar_is_rejected() {
        let err = decode("\"just a string\"", 4).unwrap_err();
        assert!(matches!(err, FileError::InvalidFormat(_)));
        assert_eq!(
            err.to_string(),
            "JSON format not recognized - file does not begin with an object or array"
        );
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert!(matches!(decode("   ", 2).unwrap_err(), FileError::InvalidFormat(_)));
    }

    #[test]
    fn test_non_object_element_is_rejected() {
        let err = decode("[{\"id\": 1}, 42]", 4).unwrap_err();
        assert!(matches!(err, FileError::InvalidShape { .. }));
        assert_eq!(err.to_string(), "Invalid input, expected an object, but got number");
    }

    #[test]
    fn test_missing_separator_is_rejected() {
        let err = decode("[{\"id\": 1} {\"id\": 2}]", 8).unwrap_err();
        assert_eq!(
            err.to_string(),
            "JSON format not recognized - expected ',' or ']' after object"
        );
    }

    #[test]
    fn test_trailing_data_is_rejected() {
        let err = decode("{\"id\": 1} x", 2).unwrap_err();
        assert_eq!(
            err.to_string(),
            "JSON format not recognized - extra characters found after end of data"
        );
        assert!(decode("[{\"id\": 1}] ]", 64).is_err());
    }

    #[test]
    fn test_truncated_input_is_rejected() {
        assert!(matches!(
            decode("[{\"id\": 1}, {\"id\"", 4).unwrap_err(),
            FileError::InvalidFormat(_)
        ));
        assert!(matches!(
            decode("[{\"id\": 1}", 4).unwrap_err(),
            FileError::InvalidFormat(_)
        ));
    }

    #[test]
    fn test_invalid_token_is_rejected() {
        assert!(matches!(
            decode("[{\"id\": tru}]", 64).unwrap_err(),
            FileError::InvalidFormat(_)
        ));
    }

    #[test]
    fn test_callback_error_stops_decoding() {
        let mut seen = 0;
        let result = JsonStreamDecoder::new(SAMPLE.as_bytes()).for_each(|_| {
            seen += 1;
            if seen == 2 {
                Err(FileError::InvalidFormat("stop".into()))
            } else {
                Ok(())
            }
        });
        assert!(result.is_err());
        assert_eq!(seen, 2);
    }

    #[test]
    fn test_buffer_stays_bounded() {
        let element = format!("{{\"payload\": \"{}\"}}", "x".repeat(100));
        let input = format!("[{}]", vec![element.clone(); 500].join(","));
        let mut decoder = JsonStreamDecoder::new(input.as_bytes()).with_chunk_size(64);

        assert_eq!(decoder.peek_token().unwrap(), Some(b'['));
        decoder.pos += 1;
        let mut max_buffered = 0;
        loop {
            decoder.read_value().unwrap();
            max_buffered = max_buffered.max(decoder.buf.len());
            match decoder.peek_token().unwrap() {
                Some(b',') => decoder.pos += 1,
                _ => break,
            }
        }
        assert!(max_buffered <= element.len() + 2 * 64, "buffered {max_buffered}");
    }
}
