//! Intermediate file encoding.
//!
//! One record per line, `base64(key) base64(value)\n`, so arbitrary bytes
//! survive and a file can be streamed back record by record.

use std::io::{BufRead, Write};

use anyhow::{anyhow, Context};
use base64::{engine::general_purpose::URL_SAFE, Engine as _};

use crate::KeyValue;

/// Append one record to `writer`.
pub fn encode<W: Write + ?Sized>(writer: &mut W, kv: &KeyValue) -> std::io::Result<()> {
    writeln!(
        writer,
        "{} {}",
        URL_SAFE.encode(&kv.key),
        URL_SAFE.encode(&kv.value)
    )
}

/// Parse a single encoded line (without its newline).
pub fn decode_line(line: &str) -> anyhow::Result<KeyValue> {
    let (key, value) = line
        .split_once(' ')
        .ok_or_else(|| anyhow!("malformed record `{line}`"))?;

    let key = URL_SAFE
        .decode(key)
        .with_context(|| format!("failed to decode key `{key}`"))?;
    let value = URL_SAFE
        .decode(value)
        .with_context(|| format!("failed to decode value `{value}`"))?;

    Ok(KeyValue::new(key, value))
}

/// Streams records back out of an encoded reader.
pub struct Decoder<R> {
    lines: std::io::Lines<R>,
}

impl<R: BufRead> Decoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

impl<R: BufRead> Iterator for Decoder<R> {
    type Item = anyhow::Result<KeyValue>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };

            if line.is_empty() {
                continue;
            }

            return Some(decode_line(&line));
        }
    }
}
