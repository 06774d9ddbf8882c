//! Word count. A word is a maximal run of alphabetic characters.

use anyhow::Result;
use bytes::Bytes;

use common::utils::string_from_bytes;
use common::{KeyValue, MapOutput};

pub fn map(kv: KeyValue, _aux: Bytes) -> MapOutput {
    let contents = string_from_bytes(kv.value)?;

    let words: Vec<String> = contents
        .split(|c: char| !c.is_alphabetic())
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect();

    let iter = words
        .into_iter()
        .map(|word| Ok::<_, anyhow::Error>(KeyValue::new(word, Bytes::from_static(b"1"))));
    Ok(Box::new(iter))
}

pub fn reduce(
    _key: Bytes,
    values: Box<dyn Iterator<Item = Bytes> + '_>,
    _aux: Bytes,
) -> Result<Bytes> {
    Ok(Bytes::from(values.count().to_string()))
}
