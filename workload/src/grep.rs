//! Distributed grep. The pattern is the auxiliary argument; the output lists
//! each matching line with the inputs it appears in.

use anyhow::{anyhow, Result};
use bytes::Bytes;

use common::utils::string_from_bytes;
use common::{KeyValue, MapOutput};

pub fn map(kv: KeyValue, aux: Bytes) -> MapOutput {
    let pattern = string_from_bytes(aux)?;
    if pattern.is_empty() {
        return Err(anyhow!("grep needs a pattern"));
    }

    let input = kv.key;
    let contents = string_from_bytes(kv.value)?;

    let matches: Vec<String> = contents
        .lines()
        .filter(|line| line.contains(pattern.as_str()))
        .map(str::to_string)
        .collect();

    let iter = matches
        .into_iter()
        .map(move |line| Ok::<_, anyhow::Error>(KeyValue::new(line, input.clone())));
    Ok(Box::new(iter))
}

pub fn reduce(
    _key: Bytes,
    values: Box<dyn Iterator<Item = Bytes> + '_>,
    _aux: Bytes,
) -> Result<Bytes> {
    let mut inputs = values
        .map(string_from_bytes)
        .collect::<Result<Vec<_>>>()?;
    inputs.sort();
    inputs.dedup();

    Ok(Bytes::from(inputs.join(",")))
}
