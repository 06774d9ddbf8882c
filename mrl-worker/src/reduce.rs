use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use anyhow::{Context, Error};
use bytes::Bytes;
use tracing::info;

use common::codec::Decoder;
use common::task::ReduceSpec;
use common::utils::{output_name, write_atomic};
use common::{KeyValue, Workload};

/// Read every record of the given intermediate files.
pub fn read_intermediate(work_dir: &Path, names: &[String]) -> Result<Vec<KeyValue>, Error> {
    let mut kva = Vec::new();

    for name in names {
        let path = work_dir.join(name);
        let file = File::open(&path)
            .with_context(|| format!("cannot open intermediate file {}", path.display()))?;

        for kv in Decoder::new(BufReader::new(file)) {
            let kv = kv.with_context(|| format!("corrupt intermediate file {}", path.display()))?;
            kva.push(kv);
        }
    }

    Ok(kva)
}

/// Sort `kva` by key, call the reduce function once per distinct key and
/// write one `<key> <value>` line per key to `out`.
pub fn reduce_sorted(
    mut kva: Vec<KeyValue>,
    workload: &Workload,
    aux: Bytes,
    out: &mut dyn Write,
) -> Result<usize, Error> {
    kva.sort_by(|a, b| a.key.cmp(&b.key));

    let reduce_func = workload.reduce_fn;
    let mut keys = 0;

    for group in kva.chunk_by(|a, b| a.key == b.key) {
        let key = group[0].key();
        let values = group.iter().map(KeyValue::value);

        let value = reduce_func(key.clone(), Box::new(values), aux.clone())?;

        out.write_all(&key)?;
        out.write_all(b" ")?;
        out.write_all(&value)?;
        out.write_all(b"\n")?;
        keys += 1;
    }

    Ok(keys)
}

/// Run a reduce task.
///
/// The output only appears under its final name once every key has been
/// reduced, so a re-executed task can never leave a torn file behind.
pub fn perform_reduce(
    spec: &ReduceSpec,
    workload: &Workload,
    aux: Bytes,
    work_dir: &Path,
) -> Result<(), Error> {
    info!(
        id = spec.id,
        inputs = spec.intermediate.len(),
        "starting reduce task"
    );

    let kva = read_intermediate(work_dir, &spec.intermediate)?;
    let records = kva.len();

    let output = work_dir.join(output_name(spec.id));
    let mut keys = 0;
    write_atomic(&output, |out| {
        keys = reduce_sorted(kva, workload, aux, out)?;
        Ok(())
    })?;

    info!(id = spec.id, records, keys, "finished reduce task");
    Ok(())
}
