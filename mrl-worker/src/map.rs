use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Error};
use bytes::Bytes;
use tracing::info;

use common::codec;
use common::task::MapSpec;
use common::utils::intermediate_name;
use common::{partition, KeyValue, Workload};

/// Run a map task: read the input, apply the map function and spread the
/// pairs over `n_reduce` intermediate files in `work_dir`.
///
/// All `n_reduce` files are created, empty or not, so that every reduce
/// task finds one file per finished map task.
pub fn perform_map(
    spec: &MapSpec,
    n_reduce: u32,
    workload: &Workload,
    aux: Bytes,
    work_dir: &Path,
) -> Result<(), Error> {
    if n_reduce == 0 {
        bail!("map task {} was assigned zero reduce partitions", spec.id);
    }

    info!(id = spec.id, input = %spec.input, "starting map task");

    let content =
        fs::read(&spec.input).with_context(|| format!("cannot read input {}", spec.input))?;

    let map_fn = workload.map_fn;
    let output = map_fn(KeyValue::new(spec.input.clone(), content), aux)?;

    let mut writers = (0..n_reduce)
        .map(|bucket| {
            let path = work_dir.join(intermediate_name(spec.id, bucket));
            let file = File::create(&path)
                .with_context(|| format!("cannot create intermediate file {}", path.display()))?;
            Ok(BufWriter::new(file))
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let mut records = 0usize;
    for kv in output {
        let kv = kv?;
        let bucket = partition(&kv.key, n_reduce) as usize;
        codec::encode(&mut writers[bucket], &kv)?;
        records += 1;
    }

    for writer in writers.iter_mut() {
        writer.flush()?;
    }

    info!(id = spec.id, records, "finished map task");
    Ok(())
}
