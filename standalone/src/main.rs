use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};
use bytes::Bytes;
use clap::Parser;
use tracing::info;

use common::utils::write_atomic;
use common::{KeyValue, Workload};
use mrl_worker::reduce::reduce_sorted;

mod args;
use args::Args;

/// Expand every pattern, keeping the order patterns were given in.
fn expand_inputs(patterns: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();

    for pattern in patterns {
        let mut matched = false;
        for path in glob::glob(pattern).with_context(|| format!("bad pattern `{pattern}`"))? {
            inputs.push(path?);
            matched = true;
        }
        if !matched {
            bail!("no input matches `{pattern}`");
        }
    }

    Ok(inputs)
}

/// Map every input, then reduce all pairs at once into `output`.
fn run(workload: &Workload, inputs: &[PathBuf], aux: Bytes, output: &Path) -> anyhow::Result<()> {
    let mut kva: Vec<KeyValue> = Vec::new();

    for input in inputs {
        let content =
            fs::read(input).with_context(|| format!("cannot read input {}", input.display()))?;
        let name = input.to_string_lossy().into_owned();

        let map_fn = workload.map_fn;
        for kv in map_fn(KeyValue::new(name, content), aux.clone())? {
            kva.push(kv?);
        }
    }

    let records = kva.len();
    let mut keys = 0;
    write_atomic(output, |out| {
        keys = reduce_sorted(kva, workload, aux, out)?;
        Ok(())
    })?;

    info!(records, keys, "wrote {}", output.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let workload = workload::try_named(&args.workload)
        .ok_or_else(|| anyhow!("The workload `{}` is not a known workload", args.workload))?;
    let inputs = expand_inputs(&args.inputs)?;
    info!(workload = %args.workload, inputs = inputs.len(), "running sequentially");

    run(
        &workload,
        &inputs,
        Bytes::from(args.aux.join(" ")),
        &args.output,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_words_across_all_inputs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pg-0.txt"), "a b a").unwrap();
        fs::write(dir.path().join("pg-1.txt"), "a b a").unwrap();

        let pattern = dir.path().join("pg-*.txt").to_string_lossy().into_owned();
        let inputs = expand_inputs(&[pattern]).unwrap();
        assert_eq!(inputs.len(), 2);

        let output = dir.path().join("mr-out-0");
        let wc = workload::try_named("wc").unwrap();
        run(&wc, &inputs, Bytes::new(), &output).unwrap();

        assert_eq!(fs::read_to_string(output).unwrap(), "a 4\nb 2\n");
    }

    #[test]
    fn pattern_without_matches_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = dir.path().join("*.txt").to_string_lossy().into_owned();

        assert!(expand_inputs(&[pattern]).is_err());
    }

    #[test]
    fn grep_passes_aux_to_the_workload() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("notes.txt");
        fs::write(&input, "keep this\ndrop that\nkeep too\n").unwrap();

        let output = dir.path().join("out");
        let grep = workload::try_named("grep").unwrap();
        run(&grep, &[input.clone()], Bytes::from("keep"), &output).unwrap();

        let name = input.to_string_lossy();
        assert_eq!(
            fs::read_to_string(output).unwrap(),
            format!("keep this {name}\nkeep too {name}\n")
        );
    }
}
