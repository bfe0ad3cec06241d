// BLOB encoding: [version: u8][wincode payload].
// Timer trees are stored flattened in pre-order with an explicit depth per node.

use wincode::{SchemaRead, SchemaWrite};

use crate::models::{ErrorInterval, ThreadStats, Timer};

pub(super) const BLOB_VERSION: u8 = 1;

#[derive(Debug, Clone, PartialEq, SchemaRead, SchemaWrite)]
struct FlatTimer {
    depth: u32,
    name: String,
    extended: bool,
    count: i64,
    total_nanos: i64,
}

fn with_version_prefix(payload: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + payload.len());
    out.push(BLOB_VERSION);
    out.extend_from_slice(&payload);
    out
}

/// Payload after the version byte; a blob with an unknown version is rejected.
fn blob_payload(bytes: &[u8]) -> anyhow::Result<&[u8]> {
    match bytes.split_first() {
        Some((&BLOB_VERSION, payload)) => Ok(payload),
        Some((version, _)) => anyhow::bail!("unsupported blob version {}", version),
        None => anyhow::bail!("empty blob"),
    }
}

pub(super) fn encode_timers(timers: &[Timer]) -> anyhow::Result<Vec<u8>> {
    let mut flat = Vec::new();
    for timer in timers {
        flatten(timer, 0, &mut flat);
    }
    let payload = wincode::serialize(&flat).map_err(|e| anyhow::anyhow!("wincode: {}", e))?;
    Ok(with_version_prefix(payload))
}

pub(super) fn decode_timers(bytes: &[u8]) -> anyhow::Result<Vec<Timer>> {
    let flat = wincode::deserialize::<Vec<FlatTimer>>(blob_payload(bytes)?)
        .map_err(|e| anyhow::anyhow!("wincode deserialize timers: {}", e))?;
    Ok(unflatten(flat))
}

pub(super) fn encode_thread_stats(stats: &ThreadStats) -> anyhow::Result<Vec<u8>> {
    let payload = wincode::serialize(stats).map_err(|e| anyhow::anyhow!("wincode: {}", e))?;
    Ok(with_version_prefix(payload))
}

pub(super) fn decode_thread_stats(bytes: &[u8]) -> anyhow::Result<ThreadStats> {
    wincode::deserialize::<ThreadStats>(blob_payload(bytes)?)
        .map_err(|e| anyhow::anyhow!("wincode deserialize thread stats: {}", e))
}

pub(super) fn encode_error_intervals(intervals: &[ErrorInterval]) -> anyhow::Result<Vec<u8>> {
    let payload =
        wincode::serialize(&intervals.to_vec()).map_err(|e| anyhow::anyhow!("wincode: {}", e))?;
    Ok(with_version_prefix(payload))
}

pub(super) fn decode_error_intervals(bytes: &[u8]) -> anyhow::Result<Vec<ErrorInterval>> {
    wincode::deserialize::<Vec<ErrorInterval>>(blob_payload(bytes)?)
        .map_err(|e| anyhow::anyhow!("wincode deserialize error intervals: {}", e))
}

fn flatten(timer: &Timer, depth: u32, out: &mut Vec<FlatTimer>) {
    out.push(FlatTimer {
        depth,
        name: timer.name.clone(),
        extended: timer.extended,
        count: timer.count,
        total_nanos: timer.total_nanos,
    });
    for child in &timer.children {
        flatten(child, depth + 1, out);
    }
}

fn unflatten(flat: Vec<FlatTimer>) -> Vec<Timer> {
    let mut roots = Vec::new();
    // open path from the current root down to the last node
    let mut path: Vec<Timer> = Vec::new();
    for node in flat {
        while path.len() > node.depth as usize {
            close_last(&mut path, &mut roots);
        }
        path.push(Timer {
            name: node.name,
            extended: node.extended,
            count: node.count,
            total_nanos: node.total_nanos,
            children: Vec::new(),
        });
    }
    while !path.is_empty() {
        close_last(&mut path, &mut roots);
    }
    roots
}

fn close_last(path: &mut Vec<Timer>, roots: &mut Vec<Timer>) {
    if let Some(done) = path.pop() {
        match path.last_mut() {
            Some(parent) => parent.children.push(done),
            None => roots.push(done),
        }
    }
}
