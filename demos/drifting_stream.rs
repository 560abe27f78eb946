//! Drifting Stream — Sporadic Eviction Keeps Memory Bounded
//!
//! A one-dimensional attractor jumps across the space in three phases.
//! Grids abandoned by the stream starve, fall below the sporadicity
//! threshold π, get flagged, and are evicted one cycle later — so the
//! registry tracks the live part of the space instead of its history,
//! and the reported clusters follow the drift.
//!
//! Run: cargo run --example drifting_stream --release

use gridstream::{DStream, StreamConfig};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn report(phase: &str, stream: &DStream) {
    println!("--- {phase} (tick {}) ---", stream.tick());
    println!(
        "live grids: {}, clusters: {}",
        stream.grid_count(),
        stream.cluster_count()
    );
    for cluster in stream.clusters() {
        let mut coords: Vec<i64> = cluster.keys().map(|k| k.coords()[0]).collect();
        coords.sort_unstable();
        println!("  cluster {} covers cells {:?}", cluster.label(), coords);
    }
    let sporadic = stream
        .grids()
        .filter(|(_, cv)| cv.is_sporadic())
        .count();
    println!("  flagged sporadic: {sporadic}\n");
}

fn main() -> gridstream::Result<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    let config = StreamConfig {
        decay_factor: 0.9,
        time_gap: Some(15),
        ..StreamConfig::default()
    };
    let mut stream = DStream::new(config)?;

    println!("=== Drifting Stream ===\n");

    for (phase, centre) in [("phase 1: attractor at 2", 2.0), ("phase 2: jump to 15", 15.0), ("phase 3: jump to 28", 28.0)] {
        for _ in 0..250 {
            let value = centre + rng.gen_range(-1.0..1.0);
            stream.ingest(&[value][..])?;
        }
        report(phase, &stream);
    }

    println!(
        "after {} records the registry holds {} grids out of an N = {} space",
        stream.tick(),
        stream.grid_count(),
        stream.n()
    );

    Ok(())
}
