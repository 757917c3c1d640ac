mod cli;
mod config;
mod sim;
mod watch;

use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use clap::Parser;
use hashbrown::HashMap;
use strata_chunk::{ChunkGenerator, FlatGenerator, NoiseGenerator};
use strata_provider::{ChunkEvent, LocalChunkProvider};
use strata_store::MemoryFarStore;

use crate::cli::Args;
use crate::config::DriverConfig;
use crate::sim::{CountingListener, Walker};

fn reload_distances(
    path: &Path,
    provider: &LocalChunkProvider,
    walkers: &HashMap<u64, Arc<Walker>>,
) {
    match DriverConfig::load(path) {
        Ok(cfg) => {
            for spec in &cfg.observers {
                if let Some(w) = walkers.get(&spec.id) {
                    provider.update_relevance(w.as_ref(), spec.distance);
                    log::info!("observer {} distance -> {}", spec.id, spec.distance);
                }
            }
        }
        Err(e) => log::warn!("ignoring config reload: {e}"),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut cfg = DriverConfig::load_or_default(&args.config)?;
    args.apply(&mut cfg);

    let far = MemoryFarStore::open_or_default(&cfg.provider.save_path())?;
    let generator: Arc<dyn ChunkGenerator> = if args.flat {
        Arc::new(FlatGenerator::new(
            cfg.generator.chunk_size,
            cfg.generator.sea_level,
        ))
    } else {
        Arc::new(NoiseGenerator::new(cfg.generator.clone()))
    };
    let (event_tx, event_rx) = crossbeam_channel::unbounded::<ChunkEvent>();
    let provider = LocalChunkProvider::new(&cfg.provider, Arc::new(far), generator, Arc::new(event_tx))?;

    let listener = CountingListener::new();
    let mut walkers: HashMap<u64, Arc<Walker>> = HashMap::new();
    for spec in &cfg.observers {
        let walker = Arc::new(Walker::from_spec(spec));
        if provider.add_relevance(walker.clone(), spec.distance, Some(listener.clone())) {
            walkers.insert(spec.id, walker);
        }
    }

    let reload = args.watch.then(|| watch::spawn_config_watcher(&args.config));
    let tick = Duration::from_millis(cfg.tick_ms);
    let (mut ready, mut unloaded) = (0u64, 0u64);
    let started = Instant::now();

    for t in 0..cfg.ticks {
        let tick_start = Instant::now();
        for w in walkers.values() {
            w.step();
        }
        if let Some(rx) = &reload {
            if rx.try_iter().count() > 0 {
                reload_distances(&args.config, &provider, &walkers);
            }
        }

        provider.update();
        for event in event_rx.try_iter() {
            match event {
                ChunkEvent::Ready(_) => ready += 1,
                ChunkEvent::Unloaded(_) => unloaded += 1,
            }
        }

        if t % 20 == 0 {
            let s = provider.stats();
            log::info!(
                "tick {t}: resident={} preparing={} queued={} inflight={} far={} ({:.2} MiB) ready={ready} unloaded={unloaded}",
                s.resident,
                s.preparing,
                s.pipeline.queued,
                s.pipeline.inflight,
                s.far_store_chunks,
                s.far_store_mib,
            );
        }
        if let Some(rest) = tick.checked_sub(tick_start.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    let s = provider.stats();
    log::info!(
        "ran {} ticks in {:.1?}: {} completed, {} failed, {} region callbacks",
        cfg.ticks,
        started.elapsed(),
        s.pipeline.completed,
        s.pipeline.failed,
        listener.ready.load(Ordering::Relaxed),
    );
    provider.dispose();
    Ok(())
}
