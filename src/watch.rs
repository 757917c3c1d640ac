use std::path::{Path, PathBuf};

use crossbeam_channel::{Receiver, unbounded};
use notify::{EventKind, RecursiveMode, Watcher};

/// Signals on the returned channel whenever `path` is modified.
///
/// The watcher lives on its own thread for the rest of the process.
pub fn spawn_config_watcher(path: &Path) -> Receiver<()> {
    let (tx, rx) = unbounded::<()>();
    let path: PathBuf = path.to_path_buf();
    let spawned = std::thread::Builder::new()
        .name("strata-config-watch".into())
        .spawn(move || {
            let watcher = notify::recommended_watcher(
                move |res: Result<notify::Event, notify::Error>| {
                    if let Ok(event) = res {
                        match event.kind {
                            EventKind::Modify(_) | EventKind::Create(_) | EventKind::Any => {
                                let _ = tx.send(());
                            }
                            _ => {}
                        }
                    }
                },
            );
            match watcher {
                Ok(mut w) => {
                    if let Err(e) = w.watch(&path, RecursiveMode::NonRecursive) {
                        log::warn!("cannot watch {}: {e}", path.display());
                        return;
                    }
                    log::info!("watching {} for changes", path.display());
                    loop {
                        std::thread::sleep(std::time::Duration::from_secs(3600));
                    }
                }
                Err(e) => log::warn!("config watcher unavailable: {e}"),
            }
        });
    if let Err(e) = spawned {
        log::warn!("failed to spawn config watcher: {e}");
    }
    rx
}
