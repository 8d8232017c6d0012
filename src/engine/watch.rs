//! Watch mode.
//!
//! All tasks run once, then the directories they watch are subscribed with a
//! debounced, recursive filesystem watcher. Each debounced batch of changes
//! is turned into the set of dirty tasks, which are re-run together:
//!
//! ```text
//! Idle --(batch with a dirty path)--> Rebuilding --(tasks finished)--> Idle
//! ```
//!
//! Batches are handled one after another on the calling thread, so a task is
//! never rebuilt concurrently with itself. Changes made during a rebuild are
//! queued by the debouncer and form the next batch.
//!
//! The set of watched directories can grow: after every run, directories of
//! newly bundled modules are subscribed as well.

use std::collections::HashSet;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use notify::{Event, EventKind, RecursiveMode};
use notify_debouncer_full::new_debouncer;

use super::Registry;
use crate::error::WatchError;
use crate::output::normalize_path;

const DEBOUNCE: Duration = Duration::from_millis(250);

/// Run every task of the registry once, then keep re-running the affected
/// tasks whenever files under `root` change. Only returns on a watcher
/// failure.
pub fn watch(root: &Utf8Path, registry: &Registry) -> Result<(), WatchError> {
    let root = root.canonicalize_utf8()?;

    tracing::info!("running initial build...");
    let report = registry.run();
    tracing::info!("initial build completed: {report}");

    let (tx, rx) = std::sync::mpsc::channel();
    let mut debouncer = new_debouncer(DEBOUNCE, None, tx)?;

    let mut subscribed = Vec::new();
    for path in new_roots(&root, registry.watched(), &subscribed) {
        tracing::info!("watching {}", path);
        debouncer.watch(&path, RecursiveMode::Recursive)?;
        subscribed.push(path);
    }

    loop {
        match rx.recv()? {
            Ok(events) => {
                let paths = changed_paths(&root, events.iter().map(|de| &de.event));
                let dirty = registry.select_dirty(&paths);

                if dirty.is_empty() {
                    continue;
                }

                tracing::info!("change detected, re-running {} task(s)...", dirty.len());
                let report = registry.run_only(&dirty);

                if report.is_success() {
                    tracing::info!("rebuild complete, watching for changes...");
                } else {
                    tracing::error!("rebuild finished with errors: {report}");
                }

                for path in new_roots(&root, registry.watched(), &subscribed) {
                    tracing::info!("watching {}", path);
                    debouncer.watch(&path, RecursiveMode::Recursive)?;
                    subscribed.push(path);
                }
            }
            Err(errors) => {
                for e in errors {
                    tracing::error!("watch error: {:?}", e);
                }
            }
        }
    }
}

/// Existing directories among `watched`, resolved against `root`, which are
/// not covered by an already `subscribed` root.
fn new_roots(
    root: &Utf8Path,
    watched: Vec<Utf8PathBuf>,
    subscribed: &[Utf8PathBuf],
) -> Vec<Utf8PathBuf> {
    let mut roots = HashSet::new();
    for path in watched {
        let path = normalize_path(&root.join(path));
        if subscribed.iter().any(|dir| path.starts_with(dir)) {
            continue;
        }
        if path.exists() {
            roots.insert(path);
        } else {
            tracing::warn!("not watching {path}, it doesn't exist");
        }
    }

    collapse_watch_paths(roots)
}

/// Paths touched by a batch of events, relative to `root`. Paths outside of
/// the root or not valid UTF-8 are dropped.
fn changed_paths<'a>(root: &Utf8Path, events: impl Iterator<Item = &'a Event>) -> Vec<Utf8PathBuf> {
    let mut paths: Vec<Utf8PathBuf> = events
        .filter(|event| {
            matches!(
                event.kind,
                EventKind::Create(..) | EventKind::Modify(..) | EventKind::Remove(..)
            )
        })
        .flat_map(|event| &event.paths)
        .filter_map(|path| Utf8Path::from_path(path))
        .filter_map(|path| path.strip_prefix(root).ok())
        .map(normalize_path)
        .collect();

    paths.sort();
    paths.dedup();
    paths
}

/// Reduces a set of paths to the minimal set of watch roots.
///
/// If we watch `/a` and `/a/b`, we only need to watch `/a` because
/// the watcher is recursive. This function sorts the paths and filters
/// out any path that is a subdirectory of a previously accepted path.
fn collapse_watch_paths(paths: HashSet<Utf8PathBuf>) -> Vec<Utf8PathBuf> {
    let mut paths: Vec<_> = paths.into_iter().collect();
    paths.sort();

    let mut filtered: Vec<Utf8PathBuf> = Vec::new();
    for path in paths {
        if let Some(last) = filtered.last()
            && path.starts_with(last)
        {
            continue;
        }
        filtered.push(path);
    }

    filtered
}
