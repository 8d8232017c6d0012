use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::Level;
use tracing_indicatif::span_ext::IndicatifSpanExt;

use super::{Report, Task, TaskReport};
use crate::utils::{get_style_root, get_style_task};

/// Run the tasks on the rayon pool and wait for all of them. A failing or
/// panicking task is logged and recorded, the remaining tasks keep running.
pub(crate) fn run_parallel(tasks: &[&dyn Task]) -> Report {
    if tasks.is_empty() {
        return Report::default();
    }

    let root_span = tracing::span!(Level::INFO, "running_tasks");
    root_span.pb_set_length(tasks.len() as u64);
    root_span.pb_set_style(&get_style_root());
    root_span.pb_set_message("Building...");
    let _enter = root_span.enter();

    let reports = tasks
        .par_iter()
        .map(|task| {
            let report = run_one(*task);
            root_span.pb_inc(1);
            report
        })
        .collect();

    Report { tasks: reports }
}

fn run_one(task: &dyn Task) -> TaskReport {
    let name = task.name();

    let span = tracing::span!(Level::INFO, "task", name);
    span.pb_set_style(&get_style_task());
    span.pb_set_message(&format!("Running {name}"));
    let _enter = span.enter();

    let start = Instant::now();

    // A panic inside a compiler is reported like any other task failure.
    let result = match catch_unwind(AssertUnwindSafe(|| task.run())) {
        Ok(result) => result,
        Err(panic) => {
            let msg = if let Some(s) = panic.downcast_ref::<&str>() {
                format!("Task panicked: {s}")
            } else if let Some(s) = panic.downcast_ref::<String>() {
                format!("Task panicked: {s}")
            } else {
                String::from("Task panicked with unknown payload")
            };

            Err(anyhow::anyhow!(msg))
        }
    };

    let duration = start.elapsed();

    match &result {
        Ok(()) => tracing::info!("Finished: {name} {}ms", duration.as_millis()),
        Err(e) => tracing::error!("Failed: {name} {}ms\n{e:#}", duration.as_millis()),
    }

    TaskReport {
        name: name.to_string(),
        duration,
        error: result.err(),
    }
}
