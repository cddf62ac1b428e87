//! Runs a selection of a project's tasks, either sequentially or across a
//! bounded worker pool. Tasks are fully isolated: each owns its own engine
//! state and output directory, so parallel execution shares nothing.

use std::path::PathBuf;

use log::error;
use rayon::ThreadPoolBuilder;

use crate::config::{Project, Task};
use crate::error::Result;
use crate::task::{self, TaskOutput};

pub struct RunOptions {
    pub selector: Option<String>,
    pub force_sequential: bool,
    pub max_parallel: Option<usize>,
    pub output_root: PathBuf,
}

/// Run every task matching `options.selector` (or the whole project, if
/// unset). A fatal error in one task is logged and does not abort its
/// siblings; the first such error is returned to the caller after every task
/// has had a chance to run.
pub fn run_project(project: &Project, options: &RunOptions) -> Result<()> {
    let tasks: Vec<&Task> = match &options.selector {
        Some(selector) => vec![project.select(selector)?],
        None => project.tasks.iter().collect(),
    };

    if options.force_sequential || tasks.len() <= 1 {
        let mut first_error = None;
        for task in tasks {
            if let Err(e) = run_one(task, options) {
                error!("task {} failed: {e}", task.name);
                first_error.get_or_insert(e);
            }
        }
        return first_error.map_or(Ok(()), Err);
    }

    let pool = ThreadPoolBuilder::new()
        .num_threads(options.max_parallel.unwrap_or(0))
        .build()
        .expect("thread pool configuration is always valid here");

    let errors: Vec<_> = pool.install(|| {
        use rayon::prelude::*;
        tasks
            .par_iter()
            .filter_map(|task| match run_one(task, options) {
                Ok(()) => None,
                Err(e) => {
                    error!("task {} failed: {e}", task.name);
                    Some(e)
                }
            })
            .collect()
    });

    errors.into_iter().next().map_or(Ok(()), Err)
}

fn run_one(task: &Task, options: &RunOptions) -> Result<()> {
    let output = TaskOutput::new(options.output_root.join(&task.name));
    task::run_task(&task.name, &task.gilbert, &output)
}
