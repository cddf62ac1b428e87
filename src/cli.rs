//! Thin CLI surface: project scaffolding, task management, running, and
//! report generation. The algorithmic core lives entirely behind
//! [`crate::runner`] and [`crate::task`]; this module only parses arguments
//! and wires them into that layer.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{AlgoMode, BackendCfg, GilbertCfg, Project, Resources, RuntimeCfg, StateCfg, Task};
use crate::error::{CssfError, Result};
use crate::runner::{self, RunOptions};

#[derive(Parser)]
#[command(name = "cssfinder", about = "Closest separable state finder")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a new, empty project file.
    Init {
        #[arg(long, default_value = "cssfproject.json")]
        project: PathBuf,
        #[arg(long)]
        name: String,
    },
    /// Add a task to an existing project.
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },
    /// Run one or all tasks in a project.
    Run {
        #[arg(long, default_value = "cssfproject.json")]
        project: PathBuf,
        #[arg(long, value_name = "NAME_OR_SUBSTRING")]
        r#match: Option<String>,
        #[arg(long)]
        force_sequential: bool,
        #[arg(long)]
        max_parallel: Option<usize>,
        #[arg(long, default_value = "output")]
        output: PathBuf,
    },
    /// Summarize the corrections recorded for a completed or in-progress run.
    Report {
        #[arg(long, default_value = "cssfproject.json")]
        project: PathBuf,
        #[arg(long, value_name = "NAME_OR_SUBSTRING")]
        r#match: String,
        #[arg(long, default_value = "output")]
        output: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum TaskAction {
    Add {
        #[arg(long, default_value = "cssfproject.json")]
        project: PathBuf,
        #[arg(long)]
        name: String,
        #[arg(long, value_enum)]
        mode: CliAlgoMode,
        #[arg(long)]
        target: PathBuf,
        #[arg(long)]
        visibility: f64,
        #[arg(long)]
        max_epochs: Option<u64>,
        #[arg(long)]
        iterations_per_epoch: Option<u64>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub enum CliAlgoMode {
    Fsnqd,
    Sbipa,
    G3pae3qd,
    G4pae3qd,
}

impl From<CliAlgoMode> for AlgoMode {
    fn from(m: CliAlgoMode) -> Self {
        match m {
            CliAlgoMode::Fsnqd => AlgoMode::FSnQd,
            CliAlgoMode::Sbipa => AlgoMode::SBiPa,
            CliAlgoMode::G3pae3qd => AlgoMode::G3PaE3qD,
            CliAlgoMode::G4pae3qd => AlgoMode::G4PaE3qD,
        }
    }
}

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Init { project, name } => cmd_init(&project, &name),
        Command::Task {
            action: TaskAction::Add {
                project,
                name,
                mode,
                target,
                visibility,
                max_epochs,
                iterations_per_epoch,
            },
        } => cmd_task_add(
            &project,
            name,
            mode.into(),
            target,
            visibility,
            max_epochs,
            iterations_per_epoch,
        ),
        Command::Run {
            project,
            r#match,
            force_sequential,
            max_parallel,
            output,
        } => cmd_run(&project, r#match, force_sequential, max_parallel, output),
        Command::Report {
            project,
            r#match,
            output,
        } => cmd_report(&project, &r#match, &output),
    }
}

fn cmd_init(project_path: &PathBuf, name: &str) -> Result<()> {
    if project_path.exists() {
        return Err(CssfError::Config(format!(
            "project file {} already exists",
            project_path.display()
        )));
    }
    let project = Project {
        name: name.to_string(),
        tasks: Vec::new(),
        resources: Resources::default(),
    };
    project.save(project_path)
}

#[allow(clippy::too_many_arguments)]
fn cmd_task_add(
    project_path: &PathBuf,
    name: String,
    mode: AlgoMode,
    target: PathBuf,
    visibility: f64,
    max_epochs: Option<u64>,
    iterations_per_epoch: Option<u64>,
) -> Result<()> {
    let mut project = Project::load(project_path)?;

    let mut runtime = RuntimeCfg::default();
    if let Some(e) = max_epochs {
        runtime.max_epochs = e;
    }
    if let Some(i) = iterations_per_epoch {
        runtime.iterations_per_epoch = i;
    }

    let task = Task {
        name,
        gilbert: GilbertCfg {
            mode,
            backend: BackendCfg::default(),
            state: StateCfg {
                target,
                depth: None,
                quantity: None,
                visibility,
                symmetries: None,
                projection: None,
            },
            runtime,
        },
    };
    task.validate()?;
    project.tasks.push(task);
    project.save(project_path)
}

fn cmd_run(
    project_path: &PathBuf,
    selector: Option<String>,
    force_sequential: bool,
    max_parallel: Option<usize>,
    output: PathBuf,
) -> Result<()> {
    let project = Project::load(project_path)?;
    let max_parallel = max_parallel.or(project.resources.max_parallel);
    let options = RunOptions {
        selector,
        force_sequential,
        max_parallel,
        output_root: output,
    };
    runner::run_project(&project, &options)
}

fn cmd_report(project_path: &PathBuf, selector: &str, output: &PathBuf) -> Result<()> {
    let project = Project::load(project_path)?;
    let task = project.select(selector)?;
    let corrections_path = output.join(&task.name).join("corrections.json");
    let log = crate::state::CorrectionLog::load(&corrections_path)?;

    println!("task: {}", task.name);
    println!("corrections accepted: {}", log.len());
    if let Some(first) = log.iter().next() {
        println!("first residual^2: {:.6}", first.residual_squared_norm);
    }
    if let Some(last) = log.last() {
        println!("last residual^2: {:.6}", last.residual_squared_norm);
    }
    Ok(())
}
