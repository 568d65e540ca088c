use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use std::path::Path;
use std::time::Duration;

use crate::artifact::CodeArtifact;
use crate::log::{PipelineLog, StageStatus};
use crate::pipeline::StageObserver;
use crate::prompt;
use crate::wire::{PipelineResult, Stage, StageOutcome};

fn step_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Explain => "Step 1: analysing vibe coding concepts",
        Stage::Design => "Step 2: designing prompts",
        Stage::Implement => "Step 3: implementing and optimising code",
    }
}

/// One spinner per stage on stderr.
#[derive(Default)]
pub struct SpinnerObserver {
    current: Mutex<Option<ProgressBar>>,
}

impl SpinnerObserver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StageObserver for SpinnerObserver {
    fn stage_started(&self, stage: Stage) {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})") {
            pb.set_style(style);
        }
        pb.set_message(format!("{} ({} is working)", step_label(stage), prompt::persona(stage).name));
        pb.enable_steady_tick(Duration::from_millis(120));
        *self.current.lock() = Some(pb);
    }

    fn stage_finished(&self, stage: Stage, outcome: &StageOutcome) {
        if let Some(pb) = self.current.lock().take() {
            let mark = match outcome {
                StageOutcome::Generated(_) => "✔".green().bold(),
                StageOutcome::Skipped => "–".dimmed(),
                _ => "✘".red().bold(),
            };
            pb.finish_with_message(format!("{} {}", mark, step_label(stage)));
        }
    }

    fn run_aborted(&self) {
        if let Some(pb) = self.current.lock().take() {
            pb.abandon_with_message(format!("{} pipeline aborted", "✘".red().bold()));
        }
    }
}

pub fn print_result(result: &PipelineResult, log: Option<&PipelineLog>) {
    println!("\n{}", "=== Coaching team results ===".bold());
    match log {
        Some(l) if l.failed_stages() == 0 => {
            println!("{}", "All three coaches completed their analysis.".green())
        }
        Some(l) => println!(
            "{}",
            format!("{} of 3 stages did not complete; see the messages below.", l.failed_stages()).yellow()
        ),
        None => println!("{}", "The coaching run failed before completing.".red()),
    }

    for stage in Stage::ORDER {
        let name = prompt::persona(stage).name;
        let header = match stage {
            Stage::Explain => format!("🧠 {name}").blue().bold(),
            Stage::Design => format!("💡 {name}").magenta().bold(),
            Stage::Implement => format!("⚡ {name}").yellow().bold(),
        };
        let failed = log
            .and_then(|l| l.steps.iter().find(|s| s.stage == stage))
            .map(|s| s.status != StageStatus::Success)
            .unwrap_or(true);
        println!("\n{}", "─".repeat(60).dimmed());
        println!("{header}");
        println!("{}", "─".repeat(60).dimmed());
        if failed {
            println!("{}", result.get(stage).red());
        } else {
            println!("{}", result.get(stage));
        }
    }
    println!();
}

pub fn print_saved_artifact(path: &Path) {
    println!("{} {}", "Code saved to".green().bold(), path.display());
}

pub fn print_code_hint(art: &CodeArtifact) {
    println!(
        "{} {} ({} lines); pass --save-code to write it",
        "Code available:".green().bold(),
        art.file_name,
        art.content.lines().count()
    );
}

pub fn print_no_artifact() {
    println!(
        "{}",
        "No downloadable code was found. Check the Implementation Coach's answer.".yellow()
    );
}

pub fn print_missing_fields(category: &str, missing: &[&str]) {
    eprintln!(
        "{} {} requires: {}",
        "error:".red().bold(),
        category,
        missing.join(", ")
    );
    eprintln!("pass them with --field KEY=VALUE, or use --allow-missing");
}
