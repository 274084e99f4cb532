use tokio::sync::broadcast;

use crate::runner::scenario::ScenarioStatus;
use crate::runner::suite::SuiteSummary;

/// Run progress events for real-time console output.
#[derive(Debug, Clone)]
pub enum TestEvent {
    SuiteStarted {
        run_id: String,
        suite: String,
        site: String,
        scenario_count: usize,
    },
    SuiteFinished {
        summary: SuiteSummary,
    },

    ScenarioStarted {
        name: String,
        browser: String,
        index: usize,
        total: usize,
        step_count: usize,
    },
    ScenarioFinished {
        name: String,
        status: ScenarioStatus,
        duration_ms: Option<u64>,
    },

    StepStarted {
        scenario: String,
        index: usize,
        display: String,
    },
    StepPassed {
        scenario: String,
        index: usize,
        duration_ms: u64,
    },
    StepFailed {
        scenario: String,
        index: usize,
        error: String,
        duration_ms: u64,
    },
    StepSkipped {
        scenario: String,
        index: usize,
        reason: String,
    },

    /// Advisory text attached to a scenario, pre or post execution.
    Advisory {
        scenario: String,
        stage: String,
        text: String,
    },

    Log {
        message: String,
    },
}

/// Event emitter for broadcasting run events. Emitting with no listener
/// attached is a no-op.
#[derive(Clone)]
pub struct EventEmitter {
    sender: broadcast::Sender<TestEvent>,
}

impl EventEmitter {
    pub fn new() -> (Self, broadcast::Receiver<TestEvent>) {
        let (sender, receiver) = broadcast::channel(100);
        (Self { sender }, receiver)
    }

    pub fn emit(&self, event: TestEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TestEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }
}

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration as StdDuration;

/// Console event listener for printing real-time updates.
pub struct ConsoleEventListener;

impl ConsoleEventListener {
    pub async fn listen(mut receiver: broadcast::Receiver<TestEvent>) {
        use colored::Colorize;
        use indicatif::ProgressDrawTarget;
        use std::io::IsTerminal;

        // Hidden draw target when piped, so logs stay free of escape codes
        let multi = if std::io::stdout().is_terminal() {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        let mut spinner: Option<ProgressBar> = None;
        let mut step_text = String::new();

        while let Ok(event) = receiver.recv().await {
            match event {
                TestEvent::SuiteStarted {
                    run_id,
                    suite,
                    site,
                    scenario_count,
                } => {
                    multi
                        .println(format!(
                            "\n{} Suite {} on {} ({} scenarios) [{}]",
                            "▶".green().bold(),
                            suite.white().bold(),
                            site.cyan(),
                            scenario_count,
                            run_id.dimmed()
                        ))
                        .ok();
                }

                TestEvent::SuiteFinished { summary } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish();
                    }
                    // Let the last spinner frame render before the summary
                    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

                    println!("\n{} Suite finished", "■".blue().bold());
                    println!("  Scenarios: {}", summary.total);
                    println!(
                        "  {} passed, {} failed",
                        summary.passed.to_string().green(),
                        summary.failed.to_string().red()
                    );
                    println!("  Duration: {}ms", summary.total_duration_ms);
                }

                TestEvent::ScenarioStarted {
                    name,
                    browser,
                    index,
                    total,
                    step_count,
                } => {
                    println!(
                        "\n  {} [{}/{}] {} on {} ({} steps)",
                        "→".blue(),
                        index + 1,
                        total,
                        name.white().bold(),
                        browser,
                        step_count
                    );
                }

                TestEvent::ScenarioFinished {
                    name,
                    status,
                    duration_ms,
                } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish();
                    }
                    let status_str = match status {
                        ScenarioStatus::Succeeded => "PASSED".green().bold(),
                        ScenarioStatus::Failed => "FAILED".red().bold(),
                    };
                    print!("  {} {} [{}]", "←".blue(), name, status_str);
                    if let Some(duration) = duration_ms {
                        print!(" {}ms", duration);
                    }
                    println!();
                }

                TestEvent::StepStarted { index, display, .. } => {
                    let pb = multi.add(ProgressBar::new_spinner());
                    let style = ProgressStyle::default_spinner()
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                        .template("    {spinner} {msg}")
                        .unwrap();
                    pb.set_style(style);

                    let body = format!("[{}] {}... ", index, display.dimmed());
                    pb.set_message(body.clone());
                    pb.enable_steady_tick(StdDuration::from_millis(100));

                    spinner = Some(pb);
                    step_text = body;
                }

                TestEvent::StepPassed { duration_ms, .. } => {
                    let done_msg =
                        format!("    {} {}({}ms)", "✓".green(), step_text, duration_ms);
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
                    }
                    println!("{}", done_msg);
                }

                TestEvent::StepFailed {
                    error, duration_ms, ..
                } => {
                    if let Some(pb) = spinner.take() {
                        let style = ProgressStyle::default_spinner()
                            .template("    {msg}")
                            .unwrap();
                        pb.set_style(style);
                        pb.finish_with_message(format!(
                            "{} {}({}ms)",
                            "✗".red(),
                            step_text,
                            duration_ms
                        ));
                    } else {
                        println!("    {} {}({}ms)", "✗".red(), step_text, duration_ms);
                    }
                    multi
                        .println(format!("      {}", error.red().dimmed()))
                        .ok();
                }

                TestEvent::StepSkipped { reason, .. } => {
                    let done_msg = format!(
                        "    {} {}({})",
                        "○".yellow(),
                        step_text,
                        reason.dimmed()
                    );
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
                    }
                    println!("{}", done_msg);
                }

                TestEvent::Advisory { stage, text, .. } => {
                    let trimmed: String = text.chars().take(200).collect();
                    multi
                        .println(format!(
                            "      {} {}: {}",
                            "ⓘ".cyan(),
                            format!("advisory ({})", stage).cyan(),
                            trimmed.dimmed()
                        ))
                        .ok();
                }

                TestEvent::Log { message } => {
                    multi.println(format!("      {}", message)).ok();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_listener_is_a_noop() {
        let emitter = EventEmitter::default();
        emitter.emit(TestEvent::Log {
            message: "nobody listening".to_string(),
        });
    }

    #[tokio::test]
    async fn test_subscribers_receive_emitted_events() {
        let (emitter, mut receiver) = EventEmitter::new();
        emitter.emit(TestEvent::StepStarted {
            scenario: "product_search".to_string(),
            index: 0,
            display: "Search for \"sneakers\"".to_string(),
        });

        match receiver.recv().await.unwrap() {
            TestEvent::StepStarted { index, display, .. } => {
                assert_eq!(index, 0);
                assert!(display.contains("sneakers"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
