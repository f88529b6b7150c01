//! Terminal rendering and the input loop
//!
//! Everything here is presentation: parse a line, call the controller, print
//! what changed.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;

use tutor_core::{
    ChatMessage, ChatSession, ClassroomService, DashboardPhase, DashboardSnapshot, DashboardSync,
    FeedbackOutcome, SubmitOutcome, TutorService,
};

/// How often the typing label is redrawn while a question is pending
const REDRAW_INTERVAL: Duration = Duration::from_millis(250);

const HELP: &str = "Commands: /yes N, /no N, /history, /dashboard, /retry, /quit";

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    /// A question for the tutor
    Ask(String),
    /// Rate turn `index` (zero-based)
    Feedback { index: usize, helpful: bool },
    /// Reprint the conversation
    History,
    /// Print the dashboard
    Dashboard,
    /// Reload the dashboard after a failed load
    Retry,
    /// Leave
    Quit,
    /// Unrecognized slash command
    Unknown(String),
}

impl ReplCommand {
    /// Parse a line; turn numbers are shown to the user starting from 1
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Self::Ask(line.to_string());
        };

        let mut parts = rest.split_whitespace();
        let verb = parts.next().unwrap_or_default();
        let arg = parts.next();

        match (verb, arg) {
            ("yes" | "no", Some(n)) => match n.parse::<usize>() {
                Ok(n) if n > 0 => Self::Feedback {
                    index: n - 1,
                    helpful: verb == "yes",
                },
                _ => Self::Unknown(trimmed.to_string()),
            },
            ("history", None) => Self::History,
            ("dashboard", None) => Self::Dashboard,
            ("retry", None) => Self::Retry,
            ("quit" | "exit", None) => Self::Quit,
            _ => Self::Unknown(trimmed.to_string()),
        }
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Render one turn with its display number
pub fn render_message(number: usize, message: &ChatMessage) -> String {
    let mut out = String::new();
    if message.from_bot {
        let _ = write!(out, "[{number}] tutor: {}", message.text);
        if !message.sources.is_empty() {
            let _ = write!(out, "\n      sources: {}", message.sources.join(", "));
        }
        match (message.feedback_given, message.helpful) {
            (true, Some(true)) => out.push_str("\n      (rated helpful)"),
            (true, _) => out.push_str("\n      (rated not helpful)"),
            (false, _) => {
                let _ = write!(out, "\n      helpful? /yes {number}  /no {number}");
            }
        }
    } else {
        let _ = write!(out, "[{number}] you: {}", message.text);
    }
    out
}

/// Render the dashboard as plain text
pub fn render_dashboard(snapshot: &DashboardSnapshot) -> String {
    let mut out = String::from("== Teacher Dashboard ==\n");

    match &snapshot.phase {
        DashboardPhase::Loading => {
            out.push_str("Loading...\n");
            return out;
        }
        DashboardPhase::Error(message) => {
            let _ = writeln!(out, "Error: {message}");
            return out;
        }
        DashboardPhase::Ready => {}
    }

    out.push_str("\nResources:\n");
    if snapshot.resources.is_empty() {
        out.push_str("  (none)\n");
    }
    for resource in &snapshot.resources {
        let _ = writeln!(out, "  {} ({})", resource.name, resource.download_path());
    }

    out.push_str("\nProgress:\n");
    if snapshot.progress.is_empty() {
        out.push_str("  (none)\n");
    }
    for record in &snapshot.progress {
        let _ = writeln!(
            out,
            "  {}: {}/{} ({}%)",
            record.student,
            record.completed,
            record.total,
            record.percent_complete()
        );
    }

    out.push_str("\nFeedback:\n");
    match &snapshot.analytics {
        None => out.push_str("  (unavailable)\n"),
        Some(analytics) => {
            let total = analytics.total_feedback;
            let _ = writeln!(
                out,
                "  overall: {} helpful, {} not helpful, {} total",
                total.helpful, total.not_helpful, total.total
            );
            for (lesson, tally) in &analytics.lesson_feedback {
                let _ = writeln!(
                    out,
                    "  {lesson}: {} helpful, {} not helpful",
                    tally.helpful, tally.not_helpful
                );
            }
        }
    }

    if let Some(at) = snapshot.last_refreshed {
        let _ = writeln!(out, "\nLast refreshed {}", at.format("%H:%M:%S UTC"));
    }
    out
}

// ============================================================================
// Chat
// ============================================================================

/// Interactive chat; the dashboard syncs in the background on the same bus
pub async fn run_chat<S, C>(chat: Arc<ChatSession<S>>, dashboard: &DashboardSync<C>) -> Result<()>
where
    S: TutorService + 'static,
    C: ClassroomService + 'static,
{
    let (history_loaded, dashboard_ready) = tokio::join!(chat.load_history(), dashboard.mount());
    if !history_loaded {
        println!("(could not load earlier messages)");
    }
    if !dashboard_ready {
        tracing::warn!("Dashboard failed to load");
        println!("(dashboard unavailable, /retry to load it again)");
    }

    let mut printed = print_new(&chat, 0);
    println!("{HELP}");

    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    while let Some(line) = lines.next().await {
        let line = line?;
        match ReplCommand::parse(&line) {
            ReplCommand::Ask(question) => {
                let outcome = ask(&chat, &question).await;
                if outcome == SubmitOutcome::Rejected {
                    continue;
                }
                printed = print_new(&chat, printed);
            }
            ReplCommand::Feedback { index, helpful } => {
                match chat.submit_feedback(index, helpful).await {
                    FeedbackOutcome::Ignored => println!("Turn {} cannot be rated", index + 1),
                    FeedbackOutcome::Delivered => println!("Thanks for the feedback"),
                    FeedbackOutcome::DeliveryFailed => {
                        println!("Feedback saved locally; the service did not accept it");
                    }
                }
            }
            ReplCommand::History => {
                printed = print_new(&chat, 0);
            }
            ReplCommand::Dashboard => print!("{}", render_dashboard(&dashboard.snapshot())),
            ReplCommand::Retry => {
                if matches!(dashboard.phase(), DashboardPhase::Error(_)) {
                    dashboard.retry().await;
                    print!("{}", render_dashboard(&dashboard.snapshot()));
                } else {
                    println!("The dashboard has not failed; nothing to retry");
                }
            }
            ReplCommand::Quit => break,
            ReplCommand::Unknown(command) => println!("Unknown command {command}. {HELP}"),
        }
    }

    chat.dispose();
    Ok(())
}

/// Submit and redraw the typing label until the answer lands
async fn ask<S: TutorService + 'static>(chat: &ChatSession<S>, question: &str) -> SubmitOutcome {
    let submit = chat.submit(question);
    tokio::pin!(submit);

    let mut redraw = tokio::time::interval(REDRAW_INTERVAL);
    let mut shown: Option<String> = None;
    loop {
        tokio::select! {
            outcome = &mut submit => {
                if shown.is_some() {
                    eprint!("\r{:width$}\r", "", width = 20);
                }
                return outcome;
            }
            _ = redraw.tick() => {
                let label = chat.typing_label();
                if label != shown {
                    if let Some(text) = &label {
                        eprint!("\r{text:<20}");
                    }
                    shown = label;
                }
            }
        }
    }
}

/// Print turns from `from` onward; returns how many turns exist
fn print_new<S: TutorService + 'static>(chat: &ChatSession<S>, from: usize) -> usize {
    let messages = chat.messages();
    for (index, message) in messages.iter().enumerate().skip(from) {
        println!("{}", render_message(index + 1, message));
    }
    messages.len()
}

// ============================================================================
// Dashboard
// ============================================================================

/// Print the dashboard once, or on every refresh with `watch`
///
/// A failed load offers a retry on Enter until it succeeds or stdin closes.
pub async fn run_dashboard<C: ClassroomService + 'static>(
    dashboard: &DashboardSync<C>,
    watch: bool,
) -> Result<()> {
    let mut updates = dashboard.updates();
    dashboard.mount().await;
    print!("{}", render_dashboard(&dashboard.snapshot()));

    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    while matches!(dashboard.phase(), DashboardPhase::Error(_)) {
        println!("Press Enter to retry, Ctrl-D to quit");
        match lines.next().await {
            Some(line) => {
                line?;
            }
            None => break,
        }
        dashboard.retry().await;
        print!("\n{}", render_dashboard(&dashboard.snapshot()));
    }

    if watch && dashboard.phase().is_ready() {
        updates.borrow_and_update();
        loop {
            tokio::select! {
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    updates.borrow_and_update();
                    print!("\n{}", render_dashboard(&dashboard.snapshot()));
                }
                _ = tokio::signal::ctrl_c() => break,
            }
        }
    }

    dashboard.unmount();
    Ok(())
}
