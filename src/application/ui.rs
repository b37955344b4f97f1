#[cfg(test)]
#[path = "ui_test.rs"]
mod tests;

use std::io;
use std::io::Write;

use anyhow::Result;
use chrono::Local;
use chrono::TimeZone;
use tokio::sync::mpsc;
use yansi::Paint;

use crate::domain::models::Event;
use crate::domain::models::EventKind;
use crate::domain::models::GenerationStatus;
use crate::domain::models::Problem;
use crate::domain::models::StreamEvent;

fn kind_label(kind: EventKind) -> String {
    let label = format!("[{kind}]");
    let painted = match kind {
        EventKind::Info => Paint::blue(label),
        EventKind::Progress => Paint::cyan(label),
        EventKind::Error => Paint::red(label),
        EventKind::Complete => Paint::green(label),
        EventKind::Content => Paint::white(label),
    };

    return painted.to_string();
}

fn format_time(timestamp: i64) -> String {
    return match Local.timestamp_millis_opt(timestamp).single() {
        Some(time) => time.format("%H:%M:%S").to_string(),
        None => "--:--:--".to_string(),
    };
}

/// One line of the generation log, counts appended when the server sent any.
pub fn format_log_line(event: &StreamEvent) -> String {
    let mut line = format!(
        "{} {} {}",
        format_time(event.timestamp),
        kind_label(event.kind),
        event.content
    );

    if event.has_counts() {
        let mut counts = vec![];
        if let Some(success_count) = event.success_count {
            counts.push(format!("成功: {success_count}"));
        }
        if let Some(failed_count) = event.failed_count {
            counts.push(format!("失败: {failed_count}"));
        }
        if let Some(total) = event.total {
            counts.push(format!("总计: {total}"));
        }
        line = format!("{line} ({})", counts.join(" | "));
    }

    return line;
}

pub fn render_event(out: &mut impl Write, event: &Event) -> Result<()> {
    match event {
        Event::GenerationStarted() => {
            writeln!(out, "{}", Paint::new("Generating answers...").bold())?;
        }
        Event::GenerationLog(log) => {
            writeln!(out, "{}", format_log_line(log))?;
        }
        Event::GenerationFinished(outcome) => {
            if outcome.status() == GenerationStatus::Completed {
                writeln!(out, "{}", Paint::green(outcome.message()))?;
            } else {
                writeln!(out, "{}", Paint::red(outcome.message()))?;
            }
        }
        Event::ChatDelta(delta) => {
            write!(out, "{delta}")?;
        }
        Event::ChatFinished(_) => {
            writeln!(out)?;
        }
        Event::ChatFailed(err) => {
            writeln!(out)?;
            writeln!(out, "{}", Paint::red(err))?;
        }
    }

    out.flush()?;
    return Ok(());
}

/// Draws published events to stdout until every sender is gone.
pub async fn render_events(rx: &mut mpsc::UnboundedReceiver<Event>) -> Result<()> {
    while let Some(event) = rx.recv().await {
        render_event(&mut io::stdout(), &event)?;
    }

    return Ok(());
}

pub fn print_problem(problem: &Problem) {
    let mut header = format!("{} · {}", problem.subject, problem.origin);
    if let Some(chapter) = &problem.chapter {
        header = format!("{header} · {chapter}");
    }
    if let Some(section) = &problem.section {
        header = format!("{header} · {section}");
    }

    println!("{}", Paint::new(header).bold());
    println!("{}\n", problem.statement.trim());
}

pub fn print_prompt() -> Result<()> {
    print!("{} ", Paint::blue(">"));
    io::stdout().flush()?;
    return Ok(());
}
