//! Step-by-step build output
//!
//! Every line is a marker plus a message. On a terminal the marker is a
//! coloured glyph; otherwise it is a bracketed tag that survives log files.

use super::context::UiContext;
use console::{style, StyledObject};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Ok,
    Skip,
    Warn,
    Info,
}

impl Marker {
    fn glyph(self) -> &'static str {
        match self {
            Self::Ok => "✓",
            Self::Skip => "-",
            Self::Warn => "!",
            Self::Info => "●",
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Self::Ok => "[OK]",
            Self::Skip => "[SKIP]",
            Self::Warn => "[WARN]",
            Self::Info => "[INFO]",
        }
    }

    fn render(self, ctx: &UiContext) -> StyledObject<&'static str> {
        let text = if ctx.use_fancy_output() {
            self.glyph()
        } else {
            self.tag()
        };
        match self {
            Self::Ok => style(text).green(),
            Self::Skip => style(text).dim(),
            Self::Warn => style(text).yellow(),
            Self::Info => style(text).cyan(),
        }
    }
}

fn step(ctx: &UiContext, marker: Marker, message: &str) {
    println!("  {} {}", marker.render(ctx), message);
}

/// Title line of a command
pub fn intro(ctx: &UiContext, title: &str) {
    let title = style(title).cyan().bold();
    if ctx.use_fancy_output() {
        println!("{} {}", style("┌").dim(), title);
    } else {
        println!("{}\n", title);
    }
}

/// Closing line of a successful command
pub fn outro_success(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        println!("{} {}", style("└").dim(), style(message).green().bold());
    } else {
        println!("\n{} {}", Marker::Ok.render(ctx), message);
    }
}

/// Header for a group of steps, e.g. the stage list
pub fn section(ctx: &UiContext, title: &str) {
    let title = style(title).bold();
    if ctx.use_fancy_output() {
        println!("\n{} {}", style("◆").cyan(), title);
    } else {
        println!("\n{}", title);
    }
}

pub fn step_ok(ctx: &UiContext, message: &str) {
    step(ctx, Marker::Ok, message);
}

/// Finished step with a dimmed detail such as a path
pub fn step_ok_detail(ctx: &UiContext, message: &str, detail: &str) {
    step(ctx, Marker::Ok, &format!("{} ({})", message, style(detail).dim()));
}

/// Stage found complete on disk
pub fn step_skip(ctx: &UiContext, message: &str) {
    step(ctx, Marker::Skip, &style(message).dim().to_string());
}

pub fn step_warn_hint(ctx: &UiContext, message: &str, hint: &str) {
    step(ctx, Marker::Warn, &format!("{} - {}", message, style(hint).dim()));
}

pub fn step_info(ctx: &UiContext, message: &str) {
    step(ctx, Marker::Info, message);
}

pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    if ctx.use_fancy_output() {
        println!("  {}: {}", style(key).dim(), value);
    } else {
        println!("  {}: {}", key, value);
    }
}
