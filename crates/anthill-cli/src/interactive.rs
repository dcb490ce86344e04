//! Terminal side of a delivery run.
//!
//! Prints the plan grouped by action and asks for confirmation with
//! dialoguer when the workflow needs it.

use std::fmt::Write as _;
use std::io::{self, Write};

use console::style;
use dialoguer::{Confirm, theme::ColorfulTheme};

use anthill_core::error::DeliverError;
use anthill_core::fs::format_size;
use anthill_core::reconcile::{Action, Interaction, Plan, PlannedItem};

/// Operator prompts on the terminal.
pub struct TerminalOperator<W: Write = io::Stdout> {
    /// Output writer (for testing)
    writer: W,
    /// List up-to-date items too
    verbose: bool,
    theme: ColorfulTheme,
}

impl TerminalOperator<io::Stdout> {
    pub fn new(verbose: bool) -> Self {
        Self {
            writer: io::stdout(),
            verbose,
            theme: ColorfulTheme::default(),
        }
    }
}

impl<W: Write> TerminalOperator<W> {
    /// Create an operator with a custom writer (for testing).
    #[cfg(test)]
    pub fn with_writer(writer: W, verbose: bool) -> Self {
        Self {
            writer,
            verbose,
            theme: ColorfulTheme::default(),
        }
    }
}

impl<W: Write> Interaction for TerminalOperator<W> {
    fn present(&mut self, plan: &Plan) {
        let text = render_plan(plan, self.verbose);
        if let Err(e) = self.writer.write_all(text.as_bytes()) {
            tracing::warn!("Failed to print plan: {e}");
        }
    }

    fn confirm(&mut self, question: &str) -> Result<bool, DeliverError> {
        Confirm::with_theme(&self.theme)
            .with_prompt(question)
            .default(true)
            .interact()
            .map_err(|e| DeliverError::Config(format!("Failed to read answer: {e}")))
    }
}

fn heading(action: Action) -> &'static str {
    match action {
        Action::Attach => "Existing bundles to attach:",
        Action::Upload => "Bundles to upload:",
        Action::Create => "Functions to create:",
        Action::Update => "Functions to update:",
        Action::Skip => "Up to date:",
    }
}

fn item_line(item: &PlannedItem) -> String {
    match item.action {
        Action::Attach | Action::Upload => format!(
            "  {} [{}] {}",
            item.name,
            style(&item.digest).dim(),
            format_size(item.size)
        ),
        _ => format!("  [{}]", item.name),
    }
}

/// Plan text, groups in execution order.
pub fn render_plan(plan: &Plan, verbose: bool) -> String {
    let mut out = String::new();
    for (action, items) in plan.groups() {
        if action == Action::Skip && !verbose {
            continue;
        }
        let _ = writeln!(out, "{}", style(heading(action)).bold());
        for item in items {
            let _ = writeln!(out, "{}", item_line(item));
        }
        if action == Action::Upload {
            let _ = writeln!(
                out,
                "Total size: {}",
                style(format_size(plan.total_size(Action::Upload))).cyan()
            );
        }
    }
    out
}
