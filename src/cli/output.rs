// src/cli/output.rs
use console::{measure_text_width, pad_str, Alignment, Style};
use serde_json::json;

use crate::models::Record;
use crate::utils::truncate_string;

use super::handlers::Outcome;

const MAX_CELL_WIDTH: usize = 72;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelKind {
    Info,
    Warning,
    Error,
}

impl PanelKind {
    fn title(&self) -> &'static str {
        match self {
            PanelKind::Info => "Info",
            PanelKind::Warning => "Warning",
            PanelKind::Error => "Error",
        }
    }

    fn border(&self) -> Style {
        match self {
            PanelKind::Info => Style::new().white(),
            PanelKind::Warning => Style::new().yellow(),
            PanelKind::Error => Style::new().red(),
        }
    }
}

/// Boxed message with the title set into the top border.
pub fn panel(kind: PanelKind, message: &str) -> String {
    let border = kind.border();
    let title = format!(" {} ", kind.title());
    let lines: Vec<&str> = message.lines().collect();
    let inner = lines
        .iter()
        .map(|line| measure_text_width(line))
        .max()
        .unwrap_or(0)
        .max(measure_text_width(&title) + 1);

    let mut out = String::new();
    out.push_str(&border.apply_to("╭─").to_string());
    out.push_str(&border.apply_to(&title).to_string());
    out.push_str(
        &border
            .apply_to(format!("{}╮", "─".repeat(inner + 1 - measure_text_width(&title))))
            .to_string(),
    );
    out.push('\n');

    for line in lines {
        out.push_str(&border.apply_to("│ ").to_string());
        out.push_str(&Style::new().bold().apply_to(pad_str(line, inner, Alignment::Left, None)).to_string());
        out.push_str(&border.apply_to(" │").to_string());
        out.push('\n');
    }

    out.push_str(&border.apply_to(format!("╰{}╯", "─".repeat(inner + 2))).to_string());
    out
}

/// `* field: value` lines, one per field.
pub fn record_details(record: &Record) -> String {
    record
        .iter()
        .map(|(name, value)| format!("* {}: {}", name, value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Numbered table with one summary cell per record.
pub fn listing(title: &str, records: &[Record]) -> String {
    let cells: Vec<String> = records
        .iter()
        .map(|record| truncate_string(&record.summary(), MAX_CELL_WIDTH))
        .collect();
    let number_width = records.len().to_string().len().max(1);
    let cell_width = cells
        .iter()
        .map(|cell| measure_text_width(cell))
        .max()
        .unwrap_or(0)
        .max(measure_text_width(title));

    let dim = Style::new().dim();
    let bold = Style::new().bold();
    let rule = format!(
        "{}─┼─{}",
        "─".repeat(number_width),
        "─".repeat(cell_width)
    );

    let mut out = vec![
        format!(
            "{} │ {}",
            dim.apply_to(pad_str("#", number_width, Alignment::Right, None)),
            bold.apply_to(title)
        ),
        rule,
    ];
    for (index, cell) in cells.iter().enumerate() {
        out.push(format!(
            "{} │ {}",
            dim.apply_to(pad_str(&(index + 1).to_string(), number_width, Alignment::Right, None)),
            cell
        ));
    }
    out.join("\n")
}

/// Human-readable rendering of an outcome, with the panel it belongs in.
pub fn render(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Created(record) | Outcome::Shown(record) | Outcome::Updated(record) => {
            panel(PanelKind::Info, &record_details(record))
        }
        Outcome::Listed { model, records } if records.is_empty() => {
            panel(PanelKind::Warning, &format!("No {} instances found.", model))
        }
        Outcome::Listed { model, records } => listing(model, records),
        Outcome::Deleted { model, id } => panel(
            PanelKind::Info,
            &format!("{} with ID {} deleted successfully.", model, id),
        ),
    }
}

pub fn to_json(outcome: &Outcome) -> serde_json::Result<String> {
    let value = match outcome {
        Outcome::Created(record) | Outcome::Shown(record) | Outcome::Updated(record) => {
            serde_json::to_value(record)?
        }
        Outcome::Listed { records, .. } => serde_json::to_value(records)?,
        Outcome::Deleted { id, .. } => json!({ "deleted": id }),
    };
    serde_json::to_string_pretty(&value)
}

pub fn print_outcome(outcome: &Outcome, as_json: bool) -> serde_json::Result<()> {
    if as_json {
        println!("{}", to_json(outcome)?);
    } else {
        println!("{}", render(outcome));
    }
    Ok(())
}

pub fn print_error(message: &str) {
    eprintln!("{}", panel(PanelKind::Error, message));
}
