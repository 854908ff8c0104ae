use anyhow::{Context, Result};
use console::style;
use log::info;
use std::io::Write;
use std::path::Path;

fn bright_green(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).bright().green()
}

fn dim(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).dim()
}

fn magenta_bold(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).magenta().bold()
}

/// Prints the banner to stderr so it never mixes with exposition output.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("📈 ado-exporter"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("Azure DevOps CI/CD metrics exporter")
    );
}

/// One-line summary of a one-shot collection, on stderr.
pub fn print_collect_summary(metric_count: usize, elapsed: std::time::Duration) {
    eprintln!(
        "  {} {}",
        bright_green(format!("Collected {metric_count} metrics ✓")),
        dim(format!("in {:.1}s", elapsed.as_secs_f64()))
    );
}

/// Joins rendered metric lines into an exposition body, each line
/// newline-terminated.
pub fn render_exposition(lines: &[String]) -> String {
    let mut body = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
    for line in lines {
        body.push_str(line);
        body.push('\n');
    }
    body
}

/// Writes the exposition to `path`, or to stdout when no path is given.
pub fn write_exposition(lines: &[String], path: Option<&Path>) -> Result<()> {
    let body = render_exposition(lines);

    if let Some(path) = path {
        std::fs::write(path, body)
            .with_context(|| format!("Failed to write metrics to: {}", path.display()))?;
        info!("Metrics written to: {}", path.display());
    } else {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(body.as_bytes())
            .context("Failed to write metrics to stdout")?;
        stdout.flush()?;
    }

    Ok(())
}
