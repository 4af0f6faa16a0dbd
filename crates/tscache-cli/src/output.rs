//! Output format selection and printing helpers

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::io::{IsTerminal, Write};

/// Output format for command results
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// Pretty-printed JSON
    Json,
}

/// `--format` flag shared by commands that print results.
#[derive(Args, Clone, Debug, Default)]
pub struct FormatArg {
    /// Output format (defaults to JSON when stdout is not a terminal)
    #[arg(short = 'f', long = "format", value_enum, env = "TSCACHE_OUTPUT_FORMAT")]
    pub format: Option<OutputFormat>,
}

impl FormatArg {
    /// The explicit format, or one chosen from whether stdout is a terminal.
    pub fn resolve(&self) -> OutputFormat {
        self.format.unwrap_or_else(|| {
            if std::io::stdout().is_terminal() {
                OutputFormat::Text
            } else {
                OutputFormat::Json
            }
        })
    }
}

/// Print any serializable value as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

/// Print a plain list, one entry per line, or as a JSON array.
pub fn print_list(items: &[String], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(items),
        OutputFormat::Text => {
            let mut stdout = std::io::stdout().lock();
            for item in items {
                writeln!(stdout, "{item}")?;
            }
            Ok(())
        },
    }
}

/// Group digits in thousands: `1234567` becomes `1,234,567`.
pub fn thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
