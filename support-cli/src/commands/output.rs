//! Render command output to the terminal

use std::process::ExitCode;

use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use support_plugin_api::CommandOutput;

/// Print `output` and return the process exit code it implies
pub fn render(output: CommandOutput) -> ExitCode {
    match output {
        CommandOutput::Text(text) => println!("{}", text),
        CommandOutput::Table { headers, rows } => println!("{}", build_table(&headers, &rows)),
        CommandOutput::Success => {}
        CommandOutput::Exit(code) => return ExitCode::from(exit_status(code)),
    }
    ExitCode::SUCCESS
}

/// Clamp a command's requested exit code to what the platform accepts
fn exit_status(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}

pub fn build_table(headers: &[String], rows: &[Vec<String>]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(headers.iter().map(|h| Cell::new(h).fg(Color::Cyan)));
    for row in rows {
        table.add_row(row.iter().map(Cell::new));
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_table_contains_cells() {
        let table = build_table(
            &["Plugin".to_string(), "Enabled".to_string()],
            &[
                vec!["docker".to_string(), "true".to_string()],
                vec!["ntfy".to_string(), "false".to_string()],
            ],
        );
        let rendered = table.to_string();

        assert!(rendered.contains("Plugin"));
        assert!(rendered.contains("docker"));
        assert!(rendered.contains("false"));
    }

    #[test]
    fn test_exit_status() {
        assert_eq!(exit_status(0), 0);
        assert_eq!(exit_status(3), 3);
        assert_eq!(exit_status(-1), 1);
        assert_eq!(exit_status(300), 1);
    }
}
