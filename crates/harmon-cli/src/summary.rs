use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::types::RunResult;

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

pub fn print_summary(result: &RunResult) {
    println!("Project: {}", result.project);
    if result.dry_run {
        println!("Dry run: no files written");
    } else {
        println!("Output: {}", result.output_dir.display());
    }

    let report = &result.report;
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Rules"),
        header_cell("Applied"),
        header_cell("Skipped"),
        header_cell("Records"),
        header_cell("Diagnostics"),
    ]);
    apply_table_style(&mut table);
    for column in 0..5 {
        if let Some(column) = table.column_mut(column) {
            column.set_cell_alignment(CellAlignment::Right);
        }
    }
    table.add_row(vec![
        Cell::new(report.total_rules),
        Cell::new(report.applied).fg(Color::Green),
        Cell::new(report.skipped).fg(Color::Yellow),
        Cell::new(report.records_written),
        count_cell(report.diagnostics.len()),
    ]);
    println!("{table}");

    print_diagnostic_table(result);
    for path in &result.written {
        println!("wrote {}", path.display());
    }
}

fn print_diagnostic_table(result: &RunResult) {
    if result.report.diagnostics.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Schema"),
        header_cell("Variable"),
        header_cell("Message"),
    ]);
    apply_table_style(&mut table);
    for diagnostic in &result.report.diagnostics {
        table.add_row(vec![
            Cell::new(&diagnostic.schema),
            Cell::new(&diagnostic.variable),
            Cell::new(&diagnostic.message).fg(Color::Red),
        ]);
    }
    println!("{table}");
}

fn header_cell(text: &str) -> Cell {
    Cell::new(text).add_attribute(Attribute::Bold)
}

fn count_cell(count: usize) -> Cell {
    if count == 0 {
        Cell::new(count)
    } else {
        Cell::new(count).fg(Color::Red)
    }
}
