use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ColumnConstraint, ContentArrangement, Table, Width,
};

use cda_core::ProcessorRegistry;
use cda_model::IssueSeverity;

use crate::run::FileReport;

pub fn print_summary(reports: &[FileReport]) {
    println!("{}", summary_table(reports));
    if let Some(table) = warnings_table(reports) {
        println!();
        println!("Warnings:");
        println!("{table}");
    }
    let failures: Vec<&FileReport> = reports.iter().filter(|report| !report.imported).collect();
    if !failures.is_empty() {
        eprintln!("Errors:");
        for report in failures {
            eprintln!("- {}: {}", report.file, report.error.as_deref().unwrap_or("-"));
        }
    }
}

pub fn summary_table(reports: &[FileReport]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("File"),
        header_cell("Status"),
        header_cell("Record"),
        header_cell("Facts"),
        header_cell("Voided"),
        header_cell("Warnings"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Center);
    align_column(&mut table, 3, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Right);
    align_column(&mut table, 5, CellAlignment::Right);

    let mut total_facts = 0usize;
    let mut total_voided = 0usize;
    let mut total_warnings = 0usize;
    for report in reports {
        total_facts += report.facts;
        total_voided += report.voided;
        total_warnings += report.warnings.len();
        table.add_row(vec![
            Cell::new(&report.file),
            status_cell(report.imported),
            report
                .record
                .as_deref()
                .map_or_else(|| dim_cell("-"), Cell::new),
            Cell::new(report.facts),
            count_cell(report.voided, Color::Cyan),
            count_cell(report.warnings.len(), Color::Yellow),
        ]);
    }
    let imported = reports.iter().filter(|report| report.imported).count();
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(format!("{imported}/{}", reports.len())).add_attribute(Attribute::Bold),
        dim_cell("-"),
        Cell::new(total_facts).add_attribute(Attribute::Bold),
        count_cell(total_voided, Color::Cyan).add_attribute(Attribute::Bold),
        count_cell(total_warnings, Color::Yellow).add_attribute(Attribute::Bold),
    ]);
    table
}

/// One row per warning, grouped by file in argument order. `None` when
/// nothing was reported.
pub fn warnings_table(reports: &[FileReport]) -> Option<Table> {
    let rows: Vec<_> = reports
        .iter()
        .flat_map(|report| {
            report
                .warnings
                .iter()
                .map(move |issue| (report.file.as_str(), issue))
        })
        .collect();
    if rows.is_empty() {
        return None;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("File"),
        header_cell("Severity"),
        header_cell("Code"),
        header_cell("Node"),
        header_cell("Message"),
    ]);
    apply_issue_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Center);
    for (file, issue) in rows {
        table.add_row(vec![
            Cell::new(file),
            severity_cell(issue.severity),
            Cell::new(&issue.code),
            issue.node.as_deref().map_or_else(|| dim_cell("-"), Cell::new),
            Cell::new(&issue.message),
        ]);
    }
    Some(table)
}

/// Registered processors with the template sets they declare.
pub fn templates_table(registry: &ProcessorRegistry) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Processor"),
        header_cell("Description"),
        header_cell("Template ids"),
    ]);
    apply_table_style(&mut table);
    let mut descriptors: Vec<_> = registry.descriptors().iter().collect();
    descriptors.sort_by_key(|descriptor| descriptor.name);
    for descriptor in descriptors {
        let description = registry
            .resolve(&descriptor.declared)
            .map(|processor| processor.description())
            .unwrap_or_default();
        let templates: Vec<&str> = descriptor
            .declared
            .iter()
            .map(|template| template.as_str())
            .collect();
        table.add_row(vec![
            Cell::new(descriptor.name)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(description),
            Cell::new(templates.join("\n")),
        ]);
    }
    table
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(140);
    if table.column_count() >= 6 {
        table.set_constraints(vec![
            ColumnConstraint::UpperBoundary(Width::Percentage(40)),
            ColumnConstraint::LowerBoundary(Width::Fixed(8)),
            ColumnConstraint::LowerBoundary(Width::Fixed(36)),
            ColumnConstraint::LowerBoundary(Width::Fixed(7)),
            ColumnConstraint::LowerBoundary(Width::Fixed(8)),
            ColumnConstraint::LowerBoundary(Width::Fixed(10)),
        ]);
    }
}

fn apply_issue_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(160);
    if table.column_count() >= 5 {
        table.set_constraints(vec![
            ColumnConstraint::UpperBoundary(Width::Percentage(25)),
            ColumnConstraint::UpperBoundary(Width::Fixed(9)),
            ColumnConstraint::UpperBoundary(Width::Fixed(28)),
            ColumnConstraint::UpperBoundary(Width::Percentage(30)),
            ColumnConstraint::UpperBoundary(Width::Percentage(45)),
        ]);
    }
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn status_cell(imported: bool) -> Cell {
    if imported {
        Cell::new("✓")
            .fg(Color::Green)
            .add_attribute(Attribute::Bold)
    } else {
        Cell::new("FAILED")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold)
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn severity_cell(severity: IssueSeverity) -> Cell {
    match severity {
        IssueSeverity::Error => Cell::new("ERROR").fg(Color::Red),
        IssueSeverity::Warning => Cell::new("WARN").fg(Color::Yellow),
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
