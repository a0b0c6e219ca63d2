//! Report rendering for estimates.

use clap::ValueEnum;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table, presets::UTF8_FULL};
use domain_estimation::Estimate;
use eyre::Result;
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Display)]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

pub fn render(estimate: &Estimate, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(render_table(estimate)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&JsonReport::new(estimate))?),
    }
}

#[derive(serde::Serialize)]
struct JsonReport<'a> {
    monthly_total: f64,
    #[serde(flatten)]
    estimate: &'a Estimate,
}

impl<'a> JsonReport<'a> {
    fn new(estimate: &'a Estimate) -> Self {
        Self {
            monthly_total: estimate.monthly_total(),
            estimate,
        }
    }
}

fn usd(amount: f64) -> String {
    format!("${amount:.2}")
}

fn quantity(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.4}")
    }
}

fn right(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

pub fn render_table(estimate: &Estimate) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("RESOURCE").fg(Color::Cyan),
        Cell::new("COST").fg(Color::Cyan),
        Cell::new("QUANTITY").fg(Color::Cyan),
        Cell::new("UNIT").fg(Color::Cyan),
        Cell::new("MONTHLY").fg(Color::Cyan),
    ]);

    for resource in &estimate.priced {
        let mut first = true;
        let mut label = || {
            if std::mem::take(&mut first) {
                resource.identifier.clone()
            } else {
                String::new()
            }
        };

        for cost in &resource.fixed_costs {
            table.add_row(vec![
                Cell::new(label()),
                Cell::new(&cost.name),
                right(quantity(cost.quantity)),
                Cell::new(&cost.unit),
                right(usd(cost.monthly_cost)),
            ]);
        }
        for cost in &resource.dynamic_costs {
            let units = if cost.overridden {
                quantity(cost.units)
            } else {
                format!("{} (default)", quantity(cost.units))
            };
            table.add_row(vec![
                Cell::new(label()),
                Cell::new(&cost.name),
                right(units),
                Cell::new(&cost.unit),
                right(usd(cost.monthly_cost)),
            ]);
        }
    }

    table.add_row(vec![
        Cell::new("TOTAL").fg(Color::Green),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        right(usd(estimate.monthly_total())).fg(Color::Green),
    ]);

    let mut output = table.to_string();
    if !estimate.skipped.is_empty() {
        output.push_str(&format!("\n\n{} resource(s) not priced (unsupported type):", estimate.skipped.len()));
        for skipped in &estimate.skipped {
            output.push_str(&format!("\n  - {} ({})", skipped.identifier, skipped.resource_type));
        }
    }
    if !estimate.failed.is_empty() {
        output.push_str(&format!("\n\n{} resource(s) failed:", estimate.failed.len()));
        for failed in &estimate.failed {
            output.push_str(&format!("\n  - {}: {}", failed.identifier, failed.error));
        }
    }
    output
}
