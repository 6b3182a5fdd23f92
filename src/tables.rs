use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::core::{filter::FilterCriteria, record::Consumer, series::Series};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table
}

/// Labelled values, above-average ones in red.
#[must_use]
pub fn build_series_table(label_header: &str, value_header: &str, series: &Series) -> Table {
    #[allow(clippy::cast_precision_loss)]
    let average = series.values.iter().sum::<f64>() / series.values.len().max(1) as f64;

    let mut table = new_table();
    table.set_header(vec![
        Cell::new(label_header),
        Cell::new(value_header).set_alignment(CellAlignment::Right),
    ]);
    for (label, value) in series.iter() {
        table.add_row(vec![
            Cell::new(label),
            Cell::new(format!("{value:.3}")).set_alignment(CellAlignment::Right).fg(
                if value > average {
                    Color::Red
                } else {
                    Color::Green
                },
            ),
        ]);
    }
    table
}

#[must_use]
pub fn build_consumers_table(consumers: &[Consumer]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Consumer ID", "Postcode"]);
    if consumers.is_empty() {
        table.add_row(vec![Cell::new("No consumers found.").add_attribute(Attribute::Dim)]);
    }
    for consumer in consumers {
        table.add_row(vec![&consumer.consumer_id, &consumer.postcode]);
    }
    table
}

/// Applied filters, with `All` standing for an absent constraint.
#[must_use]
pub fn build_stats_table(criteria: &FilterCriteria, postcodes: &[&str]) -> Table {
    fn or_all(value: Option<String>) -> Cell {
        value.map_or_else(|| Cell::new("All").add_attribute(Attribute::Dim), Cell::new)
    }

    let mut table = new_table();
    table.set_header(vec!["Consumer ID", "Postcode", "Start date", "End date", "Postcodes seen"]);
    table.add_row(vec![
        or_all(criteria.consumer_id.clone()),
        or_all(criteria.postcode.clone()),
        or_all(criteria.start_date.map(|date| date.to_string())),
        or_all(criteria.end_date.map(|date| date.to_string())),
        Cell::new(postcodes.join(", ")),
    ]);
    table
}
