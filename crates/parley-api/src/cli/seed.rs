//! `parley seed-personas`: load the built-in personas.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use parley_infra::seed::seed_personas;

use crate::state::AppState;

pub async fn seed(state: &AppState, clear: bool, json: bool) -> Result<()> {
    let report = state.persona_service.seed(seed_personas(), clear).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    if clear {
        println!(
            "  {} Removed {} built-in persona{}",
            style("i").blue().bold(),
            style(report.cleared).bold(),
            if report.cleared == 1 { "" } else { "s" }
        );
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Persona").fg(Color::White),
        Cell::new("Result").fg(Color::White),
    ]);
    for name in &report.created {
        table.add_row(vec![
            Cell::new(name).fg(Color::Cyan),
            Cell::new("● created").fg(Color::Green),
        ]);
    }
    for name in &report.skipped {
        table.add_row(vec![
            Cell::new(name).fg(Color::Cyan),
            Cell::new("○ exists, skipped").fg(Color::Yellow),
        ]);
    }

    println!("{table}");
    println!();
    println!(
        "  {} created, {} skipped",
        style(report.created.len()).green().bold(),
        style(report.skipped.len()).yellow().bold()
    );
    println!();
    Ok(())
}
