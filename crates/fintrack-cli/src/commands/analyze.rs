//! Column preview and analysis commands

use std::path::Path;

use anyhow::Result;
use fintrack_core::{
    models::CategoryTotal, ColumnRef, ColumnSelection, Panel, Pipeline, PipelineOutput,
    RunOptions,
};

use super::{truncate, InputFile};

fn role_name(column: &Option<ColumnRef>) -> &str {
    column.as_ref().map(|c| c.name.as_str()).unwrap_or("-")
}

pub fn cmd_columns(pipeline: &Pipeline, file: &Path) -> Result<()> {
    let input = InputFile::read(file)?;
    let preview = pipeline.preview(input.upload())?;
    let suggestion = &preview.suggestion;

    println!();
    println!("📄 {} ({})", file.display(), preview.file_kind);
    println!();
    println!("   Columns:");
    for (i, header) in suggestion.headers.iter().enumerate() {
        println!("   {:>3}  {}", i, header);
    }

    println!();
    println!("   Detected roles:");
    let detected = &suggestion.detected;
    println!("      date:        {}", role_name(&detected.date));
    println!("      amount:      {}", role_name(&detected.amount));
    println!("      category:    {}", role_name(&detected.category));
    println!("      type:        {}", role_name(&detected.tx_type));
    println!("      description: {}", role_name(&detected.description));

    if !suggestion.sample.is_empty() {
        println!();
        println!("   Sample rows:");
        for row in &suggestion.sample {
            let cells: Vec<String> = row.iter().map(|c| truncate(&c.to_string(), 18)).collect();
            println!("      {}", cells.join(" | "));
        }
    }

    println!();
    if suggestion.complete {
        println!("   ✓ Auto-detection found date and amount columns");
    } else {
        println!("   ⚠️  Auto-detection is incomplete; pass --date and --amount");
    }
    println!();

    Ok(())
}

pub fn cmd_analyze(
    pipeline: &Pipeline,
    file: &Path,
    selection: &ColumnSelection,
    options: &RunOptions,
    json: bool,
) -> Result<()> {
    let input = InputFile::read(file)?;
    let output = pipeline.run(input.upload(), selection, options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_summary(file, &output);
    }

    Ok(())
}

fn print_categories(title: &str, panel: &Panel<Vec<CategoryTotal>>) {
    println!("   {}:", title);
    match panel {
        Panel::Ready(totals) => {
            for total in totals {
                println!("      {:<24} {:>12}", truncate(&total.category, 24), total.total);
            }
        }
        Panel::NoData => println!("      (no data)"),
    }
    println!();
}

fn print_summary(file: &Path, output: &PipelineOutput) {
    let report = &output.report;
    let metrics = &output.metrics;

    println!();
    println!("📊 {} ({})", file.display(), output.file_kind);
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   Rows: {} loaded, {} kept",
        report.rows_loaded, report.rows_kept
    );
    if report.drops.total() > 0 {
        println!(
            "   ⚠️  Dropped: {} bad date, {} bad amount",
            report.drops.bad_date, report.drops.bad_amount
        );
    }
    if report.keyword_categorized {
        println!("   Categories assigned by keyword");
    }
    println!("   Policy: {}", output.policy);
    println!();

    println!("   Income:   {:>12}", metrics.total_income);
    println!("   Expenses: {:>12}", metrics.total_expenses);
    println!("   Net:      {:>12}", metrics.net_savings);
    if let Some(rate) = metrics.savings_rate {
        println!("   Savings rate: {}%", rate);
    }
    println!();

    print_categories("Top categories", &output.panels.top_categories);

    println!("   Monthly totals:");
    match &output.panels.monthly_totals {
        Panel::Ready(months) => {
            for month in months {
                println!("      {:<10} {:>12}", month.period, month.total);
            }
        }
        Panel::NoData => println!("      (no data)"),
    }
    println!();

    if let Panel::Ready(points) = &output.panels.cumulative {
        if let Some(last) = points.last() {
            println!("   Closing balance ({}): {}", last.date, last.balance);
            println!();
        }
    }
}
