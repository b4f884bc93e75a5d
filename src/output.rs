use chrono::Utc;
use chrono_tz::Tz;
use tabled::{settings::Style, Table, Tabled};

use crate::analysis::FlowAnalysis;
use crate::data::{ComputedLevel, ConvergenceCluster};
use crate::state::{CalcOutcome, CustomParameter, FlowState, TradeEntry};

#[derive(Tabled)]
struct LevelRow {
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Type")]
    kind: &'static str,
    #[tabled(rename = "Price")]
    price: String,
}

#[derive(Tabled)]
struct ClusterRow {
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Converging")]
    count: String,
    #[tabled(rename = "Type")]
    kind: &'static str,
    #[tabled(rename = "Labels")]
    labels: String,
    #[tabled(rename = "Formulas")]
    formulas: String,
}

pub fn print_calc_report(outcome: &CalcOutcome, tolerance: f64, threshold: usize) {
    println!("\n=== Pivot Levels ===");
    for result in &outcome.results {
        println!("\n{}", result.name);
        print_levels(&result.levels);
    }
    for name in &outcome.skipped {
        println!("\n{name}: skipped (required open price not provided)");
    }
    print_clusters(&outcome.clusters, tolerance, threshold);
}

fn print_levels(levels: &[ComputedLevel]) {
    let rows: Vec<LevelRow> = levels
        .iter()
        .map(|level| LevelRow {
            label: level.label.clone(),
            kind: level.level_type.as_str(),
            price: format!("{:.2}", level.value),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

pub fn print_clusters(clusters: &[ConvergenceCluster], tolerance: f64, threshold: usize) {
    println!(
        "\n=== Converging Levels (tolerance {tolerance:.2}, minimum {threshold} converging) ===\n"
    );
    if clusters.is_empty() {
        println!("No recurring levels found. Try lowering the convergence threshold or tolerance.");
        return;
    }

    let rows: Vec<ClusterRow> = clusters
        .iter()
        .map(|cluster| {
            // Show at most three contributing formulas, like the original
            // results grid, with a "+N more" tail.
            let mut formulas = cluster.formulas.iter().take(3).cloned().collect::<Vec<_>>().join(", ");
            if cluster.formulas.len() > 3 {
                formulas.push_str(&format!(" +{} more", cluster.formulas.len() - 3));
            }
            ClusterRow {
                price: format!("{:.2}", cluster.value),
                count: cluster.count.to_string(),
                kind: cluster.level_type.as_str(),
                labels: cluster.labels.join("/"),
                formulas,
            }
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

pub fn print_flow_report(flow: &FlowState, analysis: &FlowAnalysis) {
    println!("\n=== Flow Analysis ===\n");
    println!(
        "Pending: buy {:.1} / sell {:.1}",
        flow.selected_buy, flow.selected_sell
    );
    println!(
        "Totals:  buy {:.1} / sell {:.1} | diff {:.1} | {:.2}%",
        analysis.buy_count, analysis.sell_count, analysis.difference, analysis.percentage
    );
    println!(
        "Conclusion: {} [{}]",
        analysis.sentiment,
        analysis.sentiment.badge()
    );

    if !flow.history.is_empty() {
        println!("\nRecent entries:");
        for line in &flow.history {
            println!("  {line}");
        }
    }
}

#[derive(Tabled)]
struct TradeRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Instrument")]
    instrument: String,
    #[tabled(rename = "Entry")]
    entry: String,
    #[tabled(rename = "Exit")]
    exit: String,
    #[tabled(rename = "P/L")]
    pnl: String,
    #[tabled(rename = "Notes")]
    notes: String,
}

fn optional_price(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

pub fn print_journal(journal: &[TradeEntry]) {
    if journal.is_empty() {
        println!("No trades logged yet.");
        return;
    }
    let rows: Vec<TradeRow> = journal
        .iter()
        .map(|trade| TradeRow {
            date: trade.date.clone(),
            instrument: trade.instrument.clone(),
            entry: optional_price(trade.entry_price),
            exit: optional_price(trade.exit_price),
            pnl: optional_price(trade.pnl),
            notes: trade.notes.clone(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

#[derive(Tabled)]
struct ParameterRow {
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Parameter")]
    label: String,
    #[tabled(rename = "Value")]
    value: String,
}

pub fn print_parameters(parameters: &[CustomParameter]) {
    if parameters.is_empty() {
        println!("No parameters added yet.");
        return;
    }
    let rows: Vec<ParameterRow> = parameters
        .iter()
        .map(|param| {
            let label = match &param.sub_text {
                Some(sub) => format!("{} {sub}", param.label),
                None => param.label.clone(),
            };
            ParameterRow {
                id: param.id.clone(),
                label,
                value: format!("{:.1}", param.value),
            }
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

/// The market sessions shown by the original desk clock.
const MARKET_CLOCKS: [(&str, Tz); 6] = [
    ("IST", chrono_tz::Asia::Kolkata),
    ("LDN", chrono_tz::Europe::London),
    ("NY", chrono_tz::America::New_York),
    ("TYO", chrono_tz::Asia::Tokyo),
    ("SYD", chrono_tz::Australia::Sydney),
    ("UTC", chrono_tz::UTC),
];

pub fn print_clocks() {
    let now = Utc::now();
    println!("\n=== Market Clocks ===\n");
    for (label, tz) in MARKET_CLOCKS {
        println!(
            "  {label:<4} {}",
            now.with_timezone(&tz).format("%Y-%m-%d %I:%M:%S %p")
        );
    }
}
