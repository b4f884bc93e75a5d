mod analysis;
mod cli;
mod clipboard;
mod data;
mod hold;
mod output;
mod state;
mod store;

use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use cli::{Cli, Command, FlowCommand, FormulasAction, JournalAction, ParamAction, Setting};
use clipboard::CopyOutcome;
use data::OhlcInput;
use hold::{RepeatTimer, HOLD_INITIAL_DELAY, HOLD_REPEAT_RATE};
use state::{App, FlowSide, TradeEntry};
use store::KvStore;

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let store = KvStore::open(&cli.store_path);
    let mut app = App::load(store);

    match cli.command {
        Command::Calc {
            high,
            low,
            close,
            today_open,
            yesterday_open,
        } => {
            let input = OhlcInput {
                high,
                low,
                close,
                today_open,
                yesterday_open,
            };
            let outcome = app.recalculate(input)?;
            output::print_calc_report(&outcome, app.pivot.tolerance, app.pivot.threshold);
        }

        Command::Formulas { action } => match action {
            FormulasAction::List => {
                for def in analysis::catalog() {
                    let mark = if app.pivot.selection.contains(def.id) {
                        "[x]"
                    } else {
                        "[ ]"
                    };
                    println!("{mark} {:<22} {} — {}", def.id, def.name, def.description);
                }
            }
            FormulasAction::Toggle { id } => {
                let selected = app.toggle_formula(&id)?;
                println!(
                    "{id}: {}",
                    if selected { "selected" } else { "deselected" }
                );
            }
            FormulasAction::SelectAll => {
                app.select_all_formulas()?;
                println!("All {} formulas selected.", analysis::catalog().len());
            }
            FormulasAction::Clear => {
                app.clear_all_formulas()?;
                println!("Formula selection cleared.");
            }
        },

        Command::Set { setting } => match setting {
            Setting::Tolerance { value } => {
                let clusters = app.set_tolerance(value)?;
                output::print_clusters(&clusters, app.pivot.tolerance, app.pivot.threshold);
            }
            Setting::Threshold { value } => {
                let clusters = app.set_threshold(value)?;
                output::print_clusters(&clusters, app.pivot.tolerance, app.pivot.threshold);
            }
        },

        Command::Flow { action } => run_flow(&mut app, action)?,

        Command::Note { id, title, text } => {
            if app.annotate_note(id, title, text)? {
                println!("Entry {id} updated.");
            } else {
                println!("No entry with id {id}.");
            }
        }

        Command::Journal { action } => match action {
            JournalAction::Add {
                instrument,
                date,
                entry,
                exit,
                pnl,
                notes,
            } => {
                app.add_trade(&instrument, entry, exit, pnl, &date, &notes)?;
                println!("Trade logged.");
            }
            JournalAction::List => output::print_journal(&app.flow.journal),
            JournalAction::Export { path } => {
                export_journal(&app.flow.journal, &path)?;
                println!("Exported {} trades to {:?}.", app.flow.journal.len(), path);
            }
            JournalAction::Clear => {
                app.clear_journal()?;
                println!("Journal cleared.");
            }
        },

        Command::Param { action } => match action {
            ParamAction::Add { label, value } => {
                let id = app.add_parameter(&label, value)?;
                println!("Parameter added with id {id}.");
            }
            ParamAction::Remove { id } => {
                app.remove_parameter(&id)?;
                println!("Parameter {id} removed.");
            }
            ParamAction::List => output::print_parameters(&app.flow.parameters),
        },

        Command::Copy { value } => {
            let formatted = format!("{value:.2}");
            match clipboard::copy_value(&formatted) {
                CopyOutcome::Clipboard => println!("COPIED: {formatted}"),
                CopyOutcome::Fallback => {
                    println!("Clipboard unavailable; copy manually: {formatted}")
                }
            }
        }

        Command::Clock => output::print_clocks(),

        Command::ResetAll => {
            app.clear_all()?;
            println!("All data reset to defaults.");
        }
    }

    Ok(())
}

fn run_flow(app: &mut App, action: FlowCommand) -> Result<()> {
    match action {
        FlowCommand::Add { side, change } => {
            app.record_flow(side.into(), change)?;
            println!(
                "Pending: buy {:.1} / sell {:.1}",
                app.flow.selected_buy, app.flow.selected_sell
            );
        }

        FlowCommand::Hold {
            side,
            change,
            millis,
        } => {
            let side: FlowSide = side.into();
            // The held button fires once immediately; the timer covers the
            // delayed repeats. Ticks cross back over a channel so that all
            // state mutation stays on this thread.
            app.record_flow(side, change)?;
            let (tx, rx) = mpsc::channel();
            let mut timer = RepeatTimer::new();
            timer.start(HOLD_INITIAL_DELAY, HOLD_REPEAT_RATE, move || {
                let _ = tx.send(());
            });
            std::thread::sleep(Duration::from_millis(millis));
            timer.stop();
            let ticks = rx.try_iter().count();
            for _ in 0..ticks {
                app.record_flow(side, change)?;
            }
            println!(
                "Held {} for {millis} ms ({} repeats). Pending: buy {:.1} / sell {:.1}",
                side.as_str(),
                ticks,
                app.flow.selected_buy,
                app.flow.selected_sell
            );
        }

        FlowCommand::Set { side, value } => {
            app.set_pending_flow(side.into(), value)?;
            println!(
                "Pending: buy {:.1} / sell {:.1}",
                app.flow.selected_buy, app.flow.selected_sell
            );
        }

        FlowCommand::Submit => {
            let analysis = app.submit_flow()?;
            output::print_flow_report(&app.flow, &analysis);
        }

        FlowCommand::Undo => {
            if app.undo_flow()? {
                println!(
                    "Undone. Pending: buy {:.1} / sell {:.1}",
                    app.flow.selected_buy, app.flow.selected_sell
                );
            } else {
                println!("Nothing to undo.");
            }
        }

        FlowCommand::Reset => {
            app.reset_pending_flow()?;
            println!("Pending flow cleared.");
        }

        FlowCommand::Show { notes } => {
            let analysis = app.current_analysis();
            output::print_flow_report(&app.flow, &analysis);
            if notes {
                for entry in &app.flow.notes {
                    println!(
                        "\n[{}] {} | {} | {:.2}%",
                        entry.id, entry.timestamp, entry.conclusion, entry.percentage
                    );
                    if !entry.note_title.is_empty() {
                        println!("  title: {}", entry.note_title);
                    }
                    if !entry.note.is_empty() {
                        println!("  note: {}", entry.note);
                    }
                }
            }
        }
    }
    Ok(())
}

fn export_journal(journal: &[TradeEntry], path: &std::path::Path) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("failed to create {path:?}"))?;
    writer.write_record(["date", "instrument", "entry", "exit", "pnl", "notes"])?;
    for trade in journal {
        let price = |v: Option<f64>| v.map_or_else(String::new, |p| format!("{p:.2}"));
        writer.write_record([
            trade.date.clone(),
            trade.instrument.clone(),
            price(trade.entry_price),
            price(trade.exit_price),
            price(trade.pnl),
            trade.notes.clone(),
        ])?;
    }
    writer.flush().context("failed to flush journal export")?;
    Ok(())
}
