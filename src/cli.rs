use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::state::FlowSide;
use crate::store::DEFAULT_STORE_PATH;

/// Command-line interface for the pivot confluence desk tool.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// State file path (JSON key-value store).
    #[arg(long = "store", value_name = "FILE", default_value = DEFAULT_STORE_PATH)]
    pub store_path: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SideArg {
    Buy,
    Sell,
}

impl From<SideArg> for FlowSide {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::Buy => FlowSide::Buy,
            SideArg::Sell => FlowSide::Sell,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Calculate pivot levels for the selected formulas and detect
    /// converging levels.
    Calc {
        /// Yesterday's high.
        #[arg(long)]
        high: f64,

        /// Yesterday's low.
        #[arg(long)]
        low: f64,

        /// Yesterday's close.
        #[arg(long)]
        close: f64,

        /// Today's open (some formulas require it).
        #[arg(long)]
        today_open: Option<f64>,

        /// Yesterday's open (some formulas require it).
        #[arg(long)]
        yesterday_open: Option<f64>,
    },

    /// Manage the active formula selection.
    Formulas {
        #[command(subcommand)]
        action: FormulasAction,
    },

    /// Adjust convergence settings and re-cluster the retained levels.
    Set {
        #[command(subcommand)]
        setting: Setting,
    },

    /// Record and analyze buy/sell flow.
    Flow {
        #[command(subcommand)]
        action: FlowCommand,
    },

    /// Attach a title or note to a submitted flow entry.
    Note {
        /// Entry id as shown by `flow show --notes`.
        #[arg(long)]
        id: i64,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        text: Option<String>,
    },

    /// Trading journal.
    Journal {
        #[command(subcommand)]
        action: JournalAction,
    },

    /// Custom parameter cards.
    Param {
        #[command(subcommand)]
        action: ParamAction,
    },

    /// Copy a price value to the clipboard.
    Copy {
        /// Value to copy; formatted to 2 decimals.
        value: f64,
    },

    /// Show the market-session clocks.
    Clock,

    /// Reset both tools to their defaults. Cannot be undone.
    ResetAll,
}

#[derive(Debug, Subcommand)]
pub enum FormulasAction {
    /// List the catalog with selection marks.
    List,
    /// Toggle one formula in or out of the selection.
    Toggle { id: String },
    /// Select every formula.
    SelectAll,
    /// Clear the selection.
    Clear,
}

#[derive(Debug, Subcommand)]
pub enum Setting {
    /// Price half-width within which levels are considered converging.
    Tolerance { value: f64 },
    /// Minimum number of converging levels for a cluster to be reported.
    Threshold { value: usize },
}

#[derive(Debug, Subcommand)]
pub enum FlowCommand {
    /// Apply one increment (or decrement, with a negative change).
    Add {
        side: SideArg,

        #[arg(long, default_value_t = 0.5, allow_hyphen_values = true)]
        change: f64,
    },

    /// Simulate holding an increment button: one immediate step, then
    /// repeated steps at the hold rate for the given duration.
    Hold {
        side: SideArg,

        #[arg(long, default_value_t = 0.5, allow_hyphen_values = true)]
        change: f64,

        /// How long the button stays held, in milliseconds.
        #[arg(long, default_value_t = 1000)]
        millis: u64,
    },

    /// Overwrite one side's pending value.
    Set {
        side: SideArg,
        value: f64,
    },

    /// Fold pending flow into the totals and record the verdict.
    Submit,

    /// Undo the most recent pending-flow change.
    Undo,

    /// Discard pending flow.
    Reset,

    /// Show totals, verdict and history.
    Show {
        /// Include detailed entries with ids and notes.
        #[arg(long)]
        notes: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum JournalAction {
    Add {
        #[arg(long)]
        instrument: String,

        #[arg(long)]
        date: String,

        #[arg(long)]
        entry: Option<f64>,

        #[arg(long)]
        exit: Option<f64>,

        #[arg(long, allow_hyphen_values = true)]
        pnl: Option<f64>,

        #[arg(long, default_value = "")]
        notes: String,
    },
    List,
    /// Export the journal as CSV.
    Export {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
    /// Delete every journal entry. Cannot be undone.
    Clear,
}

#[derive(Debug, Subcommand)]
pub enum ParamAction {
    Add {
        label: String,

        #[arg(default_value_t = 1.0, allow_hyphen_values = true)]
        value: f64,
    },
    Remove {
        id: String,
    },
    List,
}
