//! Application state and the command surface that mutates it.
//!
//! All state lives in one explicit struct per tool; every mutation goes
//! through a named command on [`App`], which persists the snapshot on success.
//! Nothing here touches the presentation layer.

use std::collections::BTreeSet;

use anyhow::Result;
use chrono::Local;
use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::{self, classify, FlowAnalysis};
use crate::data::{ComputedLevel, ConvergenceCluster, InputError, OhlcInput};
use crate::store::{persist, KvStore, FLOW_STATE_KEY, PIVOT_STATE_KEY};

const HISTORY_CAP: usize = 30;
const JOURNAL_CAP: usize = 50;

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("unknown formula id '{0}'")]
    UnknownFormula(String),

    #[error("add some buy or sell flow before submitting")]
    NothingPending,

    #[error("tolerance must be a finite, nonnegative number")]
    BadTolerance,

    #[error("convergence threshold must be at least 1")]
    BadThreshold,

    #[error("parameter label cannot be empty")]
    EmptyParameterLabel,

    #[error("unknown parameter id '{0}'")]
    UnknownParameter(String),

    #[error("instrument and date are required to log a trade")]
    IncompleteTrade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowSide {
    Buy,
    Sell,
}

impl FlowSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowSide::Buy => "buy",
            FlowSide::Sell => "sell",
        }
    }
}

/// One undoable pending-flow mutation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FlowAction {
    Adjust { side: FlowSide, change: f64 },
    SetInput { side: FlowSide, original: f64 },
}

/// Submitted analysis with user-editable note fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEntry {
    pub id: i64,
    pub timestamp: String,
    pub conclusion: String,
    pub buy_count: f64,
    pub sell_count: f64,
    pub percentage: f64,
    pub note_title: String,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEntry {
    pub id: i64,
    pub instrument: String,
    pub entry_price: Option<f64>,
    pub exit_price: Option<f64>,
    pub pnl: Option<f64>,
    pub date: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomParameter {
    pub id: String,
    pub label: String,
    pub value: f64,
    pub sub_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowState {
    pub buy_count: f64,
    pub sell_count: f64,
    pub selected_buy: f64,
    pub selected_sell: f64,
    pub selection_stack: Vec<FlowAction>,
    pub history: Vec<String>,
    pub notes: Vec<NoteEntry>,
    pub journal: Vec<TradeEntry>,
    pub parameters: Vec<CustomParameter>,
}

impl Default for FlowState {
    fn default() -> Self {
        Self {
            buy_count: 0.0,
            sell_count: 0.0,
            selected_buy: 0.0,
            selected_sell: 0.0,
            selection_stack: Vec::new(),
            history: Vec::new(),
            notes: Vec::new(),
            journal: Vec::new(),
            parameters: default_parameters(),
        }
    }
}

fn default_parameters() -> Vec<CustomParameter> {
    let preset: [(&str, &str, f64, Option<&str>); 6] = [
        ("btt", "BTT", 1.0, None),
        ("futlevel", "FUTLEVEL", 1.0, None),
        ("vsa", "VSA", 1.0, Some("(0.5 for weak signs)")),
        ("vlevel", "VLEVEL", 1.0, Some("(0.5 for derivations)")),
        ("wfutlevel", "WFUTLEVEL", 0.5, None),
        (
            "mtf-confirmation",
            "MTF CONFIRMATION",
            1.0,
            Some("(0.5=Down TF + 0.5=Up TF)"),
        ),
    ];
    preset
        .into_iter()
        .map(|(id, label, value, sub)| CustomParameter {
            id: id.to_string(),
            label: label.to_string(),
            value,
            sub_text: sub.map(str::to_string),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotState {
    pub selection: BTreeSet<String>,
    pub tolerance: f64,
    pub threshold: usize,
    /// Raw level set retained from the last successful calculation. Clusters
    /// are derived from it on demand, never stored.
    pub levels: Vec<ComputedLevel>,
    pub input: Option<OhlcInput>,
}

impl Default for PivotState {
    fn default() -> Self {
        Self {
            selection: analysis::DEFAULT_SELECTION
                .iter()
                .map(|id| id.to_string())
                .collect(),
            tolerance: 0.50,
            threshold: 3,
            levels: Vec::new(),
            input: None,
        }
    }
}

impl PivotState {
    /// Re-run only the convergence engine over the retained level set.
    pub fn clusters(&self) -> Vec<ConvergenceCluster> {
        analysis::cluster(&self.levels, self.tolerance, self.threshold)
    }
}

/// Per-formula result grouping for display.
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaResult {
    pub name: String,
    pub levels: Vec<ComputedLevel>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalcOutcome {
    pub results: Vec<FormulaResult>,
    pub clusters: Vec<ConvergenceCluster>,
    /// Formula names skipped because a required optional input was absent.
    pub skipped: Vec<String>,
}

/// The running application: state plus its backing store. Command methods
/// persist on success and leave state untouched on failure.
pub struct App {
    pub flow: FlowState,
    pub pivot: PivotState,
    store: KvStore,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn timestamp_now() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn entry_id() -> i64 {
    Local::now().timestamp_millis()
}

impl App {
    pub fn load(store: KvStore) -> Self {
        let flow = store.get(FLOW_STATE_KEY).unwrap_or_default();
        let pivot = store.get(PIVOT_STATE_KEY).unwrap_or_default();
        Self { flow, pivot, store }
    }

    fn persist_flow(&mut self) -> Result<()> {
        persist(&mut self.store, FLOW_STATE_KEY, &self.flow)
    }

    fn persist_pivot(&mut self) -> Result<()> {
        persist(&mut self.store, PIVOT_STATE_KEY, &self.pivot)
    }

    // --- Pivot calculator commands ---

    pub fn toggle_formula(&mut self, id: &str) -> Result<bool> {
        if analysis::find(id).is_none() {
            return Err(CommandError::UnknownFormula(id.to_string()).into());
        }
        let selected = if self.pivot.selection.remove(id) {
            false
        } else {
            self.pivot.selection.insert(id.to_string());
            true
        };
        self.persist_pivot()?;
        Ok(selected)
    }

    pub fn select_all_formulas(&mut self) -> Result<()> {
        self.pivot.selection = analysis::catalog()
            .iter()
            .map(|f| f.id.to_string())
            .collect();
        self.persist_pivot()
    }

    pub fn clear_all_formulas(&mut self) -> Result<()> {
        self.pivot.selection.clear();
        self.persist_pivot()
    }

    pub fn set_tolerance(&mut self, value: f64) -> Result<Vec<ConvergenceCluster>> {
        if !value.is_finite() || value < 0.0 {
            return Err(CommandError::BadTolerance.into());
        }
        self.pivot.tolerance = value;
        self.persist_pivot()?;
        Ok(self.pivot.clusters())
    }

    pub fn set_threshold(&mut self, value: usize) -> Result<Vec<ConvergenceCluster>> {
        if value < 1 {
            return Err(CommandError::BadThreshold.into());
        }
        self.pivot.threshold = value;
        self.persist_pivot()?;
        Ok(self.pivot.clusters())
    }

    /// Evaluate every selected formula against `input`, replace the retained
    /// level set and run the convergence engine. Aborts before mutating
    /// anything on invalid input or an empty selection.
    pub fn recalculate(&mut self, input: OhlcInput) -> Result<CalcOutcome> {
        input.validate().map_err(CommandError::Input)?;
        if self.pivot.selection.is_empty() {
            return Err(CommandError::Input(InputError::EmptySelection).into());
        }

        let mut all_levels = Vec::new();
        let mut results = Vec::new();
        let mut skipped = Vec::new();

        for def in analysis::catalog() {
            if !self.pivot.selection.contains(def.id) {
                continue;
            }
            match def.evaluate(&input) {
                Some(levels) => {
                    all_levels.extend(levels.iter().cloned());
                    results.push(FormulaResult {
                        name: def.name.to_string(),
                        levels,
                    });
                }
                None => skipped.push(def.name.to_string()),
            }
        }

        info!(
            "calculated {} levels from {} formulas ({} skipped)",
            all_levels.len(),
            results.len(),
            skipped.len()
        );

        self.pivot.levels = all_levels;
        self.pivot.input = Some(input);
        self.persist_pivot()?;

        Ok(CalcOutcome {
            results,
            clusters: self.pivot.clusters(),
            skipped,
        })
    }

    // --- Flow analyzer commands ---

    /// Apply one increment/decrement to the pending flow for `side`. Pending
    /// values are clamped at zero and kept at 1-decimal resolution.
    pub fn record_flow(&mut self, side: FlowSide, change: f64) -> Result<()> {
        let slot = match side {
            FlowSide::Buy => &mut self.flow.selected_buy,
            FlowSide::Sell => &mut self.flow.selected_sell,
        };
        *slot = round1((*slot + change).max(0.0));
        self.flow.selection_stack.push(FlowAction::Adjust { side, change });
        self.persist_flow()
    }

    /// Overwrite one side's pending value directly (typed input).
    pub fn set_pending_flow(&mut self, side: FlowSide, value: f64) -> Result<()> {
        let value = round1(value.max(0.0));
        let slot = match side {
            FlowSide::Buy => &mut self.flow.selected_buy,
            FlowSide::Sell => &mut self.flow.selected_sell,
        };
        let original = *slot;
        *slot = value;
        self.flow
            .selection_stack
            .push(FlowAction::SetInput { side, original });
        self.persist_flow()
    }

    pub fn undo_flow(&mut self) -> Result<bool> {
        let Some(action) = self.flow.selection_stack.pop() else {
            return Ok(false);
        };
        match action {
            FlowAction::Adjust { side, change } => {
                let slot = match side {
                    FlowSide::Buy => &mut self.flow.selected_buy,
                    FlowSide::Sell => &mut self.flow.selected_sell,
                };
                *slot = round1((*slot - change).max(0.0));
            }
            FlowAction::SetInput { side, original } => match side {
                FlowSide::Buy => self.flow.selected_buy = original,
                FlowSide::Sell => self.flow.selected_sell = original,
            },
        }
        self.persist_flow()?;
        Ok(true)
    }

    /// Fold pending flow into the running totals and record the verdict.
    pub fn submit_flow(&mut self) -> Result<FlowAnalysis> {
        if self.flow.selected_buy == 0.0 && self.flow.selected_sell == 0.0 {
            return Err(CommandError::NothingPending.into());
        }

        self.flow.buy_count = round1(self.flow.buy_count + self.flow.selected_buy);
        self.flow.sell_count = round1(self.flow.sell_count + self.flow.selected_sell);

        let analysis = classify(self.flow.buy_count, self.flow.sell_count);
        let timestamp = timestamp_now();

        let line = format!(
            "{timestamp} | {} | BUYS: {:.1} | SELLS: {:.1} | %DIFF: {:.2}%",
            analysis.sentiment, analysis.buy_count, analysis.sell_count, analysis.percentage
        );
        self.flow.history.insert(0, line);
        self.flow.history.truncate(HISTORY_CAP);

        self.flow.notes.insert(
            0,
            NoteEntry {
                id: entry_id(),
                timestamp,
                conclusion: analysis.sentiment.to_string(),
                buy_count: analysis.buy_count,
                sell_count: analysis.sell_count,
                percentage: analysis.percentage,
                note_title: String::new(),
                note: String::new(),
            },
        );
        self.flow.notes.truncate(HISTORY_CAP);

        self.flow.selected_buy = 0.0;
        self.flow.selected_sell = 0.0;
        self.flow.selection_stack.clear();

        self.persist_flow()?;
        Ok(analysis)
    }

    pub fn reset_pending_flow(&mut self) -> Result<()> {
        self.flow.selected_buy = 0.0;
        self.flow.selected_sell = 0.0;
        self.flow.selection_stack.clear();
        self.persist_flow()
    }

    pub fn current_analysis(&self) -> FlowAnalysis {
        classify(self.flow.buy_count, self.flow.sell_count)
    }

    /// Attach a title and/or note text to a recorded history entry.
    pub fn annotate_note(&mut self, id: i64, title: Option<String>, note: Option<String>) -> Result<bool> {
        let Some(entry) = self.flow.notes.iter_mut().find(|n| n.id == id) else {
            return Ok(false);
        };
        if let Some(title) = title {
            entry.note_title = title;
        }
        if let Some(note) = note {
            entry.note = note;
        }
        self.persist_flow()?;
        Ok(true)
    }

    // --- Parameters ---

    pub fn add_parameter(&mut self, label: &str, value: f64) -> Result<String> {
        let label = label.trim();
        if label.is_empty() {
            return Err(CommandError::EmptyParameterLabel.into());
        }
        let value = if value.is_finite() { round1(value) } else { 0.0 };
        let id = format!("custom-{}", entry_id());
        self.flow.parameters.push(CustomParameter {
            id: id.clone(),
            label: label.to_string(),
            value,
            sub_text: None,
        });
        self.persist_flow()?;
        Ok(id)
    }

    pub fn remove_parameter(&mut self, id: &str) -> Result<()> {
        let before = self.flow.parameters.len();
        self.flow.parameters.retain(|p| p.id != id);
        if self.flow.parameters.len() == before {
            return Err(CommandError::UnknownParameter(id.to_string()).into());
        }
        self.persist_flow()
    }

    // --- Journal ---

    #[allow(clippy::too_many_arguments)]
    pub fn add_trade(
        &mut self,
        instrument: &str,
        entry_price: Option<f64>,
        exit_price: Option<f64>,
        pnl: Option<f64>,
        date: &str,
        notes: &str,
    ) -> Result<()> {
        if instrument.trim().is_empty() || date.trim().is_empty() {
            return Err(CommandError::IncompleteTrade.into());
        }
        self.flow.journal.insert(
            0,
            TradeEntry {
                id: entry_id(),
                instrument: instrument.trim().to_string(),
                entry_price: entry_price.map(crate::data::round2),
                exit_price: exit_price.map(crate::data::round2),
                pnl: pnl.map(crate::data::round2),
                date: date.trim().to_string(),
                notes: notes.trim().to_string(),
            },
        );
        self.flow.journal.truncate(JOURNAL_CAP);
        self.persist_flow()
    }

    pub fn clear_journal(&mut self) -> Result<()> {
        self.flow.journal.clear();
        self.persist_flow()
    }

    // --- Global ---

    /// Full reset of both tools to the documented defaults, including the
    /// default formula selection.
    pub fn clear_all(&mut self) -> Result<()> {
        self.flow = FlowState::default();
        self.pivot = PivotState::default();
        self.persist_flow()?;
        self.persist_pivot()
    }
}
