pub mod convergence;
pub mod formulas;
pub mod sentiment;

pub use convergence::cluster;
pub use formulas::{catalog, find, FormulaDef, DEFAULT_SELECTION};
pub use sentiment::{classify, FlowAnalysis, Sentiment};
