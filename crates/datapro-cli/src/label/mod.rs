//! Subcommand handlers for fitting, applying and inspecting label models.
pub mod fit;
pub mod infer;
pub mod summary;

pub use fit::{load_fit_config, run_fit, FitCommandConfig};
pub use infer::run_infer;
pub use summary::run_summary;
