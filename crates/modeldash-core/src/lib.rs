pub mod config;
pub mod dashboard;
pub mod error;
pub mod import;
pub mod model;
pub mod normalize;
pub mod sync;

pub use config::{Profile, Settings};
pub use dashboard::{ColumnStats, Dashboard, Filter};
pub use error::{DashError, Outcome, Result};
pub use model::{ModelRecord, NormalizedModel};
