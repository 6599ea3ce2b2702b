//! The filterable model table and the import flow that refreshes it.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::config::Settings;
use crate::error::Result;
use crate::import::{ImportState, Importer, Normalizer};
use crate::model::NormalizedModel;
use crate::normalize;

/// Row filters. Cost bounds are inclusive; `None` means unbounded, which is
/// the same as the column's min/max.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub min_input: Option<f64>,
    pub max_input: Option<f64>,
    pub min_output: Option<f64>,
    pub max_output: Option<f64>,
    pub reasoning_only: bool,
    pub vision_only: bool,
    /// Both input and output cost are zero.
    pub free_only: bool,
    /// Case-insensitive substring of the model name.
    pub search: Option<String>,
}

impl Filter {
    pub fn matches(&self, m: &NormalizedModel) -> bool {
        let within = |v: f64, lo: Option<f64>, hi: Option<f64>| {
            lo.map_or(true, |lo| v >= lo) && hi.map_or(true, |hi| v <= hi)
        };
        if !within(m.input_cost_per_1m, self.min_input, self.max_input)
            || !within(m.output_cost_per_1m, self.min_output, self.max_output)
        {
            return false;
        }
        if self.reasoning_only && !m.supports_reasoning {
            return false;
        }
        if self.vision_only && !m.supports_vision {
            return false;
        }
        if self.free_only && (m.input_cost_per_1m != 0.0 || m.output_cost_per_1m != 0.0) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => m.name.to_lowercase().contains(&q.to_lowercase()),
            _ => true,
        }
    }

    /// Matching rows in their original order.
    pub fn apply<'a>(&self, rows: &'a [NormalizedModel]) -> Vec<&'a NormalizedModel> {
        rows.iter().filter(|m| self.matches(m)).collect()
    }

    pub fn is_active(&self) -> bool {
        self != &Self::default()
    }
}

/// Column maxima, used as default upper bounds in the UI.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ColumnStats {
    pub max_input: f64,
    pub max_output: f64,
}

impl ColumnStats {
    pub fn of(rows: &[NormalizedModel]) -> Self {
        rows.iter().fold(Self::default(), |acc, m| Self {
            max_input: acc.max_input.max(m.input_cost_per_1m),
            max_output: acc.max_output.max(m.output_cost_per_1m),
        })
    }
}

/// Rows of the processed file; absent capability flags read as false.
pub fn load_rows(path: &Path) -> Result<Vec<NormalizedModel>> {
    normalize::read_processed(path)
}

pub struct Dashboard {
    processed_path: PathBuf,
    rows: Vec<NormalizedModel>,
    load_error: Option<String>,
    importer: Importer,
    pub filter: Filter,
}

impl Dashboard {
    /// An empty table over `settings.processed_path`. Nothing is read until
    /// [`Dashboard::refresh`] or a successful import.
    pub fn new(settings: &Settings) -> Self {
        Self {
            processed_path: settings.processed_path.clone(),
            rows: Vec::new(),
            load_error: None,
            importer: Importer::new(&settings.upload_dir),
            filter: Filter::default(),
        }
    }

    /// Load the processed file. A failed load leaves the table empty and is
    /// reported through [`Dashboard::load_error`].
    pub fn open(settings: &Settings) -> Self {
        let mut dash = Self::new(settings);
        dash.refresh();
        dash
    }

    pub fn refresh(&mut self) {
        match load_rows(&self.processed_path) {
            Ok(rows) => {
                tracing::debug!(count = rows.len(), "loaded dashboard rows");
                self.rows = rows;
                self.load_error = None;
            }
            Err(e) => {
                tracing::warn!(path = %self.processed_path.display(), "cannot load rows: {e}");
                self.rows.clear();
                self.load_error = Some(e.to_string());
            }
        }
    }

    pub fn processed_path(&self) -> &Path {
        &self.processed_path
    }

    pub fn rows(&self) -> &[NormalizedModel] {
        &self.rows
    }

    pub fn visible(&self) -> Vec<&NormalizedModel> {
        self.filter.apply(&self.rows)
    }

    pub fn stats(&self) -> ColumnStats {
        ColumnStats::of(&self.rows)
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn modified(&self) -> Option<SystemTime> {
        std::fs::metadata(&self.processed_path).and_then(|m| m.modified()).ok()
    }

    pub fn import_state(&self) -> &ImportState {
        self.importer.state()
    }

    pub fn open_uploader(&mut self) -> Result<()> {
        self.importer.open_uploader()
    }

    pub fn stage(&mut self, src: &Path) -> Result<PathBuf> {
        self.importer.stage(src)
    }

    pub fn clear_staged(&mut self) -> Result<()> {
        self.importer.clear()
    }

    /// Process the staged file into the processed path and reload on success.
    pub async fn process<N: Normalizer>(&mut self, normalizer: &N) -> Result<String> {
        let message = self.importer.process(normalizer, &self.processed_path).await?;
        self.refresh();
        Ok(message)
    }

    pub fn acknowledge(&mut self) -> Result<String> {
        self.importer.acknowledge()
    }
}
