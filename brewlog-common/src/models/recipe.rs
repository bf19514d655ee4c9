//! Recipe scalar fields and the patches that edit them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Scalar brewing parameters of a recipe
///
/// `id` is `None` until the first successful save. `version` only moves on
/// "save as new version"; in-place edits never touch it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Persisted identifier (None until first save)
    pub id: Option<Uuid>,
    /// Display name
    pub name: String,
    /// Beer style (free text, e.g. "American IPA")
    pub style: Option<String>,
    /// Batch size in liters
    pub batch_size_l: f64,
    /// Boil time in minutes
    pub boil_time_min: u32,
    /// Brewhouse efficiency in percent
    pub efficiency_pct: f64,
    /// Free-form brewer notes
    pub notes: String,
    /// Monotonic version counter
    pub version: u32,
    /// Recipe this one was versioned or cloned from
    pub parent_recipe_id: Option<Uuid>,
    /// Server-assigned creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Server-assigned modification time
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for Recipe {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            style: None,
            batch_size_l: 20.0,
            boil_time_min: 60,
            efficiency_pct: 72.0,
            notes: String::new(),
            version: 1,
            parent_recipe_id: None,
            created_at: None,
            updated_at: None,
        }
    }
}

impl Recipe {
    /// Apply a single scalar edit, leaving every other field untouched
    pub fn apply_field(&mut self, field: RecipeField) {
        match field {
            RecipeField::Name(name) => self.name = name,
            RecipeField::Style(style) => self.style = style,
            RecipeField::BatchSize(liters) => self.batch_size_l = liters,
            RecipeField::BoilTime(minutes) => self.boil_time_min = minutes,
            RecipeField::Efficiency(pct) => self.efficiency_pct = pct,
            RecipeField::Notes(notes) => self.notes = notes,
        }
    }

    /// Merge the fields present in `patch`; absent fields keep their value
    pub fn merge(&mut self, patch: RecipePatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(style) = patch.style {
            self.style = Some(style);
        }
        if let Some(liters) = patch.batch_size_l {
            self.batch_size_l = liters;
        }
        if let Some(minutes) = patch.boil_time_min {
            self.boil_time_min = minutes;
        }
        if let Some(pct) = patch.efficiency_pct {
            self.efficiency_pct = pct;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
    }
}

/// One editable scalar together with its new value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum RecipeField {
    Name(String),
    Style(Option<String>),
    BatchSize(f64),
    BoilTime(u32),
    Efficiency(f64),
    Notes(String),
}

/// Partial recipe metadata, as produced by an import
///
/// Identity fields (`id`, `version`, lineage, timestamps) are
/// absent: an import never rewrites them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub batch_size_l: Option<f64>,
    #[serde(default)]
    pub boil_time_min: Option<u32>,
    #[serde(default)]
    pub efficiency_pct: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl RecipePatch {
    /// Patch that only sets the name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}
