//! Derived brewing metrics

use serde::{Deserialize, Serialize};

/// Output of one metrics recompute
///
/// Never edited directly; always the result of running the calculator over
/// a whole composition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Original gravity (specific gravity, e.g. 1.052)
    pub original_gravity: f64,
    /// Final gravity
    pub final_gravity: f64,
    /// Alcohol by volume in percent
    pub abv_pct: f64,
    /// Bitterness in IBU
    pub ibu: f64,
    /// Color in SRM
    pub srm: f64,
}
