//! Catalog ingredients and their per-recipe additions

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one addition within a recipe's ingredient list
pub type AdditionId = Uuid;

/// Identifier of a catalog ingredient
pub type IngredientId = Uuid;

/// Ingredient category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngredientKind {
    Fermentable,
    Hop,
    Yeast,
    Misc,
}

/// Point in the brewing process where an addition is used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsePhase {
    Mash,
    FirstWort,
    Boil,
    Whirlpool,
    Primary,
    Secondary,
    DryHop,
    Bottling,
}

impl UsePhase {
    /// Phases that make sense for an ingredient kind
    pub fn allowed_for(kind: IngredientKind) -> &'static [UsePhase] {
        match kind {
            IngredientKind::Fermentable => &[UsePhase::Mash, UsePhase::Boil, UsePhase::Primary],
            IngredientKind::Hop => &[
                UsePhase::Mash,
                UsePhase::FirstWort,
                UsePhase::Boil,
                UsePhase::Whirlpool,
                UsePhase::DryHop,
            ],
            IngredientKind::Yeast => &[UsePhase::Primary, UsePhase::Secondary, UsePhase::Bottling],
            IngredientKind::Misc => &[
                UsePhase::Mash,
                UsePhase::Boil,
                UsePhase::Primary,
                UsePhase::Secondary,
                UsePhase::Bottling,
            ],
        }
    }

    /// Whether this phase is valid for `kind`
    pub fn is_valid_for(self, kind: IngredientKind) -> bool {
        Self::allowed_for(kind).contains(&self)
    }
}

/// Unit of an addition quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Kilograms,
    Grams,
    Pounds,
    Ounces,
    Liters,
    Milliliters,
    Packages,
    Items,
}

/// Amount with unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub amount: f64,
    pub unit: Unit,
}

impl Quantity {
    pub fn new(amount: f64, unit: Unit) -> Self {
        Self { amount, unit }
    }

    /// Same unit, amount multiplied by `factor`
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            amount: self.amount * factor,
            unit: self.unit,
        }
    }

    /// Finite and strictly positive
    pub fn is_valid(&self) -> bool {
        self.amount.is_finite() && self.amount > 0.0
    }
}

/// One use of a catalog ingredient in a recipe
///
/// `ingredient_id` is a weak reference: the addition never owns the
/// catalog definition. `id` is assigned by the composition store when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientAddition {
    #[serde(default)]
    pub id: Option<AdditionId>,
    pub ingredient_id: IngredientId,
    pub phase: UsePhase,
    pub quantity: Quantity,
    /// Timing in minutes (e.g. minutes before end of boil, days of dry hop)
    #[serde(default)]
    pub time_min: Option<u32>,
}

impl IngredientAddition {
    pub fn new(ingredient_id: IngredientId, phase: UsePhase, quantity: Quantity) -> Self {
        Self {
            id: None,
            ingredient_id,
            phase,
            quantity,
            time_min: None,
        }
    }

    pub fn with_time(mut self, minutes: u32) -> Self {
        self.time_min = Some(minutes);
        self
    }

    /// Apply the fields present in `patch`
    pub fn apply(&mut self, patch: &IngredientPatch) {
        if let Some(ingredient_id) = patch.ingredient_id {
            self.ingredient_id = ingredient_id;
        }
        if let Some(phase) = patch.phase {
            self.phase = phase;
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(time_min) = patch.time_min {
            self.time_min = time_min;
        }
    }
}

/// Partial update of one addition
///
/// `time_min: Some(None)` clears the timing value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngredientPatch {
    #[serde(default)]
    pub ingredient_id: Option<IngredientId>,
    #[serde(default)]
    pub phase: Option<UsePhase>,
    #[serde(default)]
    pub quantity: Option<Quantity>,
    #[serde(default)]
    pub time_min: Option<Option<u32>>,
}

impl IngredientPatch {
    pub fn quantity(quantity: Quantity) -> Self {
        Self {
            quantity: Some(quantity),
            ..Self::default()
        }
    }
}

/// Characteristic numbers of a catalog ingredient
///
/// Which fields are present depends on the kind: fermentables carry gravity
/// and color, hops carry alpha acid, yeasts carry attenuation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngredientAttributes {
    /// Potential gravity contribution (e.g. 1.037 for pale malt)
    #[serde(default)]
    pub potential_gravity: Option<f64>,
    /// Color contribution in degrees Lovibond
    #[serde(default)]
    pub color_lovibond: Option<f64>,
    /// Alpha acid percentage
    #[serde(default)]
    pub alpha_acid_pct: Option<f64>,
    /// Apparent attenuation percentage
    #[serde(default)]
    pub attenuation_pct: Option<f64>,
}

/// Catalog entry, immutable from the editor's point of view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientDefinition {
    pub id: IngredientId,
    pub name: String,
    pub kind: IngredientKind,
    #[serde(default)]
    pub attributes: IngredientAttributes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_rules_per_kind() {
        assert!(UsePhase::DryHop.is_valid_for(IngredientKind::Hop));
        assert!(!UsePhase::DryHop.is_valid_for(IngredientKind::Fermentable));
        assert!(UsePhase::Primary.is_valid_for(IngredientKind::Yeast));
        assert!(!UsePhase::Boil.is_valid_for(IngredientKind::Yeast));
    }

    #[test]
    fn test_patch_can_clear_timing() {
        let mut addition = IngredientAddition::new(
            Uuid::new_v4(),
            UsePhase::Boil,
            Quantity::new(28.0, Unit::Grams),
        )
        .with_time(60);

        addition.apply(&IngredientPatch {
            time_min: Some(None),
            ..IngredientPatch::default()
        });

        assert_eq!(addition.time_min, None);
        assert_eq!(addition.quantity.amount, 28.0);
    }

    #[test]
    fn test_quantity_validity() {
        assert!(Quantity::new(0.5, Unit::Kilograms).is_valid());
        assert!(!Quantity::new(0.0, Unit::Kilograms).is_valid());
        assert!(!Quantity::new(f64::NAN, Unit::Grams).is_valid());
        assert_eq!(Quantity::new(1.5, Unit::Pounds).scaled(2.0).amount, 3.0);
    }
}
