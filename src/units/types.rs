use crate::units::error::ConversionError;
use serde::Serialize;
use std::fmt;

/// Package unit as printed on a product card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Gram,
    Kilogram,
    Milliliter,
    Liter,
    Piece,
}

impl Unit {
    /// Match a unit token ("г", "КГ", "шт.") case-insensitively.
    pub fn from_token(token: &str) -> Option<Unit> {
        match token.trim().to_lowercase().as_str() {
            "г" | "гр" => Some(Unit::Gram),
            "кг" => Some(Unit::Kilogram),
            "мл" => Some(Unit::Milliliter),
            "л" => Some(Unit::Liter),
            "шт" | "шт." => Some(Unit::Piece),
            _ => None,
        }
    }

    /// How many of this unit make one standard unit
    pub fn factor(self) -> f64 {
        match self {
            Unit::Gram | Unit::Milliliter => 1000.0,
            Unit::Kilogram | Unit::Liter | Unit::Piece => 1.0,
        }
    }

    pub fn standard(self) -> StandardUnit {
        match self {
            Unit::Gram | Unit::Kilogram => StandardUnit::Kilogram,
            Unit::Milliliter | Unit::Liter => StandardUnit::Liter,
            Unit::Piece => StandardUnit::Piece,
        }
    }
}

/// The unit a badge price is quoted in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StandardUnit {
    Kilogram,
    Liter,
    Piece,
}

impl StandardUnit {
    pub fn label(self) -> &'static str {
        match self {
            StandardUnit::Kilogram => "1 кг",
            StandardUnit::Liter => "1 л",
            StandardUnit::Piece => "1 шт",
        }
    }
}

impl fmt::Display for StandardUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A validated package size. `amount` is always positive and finite, and so
/// is the multiplier derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quantity {
    amount: f64,
    unit: Unit,
}

impl Quantity {
    pub fn new(amount: f64, unit: Unit) -> Result<Self, ConversionError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(ConversionError::NonPositiveAmount(amount));
        }
        if !(unit.factor() / amount).is_finite() {
            return Err(ConversionError::UnboundedMultiplier(amount));
        }
        Ok(Self { amount, unit })
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    /// Multiplier such that `package price * multiplier` is the standard-unit price
    pub fn multiplier(&self) -> f64 {
        self.unit.factor() / self.amount
    }

    pub fn to_conversion(&self) -> ConversionResult {
        ConversionResult::UnitPriced {
            unit: self.unit.standard(),
            multiplier: self.multiplier(),
        }
    }
}

/// Outcome of normalizing a package size
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversionResult {
    UnitPriced { unit: StandardUnit, multiplier: f64 },
    /// The page text carried no recognizable unit
    NoUnitInfo,
}

impl ConversionResult {
    /// "1 кг" style label, `None` for `NoUnitInfo`
    pub fn unit_label(&self) -> Option<&'static str> {
        match self {
            ConversionResult::UnitPriced { unit, .. } => Some(unit.label()),
            ConversionResult::NoUnitInfo => None,
        }
    }

    pub fn multiplier(&self) -> Option<f64> {
        match self {
            ConversionResult::UnitPriced { multiplier, .. } => Some(*multiplier),
            ConversionResult::NoUnitInfo => None,
        }
    }

    /// Shorthand for a price already quoted per standard unit
    pub fn per_standard(unit: StandardUnit) -> Self {
        ConversionResult::UnitPriced {
            unit,
            multiplier: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_tokens() {
        assert_eq!(Unit::from_token("г"), Some(Unit::Gram));
        assert_eq!(Unit::from_token("ГР"), Some(Unit::Gram));
        assert_eq!(Unit::from_token(" кг "), Some(Unit::Kilogram));
        assert_eq!(Unit::from_token("Мл"), Some(Unit::Milliliter));
        assert_eq!(Unit::from_token("л"), Some(Unit::Liter));
        assert_eq!(Unit::from_token("шт."), Some(Unit::Piece));
        assert_eq!(Unit::from_token("уп"), None);
        assert_eq!(Unit::from_token(""), None);
    }

    #[test]
    fn test_quantity_rejects_non_positive() {
        assert!(Quantity::new(0.0, Unit::Gram).is_err());
        assert!(Quantity::new(-1.0, Unit::Liter).is_err());
        assert!(Quantity::new(f64::NAN, Unit::Piece).is_err());
        assert!(Quantity::new(f64::INFINITY, Unit::Piece).is_err());
    }

    #[test]
    fn test_quantity_multiplier() {
        let q = Quantity::new(250.0, Unit::Gram).unwrap();
        assert_eq!(q.multiplier(), 4.0);
        assert_eq!(q.to_conversion().unit_label(), Some("1 кг"));
    }
}
