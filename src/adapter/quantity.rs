use crate::units::{convert, extract, ConversionError, ConversionResult, StandardUnit};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref PERCENT: Regex = Regex::new(r"(\d+(?:\.\d+)?)\s*%").unwrap();
}

/// Where on the card the package size is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantitySource {
    /// Text of the weight/volume element
    Volume,
    /// Text of the product name element
    Name,
    /// `title` attribute of the product name element
    NameTitle,
}

/// What a card with no readable package size gets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fallback {
    /// Render the "no information" badge
    #[default]
    NoInfo,
    /// Treat the price as a price per piece
    OnePiece,
}

impl Fallback {
    pub fn result(self) -> ConversionResult {
        match self {
            Fallback::NoInfo => ConversionResult::NoUnitInfo,
            Fallback::OnePiece => ConversionResult::per_standard(StandardUnit::Piece),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityPolicy {
    /// Tried in order; the first text with a package size wins
    pub sources: Vec<QuantitySource>,
    #[serde(default)]
    pub fallback: Fallback,
    /// A bare "N%" (no other unit in the text) reads as N grams
    #[serde(default)]
    pub percent_as_grams: bool,
}

impl Default for QuantityPolicy {
    fn default() -> Self {
        Self {
            sources: vec![QuantitySource::Volume, QuantitySource::Name],
            fallback: Fallback::NoInfo,
            percent_as_grams: false,
        }
    }
}

impl QuantityPolicy {
    /// Read the first package size found in `texts` (ordered as `sources`).
    ///
    /// Fails only when a found amount is zero or negative.
    pub fn resolve<I>(&self, texts: I) -> Result<ConversionResult, ConversionError>
    where
        I: IntoIterator<Item = String>,
    {
        for text in texts {
            if let Some(found) = extract(&text) {
                return convert(found.amount, &found.unit);
            }
            if self.percent_as_grams {
                if let Some(grams) = percent_amount(&text) {
                    return convert(grams, "г");
                }
            }
        }
        Ok(self.fallback.result())
    }
}

fn percent_amount(text: &str) -> Option<f64> {
    let normalized = text.replace(',', ".");
    let caps = PERCENT.captures(&normalized)?;
    caps[1].parse().ok()
}

/// Unit a shelf price is already quoted in ("₽/кг", "за 1 л"), if any
pub fn quoted_unit(text: &str) -> Option<StandardUnit> {
    let text = text.to_lowercase();
    if text.contains("кг") {
        Some(StandardUnit::Kilogram)
    } else if text.contains('л') && !text.contains("мл") {
        Some(StandardUnit::Liter)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_first_text_with_quantity_wins() {
        let policy = QuantityPolicy::default();
        let result = policy
            .resolve(texts(&["", "Сыр Российский 250г", "1 кг"]))
            .unwrap();
        assert_eq!(result.unit_label(), Some("1 кг"));
        assert_eq!(result.multiplier(), Some(4.0));
    }

    #[test]
    fn test_fallbacks() {
        let no_info = QuantityPolicy::default();
        assert_eq!(
            no_info.resolve(texts(&["Набор подарочный"])).unwrap(),
            ConversionResult::NoUnitInfo
        );

        let one_piece = QuantityPolicy {
            fallback: Fallback::OnePiece,
            ..QuantityPolicy::default()
        };
        assert_eq!(
            one_piece.resolve(texts(&["Набор подарочный"])).unwrap(),
            ConversionResult::per_standard(StandardUnit::Piece)
        );
    }

    #[test]
    fn test_percent_as_grams_only_when_enabled() {
        let plain = QuantityPolicy::default();
        assert_eq!(
            plain.resolve(texts(&["Сметана 20%"])).unwrap(),
            ConversionResult::NoUnitInfo
        );

        let percent = QuantityPolicy {
            percent_as_grams: true,
            ..QuantityPolicy::default()
        };
        assert_eq!(
            percent.resolve(texts(&["Сметана 20%"])).unwrap().multiplier(),
            Some(50.0)
        );
        // a real unit still wins over the percentage
        assert_eq!(
            percent
                .resolve(texts(&["Сметана 20% 300 г"]))
                .unwrap()
                .multiplier(),
            convert(300.0, "г").unwrap().multiplier()
        );
    }

    #[test]
    fn test_zero_amount_is_an_error() {
        let policy = QuantityPolicy::default();
        assert!(policy.resolve(texts(&["Пакет 0 г"])).is_err());
    }

    #[test]
    fn test_quoted_unit() {
        assert_eq!(quoted_unit("₽/кг"), Some(StandardUnit::Kilogram));
        assert_eq!(quoted_unit("за 1 Л"), Some(StandardUnit::Liter));
        assert_eq!(quoted_unit("за 100 мл"), None);
        assert_eq!(quoted_unit("за шт"), None);
    }
}
