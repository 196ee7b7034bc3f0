use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::Serialize;

lazy_static! {
    /// "6x45 г", "4 × 0.25 л", "10х100г" (Latin x, multiplication sign or Cyrillic х)
    static ref MULTI_PACK: Regex = Regex::new(
        r"(\d+(?:\.\d+)?)\s*[x×х]\s*(\d+(?:\.\d+)?)\s*(кг|гр|г|мл|л|шт\.?)"
    ).unwrap();

    /// "500г", "1.5 л", "10 шт." - longest tokens first so "кг" wins over "г"
    static ref SIMPLE: Regex = Regex::new(
        r"(\d+(?:\.\d+)?)\s*(кг|гр|г|мл|л|шт\.?)"
    ).unwrap();
}

/// Count and per-item size of a multi-pack
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PackSize {
    pub count: f64,
    pub each: f64,
}

/// A package size found in free text. `unit` is the raw token, e.g. "шт.".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantityMatch {
    pub amount: f64,
    pub unit: String,
    pub pack: Option<PackSize>,
}

/// Lowercase, decimal commas to dots, exotic spaces to plain spaces, trimmed.
pub fn normalize(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .map(|c| match c {
            ',' => '.',
            '\u{00A0}' | '\u{2009}' | '\u{202F}' | '\u{2007}' => ' ',
            other => other,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Find the package size in a product name or weight line.
///
/// Multi-pack notation is tried first and its amount is `count * each`.
/// Returns `None` when no amount is followed by a known unit token; the
/// caller's fallback policy decides what that means.
pub fn extract(raw: &str) -> Option<QuantityMatch> {
    let text = normalize(raw);

    if let Some(caps) = first_unit_match(&MULTI_PACK, &text, 3) {
        let count = caps[1].parse::<f64>().ok()?;
        let each = caps[2].parse::<f64>().ok()?;
        return Some(QuantityMatch {
            amount: count * each,
            unit: caps[3].to_string(),
            pack: Some(PackSize { count, each }),
        });
    }

    let caps = first_unit_match(&SIMPLE, &text, 2)?;
    let amount = caps[1].parse::<f64>().ok()?;
    Some(QuantityMatch {
        amount,
        unit: caps[2].to_string(),
        pack: None,
    })
}

/// First match whose unit group is not the "г" of "год"/"года".
fn first_unit_match<'t>(pattern: &Regex, text: &'t str, unit_group: usize) -> Option<Captures<'t>> {
    pattern.captures_iter(text).find(|caps| {
        let unit = match caps.get(unit_group) {
            Some(unit) => unit,
            None => return false,
        };
        !(unit.as_str() == "г" && text[unit.end()..].starts_with("од"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Сыр 250г", 250.0, "г")]
    #[case("Молоко 3,2% 930 мл", 930.0, "мл")]
    #[case("Вода питьевая 1.5 л", 1.5, "л")]
    #[case("Вода питьевая 1,5 л", 1.5, "л")]
    #[case("Яйца С1 10 шт.", 10.0, "шт.")]
    #[case("Яйца С1 10 шт", 10.0, "шт")]
    #[case("Гречка 0.9 КГ", 0.9, "кг")]
    #[case("Печенье 500 гр", 500.0, "гр")]
    #[case("Кофе\u{00A0}250\u{00A0}г", 250.0, "г")]
    #[case("  450 г  ", 450.0, "г")]
    fn test_simple_amounts(#[case] text: &str, #[case] amount: f64, #[case] unit: &str) {
        let found = extract(text).expect("quantity expected");
        assert_eq!(found.amount, amount);
        assert_eq!(found.unit, unit);
        assert!(found.pack.is_none());
    }

    #[test]
    fn test_multi_pack() {
        let found = extract("6x45 г").unwrap();
        assert_eq!(found.amount, 270.0);
        assert_eq!(found.unit, "г");
        assert_eq!(
            found.pack,
            Some(PackSize {
                count: 6.0,
                each: 45.0
            })
        );

        assert_eq!(extract("Йогурт 4 × 95г").unwrap().amount, 380.0);
        assert_eq!(extract("Сок 3х0,2 л").unwrap().amount, 3.0 * 0.2);
    }

    #[test]
    fn test_multi_pack_converts_to_kilogram_multiplier() {
        let found = extract("6x45 г").unwrap();
        let result = crate::units::convert(found.amount, &found.unit).unwrap();
        assert_eq!(result.unit_label(), Some("1 кг"));
        assert!((result.multiplier().unwrap() - 3.7037).abs() < 1e-4);
    }

    #[test]
    fn test_year_is_not_grams() {
        assert_eq!(extract("Вино выдержка 3 года"), None);
        let found = extract("Коньяк урожая 2019 год 0.5 л").unwrap();
        assert_eq!(found.amount, 0.5);
        assert_eq!(found.unit, "л");
    }

    #[test]
    fn test_not_found() {
        assert_eq!(extract("Набор подарочный"), None);
        assert_eq!(extract(""), None);
        assert_eq!(extract("Арт. 12345"), None);
    }
}
