use crate::adapter::AdapterError;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    /// "1 299,90 ₽", "199 ₽", "89\u{2009}₽": an amount directly followed by the ruble sign.
    /// Thousands groups may be separated by plain, non-breaking or thin spaces.
    static ref RUBLES: Regex = Regex::new(
        r"(\d{1,3}(?:[ \x{00A0}\x{2009}\x{202F}]\d{3})+|\d+)(?:[.,](\d+))?[ \x{00A0}\x{2009}\x{202F}]*₽"
    ).unwrap();

    static ref DECIMAL_COMMA: Regex = Regex::new(r"(\d+),(\d+)").unwrap();

    static ref LEADING_NUMBER: Regex = Regex::new(r"^\d+(?:\.\d+)?").unwrap();
}

/// How a retailer prints the package price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceFormat {
    /// Amount followed by "₽"
    Rubles,
    /// Like `Rubles`, but the number counts kopecks
    Kopecks,
    /// Anything goes: keep digits and separators, read the leading number
    Digits,
    /// "123,45"; whole-ruble prices fall back to `Rubles`
    DecimalComma,
}

impl PriceFormat {
    pub fn parse(self, text: &str) -> Result<f64, AdapterError> {
        let value = match self {
            PriceFormat::Rubles => parse_rubles(text),
            PriceFormat::Kopecks => parse_rubles(text).map(|kopecks| kopecks / 100.0),
            PriceFormat::Digits => parse_digits(text),
            PriceFormat::DecimalComma => parse_decimal_comma(text).or_else(|| parse_rubles(text)),
        };

        match value {
            Some(v) if v.is_finite() => Ok(v),
            _ => Err(AdapterError::Price(text.trim().to_string())),
        }
    }
}

fn parse_rubles(text: &str) -> Option<f64> {
    let caps = RUBLES.captures(text)?;
    let whole: String = caps[1].chars().filter(char::is_ascii_digit).collect();
    let number = match caps.get(2) {
        Some(fraction) => format!("{}.{}", whole, fraction.as_str()),
        None => whole,
    };
    number.parse().ok()
}

fn parse_digits(text: &str) -> Option<f64> {
    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    let kept = kept.replacen(',', ".", 1);
    LEADING_NUMBER.find(&kept)?.as_str().parse().ok()
}

fn parse_decimal_comma(text: &str) -> Option<f64> {
    let caps = DECIMAL_COMMA.captures(text)?;
    format!("{}.{}", &caps[1], &caps[2]).parse().ok()
}
