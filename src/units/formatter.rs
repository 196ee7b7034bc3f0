use serde::{Deserialize, Serialize};

/// Badge text when a card has no recognizable package size
pub const NO_UNIT_INFO: &str = "Нет инф.";

/// Round half away from zero to `decimal_places`; negative places round to tens, hundreds, ...
pub fn round_number(value: f64, decimal_places: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimal_places);
    let rounded = (value.abs() * factor).round() / factor;
    if value < 0.0 {
        -rounded
    } else {
        rounded
    }
}

/// How many decimals a unit price is shown with
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    /// Whole rubles
    #[default]
    Whole,
    /// Kopecks for prices under the threshold, whole rubles otherwise
    CentsBelow(f64),
}

impl Precision {
    pub fn apply(self, unit_price: f64) -> f64 {
        match self {
            Precision::Whole => round_number(unit_price, 0),
            Precision::CentsBelow(threshold) if unit_price < threshold => round_number(unit_price, 2),
            Precision::CentsBelow(_) => round_number(unit_price, 0),
        }
    }
}

/// Layout of the priced badge text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeTemplate {
    /// "796 ₽ за 1 кг"
    #[default]
    Za,
    /// "796 ₽/1 кг"
    Slash,
}

/// Render the unit price badge text
pub fn format_unit_price(
    unit_price: f64,
    unit_label: &str,
    precision: Precision,
    template: BadgeTemplate,
) -> String {
    let shown = precision.apply(unit_price);
    match template {
        BadgeTemplate::Za => format!("{} ₽ за {}", shown, unit_label),
        BadgeTemplate::Slash => format!("{} ₽/{}", shown, unit_label),
    }
}
