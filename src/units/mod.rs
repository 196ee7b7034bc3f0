// Quantity parsing and normalization to per-kilogram / per-liter / per-piece multipliers.
// Everything here is pure: no DOM access, no logging side effects.

pub mod converter;
pub mod error;
pub mod extractor;
pub mod formatter;
pub mod types;

pub use converter::convert;
pub use error::ConversionError;
pub use extractor::{extract, PackSize, QuantityMatch};
pub use formatter::{format_unit_price, round_number, BadgeTemplate, Precision, NO_UNIT_INFO};
pub use types::{ConversionResult, Quantity, StandardUnit, Unit};
