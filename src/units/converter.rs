use crate::units::error::ConversionError;
use crate::units::types::{ConversionResult, Quantity, Unit};

/// Normalize `amount` of `unit_token` to a standard-unit multiplier.
///
/// `price * multiplier` gives the price per 1 кг, 1 л or 1 шт. The amount is
/// validated before the token, so `convert(0.0, "уп")` is still an error.
/// An unrecognized token is not an error: it yields `NoUnitInfo`. An amount
/// small enough to overflow the multiplier is.
pub fn convert(amount: f64, unit_token: &str) -> Result<ConversionResult, ConversionError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ConversionError::NonPositiveAmount(amount));
    }

    match Unit::from_token(unit_token) {
        Some(unit) => Ok(Quantity::new(amount, unit)?.to_conversion()),
        None => Ok(ConversionResult::NoUnitInfo),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::types::StandardUnit;
    use rstest::rstest;

    #[rstest]
    // weight
    #[case(250.0, "г", StandardUnit::Kilogram, 4.0)]
    #[case(500.0, "г", StandardUnit::Kilogram, 2.0)]
    #[case(1000.0, "г", StandardUnit::Kilogram, 1.0)]
    #[case(500.0, "гр", StandardUnit::Kilogram, 2.0)]
    #[case(1.0, "кг", StandardUnit::Kilogram, 1.0)]
    #[case(0.5, "кг", StandardUnit::Kilogram, 2.0)]
    #[case(2.5, "кг", StandardUnit::Kilogram, 0.4)]
    #[case(75.0, "г", StandardUnit::Kilogram, 13.333333333333334)]
    #[case(2.7, "кг", StandardUnit::Kilogram, 0.37037037037037035)]
    // volume
    #[case(300.0, "мл", StandardUnit::Liter, 3.3333333333333335)]
    #[case(500.0, "мл", StandardUnit::Liter, 2.0)]
    #[case(0.75, "л", StandardUnit::Liter, 1.3333333333333333)]
    #[case(1.947, "л", StandardUnit::Liter, 0.5136106831022085)]
    #[case(930.0, "мл", StandardUnit::Liter, 1.075268817204301)]
    // pieces
    #[case(1.0, "шт", StandardUnit::Piece, 1.0)]
    #[case(4.0, "шт", StandardUnit::Piece, 0.25)]
    #[case(10.0, "шт.", StandardUnit::Piece, 0.1)]
    fn test_known_units(
        #[case] amount: f64,
        #[case] token: &str,
        #[case] unit: StandardUnit,
        #[case] multiplier: f64,
    ) {
        assert_eq!(
            convert(amount, token).unwrap(),
            ConversionResult::UnitPriced { unit, multiplier }
        );
    }

    #[rstest]
    #[case(500.0, "г", 1000.0)]
    #[case(3.0, "кг", 1.0)]
    #[case(906.0, "мл", 1000.0)]
    #[case(1.4, "л", 1.0)]
    #[case(3.0, "шт", 1.0)]
    fn test_multiplier_times_amount_is_factor(
        #[case] amount: f64,
        #[case] token: &str,
        #[case] factor: f64,
    ) {
        let multiplier = convert(amount, token).unwrap().multiplier().unwrap();
        assert!((multiplier * amount - factor).abs() < 1e-9);
    }

    #[test]
    fn test_case_insensitive_tokens() {
        assert_eq!(
            convert(200.0, "Г").unwrap(),
            convert(200.0, "г").unwrap()
        );
        assert_eq!(convert(2.0, "КГ").unwrap().unit_label(), Some("1 кг"));
    }

    #[test]
    fn test_unknown_unit_is_no_info() {
        assert_eq!(convert(5.0, "unknown").unwrap(), ConversionResult::NoUnitInfo);
        assert_eq!(convert(5.0, "").unwrap(), ConversionResult::NoUnitInfo);
        assert_eq!(convert(5.0, " ").unwrap(), ConversionResult::NoUnitInfo);
    }

    #[test]
    fn test_non_positive_amounts_rejected() {
        assert_eq!(
            convert(0.0, "кг"),
            Err(ConversionError::NonPositiveAmount(0.0))
        );
        assert_eq!(
            convert(-5.0, "кг"),
            Err(ConversionError::NonPositiveAmount(-5.0))
        );
        // amount is checked before the token
        assert!(convert(0.0, "уп").is_err());
        assert!(convert(f64::NAN, "г").is_err());
    }

    #[test]
    fn test_tiny_amounts_rejected() {
        assert_eq!(
            convert(1e-307, "г"),
            Err(ConversionError::UnboundedMultiplier(1e-307))
        );
        assert!(convert(1e-310, "шт").is_err());

        let small = convert(1e-6, "г").unwrap().multiplier().unwrap();
        assert!(small.is_finite() && small > 0.0);
    }
}
