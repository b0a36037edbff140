use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

use salesdesk_products::ProductCode;

use crate::transaction::TransactionLine;

/// One product that cannot cover the requested quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shortfall {
    pub code: ProductCode,
    pub requested: Decimal,
    pub available: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("insufficient stock for product(s): {}", describe(.shortfalls))]
pub struct StockError {
    pub shortfalls: Vec<Shortfall>,
}

fn describe(shortfalls: &[Shortfall]) -> String {
    shortfalls
        .iter()
        .map(|s| {
            format!(
                "{} (requested: {}, available: {})",
                s.code, s.requested, s.available
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Check every line against current stock before anything is written.
///
/// `available` returns `None` for an unknown product, which counts as zero
/// stock. Lines for the same product are summed so a split order cannot
/// overdraw. A sum too large to represent is always a shortfall and is
/// reported as `Decimal::MAX`.
pub fn check_availability<F>(lines: &[TransactionLine], available: F) -> Result<(), StockError>
where
    F: Fn(&ProductCode) -> Option<Decimal>,
{
    // `None` once the running total has overflowed.
    let mut requested: BTreeMap<&ProductCode, Option<Decimal>> = BTreeMap::new();
    for line in lines {
        let total = requested.entry(&line.product_code).or_insert(Some(Decimal::ZERO));
        *total = total.and_then(|sum| sum.checked_add(line.quantity));
    }

    let shortfalls: Vec<Shortfall> = requested
        .into_iter()
        .filter_map(|(code, requested)| {
            let available = available(code).unwrap_or(Decimal::ZERO);
            match requested {
                Some(requested) if requested <= available => None,
                requested => Some(Shortfall {
                    code: code.clone(),
                    requested: requested.unwrap_or(Decimal::MAX),
                    available,
                }),
            }
        })
        .collect();

    if shortfalls.is_empty() {
        Ok(())
    } else {
        Err(StockError { shortfalls })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(code: &str, quantity: Decimal) -> TransactionLine {
        TransactionLine {
            product_code: ProductCode::parse(code).unwrap(),
            quantity,
            unit_price: dec!(10),
        }
    }

    fn stock(code: &ProductCode) -> Option<Decimal> {
        match code.as_str() {
            "GLD-001" => Some(dec!(5)),
            "ORG-001" => Some(dec!(1)),
            _ => None,
        }
    }

    #[test]
    fn sufficient_stock_passes() {
        let lines = vec![line("GLD-001", dec!(5)), line("ORG-001", dec!(0.5))];
        assert!(check_availability(&lines, stock).is_ok());
    }

    #[test]
    fn every_shortfall_is_listed() {
        let lines = vec![
            line("GLD-001", dec!(6)),
            line("ORG-001", dec!(1)),
            line("XXX-404", dec!(2)),
        ];
        let err = check_availability(&lines, stock).unwrap_err();
        assert_eq!(err.shortfalls.len(), 2);
        assert_eq!(err.shortfalls[0].code.as_str(), "GLD-001");
        assert_eq!(err.shortfalls[0].available, dec!(5));
        assert_eq!(err.shortfalls[1].code.as_str(), "XXX-404");
        assert_eq!(err.shortfalls[1].available, Decimal::ZERO);
        assert!(err.to_string().contains("XXX-404 (requested: 2, available: 0)"));
    }

    #[test]
    fn repeated_product_lines_are_summed() {
        let lines = vec![line("GLD-001", dec!(3)), line("GLD-001", dec!(3))];
        let err = check_availability(&lines, stock).unwrap_err();
        assert_eq!(err.shortfalls[0].requested, dec!(6));
    }

    #[test]
    fn oversized_request_is_a_shortfall_even_against_full_stock() {
        let lines = vec![line("GLD-001", Decimal::MAX), line("GLD-001", dec!(1))];
        let err = check_availability(&lines, |_| Some(Decimal::MAX)).unwrap_err();
        assert_eq!(err.shortfalls.len(), 1);
        assert_eq!(err.shortfalls[0].requested, Decimal::MAX);
        assert_eq!(err.shortfalls[0].available, Decimal::MAX);
    }
}
