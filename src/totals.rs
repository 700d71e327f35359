//! Invoice financial calculator.
//!
//! Every surface that shows or stores money (persisted invoice rows, the
//! PDF, the HTML preview, the email summary) goes through [`calculate`];
//! none of them re-implement the arithmetic.

use crate::error::DomainError;
use crate::models::InvoiceItem;

/// One billable line as the calculator sees it.
#[derive(Debug, Clone, Copy)]
pub struct LineInput {
    pub quantity: f64,
    pub unit_price: f64,
}

impl From<&InvoiceItem> for LineInput {
    fn from(item: &InvoiceItem) -> Self {
        LineInput {
            quantity: item.quantity,
            unit_price: item.unit_price,
        }
    }
}

/// Derived money fields of an invoice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    pub subtotal: f64,
    pub discount_amount: f64,
    pub tax_amount: f64,
    pub total: f64,
}

/// Round half away from zero to 2 decimal places. Applied after each
/// derived value so the persisted record, the preview, and the document
/// can never drift apart.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn line_total(quantity: f64, unit_price: f64) -> f64 {
    round2(quantity * unit_price)
}

/// Compute subtotal, discount, tax, and grand total from line inputs.
///
/// Discount and tax are percentages (0 when absent); tax applies to the
/// discounted subtotal. The function is total over finite inputs; NaN and
/// negative values must be rejected with [`validate`] before calling.
pub fn calculate(
    items: &[LineInput],
    discount_percentage: Option<f64>,
    tax_percentage: Option<f64>,
) -> Totals {
    let subtotal = round2(
        items
            .iter()
            .map(|i| line_total(i.quantity, i.unit_price))
            .sum(),
    );
    let discount_pct = discount_percentage.unwrap_or(0.0);
    let tax_pct = tax_percentage.unwrap_or(0.0);

    let discount_amount = round2(subtotal * discount_pct / 100.0);
    let tax_amount = round2((subtotal - discount_amount) * tax_pct / 100.0);
    let total = round2(subtotal - discount_amount + tax_amount);

    Totals {
        subtotal,
        discount_amount,
        tax_amount,
        total,
    }
}

/// Caller-side validation gate in front of the calculator.
pub fn validate(
    items: &[LineInput],
    discount_percentage: Option<f64>,
    tax_percentage: Option<f64>,
) -> Result<(), DomainError> {
    for (idx, item) in items.iter().enumerate() {
        if !item.quantity.is_finite() || item.quantity <= 0.0 {
            return Err(DomainError::validation(format!(
                "item {}: quantity must be a positive number",
                idx + 1
            )));
        }
        if !item.unit_price.is_finite() || item.unit_price < 0.0 {
            return Err(DomainError::validation(format!(
                "item {}: unit price must be a non-negative number",
                idx + 1
            )));
        }
    }
    for (label, pct) in [
        ("discount percentage", discount_percentage),
        ("tax percentage", tax_percentage),
    ] {
        if let Some(p) = pct {
            if !p.is_finite() || !(0.0..=100.0).contains(&p) {
                return Err(DomainError::validation(format!(
                    "{} must be between 0 and 100",
                    label
                )));
            }
        }
    }
    Ok(())
}
