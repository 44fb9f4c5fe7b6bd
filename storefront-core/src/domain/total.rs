//! Order total computed over the checkout subset

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::line_item::{CartLine, CartLineId};

/// Totals for the lines that would go to checkout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotal {
    /// Σ unit_price × quantity
    pub subtotal: Decimal,
    /// Σ original_price × quantity
    pub original_subtotal: Decimal,
    pub savings: Decimal,
    /// Σ quantity
    pub item_count: u64,
    pub line_count: usize,
    /// False when the selection was empty and the whole cart was used
    pub selection_applied: bool,
}

impl OrderTotal {
    /// Compute the total for `cart` given the current selection
    ///
    /// An empty selection means the whole cart, not zero.
    pub fn compute(cart: &[CartLine], selection: &BTreeSet<CartLineId>) -> Self {
        let selection_applied = !selection.is_empty();
        Self::over(
            active_lines(cart, selection).into_iter(),
            selection_applied,
        )
    }

    fn over<'a>(lines: impl Iterator<Item = &'a CartLine>, selection_applied: bool) -> Self {
        let mut total = OrderTotal {
            selection_applied,
            ..Self::default()
        };

        // Sums saturate at the Decimal bounds rather than panic on overflow
        for line in lines {
            total.subtotal = total.subtotal.saturating_add(line.item.line_total());
            total.original_subtotal = total
                .original_subtotal
                .saturating_add(line.item.original_total());
            total.item_count = total.item_count.saturating_add(u64::from(line.item.quantity));
            total.line_count += 1;
        }

        total.savings = total
            .original_subtotal
            .saturating_sub(total.subtotal)
            .max(Decimal::ZERO);
        total
    }
}

/// The lines counted toward checkout: the selection, or everything if none
pub fn active_lines<'a>(cart: &'a [CartLine], selection: &BTreeSet<CartLineId>) -> Vec<&'a CartLine> {
    if selection.is_empty() {
        cart.iter().collect()
    } else {
        cart.iter().filter(|l| selection.contains(&l.id)).collect()
    }
}

/// What a checkout would submit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSummary {
    pub lines: Vec<CartLine>,
    pub total: OrderTotal,
}
