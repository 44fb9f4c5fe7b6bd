//! Total and checkout commands

use anyhow::Result;
use colored::Colorize;
use storefront_core::{CheckoutSummary, OperationResult, OrderTotal, StorefrontContext};

use super::{get_context, resolve_line_id};
use crate::output::{self, create_table, format_money};

/// Select the named lines; an empty list leaves the whole cart active
fn apply_selection(ctx: &mut StorefrontContext, select: &[String]) -> Result<()> {
    for raw in select {
        let id = resolve_line_id(&ctx.cart.model(), raw)?;
        if !ctx.cart.model().selection.contains(&id) {
            ctx.cart.toggle_selection(&id)?;
        }
    }
    Ok(())
}

fn print_total(total: &OrderTotal) {
    let scope = if total.selection_applied {
        format!("{} selected lines", total.line_count)
    } else {
        "whole cart".to_string()
    };
    println!("{} ({})", "Order total".bold(), scope.dimmed());
    println!("  Items:    {}", total.item_count);
    println!("  Subtotal: {}", format_money(total.subtotal).bold());
    if !total.savings.is_zero() {
        println!(
            "  Savings:  {} (was {})",
            format_money(total.savings).green(),
            format_money(total.original_subtotal)
        );
    }
}

pub async fn run_total(select: Vec<String>, json: bool) -> Result<()> {
    let mut ctx = get_context().await?;
    apply_selection(&mut ctx, &select)?;

    let total = ctx.cart.total();
    if json {
        println!("{}", serde_json::to_string_pretty(&total)?);
        return Ok(());
    }

    print_total(&total);
    Ok(())
}

pub async fn run(select: Vec<String>, json: bool) -> Result<()> {
    let mut ctx = get_context().await?;
    apply_selection(&mut ctx, &select)?;

    let result = ctx.cart.prepare_checkout();
    if json {
        let result: OperationResult<CheckoutSummary> = result.into();
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let summary = match result {
        Ok(summary) => summary,
        Err(e) if e.rejection().is_some() => {
            output::warning(&e.user_message());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let mut table = create_table();
    table.set_header(vec!["Product", "Qty", "Total"]);
    for line in &summary.lines {
        table.add_row(vec![
            line.item
                .product_name
                .clone()
                .unwrap_or_else(|| line.item.product_id.clone()),
            line.item.quantity.to_string(),
            format_money(line.item.line_total()),
        ]);
    }
    println!("{}", table);
    print_total(&summary.total);
    output::info("Ready for payment");

    Ok(())
}
