//! Viewed command - recently viewed products

use anyhow::Result;
use colored::Colorize;

use super::get_context;

pub async fn run(product_id: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context().await?;

    let ids = match product_id {
        Some(id) => ctx.cart.record_product_view(&id)?,
        None => ctx.cart.recently_viewed(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&ids)?);
        return Ok(());
    }

    if ids.is_empty() {
        println!("{}", "Nothing viewed yet".dimmed());
        return Ok(());
    }

    println!("{}", "Recently viewed".bold());
    for (i, id) in ids.iter().enumerate() {
        println!("  {:>2}. {}", i + 1, id);
    }
    Ok(())
}
