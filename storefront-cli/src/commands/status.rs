//! Status command - who is signed in and a cart summary

use anyhow::Result;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use super::{get_context, get_data_dir};
use crate::output::{self, format_money};

pub async fn run(json: bool) -> Result<()> {
    let ctx = get_context().await?;
    let model = ctx.cart.model();
    let identity = ctx.cart.identity();

    if json {
        let status = serde_json::json!({
            "identity": identity.kind(),
            "userId": identity.user_id(),
            "cartLines": model.cart.len(),
            "cartItems": model.total.item_count,
            "subtotal": model.total.subtotal,
            "wishlistItems": model.wishlist.len(),
            "apiBaseUrl": ctx.config.api_base_url,
            "storageBackend": ctx.config.storage_backend.to_string(),
            "dataDir": get_data_dir()?.to_string_lossy(),
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", "Storefront Status".bold());
    println!();

    let signed_in = match identity.user_id() {
        Some(user) => user.to_string(),
        None => "guest".to_string(),
    };

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.add_row(vec!["Signed in as", signed_in.as_str()]);
    table.add_row(vec!["Cart lines", &model.cart.len().to_string()]);
    table.add_row(vec!["Cart items", &model.total.item_count.to_string()]);
    table.add_row(vec!["Subtotal", &format_money(model.total.subtotal)]);
    table.add_row(vec!["Wishlist", &model.wishlist.len().to_string()]);
    table.add_row(vec!["API", ctx.config.api_base_url.as_str()]);
    table.add_row(vec!["Storage", &ctx.config.storage_backend.to_string()]);
    println!("{}", table);

    if !identity.is_authenticated() && !model.cart.is_empty() {
        println!();
        output::info("Sign in with `sf login <user>` to keep this cart on your account.");
    }

    Ok(())
}
