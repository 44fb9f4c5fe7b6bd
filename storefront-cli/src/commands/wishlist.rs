//! Wishlist command - view and toggle favorites

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use rust_decimal::Decimal;
use storefront_core::{OperationResult, PriceSnapshot, ProductRef, WishlistToggle};

use super::get_context;
use crate::output::{self, create_table, format_money};

#[derive(Subcommand)]
pub enum WishlistCommands {
    /// List wishlist entries
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a product to the wishlist, or remove it if it is already there
    Toggle {
        /// Product id
        product_id: String,
        /// Variant id
        #[arg(long)]
        variant: Option<String>,
        /// Unit price shown on the product page
        #[arg(long, default_value = "0")]
        price: Decimal,
        /// Product name
        #[arg(long)]
        name: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(command: WishlistCommands) -> Result<()> {
    let mut ctx = get_context().await?;

    match command {
        WishlistCommands::List { json } => {
            let model = ctx.cart.model();
            if json {
                println!("{}", serde_json::to_string_pretty(&model.wishlist)?);
                return Ok(());
            }

            if model.wishlist.is_empty() {
                println!("{}", "Your wishlist is empty".dimmed());
                return Ok(());
            }

            let mut table = create_table();
            table.set_header(vec!["Id", "Product", "Variant", "Price"]);
            for entry in &model.wishlist {
                table.add_row(vec![
                    entry.id.to_string(),
                    entry
                        .item
                        .product_name
                        .clone()
                        .unwrap_or_else(|| entry.item.product_id.clone()),
                    entry.item.variant_id.clone().unwrap_or_default(),
                    format_money(entry.item.unit_price),
                ]);
            }
            println!("{}", table);
        }
        WishlistCommands::Toggle {
            product_id,
            variant,
            price,
            name,
            json,
        } => {
            let mut product = ProductRef::new(product_id);
            if let Some(variant) = variant {
                product = product.with_variant(variant);
            }
            if let Some(name) = name {
                product = product.with_name(name);
            }

            let result = ctx
                .cart
                .toggle_wishlist(&product, &PriceSnapshot::new(price))
                .await;
            if json {
                let result: OperationResult<WishlistToggle> = result.into();
                println!("{}", serde_json::to_string_pretty(&result)?);
                return Ok(());
            }

            match result? {
                WishlistToggle::Added(_) => output::success("Added to your wishlist"),
                WishlistToggle::Removed => output::success("Removed from your wishlist"),
            }
        }
    }

    Ok(())
}
