//! Cart command - view and change the cart

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;
use rust_decimal::Decimal;
use storefront_core::{CartLine, CartModel, OperationResult, PriceSnapshot, ProductRef};

use super::{get_context, resolve_line_id};
use crate::output::{self, create_table, format_discount, format_money};

#[derive(Subcommand)]
pub enum CartCommands {
    /// List cart lines
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add one unit of a product
    Add {
        /// Product id
        product_id: String,
        /// Variant id (size, color, ...)
        #[arg(long)]
        variant: Option<String>,
        /// Unit price shown on the product page
        #[arg(long)]
        price: Decimal,
        /// Price before discount (defaults to --price)
        #[arg(long)]
        original_price: Option<Decimal>,
        /// Product name to show in the cart
        #[arg(long)]
        name: Option<String>,
        /// Product image reference
        #[arg(long)]
        image: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a line (server id or product[/variant])
    Remove {
        line: String,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
    },
    /// Set a line's quantity (values below 1 become 1)
    Qty {
        line: String,
        #[arg(allow_hyphen_values = true)]
        quantity: i64,
    },
    /// Add one unit to a line
    Inc { line: String },
    /// Remove one unit from a line
    Dec { line: String },
    /// Move a line to the wishlist
    Move { line: String },
}

pub async fn run(command: CartCommands) -> Result<()> {
    let mut ctx = get_context().await?;

    match command {
        CartCommands::List { json } => {
            let model = ctx.cart.model();
            if json {
                println!("{}", serde_json::to_string_pretty(&model)?);
                return Ok(());
            }
            print_cart(&model);
        }
        CartCommands::Add {
            product_id,
            variant,
            price,
            original_price,
            name,
            image,
            json,
        } => {
            let mut product = ProductRef::new(product_id);
            if let Some(variant) = variant {
                product = product.with_variant(variant);
            }
            if let Some(name) = name {
                product = product.with_name(name);
            }
            if let Some(image) = image {
                product = product.with_image(image);
            }
            let mut snapshot = PriceSnapshot::new(price);
            if let Some(original) = original_price {
                snapshot = snapshot.with_original(original);
            }

            let result = ctx.cart.add_to_cart(&product, &snapshot).await;
            if json {
                let result: OperationResult<CartLine> = result.into();
                println!("{}", serde_json::to_string_pretty(&result)?);
                return Ok(());
            }

            let line = result?;
            output::success(&format!(
                "Added {} (quantity {})",
                display_name(&line),
                line.item.quantity
            ));
        }
        CartCommands::Remove { line, force } => {
            let model = ctx.cart.model();
            let id = resolve_line_id(&model, &line)?;

            if !force {
                let name = model.line(&id).map(display_name).unwrap_or_default();
                if !Confirm::new()
                    .with_prompt(format!("Remove {} from your cart?", name))
                    .default(false)
                    .interact()?
                {
                    println!("{}", "Cancelled".dimmed());
                    return Ok(());
                }
            }

            ctx.cart.remove_from_cart(&id).await?;
            output::success("Removed from cart");
        }
        CartCommands::Qty { line, quantity } => {
            let id = resolve_line_id(&ctx.cart.model(), &line)?;
            let updated = ctx.cart.update_quantity(&id, quantity).await?;
            output::success(&format!(
                "{} quantity is now {}",
                display_name(&updated),
                updated.item.quantity
            ));
        }
        CartCommands::Inc { line } => {
            let id = resolve_line_id(&ctx.cart.model(), &line)?;
            let updated = ctx.cart.increment_quantity(&id).await?;
            if updated.item.quantity >= ctx.cart.options().max_quantity {
                output::warning(&format!(
                    "{} is at the maximum quantity ({})",
                    display_name(&updated),
                    updated.item.quantity
                ));
            } else {
                output::success(&format!(
                    "{} quantity is now {}",
                    display_name(&updated),
                    updated.item.quantity
                ));
            }
        }
        CartCommands::Dec { line } => {
            let id = resolve_line_id(&ctx.cart.model(), &line)?;
            let updated = ctx.cart.decrement_quantity(&id).await?;
            output::success(&format!(
                "{} quantity is now {}",
                display_name(&updated),
                updated.item.quantity
            ));
        }
        CartCommands::Move { line } => {
            let id = resolve_line_id(&ctx.cart.model(), &line)?;
            match ctx.cart.move_to_wishlist(&id).await {
                Ok(entry) => output::success(&format!(
                    "Moved {} to your wishlist",
                    entry.item.product_name.as_deref().unwrap_or(&entry.item.product_id)
                )),
                Err(e) if e.rejection().is_some() => output::warning(&e.user_message()),
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(())
}

fn display_name(line: &CartLine) -> String {
    line.item
        .product_name
        .clone()
        .unwrap_or_else(|| line.item.product_id.clone())
}

/// Print the cart as a table followed by its total
pub fn print_cart(model: &CartModel) {
    let owner = match &model.user_id {
        Some(user) => format!("Cart for {}", user),
        None => "Guest cart".to_string(),
    };
    println!("{}", owner.bold());

    if model.cart.is_empty() {
        println!("{}", "Your cart is empty".dimmed());
        return;
    }

    let mut table = create_table();
    table.set_header(vec!["Line", "Product", "Variant", "Qty", "Price", "", "Total"]);
    for line in &model.cart {
        let marker = if model.selection.contains(&line.id) {
            "*"
        } else {
            ""
        };
        table.add_row(vec![
            format!("{}{}", line.id, marker),
            display_name(line),
            line.item.variant_id.clone().unwrap_or_default(),
            line.item.quantity.to_string(),
            format_money(line.item.unit_price),
            format_discount(line.item.discount_percent),
            format_money(line.item.line_total()),
        ]);
    }
    println!("{}", table);

    println!(
        "{} items, subtotal {}",
        model.total.item_count,
        format_money(model.total.subtotal).bold()
    );
    if !model.total.savings.is_zero() {
        println!("You save {}", format_money(model.total.savings).green());
    }
}
