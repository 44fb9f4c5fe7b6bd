//! Login and logout commands

use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use storefront_core::{LoginReport, PartialFailurePolicy, UserSession};

use super::get_context;
use crate::commands::cart::print_cart;
use crate::output;

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

pub async fn login(
    user_id: String,
    name: Option<String>,
    email: Option<String>,
    token: Option<String>,
    json: bool,
) -> Result<()> {
    let mut ctx = get_context().await?;

    let mut session = UserSession::new(user_id);
    if let Some(name) = name {
        session = session.with_name(name);
    }
    if let Some(email) = email {
        session = session.with_email(email);
    }
    if let Some(token) = token {
        session = session.with_token(token);
    }

    let bar = (!json).then(|| spinner("Signing in..."));
    let report = ctx.cart.login(session).await;
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    let report = report?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_login(&report, ctx.config.on_partial_failure);
    if report.synced {
        println!();
        print_cart(&ctx.cart.model());
    }
    Ok(())
}

fn print_login(report: &LoginReport, policy: PartialFailurePolicy) {
    output::success(&format!("Signed in as {}", report.user_id));

    if let Some(migration) = &report.migration {
        if migration.migrated() > 0 {
            println!(
                "  Moved {} cart lines and {} wishlist items from this device",
                migration.cart_migrated, migration.wishlist_migrated
            );
        }
        if !migration.is_complete() {
            let fate = match policy {
                PartialFailurePolicy::Retain => "they stay on this device",
                PartialFailurePolicy::Discard => "they were discarded",
            };
            output::warning(&format!(
                "  {} cart lines and {} wishlist items could not be moved; {}",
                migration.cart_failed, migration.wishlist_failed, fate
            ));
            for error in &migration.errors {
                println!("    {}", error.dimmed());
            }
        }
    }

    if !report.synced {
        output::warning("Could not load your account cart. Try `sf cart list` again later.");
    }
}

pub async fn logout(json: bool) -> Result<()> {
    let mut ctx = get_context().await?;
    let model = ctx.cart.logout().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&model)?);
        return Ok(());
    }

    output::success("Signed out");
    println!();
    print_cart(&model);
    Ok(())
}
