//! Storefront CLI - your cart and wishlist in the terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{cart, checkout, logs, session, status, viewed, wishlist};

/// Storefront - cart and wishlist for guests and signed-in shoppers
#[derive(Parser)]
#[command(name = "sf", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show who is signed in and a cart summary
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and change the cart
    Cart {
        #[command(subcommand)]
        command: cart::CartCommands,
    },

    /// View and change the wishlist
    Wishlist {
        #[command(subcommand)]
        command: wishlist::WishlistCommands,
    },

    /// Show the order total for the selected lines (or the whole cart)
    Total {
        /// Lines to include (server ids or product[/variant]); default is all
        #[arg(long, value_delimiter = ',')]
        select: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Prepare the selected lines for checkout
    Checkout {
        /// Lines to check out (server ids or product[/variant]); default is all
        #[arg(long, value_delimiter = ',')]
        select: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign in, moving any guest cart and wishlist to the account
    Login {
        /// Account user id
        user_id: String,
        /// Display name
        #[arg(long)]
        name: Option<String>,
        /// Email address
        #[arg(long)]
        email: Option<String>,
        /// Bearer token for the storefront API
        #[arg(long, env = "STOREFRONT_TOKEN")]
        token: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign out and return to the guest cart
    Logout {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or record recently viewed products
    Viewed {
        /// Record a view of this product first
        product_id: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Status { json } => status::run(json).await,
        Commands::Cart { command } => cart::run(command).await,
        Commands::Wishlist { command } => wishlist::run(command).await,
        Commands::Total { select, json } => checkout::run_total(select, json).await,
        Commands::Checkout { select, json } => checkout::run(select, json).await,
        Commands::Login {
            user_id,
            name,
            email,
            token,
            json,
        } => session::login(user_id, name, email, token, json).await,
        Commands::Logout { json } => session::logout(json).await,
        Commands::Viewed { product_id, json } => viewed::run(product_id, json).await,
        Commands::Logs { command } => logs::run(command),
    }
}
