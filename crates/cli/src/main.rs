//! PromptOS CLI - browse the prompt catalog and run the commerce ledger.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! promptos catalog prompts --featured
//! promptos catalog prompt seo-blog-writer
//! promptos catalog plans
//!
//! # Sign in and buy
//! promptos login -e ana@example.com -p secret
//! promptos cart add seo-blog-writer --plan monthly
//! promptos checkout --method wallet
//!
//! # Wallet and purchases
//! promptos wallet top-up 100000
//! promptos purchases
//! promptos renew <purchase-id> 99000
//! ```
//!
//! # Environment Variables
//!
//! See `promptos_storefront::config` for the full list. Catalog commands need
//! either `CATALOG_FIXTURE_PATH` or the `COSMIC_*` settings; ledger state is
//! kept under `PROMPTOS_DATA_DIR`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

use promptos_core::PaymentMethod;
use promptos_storefront::config::StorefrontConfig;

mod commands;
mod telemetry;

#[derive(Parser)]
#[command(name = "promptos")]
#[command(author, version, about = "PromptOS storefront")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse prompts, categories and plans
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Sign in with any email and password
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
        #[arg(short, long)]
        name: String,
    },
    /// Sign out and empty the cart
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Buy everything in the cart
    Checkout {
        /// Payment method (`wallet` or `card`)
        #[arg(short, long, default_value = "wallet")]
        method: PaymentMethod,
    },
    /// Show or top up the wallet
    Wallet {
        #[command(subcommand)]
        action: WalletAction,
    },
    /// List purchased prompts
    Purchases,
    /// Extend a purchase by one month, paid from the wallet
    Renew {
        /// Purchase id
        product_id: String,
        /// Renewal price
        price: String,
    },
    /// Mark lapsed subscriptions as expired
    Sweep,
    /// Drop all ledger state
    Reset,
}

#[derive(Subcommand)]
enum CatalogAction {
    /// List prompts
    Prompts {
        /// Only prompts in this category id
        #[arg(short, long)]
        category: Option<String>,
        /// Only featured prompts
        #[arg(short, long)]
        featured: bool,
    },
    /// Show one prompt by slug
    Prompt { slug: String },
    /// List categories
    Categories,
    /// List subscription plans
    Plans,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart lines and total
    Show,
    /// Add a prompt by slug
    Add {
        slug: String,
        /// Subscribe under this plan id instead of buying once
        #[arg(short, long)]
        plan: Option<String>,
    },
    /// Remove a cart line by id
    Remove { id: String },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum WalletAction {
    /// Show balance and transactions
    Show,
    /// Add funds
    TopUp { amount: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            telemetry::init_tracing();
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = telemetry::init_sentry(config.sentry_dsn.as_deref());
    telemetry::init_tracing();

    if let Err(e) = run(cli, &config).await {
        // Only error-level events from this binary reach Sentry as events.
        if e.is_fault() {
            tracing::error!("Command failed: {e}");
        } else {
            tracing::warn!("{e}");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &StorefrontConfig) -> promptos_storefront::Result<()> {
    use commands::{account, cart, catalog, wallet};

    if let Commands::Catalog { action } = cli.command {
        let source = commands::open_catalog(config)?;
        let currency = config.ledger.currency;
        return match action {
            CatalogAction::Prompts { category, featured } => {
                catalog::prompts(&source, category, featured, currency).await
            }
            CatalogAction::Prompt { slug } => catalog::prompt(&source, &slug, currency).await,
            CatalogAction::Categories => catalog::categories(&source).await,
            CatalogAction::Plans => catalog::plans(&source, currency).await,
        };
    }

    let mut ledger = commands::open_ledger(config)?;
    if let Some(user) = ledger.current_user() {
        telemetry::set_sentry_user(user);
    }

    match cli.command {
        Commands::Catalog { .. } => {}
        Commands::Login { email, password } => account::login(&mut ledger, &email, &password)?,
        Commands::Register {
            email,
            password,
            name,
        } => account::register(&mut ledger, &email, &password, &name)?,
        Commands::Logout => account::logout(&mut ledger)?,
        Commands::Whoami => account::whoami(&ledger),
        Commands::Cart { action } => match action {
            CartAction::Show => cart::show(&ledger),
            CartAction::Add { slug, plan } => {
                let source = commands::open_catalog(config)?;
                cart::add(&mut ledger, &source, &slug, plan).await?;
            }
            CartAction::Remove { id } => cart::remove(&mut ledger, &id)?,
            CartAction::Clear => cart::clear(&mut ledger)?,
        },
        Commands::Checkout { method } => cart::checkout(&mut ledger, method)?,
        Commands::Wallet { action } => match action {
            WalletAction::Show => wallet::show(&ledger),
            WalletAction::TopUp { amount } => wallet::top_up(&mut ledger, &amount)?,
        },
        Commands::Purchases => wallet::purchases(&ledger),
        Commands::Renew { product_id, price } => wallet::renew(&mut ledger, &product_id, &price)?,
        Commands::Sweep => wallet::sweep(&mut ledger)?,
        Commands::Reset => wallet::reset(&mut ledger)?,
    }
    Ok(())
}
