//! Zodiaco CLI - Terminal storefront.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! zodiaco products list --q camiseta
//! zodiaco products show p1
//!
//! # Fill the cart and check out as a guest
//! zodiaco cart add p1 v1 --quantity 2
//! zodiaco checkout --email ana@zodiaco.co --first-name Ana --last-name Ruiz \
//!     --address "Calle 10 # 5-20" --city Medellín --postal-code 050021 --phone 3001234567
//!
//! # Log in; the cart commands now use the server cart
//! ZODIACO_PASSWORD=secreto zodiaco login -e ana@zodiaco.co
//! zodiaco orders list
//! ```
//!
//! # Commands
//!
//! - `products`, `categories` - Browse the catalog
//! - `cart` - Show and change the cart
//! - `login`, `register`, `logout`, `whoami` - Session
//! - `checkout` - Place an order for the cart
//! - `orders` - Order history
//! - `addresses`, `profile`, `password` - Account management
//!
//! Configuration is read from the environment (and `.env`); see
//! [`StorefrontConfig`].

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zodiaco_core::{
    AddressId, AddressKind, AddressUpdate, CategoryId, NewAddress, NewReview, OrderId,
    PostalAddress, Price, ProductId, ProductQuery, VariantId,
};
use zodiaco_storefront::api::{DEFAULT_PAGE_SIZE, PasswordChange, ProfileUpdate};
use zodiaco_storefront::error::Result;
use zodiaco_storefront::forms::DEFAULT_COUNTRY;
use zodiaco_storefront::{
    CheckoutForm, LoginForm, PaymentMethod, RegisterForm, Storefront, StorefrontConfig,
};

mod commands;
mod views;

#[derive(Parser)]
#[command(name = "zodiaco")]
#[command(author, version, about = "Zodiaco storefront in the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse products
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// List categories, or the products of one category
    Categories {
        /// Category ID
        id: Option<String>,

        #[command(flatten)]
        page: PageArgs,
    },
    /// Show and change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Log in
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(long, env = "ZODIACO_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and log in
    Register {
        #[arg(short, long)]
        email: String,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        #[arg(long, env = "ZODIACO_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(long, env = "ZODIACO_PASSWORD", hide_env_values = true)]
        confirm_password: String,

        /// Accept the terms and conditions
        #[arg(long)]
        accept_terms: bool,
    },
    /// Log out and forget the stored token
    Logout,
    /// Show the logged-in customer
    Whoami,
    /// Place an order for the cart
    Checkout(CheckoutArgs),
    /// Order history
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Saved addresses
    Addresses {
        #[command(subcommand)]
        action: AddressesAction,
    },
    /// Customer profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Account password
    Password {
        #[command(subcommand)]
        action: PasswordAction,
    },
}

#[derive(Args)]
struct PageArgs {
    #[arg(long, default_value_t = 1)]
    page: u32,

    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    limit: u32,
}

#[derive(Subcommand)]
enum ProductsAction {
    /// Search and filter products
    List {
        /// Free-text search
        #[arg(long)]
        q: Option<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        brand: Option<String>,

        /// Minimum price in pesos
        #[arg(long)]
        min_price: Option<i64>,

        /// Maximum price in pesos
        #[arg(long)]
        max_price: Option<i64>,

        /// Only products with stock
        #[arg(long)]
        in_stock: bool,

        /// Sort order, e.g. `price_asc`
        #[arg(long)]
        sort: Option<String>,

        #[command(flatten)]
        page: PageArgs,
    },
    /// Show one product with its variants
    Show { id: String },
    /// Featured products
    Featured {
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// Products related to a product
    Related {
        id: String,

        #[arg(long, default_value_t = 5)]
        limit: u32,
    },
    /// Reviews of a product
    Reviews {
        id: String,

        #[command(flatten)]
        page: PageArgs,
    },
    /// Review a product
    Review {
        id: String,

        /// Rating from 1 to 5
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        rating: u8,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        comment: Option<String>,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add units of a product variant
    Add {
        product_id: String,
        variant_id: String,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a product variant
    Remove {
        product_id: String,
        variant_id: String,
    },
    /// Set the quantity of a line; zero or less removes it
    Update {
        product_id: String,
        variant_id: String,

        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove every line
    Clear,
}

#[derive(Args)]
struct CheckoutArgs {
    /// Contact email (defaults to the logged-in customer's)
    #[arg(short, long, default_value = "")]
    email: String,

    #[arg(long, default_value = "")]
    first_name: String,

    #[arg(long, default_value = "")]
    last_name: String,

    #[arg(long)]
    address: String,

    #[arg(long)]
    city: String,

    #[arg(long)]
    postal_code: String,

    #[arg(long)]
    phone: String,

    /// `card`, `pse` or `cash`
    #[arg(long, default_value = "card")]
    payment: PaymentMethod,
}

impl From<CheckoutArgs> for CheckoutForm {
    fn from(args: CheckoutArgs) -> Self {
        Self {
            email: args.email,
            first_name: args.first_name,
            last_name: args.last_name,
            address: args.address,
            city: args.city,
            postal_code: args.postal_code,
            phone: args.phone,
            payment_method: args.payment,
        }
    }
}

#[derive(Subcommand)]
enum OrdersAction {
    /// List past orders
    List {
        #[command(flatten)]
        page: PageArgs,
    },
    /// Show one order
    Show { id: String },
}

#[derive(Subcommand)]
enum AddressesAction {
    /// List saved addresses
    List,
    /// Save a new address
    Add(NewAddressArgs),
    /// Make an address the default one
    MakeDefault { id: String },
    /// Delete a saved address
    Delete { id: String },
}

#[derive(Args)]
struct NewAddressArgs {
    #[arg(long)]
    first_name: String,

    #[arg(long)]
    last_name: String,

    #[arg(long, default_value = "")]
    company: String,

    #[arg(long)]
    line1: String,

    #[arg(long, default_value = "")]
    line2: String,

    #[arg(long)]
    city: String,

    #[arg(long, default_value = "")]
    state: String,

    #[arg(long)]
    postal_code: String,

    #[arg(long, default_value = DEFAULT_COUNTRY)]
    country: String,

    #[arg(long, default_value = "")]
    phone: String,

    /// Save as a billing address instead of a shipping one
    #[arg(long)]
    billing: bool,

    /// Make this the default address
    #[arg(long)]
    default: bool,
}

impl From<NewAddressArgs> for NewAddress {
    fn from(args: NewAddressArgs) -> Self {
        Self {
            kind: if args.billing {
                AddressKind::Billing
            } else {
                AddressKind::Shipping
            },
            postal: PostalAddress {
                first_name: args.first_name,
                last_name: args.last_name,
                company: args.company,
                address_line_1: args.line1,
                address_line_2: args.line2,
                city: args.city,
                state: args.state,
                postal_code: args.postal_code,
                country: args.country,
                phone: args.phone,
            },
            is_default: args.default,
        }
    }
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Change name or email
    Update {
        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        #[arg(long)]
        email: Option<String>,
    },
}

#[derive(Subcommand)]
enum PasswordAction {
    /// Change the account password
    Change {
        #[arg(long, env = "ZODIACO_PASSWORD", hide_env_values = true)]
        current: String,

        #[arg(long, env = "ZODIACO_NEW_PASSWORD", hide_env_values = true)]
        new: String,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[allow(clippy::print_stderr)]
fn fail(message: &str) -> ExitCode {
    eprintln!("{message}");
    ExitCode::FAILURE
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => return fail(&e.to_string()),
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "zodiaco_storefront=info,zodiaco_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let storefront = match Storefront::new(config) {
        Ok(storefront) => storefront,
        Err(e) => return fail(&e.report().user_message()),
    };

    match run(cli, &storefront).await {
        Ok(output) => {
            #[allow(clippy::print_stdout)]
            {
                println!("{output}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e.report().user_message()),
    }
}

async fn run(cli: Cli, storefront: &Storefront) -> Result<String> {
    match cli.command {
        Commands::Products { action } => products(action, storefront).await,
        Commands::Categories { id, page } => {
            let id = id.map(CategoryId::new);
            commands::catalog::categories(storefront, id.as_ref(), page.page, page.limit).await
        }
        Commands::Cart { action } => cart(action, storefront).await,
        Commands::Login { email, password } => {
            commands::account::login(storefront, &LoginForm { email, password }).await
        }
        Commands::Register {
            email,
            first_name,
            last_name,
            password,
            confirm_password,
            accept_terms,
        } => {
            let form = RegisterForm {
                email,
                password,
                confirm_password,
                first_name,
                last_name,
                accept_terms,
            };
            commands::account::register(storefront, &form).await
        }
        Commands::Logout => Ok(commands::account::logout(storefront).await),
        Commands::Whoami => Ok(commands::account::whoami(storefront).await),
        Commands::Checkout(args) => commands::orders::checkout(storefront, args.into()).await,
        Commands::Orders { action } => match action {
            OrdersAction::List { page } => {
                commands::orders::list(storefront, page.page, page.limit).await
            }
            OrdersAction::Show { id } => {
                commands::orders::show(storefront, &OrderId::new(id)).await
            }
        },
        Commands::Addresses { action } => match action {
            AddressesAction::List => commands::account::addresses(storefront).await,
            AddressesAction::Add(args) => {
                commands::account::add_address(storefront, &args.into()).await
            }
            AddressesAction::MakeDefault { id } => {
                let update = AddressUpdate {
                    is_default: Some(true),
                    ..AddressUpdate::default()
                };
                commands::account::update_address(storefront, &AddressId::new(id), &update).await
            }
            AddressesAction::Delete { id } => {
                commands::account::delete_address(storefront, &AddressId::new(id)).await
            }
        },
        Commands::Profile {
            action:
                ProfileAction::Update {
                    first_name,
                    last_name,
                    email,
                },
        } => {
            let update = ProfileUpdate {
                first_name,
                last_name,
                email,
            };
            commands::account::update_profile(storefront, &update).await
        }
        Commands::Password {
            action: PasswordAction::Change { current, new },
        } => {
            let change = PasswordChange {
                current_password: current,
                new_password: new,
            };
            commands::account::change_password(storefront, &change).await
        }
    }
}

async fn products(action: ProductsAction, storefront: &Storefront) -> Result<String> {
    match action {
        ProductsAction::List {
            q,
            category,
            brand,
            min_price,
            max_price,
            in_stock,
            sort,
            page,
        } => {
            let query = ProductQuery {
                q,
                category,
                brand,
                min_price: min_price.map(Price::from_units),
                max_price: max_price.map(Price::from_units),
                in_stock: in_stock.then_some(true),
                sort,
                page: Some(page.page),
                limit: Some(page.limit),
            };
            commands::catalog::list(storefront, &query).await
        }
        ProductsAction::Show { id } => {
            commands::catalog::show(storefront, &ProductId::new(id)).await
        }
        ProductsAction::Featured { limit } => commands::catalog::featured(storefront, limit).await,
        ProductsAction::Related { id, limit } => {
            commands::catalog::related(storefront, &ProductId::new(id), limit).await
        }
        ProductsAction::Reviews { id, page } => {
            commands::catalog::reviews(storefront, &ProductId::new(id), page.page, page.limit)
                .await
        }
        ProductsAction::Review {
            id,
            rating,
            title,
            comment,
        } => {
            let review = NewReview {
                rating,
                title,
                comment,
            };
            commands::catalog::review(storefront, &ProductId::new(id), &review).await
        }
    }
}

async fn cart(action: CartAction, storefront: &Storefront) -> Result<String> {
    match action {
        CartAction::Show => commands::cart::show(storefront).await,
        CartAction::Add {
            product_id,
            variant_id,
            quantity,
        } => {
            commands::cart::add(
                storefront,
                &ProductId::new(product_id),
                VariantId::new(variant_id),
                quantity,
            )
            .await
        }
        CartAction::Remove {
            product_id,
            variant_id,
        } => {
            commands::cart::remove(storefront, ProductId::new(product_id), VariantId::new(variant_id))
                .await
        }
        CartAction::Update {
            product_id,
            variant_id,
            quantity,
        } => {
            commands::cart::update(
                storefront,
                ProductId::new(product_id),
                VariantId::new(variant_id),
                quantity,
            )
            .await
        }
        CartAction::Clear => commands::cart::clear(storefront).await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_negative_quantity_parses() {
        let cli = Cli::try_parse_from(["zodiaco", "cart", "update", "p1", "v1", "-2"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Cart {
                action: CartAction::Update { quantity: -2, .. }
            }
        ));
    }

    #[test]
    fn test_checkout_payment_method() {
        let cli = Cli::try_parse_from([
            "zodiaco",
            "checkout",
            "--address",
            "Calle 10 # 5-20",
            "--city",
            "Medellín",
            "--postal-code",
            "050021",
            "--phone",
            "3001234567",
            "--payment",
            "pse",
        ])
        .unwrap();
        let Commands::Checkout(args) = cli.command else {
            panic!("expected checkout");
        };
        let form = CheckoutForm::from(args);
        assert_eq!(form.payment_method, PaymentMethod::Pse);
        assert!(form.email.is_empty());
    }

    #[test]
    fn test_unknown_payment_method_is_rejected() {
        let result = Cli::try_parse_from([
            "zodiaco", "checkout", "--address", "a", "--city", "b", "--postal-code", "c",
            "--phone", "d", "--payment", "bitcoin",
        ]);
        assert!(result.is_err());
    }
}
