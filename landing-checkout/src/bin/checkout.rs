//! `checkout` - place a landing-page order from the terminal.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use landing_checkout::{Catalog, CheckoutConfig, CheckoutForm, OrderFlow, ReservationTimer};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "checkout", version, about = "Landing-page order flow")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List available colors, sizes and the unit price.
    Catalog,
    /// Submit an order.
    Order(OrderArgs),
    /// Print the id of the last accepted order.
    Last,
}

#[derive(Args)]
struct OrderArgs {
    #[arg(long)]
    color: String,
    #[arg(long)]
    size: String,
    #[arg(long, default_value_t = 1)]
    quantity: u32,
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    phone: String,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    address: String,
    #[arg(long)]
    city: String,
    #[arg(long)]
    postal_code: String,
    #[arg(long)]
    notes: Option<String>,
}

impl From<&OrderArgs> for CheckoutForm {
    fn from(args: &OrderArgs) -> Self {
        Self {
            first_name: args.first_name.clone(),
            last_name: args.last_name.clone(),
            phone: args.phone.clone(),
            email: args.email.clone(),
            address: args.address.clone(),
            city: args.city.clone(),
            postal_code: args.postal_code.clone(),
            notes: args.notes.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let catalog = Catalog::default();

    match cli.command {
        Command::Catalog => {
            println!("{}", catalog.product_name);
            println!("Colors: {}", catalog.colors.join(", "));
            println!("Sizes:  {}", catalog.sizes.join(", "));
            println!("Price:  {:.2}", catalog.unit_price_cents as f64 / 100.0);
        }
        Command::Order(args) => {
            let timer = ReservationTimer::start(Utc::now());
            let selection = catalog.select(&args.color, &args.size, args.quantity)?;
            println!("{} x{} reserved for {}", selection.label(), selection.quantity, timer.display(Utc::now()));

            let config = CheckoutConfig::from_env().context("loading configuration")?;
            let flow = OrderFlow::new(config)?;
            let confirmation = flow.submit(&selection, &CheckoutForm::from(&args)).await?;

            println!("Order {} placed.", confirmation.order_id);
            println!("{}", confirmation.redirect_url);
        }
        Command::Last => {
            let config = CheckoutConfig::from_env().context("loading configuration")?;
            match OrderFlow::new(config)?.last_order_id()? {
                Some(id) => println!("{}", id),
                None => println!("No orders yet."),
            }
        }
    }

    Ok(())
}
