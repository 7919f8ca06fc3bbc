//! # Shopping Session Simulator
//!
//! Runs a scripted session against the in-memory remote store and prints
//! the cart view after each step.
//!
//! ## Usage
//! ```bash
//! # Defaults from ~/.config/storefront/storefront.toml, if present
//! cargo run -p bookcart-sync --bin simulate
//!
//! # Explicit config, slower remote, let double clicks through
//! BOOKCART_REENTRANCY=allow cargo run -p bookcart-sync --bin simulate -- \
//!     --config ./storefront.toml --latency-ms 200
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bookcart_core::{AddressId, BookId, BookRef, FeeSchedule, Money, PaymentMethod};
use bookcart_sync::{
    CartStore, Checkout, CheckoutForm, InMemoryRemote, StorefrontConfig, WishlistStore,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn catalog() -> Vec<BookRef> {
    let mut dune = BookRef::new("b1", "Dune", Money::from_major_minor(20, 0), 4);
    dune.author = Some("Frank Herbert".into());

    let mut emma = BookRef::new("b2", "Emma", Money::from_major_minor(10, 0), 1);
    emma.author = Some("Jane Austen".into());

    let mut beloved = BookRef::new("b3", "Beloved", Money::from_major_minor(14, 50), 0);
    beloved.author = Some("Toni Morrison".into());

    let mut solaris = BookRef::new("b4", "Solaris", Money::from_major_minor(12, 99), 7);
    solaris.author = Some("Stanisław Lem".into());

    vec![dune, emma, beloved, solaris]
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bookcart=debug"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn print_cart(
    step: &str,
    cart: &CartStore<InMemoryRemote>,
    fees: &FeeSchedule,
) -> Result<(), serde_json::Error> {
    println!();
    println!("── {} ──", step);
    println!("{}", serde_json::to_string_pretty(&cart.view(fees))?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut config_path: Option<PathBuf> = None;
    let mut latency_ms: u64 = 50;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--latency-ms" | "-l" => {
                if i + 1 < args.len() {
                    latency_ms = args[i + 1].parse().unwrap_or(50);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Bookcart Session Simulator");
                println!();
                println!("Usage: simulate [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>      Storefront config file");
                println!("  -l, --latency-ms <N>     Remote round trip in ms (default: 50)");
                println!("  -h, --help               Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    init_tracing();

    let config = StorefrontConfig::load_or_default(config_path);
    let fees = config.fee_schedule();
    info!(
        threshold = %fees.shipping_threshold,
        fee = %fees.shipping_fee,
        tax_bps = fees.tax_rate.bps(),
        reentrancy = %config.reentrancy(),
        "Storefront configured"
    );

    let remote = Arc::new(
        InMemoryRemote::with_catalog(catalog()).with_latency(Duration::from_millis(latency_ms)),
    );
    let cart = Arc::new(CartStore::with_policy(remote.clone(), config.reentrancy()));
    let wishlist = WishlistStore::with_policy(remote.clone(), config.reentrancy());
    let checkout = Checkout::with_rules(
        remote.clone(),
        cart.clone(),
        fees,
        config.invalidation_rules(),
    );

    // Session start
    cart.fetch().await?;
    wishlist.fetch().await?;
    print_cart("Session start", &cart, &fees)?;

    // Browsing: one book saved for later, one into the cart
    let dune = BookId::from("b1");
    let emma = BookId::from("b2");
    let beloved = BookId::from("b3");

    wishlist.add(&emma, remote.book(&emma)).await?;
    cart.add(&dune, 1, remote.book(&dune)).await?;
    print_cart("Added Dune", &cart, &fees)?;

    // Double click on "add to cart"
    let (first, second) = tokio::join!(
        cart.add(&dune, 1, remote.book(&dune)),
        cart.add(&dune, 1, remote.book(&dune)),
    );
    for result in [first, second] {
        if let Err(e) = result {
            warn!(error = %e, "Second click refused");
        }
    }
    print_cart("Double-clicked add on Dune", &cart, &fees)?;

    // An out-of-stock title the remote refuses
    if let Err(e) = cart.add(&beloved, 1, remote.book(&beloved)).await {
        println!();
        println!("Could not add Beloved: {}", e);
    }

    wishlist.move_to_cart(&emma, &cart).await?;
    cart.update_quantity(&dune, 2).await?;
    print_cart("Moved Emma from wishlist, Dune set to 2", &cart, &fees)?;

    // Checkout
    let incomplete = CheckoutForm {
        address_id: Some(AddressId::new("addr-home")),
        payment_method: None,
    };
    if let Err(e) = checkout.place_order(&incomplete).await {
        println!();
        println!("Checkout blocked: {}", e);
    }

    let form = CheckoutForm::new(AddressId::new("addr-home"), PaymentMethod::CashOnDelivery);
    let outcome = checkout.place_order(&form).await?;
    println!();
    println!("── Order outcome ──");
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if outcome.returns_to_cart() {
        cart.fetch().await?;
    }
    print_cart("After checkout", &cart, &fees)?;

    for order in remote.orders() {
        info!(
            order_id = %order.order_id,
            lines = order.lines.len(),
            payment = %order.request.payment_method,
            placed_at = %order.placed_at,
            "Order on record"
        );
    }

    Ok(())
}
