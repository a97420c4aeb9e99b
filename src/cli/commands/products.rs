use clap::Subcommand;
use rust_decimal::Decimal;

use super::{open_context, require_session, CliConfirm};
use crate::api::Page;
use crate::cli::utils::{output_item, output_list, output_success};
use crate::cli::OutputFormat;
use crate::models::{DeliveryInput, Product, ProductDelivery, ProductInput, UnitInput};
use crate::screens::{DeleteOutcome, DeliveryFilter, ProductFilter, ProductsScreen};

#[derive(Subcommand)]
pub enum ProductCommands {
    /// List products
    List {
        /// Filter by name
        #[arg(long)]
        name: Option<String>,
        /// Only products at or below their minimum
        #[arg(long)]
        low_stock: bool,
        #[arg(long, default_value = "0")]
        skip: u32,
        #[arg(long, default_value = "100")]
        limit: u32,
    },
    /// Show one product
    Show { id: i64 },
    /// Create a product
    Create {
        name: String,
        #[arg(long)]
        unit_id: i64,
        #[arg(long)]
        min_quantity: Decimal,
    },
    /// Update a product
    Update {
        id: i64,
        name: String,
        #[arg(long)]
        unit_id: i64,
        #[arg(long)]
        min_quantity: Decimal,
    },
    /// Delete a product
    Delete {
        id: i64,
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// List units of measure
    Units,
    /// Add a unit of measure
    AddUnit {
        name: String,
        short_name: String,
    },
    /// List deliveries
    Deliveries {
        #[arg(long)]
        product_id: Option<i64>,
        #[arg(long, default_value = "0")]
        skip: u32,
        #[arg(long, default_value = "100")]
        limit: u32,
    },
    /// Record a delivery
    Receive {
        product_id: i64,
        quantity: Decimal,
        #[arg(long)]
        supplier: String,
        #[arg(long)]
        price: Option<Decimal>,
        /// Delivery date (YYYY-MM-DD); the server uses today when omitted
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
}

fn product_line(product: &Product) -> String {
    let stock = product
        .current_quantity
        .map(|q| q.to_string())
        .unwrap_or_else(|| "-".to_string());
    let marker = if product.is_low_stock() { " [low]" } else { "" };
    format!(
        "{:>5}  {:<30} {} {} (min {}){}",
        product.id, product.name, stock, product.unit.short_name, product.min_quantity, marker
    )
}

fn delivery_line(delivery: &ProductDelivery) -> String {
    format!(
        "{:>5}  {}  {:<24} {} {}  from {}",
        delivery.id,
        delivery.delivery_date.format("%Y-%m-%d"),
        delivery.product_name.as_deref().unwrap_or("?"),
        delivery.quantity,
        delivery.product_unit_short_name.as_deref().unwrap_or(""),
        delivery.supplier
    )
}

pub async fn handle(cmd: ProductCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let ctx = open_context()?;
    require_session(&ctx).await?;
    let screen = ProductsScreen::new(&ctx);

    match cmd {
        ProductCommands::List { name, low_stock, skip, limit } => {
            let filter = ProductFilter {
                name,
                low_stock_only: low_stock.then_some(true),
                page: Page::new(skip, limit),
            };
            let products = screen.list(&filter).await?;
            output_list(&output_format, "products", &products, "No products found", product_line)
        }

        ProductCommands::Show { id } => {
            let product = screen
                .detail(Some(id))
                .await?
                .ok_or_else(|| anyhow::anyhow!("Product {} not found", id))?;
            output_item(&output_format, &product, vec![product_line(&product)])
        }

        ProductCommands::Create { name, unit_id, min_quantity } => {
            let product = screen
                .create(&ProductInput { name, unit_id, min_quantity })
                .await?;
            output_success(
                &output_format,
                &format!("Product '{}' created (id {})", product.name, product.id),
                Some(serde_json::to_value(&product)?),
            )
        }

        ProductCommands::Update { id, name, unit_id, min_quantity } => {
            let product = screen
                .update(id, &ProductInput { name, unit_id, min_quantity })
                .await?;
            output_success(
                &output_format,
                &format!("Product '{}' updated", product.name),
                Some(serde_json::to_value(&product)?),
            )
        }

        ProductCommands::Delete { id, yes } => {
            let confirm = CliConfirm { assume_yes: yes };
            match screen.delete_by_id(id, &format!("#{}", id), &confirm).await? {
                DeleteOutcome::Deleted(product) => {
                    output_success(&output_format, &format!("Product '{}' deleted", product.name), None)
                }
                DeleteOutcome::Cancelled => output_success(&output_format, "Cancelled", None),
            }
        }

        ProductCommands::Units => {
            let units = screen.units().await?;
            output_list(&output_format, "units", &units, "No units defined", |u| {
                format!("{:>5}  {} ({})", u.id, u.name, u.short_name)
            })
        }

        ProductCommands::AddUnit { name, short_name } => {
            let unit = screen.create_unit(&UnitInput { name, short_name }).await?;
            output_success(
                &output_format,
                &format!("Unit '{}' created (id {})", unit.name, unit.id),
                Some(serde_json::to_value(&unit)?),
            )
        }

        ProductCommands::Deliveries { product_id, skip, limit } => {
            let filter = DeliveryFilter {
                product_id,
                page: Page::new(skip, limit),
            };
            let deliveries = screen.deliveries(&filter).await?;
            output_list(&output_format, "deliveries", &deliveries, "No deliveries found", delivery_line)
        }

        ProductCommands::Receive { product_id, quantity, supplier, price, date, notes } => {
            let input = DeliveryInput {
                product_id,
                quantity,
                supplier,
                price,
                delivery_date: date,
                notes,
            };
            let delivery = screen.create_delivery(&input).await?;
            output_success(
                &output_format,
                &format!("Delivery recorded (id {})", delivery.id),
                Some(serde_json::to_value(&delivery)?),
            )
        }
    }
}
