use super::{open_context, require_session};
use crate::cli::OutputFormat;
use crate::screens::DashboardScreen;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let ctx = open_context()?;
    let principal = require_session(&ctx).await?;
    let dashboard = DashboardScreen::new(&ctx).load().await?;

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&dashboard)?),
        OutputFormat::Text => {
            println!("{} ({})", principal.display_name, principal.role.as_str());

            if let Some(stock) = &dashboard.stock {
                println!();
                println!("Products: {}  low stock: {}", stock.total_products, stock.low_stock.len());
                for product in &stock.low_stock {
                    println!(
                        "  {:<30} {} / min {} {}",
                        product.name,
                        product
                            .current_quantity
                            .map(|q| q.to_string())
                            .unwrap_or_else(|| "-".to_string()),
                        product.min_quantity,
                        product.unit.short_name
                    );
                }
            }

            println!();
            if dashboard.unread_notifications.is_empty() {
                println!("No unread notifications");
            } else {
                println!("Unread notifications:");
                for notification in &dashboard.unread_notifications {
                    println!("  {}", notification.message);
                }
            }

            if let Some(consumption) = &dashboard.consumption {
                println!();
                println!("Consumption, last 30 days:");
                for row in consumption {
                    println!("  {:<30} {} {}", row.product_name, row.total_consumed, row.unit_short_name);
                }
            }
        }
    }
    Ok(())
}
