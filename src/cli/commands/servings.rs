use chrono::NaiveDate;
use clap::Subcommand;

use super::{open_context, require_session};
use crate::api::Page;
use crate::cli::utils::{output_list, output_success};
use crate::cli::OutputFormat;
use crate::models::{AvailableMeal, MealServing, ServingInput};
use crate::screens::{ServingFilter, ServingsScreen};

#[derive(Subcommand)]
pub enum ServingCommands {
    /// Meals that can be served with current stock
    Available,
    /// Serving history (managers and administrators)
    History {
        #[arg(long)]
        meal_id: Option<i64>,
        #[arg(long)]
        user_id: Option<i64>,
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long, default_value = "0")]
        skip: u32,
        #[arg(long, default_value = "50")]
        limit: u32,
    },
    /// Serve portions of a meal
    Serve {
        meal_id: i64,
        portions: i64,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Recalculate possible portions for every meal
    Recalculate,
}

fn available_line(meal: &AvailableMeal) -> String {
    let limit = match (&meal.limiting_ingredient_name, &meal.limiting_ingredient_unit) {
        (Some(name), Some(unit)) => format!("  (limited by {}, {})", name, unit),
        (Some(name), None) => format!("  (limited by {})", name),
        _ => String::new(),
    };
    format!("{:>5}  {:<30} {} portions{}", meal.meal_id, meal.meal_name, meal.possible_portions, limit)
}

fn serving_line(serving: &MealServing) -> String {
    let meal = serving
        .meal
        .as_ref()
        .map(|m| m.name.clone())
        .unwrap_or_else(|| format!("meal #{}", serving.meal_id));
    let by = serving
        .served_by_user
        .as_ref()
        .map(|u| u.username.as_str())
        .unwrap_or("?");
    format!(
        "{:>5}  {}  {:<30} x{}  by {}",
        serving.id,
        serving.served_at.format("%Y-%m-%d %H:%M"),
        meal,
        serving.portions_served,
        by
    )
}

pub async fn handle(cmd: ServingCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let ctx = open_context()?;
    require_session(&ctx).await?;
    let screen = ServingsScreen::new(&ctx);

    match cmd {
        ServingCommands::Available => {
            let meals = screen.available().await?;
            output_list(&output_format, "available_meals", &meals, "Nothing can be served right now", available_line)
        }

        ServingCommands::History { meal_id, user_id, from, to, skip, limit } => {
            let filter = ServingFilter {
                meal_id,
                user_id,
                start_date: from,
                end_date: to,
                page: Page::new(skip, limit),
            };
            let servings = screen
                .history(&filter)
                .await?
                .ok_or_else(|| anyhow::anyhow!("Serving history is not available to your role"))?;
            output_list(&output_format, "servings", &servings, "No servings recorded", serving_line)
        }

        ServingCommands::Serve { meal_id, portions, notes } => {
            if portions <= 0 {
                anyhow::bail!("Portions must be a positive number");
            }
            let outcome = screen
                .serve(&ServingInput {
                    meal_id,
                    portions_served: portions,
                    notes,
                })
                .await?;
            let mut message = format!(
                "Served {} portion(s) (serving id {})",
                outcome.serving.portions_served, outcome.serving.id
            );
            if outcome.recalculated {
                message.push_str("; portions recalculated");
            }
            output_success(&output_format, &message, Some(serde_json::to_value(&outcome)?))
        }

        ServingCommands::Recalculate => {
            let ack = screen.recalculate().await?;
            let message = if ack.message.is_empty() {
                "Possible portions recalculated".to_string()
            } else {
                ack.message
            };
            output_success(&output_format, &message, None)
        }
    }
}
