use clap::Subcommand;
use rust_decimal::Decimal;

use super::{open_context, require_session, CliConfirm};
use crate::api::Page;
use crate::cli::utils::{output_item, output_list, output_success};
use crate::cli::OutputFormat;
use crate::models::{IngredientInput, Meal, MealInput};
use crate::screens::{DeleteOutcome, MealFilter, MealsScreen};

#[derive(Subcommand)]
pub enum MealCommands {
    /// List meals
    List {
        #[arg(long)]
        name: Option<String>,
        /// Only active meals
        #[arg(long)]
        active: bool,
        #[arg(long, default_value = "0")]
        skip: u32,
        #[arg(long, default_value = "100")]
        limit: u32,
    },
    /// Show one meal with its recipe
    Show { id: i64 },
    /// Create a meal
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Create the meal inactive
        #[arg(long)]
        inactive: bool,
        /// Recipe line as PRODUCT_ID:QUANTITY:UNIT_ID, repeatable
        #[arg(long = "ingredient", value_parser = parse_ingredient)]
        ingredients: Vec<IngredientInput>,
    },
    /// Replace a meal's definition
    Update {
        id: i64,
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        inactive: bool,
        #[arg(long = "ingredient", value_parser = parse_ingredient)]
        ingredients: Vec<IngredientInput>,
    },
    /// Delete a meal
    Delete {
        id: i64,
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

fn parse_ingredient(value: &str) -> Result<IngredientInput, String> {
    let parts: Vec<&str> = value.split(':').map(str::trim).collect();
    let [product_id, quantity, unit_id] = parts.as_slice() else {
        return Err(format!("expected PRODUCT_ID:QUANTITY:UNIT_ID, got '{}'", value));
    };

    let quantity: Decimal = quantity
        .parse()
        .map_err(|e| format!("invalid quantity '{}': {}", quantity, e))?;
    if quantity <= Decimal::ZERO {
        return Err("quantity per portion must be positive".to_string());
    }

    Ok(IngredientInput {
        product_id: product_id
            .parse()
            .map_err(|_| format!("invalid product id '{}'", product_id))?,
        quantity_per_portion: quantity,
        unit_id: unit_id.parse().map_err(|_| format!("invalid unit id '{}'", unit_id))?,
    })
}

fn meal_line(meal: &Meal) -> String {
    let portions = meal
        .possible_portions
        .map(|p| p.to_string())
        .unwrap_or_else(|| "-".to_string());
    let status = if meal.is_active { "" } else { " [inactive]" };
    format!(
        "{:>5}  {:<30} {} ingredients, {} portions{}",
        meal.id,
        meal.name,
        meal.ingredients.len(),
        portions,
        status
    )
}

fn meal_detail(meal: &Meal) -> Vec<String> {
    let mut lines = vec![meal_line(meal)];
    if let Some(description) = &meal.description {
        lines.push(format!("       {}", description));
    }
    for ingredient in &meal.ingredients {
        let product = ingredient
            .product
            .as_ref()
            .map(|p| p.name.clone())
            .unwrap_or_else(|| format!("product #{}", ingredient.product_id));
        let unit = ingredient.unit.as_ref().map(|u| u.short_name.as_str()).unwrap_or("");
        lines.push(format!("       - {} {} {}", product, ingredient.quantity_per_portion, unit));
    }
    lines
}

pub async fn handle(cmd: MealCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let ctx = open_context()?;
    require_session(&ctx).await?;
    let screen = MealsScreen::new(&ctx);

    match cmd {
        MealCommands::List { name, active, skip, limit } => {
            let filter = MealFilter {
                name,
                active_only: active.then_some(true),
                page: Page::new(skip, limit),
            };
            let meals = screen.list(&filter).await?;
            output_list(&output_format, "meals", &meals, "No meals found", meal_line)
        }

        MealCommands::Show { id } => {
            let meal = screen
                .detail(Some(id))
                .await?
                .ok_or_else(|| anyhow::anyhow!("Meal {} not found", id))?;
            output_item(&output_format, &meal, meal_detail(&meal))
        }

        MealCommands::Create { name, description, inactive, ingredients } => {
            let input = MealInput {
                name,
                description,
                is_active: !inactive,
                ingredients,
            };
            let meal = screen.create(&input).await?;
            output_success(
                &output_format,
                &format!("Meal '{}' created (id {})", meal.name, meal.id),
                Some(serde_json::to_value(&meal)?),
            )
        }

        MealCommands::Update { id, name, description, inactive, ingredients } => {
            let input = MealInput {
                name,
                description,
                is_active: !inactive,
                ingredients,
            };
            let meal = screen.update(id, &input).await?;
            output_success(
                &output_format,
                &format!("Meal '{}' updated", meal.name),
                Some(serde_json::to_value(&meal)?),
            )
        }

        MealCommands::Delete { id, yes } => {
            let confirm = CliConfirm { assume_yes: yes };
            match screen.delete_by_id(id, &format!("#{}", id), &confirm).await? {
                DeleteOutcome::Deleted(meal) => {
                    output_success(&output_format, &format!("Meal '{}' deleted", meal.name), None)
                }
                DeleteOutcome::Cancelled => output_success(&output_format, "Cancelled", None),
            }
        }
    }
}
