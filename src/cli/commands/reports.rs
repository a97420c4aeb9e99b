use chrono::{NaiveDate, Utc};
use clap::{Args, Subcommand};

use super::{open_context, require_session};
use crate::api::Page;
use crate::cli::utils::{output_item, output_list, output_success};
use crate::cli::OutputFormat;
use crate::models::MonthlyReport;
use crate::screens::dashboard::TREND_DAYS;
use crate::screens::{DateRange, ReportsScreen};

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Queue generation of a monthly report (administrators)
    Generate { year: i32, month: u32 },
    /// List generated reports
    List {
        #[arg(long, default_value = "0")]
        skip: u32,
        #[arg(long, default_value = "100")]
        limit: u32,
    },
    /// Show a report with its meal and product summaries
    Show { id: i64 },
    /// Ingredient consumption over a date range
    Consumption(RangeArgs),
    /// Delivery totals over a date range
    Deliveries(RangeArgs),
}

#[derive(Args)]
pub struct RangeArgs {
    /// First day (YYYY-MM-DD), defaults to 30 days before --to
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Last day (YYYY-MM-DD), defaults to today
    #[arg(long)]
    to: Option<NaiveDate>,
}

impl RangeArgs {
    fn range(&self) -> DateRange {
        let end = self.to.unwrap_or_else(|| Utc::now().date_naive());
        match self.from {
            Some(start) => DateRange::new(start, end),
            None => DateRange::last_days(end, TREND_DAYS),
        }
    }
}

fn report_line(report: &MonthlyReport) -> String {
    let flag = if report.is_overall_suspicious { " [suspicious]" } else { "" };
    format!(
        "{:>5}  {}  {} portions served{}",
        report.id,
        report.report_month.format("%Y-%m"),
        report.total_portions_served_overall,
        flag
    )
}

fn report_detail(report: &MonthlyReport) -> Vec<String> {
    let mut lines = vec![report_line(report)];

    if !report.meal_performance_summaries.is_empty() {
        lines.push("Meals:".to_string());
    }
    for summary in &report.meal_performance_summaries {
        let name = summary
            .meal
            .as_ref()
            .map(|m| m.name.as_str())
            .or_else(|| report.meal_name(summary.meal_id))
            .unwrap_or("?");
        let flag = if summary.is_suspicious { " !" } else { "" };
        lines.push(format!(
            "  {:<30} served {} of {} possible ({}%){}",
            name,
            summary.portions_served_this_meal,
            summary.possible_portions_at_report_time,
            summary.difference_percentage.round_dp(1),
            flag
        ));
    }

    if !report.product_balance_summaries.is_empty() {
        lines.push("Products:".to_string());
    }
    for balance in &report.product_balance_summaries {
        let name = balance
            .product_in_balance
            .as_ref()
            .map(|p| p.name.clone())
            .unwrap_or_else(|| format!("product #{}", balance.product_id));
        let flag = if balance.is_balance_suspicious { " !" } else { "" };
        lines.push(format!(
            "  {:<30} expected {} actual {} (discrepancy {}%){}",
            name,
            balance.theoretical_ending_stock,
            balance.actual_ending_stock,
            balance.discrepancy_percentage.round_dp(1),
            flag
        ));
    }
    lines
}

pub async fn handle(cmd: ReportCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let ctx = open_context()?;
    require_session(&ctx).await?;
    let screen = ReportsScreen::new(&ctx);

    match cmd {
        ReportCommands::Generate { year, month } => {
            let ack = screen.generate(year, month).await?;
            let message = if ack.message.is_empty() {
                format!("Report for {}-{:02} queued", year, month)
            } else {
                ack.message
            };
            output_success(&output_format, &message, None)
        }

        ReportCommands::List { skip, limit } => {
            let reports = screen.list(Page::new(skip, limit)).await?;
            output_list(&output_format, "reports", &reports, "No reports generated yet", report_line)
        }

        ReportCommands::Show { id } => {
            let report = screen
                .detail(Some(id))
                .await?
                .ok_or_else(|| anyhow::anyhow!("Report {} not found", id))?;
            output_item(&output_format, &report, report_detail(&report))
        }

        ReportCommands::Consumption(args) => {
            let rows = screen.ingredient_consumption(args.range()).await?;
            output_list(&output_format, "consumption", &rows, "No consumption in this period", |row| {
                format!("{:<30} {} {}", row.product_name, row.total_consumed, row.unit_short_name)
            })
        }

        ReportCommands::Deliveries(args) => {
            let rows = screen.delivery_trends(args.range()).await?;
            output_list(&output_format, "delivery_trends", &rows, "No deliveries in this period", |row| {
                format!(
                    "{}  {:<30} {} {}",
                    row.delivery_date.format("%Y-%m-%d"),
                    row.product_name,
                    row.total_delivered,
                    row.unit_short_name
                )
            })
        }
    }
}
