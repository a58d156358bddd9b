//! Search log commands.

use console::style;

use crate::config::Settings;
use crate::repository::SearchOutcome;

/// Show the most recent searches.
pub async fn cmd_logs(settings: &Settings, limit: usize) -> anyhow::Result<()> {
    let log = settings.create_search_log()?;
    let entries = log.recent_searches(limit)?;

    if entries.is_empty() {
        println!("{} No searches logged yet", style("!").yellow());
        return Ok(());
    }

    println!("\n{}", style("Recent Searches").bold());
    println!("{}", "-".repeat(72));

    for entry in entries {
        let status = match SearchOutcome::from_str(&entry.status) {
            Some(SearchOutcome::Success) => style(entry.status.as_str()).green(),
            Some(SearchOutcome::SuccessWithWarning) | Some(SearchOutcome::NoData) => {
                style(entry.status.as_str()).yellow()
            }
            Some(SearchOutcome::Failed) => style(entry.status.as_str()).red(),
            Some(SearchOutcome::Started) | None => style(entry.status.as_str()).dim(),
        };
        let duration = entry
            .processing_time
            .map(|secs| format!("{:.1}s", secs))
            .unwrap_or_else(|| "-".to_string());

        println!(
            "  {}  {} {}/{}  {:<20} {}",
            style(entry.searched_at.format("%Y-%m-%d %H:%M:%S")).dim(),
            entry.case_type,
            entry.case_number,
            entry.filing_year,
            status,
            duration
        );
        if let Some(error) = entry.error_message {
            println!("      {}", style(error).dim());
        }
    }

    Ok(())
}

/// Show overall and per-day statistics.
pub async fn cmd_stats(settings: &Settings, days: usize) -> anyhow::Result<()> {
    let log = settings.create_search_log()?;
    let stats = log.statistics()?;

    println!("\n{}", style("Search Statistics").bold());
    println!("{}", "-".repeat(40));
    println!("  Total searches:   {}", stats.total_searches);
    println!(
        "  Successful:       {}",
        style(stats.successful_searches).green()
    );
    println!("  No data:          {}", style(stats.no_data_searches).yellow());
    println!("  Failed:           {}", style(stats.failed_searches).red());
    println!("  Success rate:     {:.2}%", stats.success_rate);
    println!("  Avg. duration:    {:.2}s", stats.avg_processing_time);
    println!("  Last 24 hours:    {}", stats.recent_searches_24h);

    let daily = log.daily_statistics(days)?;
    if !daily.is_empty() {
        println!("\n{}", style(format!("Last {} days", days)).bold());
        println!("{}", "-".repeat(40));
        for day in daily {
            println!(
                "  {}  {:>4} total  {:>4} ok  {:>4} failed  {:.1}s avg",
                day.date,
                day.total_searches,
                day.successful_searches,
                day.failed_searches,
                day.avg_processing_time
            );
        }
    }

    let health = log.health();
    println!(
        "\n  {}",
        style(format!(
            "{} ({} bytes)",
            health.database_path.display(),
            health.database_size
        ))
        .dim()
    );

    Ok(())
}

/// Drop search log records older than `days`.
pub async fn cmd_cleanup(settings: &Settings, days: u32) -> anyhow::Result<()> {
    let log = settings.create_search_log()?;
    let removed = log.cleanup_old_records(days)?;

    if removed == 0 {
        println!(
            "{} No searches older than {} days",
            style("✓").green(),
            days
        );
    } else {
        println!(
            "{} Removed {} searches older than {} days",
            style("✓").green(),
            removed,
            days
        );
    }

    Ok(())
}
