//! Foreground search and environment check.

use console::style;

use crate::config::Settings;
use crate::models::{CaseRecord, SearchQuery};

/// Run one scrape and print the record.
pub async fn cmd_search(
    settings: &Settings,
    case_type: &str,
    case_number: &str,
    filing_year: &str,
) -> anyhow::Result<()> {
    let query = SearchQuery::parse(case_type, case_number, filing_year)?;

    println!(
        "{} Searching {} at {}",
        style("→").cyan(),
        style(&query).bold(),
        style(settings.search_url()).dim()
    );

    let scraper = settings.create_scraper();
    let record = match scraper.scrape(&query).await {
        Ok(record) => record,
        Err(e) => {
            eprintln!("{} {}", style("✗").red(), e.user_message());
            eprintln!("  {}", style(e.to_string()).dim());
            anyhow::bail!("Search failed ({})", e.kind());
        }
    };

    print_record(&record);

    if !record.is_success() {
        anyhow::bail!("No case data found");
    }
    Ok(())
}

/// Probe the court website and start (then stop) a browser.
pub async fn cmd_check(settings: &Settings) -> anyhow::Result<()> {
    let probe = settings.create_probe()?;
    let reachable = probe.is_reachable().await;
    if reachable {
        println!(
            "{} {} is reachable",
            style("✓").green(),
            settings.base_url
        );
    } else {
        println!(
            "{} {} is not accessible",
            style("✗").red(),
            settings.base_url
        );
    }

    let scraper = settings.create_scraper();
    let browser_ok = match scraper.check().await {
        Ok(()) => {
            println!("{} Browser setup successful", style("✓").green());
            true
        }
        Err(e) => {
            println!("{} Browser setup failed: {}", style("✗").red(), e);
            if let Some(ref remote) = settings.browser.remote_url {
                println!("  {}", style(format!("Remote browser: {}", remote)).dim());
            }
            false
        }
    };

    if reachable && browser_ok {
        println!("\n{} Scraper is ready", style("✓").green());
        Ok(())
    } else {
        anyhow::bail!("Scraper is not ready")
    }
}

fn print_record(record: &CaseRecord) {
    let heading = if record.is_success() {
        style("Case Information").green().bold()
    } else {
        style("No Case Information").yellow().bold()
    };
    println!("\n{}", heading);
    println!("{}", "-".repeat(40));

    for (name, value) in record.fields() {
        if name == "raw_content" {
            continue;
        }
        println!("  {:<14} {}", style(format!("{}:", name)).cyan(), value);
    }
}
