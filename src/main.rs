//! Torn City profit analyzer
//!
//! Reconciles money logs into daily income, expenses and bazaar trading
//! analytics.

mod analysis;
mod api;
mod config;
mod db;
mod models;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use tracing::{debug, info, Level};
use tracing_subscriber::{filter::LevelFilter, EnvFilter, FmtSubscriber};

use crate::analysis::{ProfitAnalyzer, ITEM_CACHE_KEY};
use crate::api::TornClient;
use crate::config::AnalyzerConfig;
use crate::db::CacheStore;
use crate::models::{AnalysisHealth, AnalysisReport, ItemCache};

/// Torn money log profit analyzer CLI.
#[derive(Parser)]
#[command(name = "tornprofit")]
#[command(about = "Daily profit and bazaar analytics from Torn money logs", long_about = None)]
struct Cli {
    /// Cache database URL (defaults to ./tornprofit.db)
    #[arg(short, long)]
    database: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Torn API key
    #[arg(long, env = "TORN_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze profit over the last N days
    Analyze {
        /// Number of days, today included
        #[arg(short, long, default_value = "1")]
        days: u32,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,

        /// Bazaar tables to print
        #[arg(short, long, value_enum, default_value = "both")]
        bazaar: BazaarView,

        /// Use a throwaway in-memory cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Item name cache
    Items {
        #[command(subcommand)]
        action: ItemsAction,
    },

    /// Cache maintenance
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Show current configuration
    Config,
}

#[derive(Subcommand)]
enum ItemsAction {
    /// Refetch the item catalog now
    Refresh,

    /// Look up a cached item name
    Lookup {
        /// Item id
        id: u64,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Remove every cached entry
    Clear,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BazaarView {
    Items,
    Partners,
    Both,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // RUST_LOG wins over --log-level when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(LevelFilter::from_level(log_level).into()));

    // Logs go to stderr so `--json` output stays clean
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = AnalyzerConfig::from_env();
    if cli.api_key.is_some() {
        config = config.with_api_key(cli.api_key.clone());
    }
    if let Some(database) = &cli.database {
        config.database_url = database.clone();
    }

    match cli.command {
        Commands::Analyze {
            days,
            json,
            bazaar,
            no_cache,
        } => {
            let client = TornClient::from_config(&config)?;
            let store = if no_cache {
                CacheStore::in_memory().await?
            } else {
                CacheStore::new(&config.database_url).await?
            };

            let purged = store.purge_expired().await?;
            if purged > 0 {
                debug!(purged = purged, "Purged expired cache entries");
            }

            info!(days = days, "Analyzing money logs");

            let analyzer = ProfitAnalyzer::new(client, store, config);
            let report = analyzer.analyze_profit_for_days(days).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report, bazaar);
            }
        }

        Commands::Items { action } => match action {
            ItemsAction::Refresh => {
                let client = TornClient::from_config(&config)?;
                let store = CacheStore::new(&config.database_url).await?;
                let analyzer = ProfitAnalyzer::new(client, store, config);

                let cache = analyzer.load_item_cache(true).await?;
                println!(
                    "Cached {} item names (expires {})",
                    cache.len(),
                    cache.expires_at.format("%Y-%m-%d %H:%M UTC")
                );
            }

            ItemsAction::Lookup { id } => {
                let store = CacheStore::new(&config.database_url).await?;

                match store.get::<ItemCache>(ITEM_CACHE_KEY).await? {
                    Some(cache) => match cache.name(id) {
                        Some(name) => println!("{} [{}]", name, id),
                        None => println!("Item {} is not in the cache ({} items cached)", id, cache.len()),
                    },
                    None => {
                        println!("Item cache is empty or expired. Run 'tornprofit items refresh' first.")
                    }
                }
            }
        },

        Commands::Cache {
            action: CacheAction::Clear,
        } => {
            let store = CacheStore::new(&config.database_url).await?;
            let removed = store.clear().await?;
            println!("Removed {} cache entries", removed);
        }

        Commands::Config => {
            println!("\n=== Analyzer Configuration ===\n");
            println!("API:");
            println!("  Base URL:             {}", config.base_url);
            println!("  API Key:              {}", config.masked_key());
            println!("  Request Timeout:      {}s", config.request_timeout_secs);
            println!("  Max Retry Time:       {}s", config.max_retry_secs);

            println!("\nLog Fetching:");
            println!("  Page Limit:           {}", config.page_limit);
            println!("  Max Pages/Category:   {}", config.max_pages_per_category);

            println!("\nItem Cache:");
            println!("  TTL:                  {}h", config.item_cache_ttl_hours);
            println!("  Catalog Concurrency:  {}", config.catalog_concurrency);
            println!("  Database:             {}", config.database_url);
        }
    }

    Ok(())
}

fn print_report(report: &AnalysisReport, bazaar: BazaarView) {
    println!("\n=== Daily Profit ===\n");
    println!(
        "{:<12} {:>16} {:>16} {:>16} {:>6}",
        "DATE", "INCOME", "EXPENSES", "NET", "TXNS"
    );
    println!("{}", "-".repeat(70));

    for day in &report.days {
        let count: u32 = day.transactions.iter().map(|t| t.count).sum();
        println!(
            "{:<12} {:>16} {:>16} {:>16} {:>6}",
            day.date.to_string(),
            money(day.income),
            money(day.expenses),
            money(day.net_profit),
            count
        );
    }

    println!("{}", "-".repeat(70));
    println!(
        "{:<12} {:>16} {:>16} {:>16}",
        "TOTAL",
        money(report.total_income()),
        money(report.total_expenses()),
        money(report.net_profit())
    );

    for day in report.days.iter().filter(|d| !d.transactions.is_empty()) {
        println!("\n--- {} ---", day.date);
        for txn in &day.transactions {
            println!(
                "  {:<8} {:<38} {:>4}x {:>14}",
                txn.kind.as_str(),
                truncate(&txn.title, 38),
                txn.count,
                money(txn.amount)
            );
        }
    }

    let range = &report.range_bazaar;
    if range.is_empty() {
        println!("\nNo bazaar trades in range.");
    } else {
        println!("\n=== Bazaar ({} trades) ===", range.total_trades);
        println!(
            "Bought: {}  Sold: {}  Net: {}",
            money(range.total_bought),
            money(range.total_sold),
            money(range.net_profit)
        );
        println!("Top item: {}  Top partner: {}", range.top_item, range.top_partner);

        if bazaar != BazaarView::Partners {
            println!(
                "\n{:<24} {:>6} {:>6} {:>12} {:>12} {:>8} {:>14}",
                "ITEM", "BOUGHT", "SOLD", "AVG BUY", "AVG SELL", "MARGIN", "NET"
            );
            println!("{}", "-".repeat(88));
            for item in &range.items {
                println!(
                    "{:<24} {:>6} {:>6} {:>12} {:>12} {:>7.1}% {:>14}",
                    truncate(&item.item_name, 24),
                    item.quantity_bought,
                    item.quantity_sold,
                    money(item.avg_buy_price),
                    money(item.avg_sell_price),
                    item.profit_margin,
                    money(item.net_profit)
                );
            }
        }

        if bazaar != BazaarView::Items {
            println!(
                "\n{:<24} {:>6} {:>14} {:<24} {:>16}",
                "PARTNER", "TRADES", "VOLUME", "MOST TRADED", "LAST"
            );
            println!("{}", "-".repeat(88));
            for partner in &range.partners {
                let last = partner
                    .last_transaction
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<24} {:>6} {:>14} {:<24} {:>16}",
                    truncate(&partner.partner, 24),
                    partner.transaction_count,
                    money(partner.total_volume),
                    truncate(&partner.most_traded_item, 24),
                    last
                );
            }
        }
    }

    let issues = &report.issues;
    match issues.health() {
        AnalysisHealth::Healthy => println!("\nHealth: OK"),
        AnalysisHealth::Degraded => println!(
            "\nHealth: DEGRADED (unknown: {}, missing amount: {}, misclassified: {}, unresolved items: {})",
            issues.unknown_transaction_count,
            issues.missing_amount_extraction_count,
            issues.incorrect_classification_count,
            issues.unresolved_item_id_count
        ),
    }
    if !report.unresolved_item_ids.is_empty() {
        println!("Unresolved item ids: {:?}", report.unresolved_item_ids);
    }
}

fn money(amount: Decimal) -> String {
    let rounded = amount.round();
    if rounded < Decimal::ZERO {
        format!("-${}", rounded.abs())
    } else {
        format!("${}", rounded)
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
