//! Database maintenance and inspection commands.

use clap::Subcommand;

/// Sub-commands available under `db`.
#[derive(Debug, Subcommand)]
pub enum DbCommands {
    /// Check that the database is reachable
    Ping,
    /// Apply pending migrations
    Migrate,
    /// List deals that have not yet expired, best discount first
    Deals {
        /// Only show deals from this retailer (e.g., nike)
        #[arg(long)]
        retailer: Option<String>,
        /// Maximum number of deals to show
        #[arg(long, default_value = "20")]
        limit: i64,
    },
    /// Delete deals past their expiry
    Purge,
}

pub(crate) async fn run_db(
    config: &dealscope_core::AppConfig,
    command: DbCommands,
) -> anyhow::Result<()> {
    let pool = dealscope_db::connect_from_config(config).await?;
    match command {
        DbCommands::Ping => {
            dealscope_db::ping(&pool).await?;
            println!("database ok");
        }
        DbCommands::Migrate => {
            let applied = dealscope_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        DbCommands::Deals { retailer, limit } => {
            run_db_deals(&pool, retailer.as_deref(), limit).await?;
        }
        DbCommands::Purge => {
            let removed = dealscope_db::purge_expired_deals(&pool).await?;
            tracing::info!(removed, "purged expired deals");
            println!("removed {removed} expired deal(s)");
        }
    }
    Ok(())
}

/// Prints active deals as a fixed-width table.
///
/// # Errors
///
/// Returns an error if the database query fails.
async fn run_db_deals(
    pool: &sqlx::PgPool,
    retailer: Option<&str>,
    limit: i64,
) -> anyhow::Result<()> {
    let rows = dealscope_db::list_active_deals(pool, retailer, limit).await?;

    if rows.is_empty() {
        println!(
            "no active deals{}; run `dealscope run <plan> --save` first",
            retailer.map(|r| format!(" for {r}")).unwrap_or_default()
        );
        return Ok(());
    }

    println!(
        "{:<11}{:<16}{:>9}{:>10}{:>8}  {:<17}NAME",
        "RETAILER", "CATEGORY", "WAS", "NOW", "OFF", "EXPIRES"
    );
    for row in &rows {
        println!(
            "{:<11}{:<16}{:>9}{:>10}{:>7}%  {:<17}{}",
            row.retailer,
            truncate(&row.category, 15),
            row.original_price,
            row.sale_price,
            row.discount_pct,
            row.expires_at.format("%Y-%m-%d %H:%M"),
            truncate(&row.name, 50)
        );
    }

    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::truncate;

    #[test]
    fn truncate_counts_chars_not_bytes() {
        assert_eq!(truncate("Café Racer", 4), "Café...");
        assert_eq!(truncate("Parka", 10), "Parka");
    }
}
