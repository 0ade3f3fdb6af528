//! Browse command handler

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::warn;

use crate::cli::BrowseArgs;
use crate::clients::jikan::JikanClient;
use crate::config::Config;
use crate::constants::intervals;
use crate::domain::{GenreId, SortOrder};
use crate::models::anime::AnimeRecord;
use crate::services::{CatalogTable, SortConfig};

pub async fn cmd_browse(config: &Config, args: &BrowseArgs) -> anyhow::Result<()> {
    let client = JikanClient::from_config(&config.jikan)?;
    let table = CatalogTable::new(Arc::new(client), &config.table);

    apply_args(&table, args);

    let search = args.search.as_deref().unwrap_or("").trim();
    if !search.is_empty() {
        println!("Searching for: {search}");
    }

    let first = if search.is_empty() {
        table.request_next_page().await
    } else {
        table.commit_search(search).await
    };

    if let Err(e) = first {
        println!("Could not load the catalog: {e}");
        return Ok(());
    }

    while table.page() < args.pages && table.has_more() {
        tokio::time::sleep(intervals::JIKAN_REQUEST_SPACING).await;
        if let Err(e) = table.request_next_page().await {
            warn!(error = %e, "Stopping after failed page load");
            println!("Stopped at page {}: {e}", table.page());
            break;
        }
    }

    print_table(&table);
    Ok(())
}

fn apply_args(table: &CatalogTable, args: &BrowseArgs) {
    for anime_type in args.types.iter().collect::<BTreeSet<_>>() {
        table.toggle_type(*anime_type);
    }

    for genre in args.genres.iter().collect::<BTreeSet<_>>() {
        table.toggle_genre(GenreId::new(*genre));
    }

    table.commit_score_range(args.min_score, args.max_score);

    let order = if args.desc {
        SortOrder::Descending
    } else {
        SortOrder::Ascending
    };
    let target = SortConfig::new(args.sort, order);
    // Same path as header clicks: at most two clicks reach any config.
    while table.sort() != target {
        table.sort_by(args.sort);
    }
}

fn print_table(table: &CatalogTable) {
    let rows = table.visible_records();
    let sort = table.sort();

    println!();
    println!(
        "Catalog ({} shown of {} loaded, page {}, sorted by {} {})",
        rows.len(),
        table.loaded_count(),
        table.page(),
        sort.field,
        sort.order
    );
    println!("{:-<110}", "");
    println!(
        "{:<44} {:<10} {:<28} {:<10} {:>5} {:>6}",
        "Title", "Type", "Genres", "Aired", "Eps", "Score"
    );
    println!("{:-<110}", "");

    if rows.is_empty() {
        println!("No anime match the current filters.");
    }

    for record in &rows {
        println!("{}", format_row(record));
    }

    println!();
    if table.has_more() {
        println!("More results available: rerun with a higher --pages value.");
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}

fn format_row(record: &AnimeRecord) -> String {
    let anime_type = record
        .anime_type
        .map_or_else(|| "?".to_string(), |t| t.to_string());
    let aired = record
        .aired
        .start()
        .map_or_else(|| "?".to_string(), |d| d.format("%Y-%m-%d").to_string());
    let episodes = record
        .episodes
        .map_or_else(|| "?".to_string(), |e| e.to_string());
    let score = record
        .score
        .map_or_else(|| "-".to_string(), |s| format!("{s:.2}"));

    format!(
        "{:<44} {:<10} {:<28} {:<10} {:>5} {:>6}",
        truncate(&record.title, 44),
        anime_type,
        truncate(&record.genre_names(), 28),
        aired,
        episodes,
        score
    )
}
