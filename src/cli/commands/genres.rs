//! Genre list command handler

use std::sync::Arc;

use crate::clients::jikan::JikanClient;
use crate::config::Config;
use crate::services::CatalogTable;

pub async fn cmd_genres(config: &Config, filter: Option<&str>) -> anyhow::Result<()> {
    let client = JikanClient::from_config(&config.jikan)?;
    let table = CatalogTable::new(Arc::new(client), &config.table);

    if table.load_genres().await == 0 {
        println!("No genres available (the request may have failed, see logs).");
        return Ok(());
    }

    let filter = filter.unwrap_or("");
    let genres = table.genres_matching(filter);

    if genres.is_empty() {
        println!("No genres matching '{filter}'");
        return Ok(());
    }

    println!("Genres ({} shown)", genres.len());
    println!("{:-<40}", "");

    for genre in genres {
        println!("• {:<30} ID: {}", genre.name, genre.id);
    }

    println!();
    println!("Filter by genre with: anitable browse --genre <ID>");

    Ok(())
}
