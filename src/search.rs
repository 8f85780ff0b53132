//! `caselaw search`: query-mode embedding, MMR re-ranking, dedupe.

use anyhow::{bail, Result};

use caselaw_core::models::MetaValue;
use caselaw_core::search::{search_index, SearchHit};

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::vector_store::create_store;

pub async fn run_search(config: &Config, query: &str, limit: Option<usize>) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let Some(index) = config.index_name() else {
        bail!("No index name configured; set [index].name or PINECONE_INDEX");
    };

    let store = create_store(&config.index)?;
    let embedder = create_embedder(&config.embedding)?;

    let mut opts = config.search_options();
    if let Some(limit) = limit {
        opts.top_k = limit.max(1);
        opts.fetch_k = opts.fetch_k.max(opts.top_k);
    }

    let hits = search_index(store.as_ref(), embedder.as_ref(), &index, query, opts).await?;
    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        print_hit(i + 1, hit);
    }
    Ok(())
}

fn print_hit(rank: usize, hit: &SearchHit) {
    let text = |key: &str| hit.metadata.get(key).and_then(MetaValue::as_str);
    let title = text("title")
        .or_else(|| text("filename"))
        .or_else(|| text("source"))
        .unwrap_or("(untitled)");

    println!("{}. [{:.3}] {}", rank, hit.score, title);
    if let Some(date) = text("date") {
        println!("    date: {}", date);
    }
    if let Some(outcome) = text("outcome") {
        println!("    outcome: {}", outcome);
    }
    println!("    {}", snippet(&hit.page_content, 200));
}

/// First `max_chars` characters of `text` on one line.
fn snippet(text: &str, max_chars: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_collapses_whitespace() {
        assert_eq!(snippet("a\n\n b\tc", 50), "a b c");
    }

    #[test]
    fn snippet_truncates_on_char_boundary() {
        assert_eq!(snippet("ééééé", 3), "ééé...");
    }
}
