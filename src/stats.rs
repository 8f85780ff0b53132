//! `caselaw stats`: record count and dimension of the target index.

use anyhow::{bail, Context, Result};

use crate::config::Config;
use crate::vector_store::create_store;

pub async fn run_stats(config: &Config) -> Result<()> {
    let Some(index) = config.index_name() else {
        bail!("No index name configured; set [index].name or PINECONE_INDEX");
    };

    let store = create_store(&config.index)?;
    let stats = store
        .describe_index_stats(&index)
        .await
        .with_context(|| format!("Failed to read stats for index '{}'", index))?;

    println!("Caselaw — Index Stats");
    println!("=====================");
    println!();
    println!("  Index:       {}", index);
    println!("  Provider:    {}", store.name());
    println!("  Records:     {}", stats.total_record_count);
    match stats.dimension {
        Some(d) => println!("  Dimension:   {}", d),
        None => println!("  Dimension:   unknown"),
    }
    println!(
        "  Bootstrapped: {}",
        if stats.total_record_count > 0 { "yes" } else { "no" }
    );

    Ok(())
}
