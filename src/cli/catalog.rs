use anyhow::{Result, bail};
use console::style;

use catalog_agent::core::catalog::{CatalogError, CatalogStore, seed};
use catalog_agent::core::terminal::{self, GuideSection, print_info, print_success};
use catalog_agent::core::tools::{ToolRegistry, ToolRequest};

pub(crate) fn run_seed(store: &CatalogStore, force: bool) -> Result<()> {
    let Some(conn) = store.connection() else {
        bail!(CatalogError::StoreUnavailable);
    };
    let inserted = seed::seed_catalog(conn, force)?;
    if inserted == 0 {
        print_info("Catalog already populated. Use `seed --force` to replace it.");
    } else {
        print_success(&format!(
            "Loaded {} demo product(s) into {}.",
            inserted,
            seed::PRODUCT_TABLE
        ));
    }
    Ok(())
}

pub(crate) fn run_tables(store: &CatalogStore) -> Result<()> {
    let tables = store.list_tables();
    let mut section = GuideSection::new("Tables");
    if tables.is_empty() {
        section = section.text("No tables found. Run `catalog-agent seed` to create the demo catalog.");
    }
    for t in &tables {
        section = section.text(t);
    }
    section.print();
    println!();
    Ok(())
}

pub(crate) fn run_describe(store: &CatalogStore, table: &str) -> Result<()> {
    let descriptor = store.table_descriptor(table);
    let mut section = GuideSection::new(&format!("Table · {}", descriptor.name));
    if descriptor.columns.is_empty() {
        section = section.text("No such table, or it has no columns.");
    }
    for col in &descriptor.columns {
        section = section.status(&col.name, &style(&col.declared_type).dim().to_string());
    }
    section.print();
    println!();
    Ok(())
}

/// Run a statement through the same tool path the model uses and print each row as JSON.
pub(crate) fn run_query(store: &CatalogStore, sql: &str) -> Result<()> {
    let registry = ToolRegistry::new(store);
    let rows = registry.execute(&ToolRequest::ExecuteQuery {
        sql: sql.to_string(),
    })?;

    for notice in store.notices().drain() {
        terminal::print_notice(&notice);
    }

    let rows = rows.as_array().cloned().unwrap_or_default();
    for row in &rows {
        println!("{}", row);
    }
    print_info(&format!("{} row(s)", rows.len()));
    Ok(())
}
