//! Demo catalog for a small computer store.

use rusqlite::{Connection, params};
use tracing::info;

use super::CatalogError;

pub const PRODUCT_TABLE: &str = "tech_products";
pub const PRODUCT_COLUMNS: [&str; 6] = ["id", "name", "description", "price", "stock", "category"];

pub struct SeedProduct {
    pub name: &'static str,
    pub description: &'static str,
    pub price: f64,
    pub stock: i64,
    pub category: &'static str,
}

pub const DEMO_PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        name: "Logitech G203",
        description: "Wired RGB gaming mouse, 8000 DPI",
        price: 39.99,
        stock: 10,
        category: "mouse",
    },
    SeedProduct {
        name: "Razer DeathAdder V3",
        description: "Ergonomic wired gaming mouse, 30000 DPI optical sensor",
        price: 69.99,
        stock: 4,
        category: "mouse",
    },
    SeedProduct {
        name: "Logitech MX Master 3S",
        description: "Wireless productivity mouse with quiet clicks",
        price: 99.99,
        stock: 0,
        category: "mouse",
    },
    SeedProduct {
        name: "Microsoft Basic Optical Mouse",
        description: "Budget wired office mouse",
        price: 14.90,
        stock: 25,
        category: "mouse",
    },
    SeedProduct {
        name: "Redragon Kumara K552",
        description: "Mechanical RGB gaming keyboard, tenkeyless",
        price: 49.99,
        stock: 7,
        category: "keyboard",
    },
    SeedProduct {
        name: "Logitech MX Keys",
        description: "Wireless backlit keyboard for productivity",
        price: 109.99,
        stock: 3,
        category: "keyboard",
    },
    SeedProduct {
        name: "Keychron K2",
        description: "Wireless mechanical keyboard with RGB backlight",
        price: 89.00,
        stock: 0,
        category: "keyboard",
    },
    SeedProduct {
        name: "Logitech K380",
        description: "Compact wireless bluetooth keyboard",
        price: 39.90,
        stock: 12,
        category: "keyboard",
    },
    SeedProduct {
        name: "Dell Inspiron 15",
        description: "Budget notebook, Intel Core i5, 8GB RAM, 256GB SSD",
        price: 549.00,
        stock: 6,
        category: "notebook",
    },
    SeedProduct {
        name: "Lenovo IdeaPad Gaming 3",
        description: "Gaming notebook, Ryzen 7, RTX 3050, 16GB RAM",
        price: 1199.00,
        stock: 2,
        category: "notebook",
    },
    SeedProduct {
        name: "Apple MacBook Pro 14",
        description: "Notebook with M3 Pro chip, 18GB RAM, 512GB SSD",
        price: 1999.00,
        stock: 1,
        category: "notebook",
    },
    SeedProduct {
        name: "ASUS ROG Zephyrus G14",
        description: "Premium gaming notebook, RTX 4070, 32GB RAM",
        price: 2299.00,
        stock: 0,
        category: "notebook",
    },
];

pub fn create_schema(conn: &Connection) -> Result<(), CatalogError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS tech_products (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            price REAL NOT NULL,
            stock INTEGER NOT NULL DEFAULT 0,
            category TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// Create the product table and fill it with the demo catalog.
///
/// Returns the number of rows inserted. An already populated table is left
/// alone unless `force` is set, in which case its rows are replaced.
pub fn seed_catalog(conn: &Connection, force: bool) -> Result<usize, CatalogError> {
    create_schema(conn)?;

    let existing: i64 = conn.query_row("SELECT COUNT(*) FROM tech_products", [], |row| {
        row.get(0)
    })?;
    if existing > 0 && !force {
        info!(
            "Catalog already holds {} product(s), skipping seed",
            existing
        );
        return Ok(0);
    }

    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM tech_products", [])?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO tech_products (name, description, price, stock, category) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for p in DEMO_PRODUCTS {
            stmt.execute(params![p.name, p.description, p.price, p.stock, p.category])?;
        }
    }
    tx.commit()?;

    info!("Seeded {} product(s) into {}", DEMO_PRODUCTS.len(), PRODUCT_TABLE);
    Ok(DEMO_PRODUCTS.len())
}
