//! Test PostgreSQL database connection
//!
//! Run with: cargo run --bin test_db_connection

use askdb::config::AppConfig;
use askdb::db::SchemaIntrospector;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    println!("🔌 Testing PostgreSQL Connection...\n");

    let config = AppConfig::from_env()?;
    println!("📡 Connecting to: {}", config.database.display_target());

    match SchemaIntrospector::new(&config.database).describe(&config.tables).await {
        Ok(schema) => {
            println!("✅ Connected successfully!\n");
            println!("   📊 Columns in scope: {}", schema.len());

            let found = schema.tables();
            for table in &config.tables {
                if found.contains(&table.as_str()) {
                    println!("   📋 {}", table);
                } else {
                    println!("   ⚠️  {} not found in the public schema", table);
                }
            }

            println!("\n✅ Database connection test completed successfully!");
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Connection failed: {}", e);
            eprintln!("\n💡 Troubleshooting:");
            eprintln!("   1. Is PostgreSQL running? (check with: pg_isready)");
            eprintln!("   2. Are PGHOST/PGPORT/PGDATABASE or DATABASE_URL set correctly?");
            eprintln!("   3. Are the username and password correct?");
            Err(format!("Connection failed: {}", e).into())
        }
    }
}
