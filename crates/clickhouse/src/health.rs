//! ClickHouse health checks and schema bootstrap.

use crate::client::ClickHouseClient;
use crate::schema::all_statements;
use backblast_core::{Error, Result};
use tracing::{debug, error, info};

/// Check ClickHouse connection health and update the health registry.
pub async fn check_connection(client: &ClickHouseClient) -> bool {
    let health = &telemetry::health().clickhouse;
    match client.inner().query("SELECT 1").fetch_one::<u8>().await {
        Ok(_) => {
            debug!("ClickHouse connection healthy");
            health.set_healthy();
            true
        }
        Err(e) => {
            error!("ClickHouse health check failed: {}", e);
            health.set_unhealthy(e.to_string());
            false
        }
    }
}

/// Creates the base database, the checkpoint table, and one database with
/// its tables per region namespace.
pub async fn init_schema<'a>(
    client: &ClickHouseClient,
    namespaces: impl IntoIterator<Item = &'a str>,
) -> Result<()> {
    // DDL runs against `default` since the target databases may not exist yet.
    let admin = client.inner().clone().with_database("default");

    for ddl in all_statements(&client.config().database, namespaces) {
        admin
            .query(&ddl)
            .execute()
            .await
            .map_err(|e| Error::store(format!("Failed to execute DDL: {}", e)))?;
    }

    info!("ClickHouse schema initialized");
    Ok(())
}
