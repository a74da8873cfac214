use anyhow::{Context, Result};
use mongodb::bson::doc;
use mongodb::Client;
use tracing::info;

use crate::config::{Config, Credentials};
use crate::mongo_store::MongoStore;

/// Opens the client, pings the server, and returns the store for the
/// configured database. Connectivity failure is fatal; there is no retry.
pub async fn connect(config: &Config, credentials: &Credentials) -> Result<MongoStore> {
    let uri = credentials.connection_uri(config.database.port);
    let client = Client::with_uri_str(&uri)
        .await
        .with_context(|| {
            format!(
                "Invalid MongoDB connection settings for host {}",
                credentials.host
            )
        })?;

    if let Err(e) = client
        .database(&config.database.name)
        .run_command(doc! { "ping": 1 })
        .await
    {
        client.shutdown().await;
        return Err(e).with_context(|| {
            format!(
                "Failed to reach MongoDB at {}:{}",
                credentials.host, config.database.port
            )
        });
    }

    info!(
        host = %credentials.host,
        database = %config.database.name,
        "connected"
    );
    Ok(MongoStore::new(client, &config.database.name))
}
