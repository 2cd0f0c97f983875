use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::error;

use crate::config::Config;
use crate::models::Client;

mod error;

pub use error::StoreError;

const DELETE_CLIENT: &str = "DELETE FROM client WHERE cli_id = ?";
const DELETE_RESERVATION: &str = "DELETE FROM reservation WHERE res_cli_id = ?";
const INSERT_CLIENT: &str =
    "INSERT INTO client(cli_nom, cli_prenom, cli_adresse, cli_ville) VALUES (?,?,?,?)";
const SELECT_CLIENT: &str = "SELECT * FROM client WHERE cli_id = ?";
const SELECT_CLIENTS: &str = "SELECT * FROM client";
const SELECT_LAST_CLIENT: &str = "SELECT * FROM client ORDER BY cli_id DESC LIMIT 1";
const UPDATE_CLIENT: &str =
    "UPDATE client SET cli_nom = ?, cli_prenom = ?, cli_adresse = ?, cli_ville = ? WHERE cli_id = ?";

/// Record store for the `client` table.
///
/// Owns nothing but a handle to the connection pool, which is injected at
/// construction and closed explicitly at shutdown.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool from the configured database URL.
    pub async fn connect(config: &Config) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(config.database_url())
            .await
            .map_err(StoreError::Connect)?;

        Ok(Self::new(pool))
    }

    /// Creates the `client` and `reservation` tables if they do not exist yet.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS client (
                cli_id INTEGER PRIMARY KEY AUTOINCREMENT,
                cli_nom TEXT NOT NULL,
                cli_prenom TEXT NOT NULL,
                cli_adresse TEXT,
                cli_ville TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS reservation (
                res_id INTEGER PRIMARY KEY AUTOINCREMENT,
                res_cli_id INTEGER NOT NULL REFERENCES client(cli_id)
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Closes the pool. Called once at shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Returns every client in the table. An empty table yields an empty list,
    /// not an error.
    pub async fn list_clients(&self) -> Result<Vec<Client>, StoreError> {
        let clients = sqlx::query_as::<_, Client>(SELECT_CLIENTS)
            .fetch_all(&self.pool)
            .await
            .inspect_err(|err| error!("failed to list clients: {err}"))?;

        Ok(clients)
    }

    /// Looks a client up by id. `Ok(None)` means no such row; a query failure
    /// is a distinct `Err`.
    pub async fn find_client(&self, id: i64) -> Result<Option<Client>, StoreError> {
        let client = sqlx::query_as::<_, Client>(SELECT_CLIENT)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .inspect_err(|err| error!("failed to find client {id}: {err}"))?;

        Ok(client)
    }

    /// Inserts the four text fields of a new client. The id is assigned by the
    /// database and not read back into the passed value.
    pub async fn insert_client(&self, client: &Client) -> Result<(), StoreError> {
        sqlx::query(INSERT_CLIENT)
            .bind(&client.last_name)
            .bind(&client.first_name)
            .bind(client.address.as_deref())
            .bind(&client.city)
            .execute(&self.pool)
            .await
            .inspect_err(|err| error!("failed to insert client: {err}"))?;

        Ok(())
    }

    /// Overwrites every field of the row keyed by the client's id.
    pub async fn update_client(&self, client: &Client) -> Result<(), StoreError> {
        sqlx::query(UPDATE_CLIENT)
            .bind(&client.last_name)
            .bind(&client.first_name)
            .bind(client.address.as_deref())
            .bind(&client.city)
            .bind(client.id)
            .execute(&self.pool)
            .await
            .inspect_err(|err| error!("failed to update client {}: {err}", client.id))?;

        Ok(())
    }

    /// Deletes a client in two phases: dependent reservation rows first, the
    /// client row second, each phase committed on its own with a savepoint set
    /// right before the delete. A failure in the second phase rolls back only
    /// to its own savepoint, so the reservation deletion stays committed even
    /// when the client row survives.
    pub async fn delete_client(&self, id: i64) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .inspect_err(|err| error!("failed to begin reservation delete: {err}"))?;

        sqlx::query("SAVEPOINT before_reservation_delete")
            .execute(&mut *tx)
            .await?;

        if let Err(err) = sqlx::query(DELETE_RESERVATION).bind(id).execute(&mut *tx).await {
            error!("failed to delete reservations for client {id}: {err}");
            let _ = sqlx::query("ROLLBACK TO before_reservation_delete")
                .execute(&mut *tx)
                .await;
            return Err(err.into());
        }

        tx.commit()
            .await
            .inspect_err(|err| error!("failed to commit reservation delete: {err}"))?;

        let mut tx = self
            .pool
            .begin()
            .await
            .inspect_err(|err| error!("failed to begin client delete: {err}"))?;

        sqlx::query("SAVEPOINT before_client_delete")
            .execute(&mut *tx)
            .await?;

        if let Err(err) = sqlx::query(DELETE_CLIENT).bind(id).execute(&mut *tx).await {
            error!("failed to delete client {id}: {err}");
            // Reservations are already committed; only this phase is undone.
            let _ = sqlx::query("ROLLBACK TO before_client_delete")
                .execute(&mut *tx)
                .await;
            return Err(err.into());
        }

        tx.commit()
            .await
            .inspect_err(|err| error!("failed to commit client delete: {err}"))?;

        Ok(())
    }

    /// Returns the most recently inserted client, if any.
    pub async fn last_client(&self) -> Result<Option<Client>, StoreError> {
        let client = sqlx::query_as::<_, Client>(SELECT_LAST_CLIENT)
            .fetch_optional(&self.pool)
            .await
            .inspect_err(|err| error!("failed to fetch the last client: {err}"))?;

        Ok(client)
    }
}

/// Loads configuration-driven connectivity and prepares the schema.
pub async fn init(config: &Config) -> Result<Database, StoreError> {
    let db = Database::connect(config).await?;
    db.init_schema().await?;

    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqliteConnectOptions;
    use std::str::FromStr;

    // A single-connection in-memory pool; foreign keys are enforced so the
    // partial-failure test below can block the client delete.
    async fn memory_store() -> Database {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();

        let db = Database::new(pool);
        db.init_schema().await.unwrap();
        db
    }

    fn sample_client() -> Client {
        Client {
            id: 0,
            last_name: "Prénom".to_string(),
            first_name: "Beau".to_string(),
            address: Some("65 rue imaginaire".to_string()),
            city: "Imaginaire".to_string(),
        }
    }

    async fn add_reservation(db: &Database, client_id: i64) {
        sqlx::query("INSERT INTO reservation(res_cli_id) VALUES (?)")
            .bind(client_id)
            .execute(&db.pool)
            .await
            .unwrap();
    }

    async fn reservation_count(db: &Database, client_id: i64) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM reservation WHERE res_cli_id = ?")
            .bind(client_id)
            .fetch_one(&db.pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn list_on_an_empty_table_is_empty() {
        let db = memory_store().await;

        assert!(db.list_clients().await.unwrap().is_empty());
        assert!(db.last_client().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_on_a_missing_id_returns_none() {
        let db = memory_store().await;

        assert!(db.find_client(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_then_find_returns_the_same_fields() {
        let db = memory_store().await;

        db.insert_client(&sample_client()).await.unwrap();

        let inserted = db.last_client().await.unwrap().unwrap();
        let found = db.find_client(inserted.id).await.unwrap().unwrap();

        assert_eq!(found.last_name, "Prénom");
        assert_eq!(found.first_name, "Beau");
        assert_eq!(found.address.as_deref(), Some("65 rue imaginaire"));
        assert_eq!(found.city, "Imaginaire");
    }

    #[tokio::test]
    async fn update_then_reread_matches_the_new_values() {
        let db = memory_store().await;

        db.insert_client(&sample_client()).await.unwrap();
        let mut client = db.last_client().await.unwrap().unwrap();

        client.last_name = "Update".to_string();
        client.first_name = "Jean".to_string();
        client.address = Some("La rue de l'update".to_string());
        client.city = "Updatia".to_string();
        db.update_client(&client).await.unwrap();

        let reread = db.find_client(client.id).await.unwrap().unwrap();
        assert_eq!(reread.last_name, "Update");
        assert_eq!(reread.first_name, "Jean");
        assert_eq!(reread.address.as_deref(), Some("La rue de l'update"));
        assert_eq!(reread.city, "Updatia");
    }

    #[tokio::test]
    async fn delete_shrinks_the_list_by_one() {
        let db = memory_store().await;

        db.insert_client(&sample_client()).await.unwrap();
        db.insert_client(&sample_client()).await.unwrap();

        let before = db.list_clients().await.unwrap().len();
        let last = db.last_client().await.unwrap().unwrap();

        db.delete_client(last.id).await.unwrap();

        assert_eq!(db.list_clients().await.unwrap().len(), before - 1);
        assert!(db.find_client(last.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_removes_dependent_reservations_first() {
        let db = memory_store().await;

        db.insert_client(&sample_client()).await.unwrap();
        let client = db.last_client().await.unwrap().unwrap();
        add_reservation(&db, client.id).await;
        add_reservation(&db, client.id).await;

        db.delete_client(client.id).await.unwrap();

        assert_eq!(reservation_count(&db, client.id).await, 0);
        assert!(db.find_client(client.id).await.unwrap().is_none());
    }

    // When the client row cannot be deleted, the reservation deletion from the
    // first phase stays committed. A second table referencing the client blocks
    // the delete through its foreign key.
    #[tokio::test]
    async fn failed_client_delete_keeps_reservations_deleted() {
        let db = memory_store().await;

        sqlx::query(
            "CREATE TABLE booking_lock (
                lock_id INTEGER PRIMARY KEY AUTOINCREMENT,
                cli_id INTEGER NOT NULL REFERENCES client(cli_id)
            )",
        )
        .execute(&db.pool)
        .await
        .unwrap();

        db.insert_client(&sample_client()).await.unwrap();
        let client = db.last_client().await.unwrap().unwrap();
        add_reservation(&db, client.id).await;

        sqlx::query("INSERT INTO booking_lock(cli_id) VALUES (?)")
            .bind(client.id)
            .execute(&db.pool)
            .await
            .unwrap();

        let result = db.delete_client(client.id).await;

        assert!(result.is_err());
        assert_eq!(reservation_count(&db, client.id).await, 0);
        assert!(db.find_client(client.id).await.unwrap().is_some());
    }
}
