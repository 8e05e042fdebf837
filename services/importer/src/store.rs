//! Database connection handle
//!
//! One connection per import run, opened through sqlx's `Any` driver so the
//! same `?`-placeholder statements run on MySQL and SQLite. Every statement
//! autocommits; there is no transaction spanning a row.

use sqlx::any::AnyQueryResult;
use sqlx::{AnyConnection, Connection};
use tracing::{debug, info, warn};

use crate::config::DbConfig;
use crate::error::ImportError;

/// Owned connection, passed explicitly to every resolver and recorder call
pub struct Store {
    conn: AnyConnection,
}

impl Store {
    /// Connect using the assembled configuration
    pub async fn connect(config: &DbConfig) -> Result<Self, ImportError> {
        info!(target_db = %config, "connecting to database");
        Self::connect_url(&config.connection_url()).await
    }

    pub async fn connect_url(url: &str) -> Result<Self, ImportError> {
        sqlx::any::install_default_drivers();
        let conn = AnyConnection::connect(url)
            .await
            .map_err(|source| ImportError::Connect { source })?;
        debug!("database connection established");
        Ok(Self { conn })
    }

    /// Raw connection for statements outside the importer (schema setup, reports)
    pub fn conn(&mut self) -> &mut AnyConnection {
        &mut self.conn
    }

    /// Release the connection. Consumes the handle so it cannot happen twice.
    pub async fn close(self) {
        match self.conn.close().await {
            Ok(()) => info!("database connection closed"),
            Err(e) => warn!(error = %e, "database connection closed with error"),
        }
    }
}

/// Generated id of an `INSERT` just run on `conn`
///
/// MySQL reports it with the query result. SQLite does not through the `Any`
/// driver, so the rowid is read back on the same connection.
pub(crate) async fn inserted_id(
    conn: &mut AnyConnection,
    result: &AnyQueryResult,
) -> Result<i64, sqlx::Error> {
    if let Some(id) = result.last_insert_id() {
        return Ok(id);
    }

    if conn.backend_name().eq_ignore_ascii_case("sqlite") {
        let (id,): (i64,) = sqlx::query_as("SELECT last_insert_rowid()")
            .fetch_one(&mut *conn)
            .await?;
        return Ok(id);
    }

    Err(sqlx::Error::Protocol(format!(
        "{} driver did not report an inserted id",
        conn.backend_name()
    )))
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory SQLite store with the four import tables

    use super::Store;

    pub const SCHEMA: &[&str] = &[
        r#"
        CREATE TABLE clientes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nome TEXT NOT NULL,
            cpf_cnpj TEXT,
            tipo_conta TEXT,
            cidade TEXT
        )
        "#,
        r#"
        CREATE TABLE contratos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            cliente_id INTEGER NOT NULL REFERENCES clientes(id),
            numero_contrato_sisbr TEXT,
            numero_contrato_legado TEXT,
            especie TEXT,
            ponto_atendimento TEXT
        )
        "#,
        r#"
        CREATE TABLE protestos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            contrato_id INTEGER NOT NULL REFERENCES contratos(id),
            valor_protestado REAL NOT NULL,
            numero_parcela TEXT,
            data_registro TEXT,
            protocolo TEXT,
            status TEXT NOT NULL,
            situacao TEXT,
            data_baixa_cartorio TEXT
        )
        "#,
        r#"
        CREATE TABLE avalistas (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nome TEXT NOT NULL,
            cpf_cnpj TEXT,
            protesto_id INTEGER NOT NULL REFERENCES protestos(id)
        )
        "#,
    ];

    pub async fn memory_store() -> Store {
        let mut store = Store::connect_url("sqlite::memory:").await.unwrap();
        for ddl in SCHEMA {
            sqlx::query(ddl).execute(store.conn()).await.unwrap();
        }
        store
    }

    pub async fn count(store: &mut Store, table: &str) -> i64 {
        let (n,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(store.conn())
            .await
            .unwrap();
        n
    }
}
