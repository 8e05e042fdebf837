//! Find-or-create resolution of clients and contracts
//!
//! Identity rules:
//! - A client is identified by its tax id. The first row that introduces a
//!   tax id decides the stored name, city and account type; later rows with
//!   the same tax id get the same id and never update the record.
//! - A contract is identified by its primary (SISBR) number alone when one is
//!   present, regardless of the client. Otherwise by the pair
//!   (client id, legacy number).
//! - A missing key never matches anything: the row always gets a new record.
//!
//! Ids resolved during a run are memoized, so a repeated key costs no
//! round trip. Identities are append-only, so a memoized id is always the
//! one the lookup would return. Each map holds at most `memo_limit` keys
//! (one owned string plus an id each); past that, keys are resolved by
//! lookup only.

use std::collections::HashMap;

use tracing::debug;

use crate::store::{inserted_id, Store};

/// Default number of keys kept per memo map
pub const DEFAULT_MEMO_LIMIT: usize = 100_000;

/// Identity of a contract
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContractKey {
    Primary(String),
    Legacy { client_id: i64, number: String },
}

impl ContractKey {
    /// Key for a contract, or `None` when it has no number at all
    pub fn new(client_id: i64, primary: Option<&str>, legacy: Option<&str>) -> Option<Self> {
        match (primary, legacy) {
            (Some(number), _) => Some(ContractKey::Primary(number.to_string())),
            (None, Some(number)) => Some(ContractKey::Legacy {
                client_id,
                number: number.to_string(),
            }),
            (None, None) => None,
        }
    }
}

/// Counters for what resolution did during a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ResolutionStats {
    pub clients_created: u64,
    pub clients_matched: u64,
    pub contracts_created: u64,
    pub contracts_matched: u64,
}

#[derive(Debug)]
pub struct EntityResolver {
    clients: HashMap<String, i64>,
    contracts: HashMap<ContractKey, i64>,
    memo_limit: usize,
    stats: ResolutionStats,
}

impl Default for EntityResolver {
    fn default() -> Self {
        Self::with_memo_limit(DEFAULT_MEMO_LIMIT)
    }
}

impl EntityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_memo_limit(memo_limit: usize) -> Self {
        Self {
            clients: HashMap::new(),
            contracts: HashMap::new(),
            memo_limit,
            stats: ResolutionStats::default(),
        }
    }

    pub fn stats(&self) -> ResolutionStats {
        self.stats
    }

    /// Get or create a client, returning its id
    pub async fn resolve_client(
        &mut self,
        store: &mut Store,
        name: &str,
        tax_id: Option<&str>,
        account_type: Option<&str>,
        city: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        if let Some(tax_id) = tax_id {
            if let Some(&id) = self.clients.get(tax_id) {
                self.stats.clients_matched += 1;
                return Ok(id);
            }

            // Try to get existing
            let existing: Option<(i64,)> =
                sqlx::query_as("SELECT id FROM clientes WHERE cpf_cnpj = ?")
                    .bind(tax_id)
                    .fetch_optional(store.conn())
                    .await?;

            if let Some((id,)) = existing {
                self.remember_client(tax_id, id);
                self.stats.clients_matched += 1;
                return Ok(id);
            }
        }

        // Create new
        let result = sqlx::query(
            "INSERT INTO clientes (nome, cpf_cnpj, tipo_conta, cidade) VALUES (?, ?, ?, ?)",
        )
        .bind(name)
        .bind(tax_id)
        .bind(account_type)
        .bind(city)
        .execute(store.conn())
        .await?;
        let id = inserted_id(store.conn(), &result).await?;

        if let Some(tax_id) = tax_id {
            self.remember_client(tax_id, id);
        }
        self.stats.clients_created += 1;
        debug!(client_id = id, "client created");
        Ok(id)
    }

    /// Get or create a contract for `client_id`, returning its id
    pub async fn resolve_contract(
        &mut self,
        store: &mut Store,
        client_id: i64,
        primary_number: Option<&str>,
        legacy_number: Option<&str>,
        kind: Option<&str>,
        service_point: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        let key = ContractKey::new(client_id, primary_number, legacy_number);

        if let Some(key) = &key {
            if let Some(&id) = self.contracts.get(key) {
                self.stats.contracts_matched += 1;
                return Ok(id);
            }

            // Try to get existing, preferring the SISBR number
            let existing: Option<(i64,)> = match key {
                ContractKey::Primary(number) => {
                    sqlx::query_as("SELECT id FROM contratos WHERE numero_contrato_sisbr = ?")
                        .bind(number.as_str())
                        .fetch_optional(store.conn())
                        .await?
                }
                ContractKey::Legacy { client_id, number } => {
                    sqlx::query_as(
                        "SELECT id FROM contratos WHERE cliente_id = ? AND numero_contrato_legado = ?",
                    )
                    .bind(*client_id)
                    .bind(number.as_str())
                    .fetch_optional(store.conn())
                    .await?
                }
            };

            if let Some((id,)) = existing {
                self.remember_contract(key.clone(), id);
                self.stats.contracts_matched += 1;
                return Ok(id);
            }
        }

        // Create new
        let result = sqlx::query(
            r#"
            INSERT INTO contratos (cliente_id, numero_contrato_sisbr, numero_contrato_legado, especie, ponto_atendimento)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(client_id)
        .bind(primary_number)
        .bind(legacy_number)
        .bind(kind)
        .bind(service_point)
        .execute(store.conn())
        .await?;
        let id = inserted_id(store.conn(), &result).await?;

        if let Some(key) = key {
            self.remember_contract(key, id);
        }
        self.stats.contracts_created += 1;
        debug!(contract_id = id, client_id, "contract created");
        Ok(id)
    }

    fn remember_client(&mut self, tax_id: &str, id: i64) {
        if self.clients.len() < self.memo_limit {
            self.clients.insert(tax_id.to_string(), id);
        }
    }

    fn remember_contract(&mut self, key: ContractKey, id: i64) {
        if self.contracts.len() < self.memo_limit {
            self.contracts.insert(key, id);
        }
    }
}
