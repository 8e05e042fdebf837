//! Create-only inserts for protests and guarantors

use crate::row::ProtestRow;
use crate::store::{inserted_id, Store};

/// Insert a protest for `contract_id`. Repeated rows produce repeated protests.
pub async fn record_protest(
    store: &mut Store,
    contract_id: i64,
    row: &ProtestRow,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO protestos (valor_protestado, numero_parcela, data_registro, protocolo,
                               status, situacao, data_baixa_cartorio, contrato_id)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(row.amount)
    .bind(row.installment_number.as_deref())
    .bind(row.registration_date.as_deref())
    .bind(row.protocol_number.as_deref())
    .bind(row.status.as_str())
    .bind(row.situation.as_deref())
    .bind(row.clearance_date.as_deref())
    .bind(contract_id)
    .execute(store.conn())
    .await?;

    inserted_id(store.conn(), &result).await
}

/// Insert a guarantor for `protest_id`
///
/// The export carries no guarantor document, so callers pass the debtor's.
pub async fn record_guarantor(
    store: &mut Store,
    name: &str,
    tax_id: Option<&str>,
    protest_id: i64,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query("INSERT INTO avalistas (nome, cpf_cnpj, protesto_id) VALUES (?, ?, ?)")
        .bind(name)
        .bind(tax_id)
        .bind(protest_id)
        .execute(store.conn())
        .await?;

    inserted_id(store.conn(), &result).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::EntityResolver;
    use crate::row::DEFAULT_STATUS;
    use crate::store::testing::{count, memory_store};

    fn protest(amount: f64) -> ProtestRow {
        ProtestRow {
            debtor_name: "Ana".to_string(),
            guarantor_name: None,
            amount,
            installment_number: Some("1/3".to_string()),
            registration_date: Some("2024-03-05".to_string()),
            service_point: None,
            primary_contract_number: Some("S-1".to_string()),
            legacy_contract_number: None,
            kind: None,
            city: None,
            protocol_number: None,
            status: DEFAULT_STATUS.to_string(),
            account_type: None,
            tax_id: Some("111".to_string()),
            situation: None,
            clearance_date: None,
        }
    }

    async fn contract(store: &mut Store) -> i64 {
        let mut resolver = EntityResolver::new();
        let client = resolver
            .resolve_client(store, "Ana", Some("111"), None, None)
            .await
            .unwrap();
        resolver
            .resolve_contract(store, client, Some("S-1"), None, None, None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_record_protest_stores_fields() {
        let mut store = memory_store().await;
        let contract_id = contract(&mut store).await;

        let id = record_protest(&mut store, contract_id, &protest(1234.56))
            .await
            .unwrap();

        let (amount, installment, date, status, linked): (f64, Option<String>, Option<String>, String, i64) =
            sqlx::query_as(
                "SELECT valor_protestado, numero_parcela, data_registro, status, contrato_id FROM protestos WHERE id = ?",
            )
            .bind(id)
            .fetch_one(store.conn())
            .await
            .unwrap();

        assert_eq!(amount, 1234.56);
        assert_eq!(installment.as_deref(), Some("1/3"));
        assert_eq!(date.as_deref(), Some("2024-03-05"));
        assert_eq!(status, DEFAULT_STATUS);
        assert_eq!(linked, contract_id);
    }

    #[tokio::test]
    async fn test_record_protest_never_deduplicates() {
        let mut store = memory_store().await;
        let contract_id = contract(&mut store).await;
        let row = protest(10.0);

        let a = record_protest(&mut store, contract_id, &row).await.unwrap();
        let b = record_protest(&mut store, contract_id, &row).await.unwrap();

        assert_ne!(a, b);
        assert_eq!(count(&mut store, "protestos").await, 2);
    }

    #[tokio::test]
    async fn test_record_guarantor_links_protest() {
        let mut store = memory_store().await;
        let contract_id = contract(&mut store).await;
        let protest_id = record_protest(&mut store, contract_id, &protest(10.0))
            .await
            .unwrap();

        record_guarantor(&mut store, "José", Some("111"), protest_id)
            .await
            .unwrap();

        let (name, tax_id, linked): (String, Option<String>, i64) =
            sqlx::query_as("SELECT nome, cpf_cnpj, protesto_id FROM avalistas")
                .fetch_one(store.conn())
                .await
                .unwrap();
        assert_eq!(name, "José");
        assert_eq!(tax_id.as_deref(), Some("111"));
        assert_eq!(linked, protest_id);
    }
}
