//! Field extraction for one protest export row
//!
//! Every field is trimmed; blank values become `None`. The debtor name and
//! the protested amount are required, everything else is optional.

use tracing::warn;

use crate::amount::parse_amount;
use crate::dates::normalize_date;
use crate::error::RowError;
use crate::source::{Headers, SourceRow};

// =============================================================================
// Column names as they appear in the export header
// =============================================================================

pub const COL_DEBTOR: &str = "DEVEDOR";
pub const COL_GUARANTOR: &str = "AVALISTA";
pub const COL_AMOUNT: &str = "VALOR PROTESTADO";
pub const COL_INSTALLMENT: &str = "NUMERO DA PARCELA";
pub const COL_REGISTRATION_DATE: &str = "DATA REGISTRO";
pub const COL_SERVICE_POINT: &str = "PONTO ATENDIMENTO";
pub const COL_PRIMARY_CONTRACT: &str = "CONTRATO SISBR";
pub const COL_LEGACY_CONTRACT: &str = "NUMERO CONTRATO LEGADO";
pub const COL_KIND: &str = "ESPECIE";
pub const COL_CITY: &str = "CIDADE";
pub const COL_PROTOCOL: &str = "PROTOCOLO";
pub const COL_STATUS: &str = "STATUS";
pub const COL_ACCOUNT_TYPE: &str = "TIPO DE CONTA";
pub const COL_TAX_ID: &str = "CPFCNPJ";
pub const COL_SITUATION: &str = "SITUACAO";
pub const COL_CLEARANCE_DATE: &str = "DATA DA BAIXA CARTORIO";

pub const REQUIRED_COLUMNS: &[&str] = &[COL_DEBTOR, COL_AMOUNT];

pub const OPTIONAL_COLUMNS: &[&str] = &[
    COL_GUARANTOR,
    COL_INSTALLMENT,
    COL_REGISTRATION_DATE,
    COL_SERVICE_POINT,
    COL_PRIMARY_CONTRACT,
    COL_LEGACY_CONTRACT,
    COL_KIND,
    COL_CITY,
    COL_PROTOCOL,
    COL_STATUS,
    COL_ACCOUNT_TYPE,
    COL_TAX_ID,
    COL_SITUATION,
    COL_CLEARANCE_DATE,
];

/// Status stored when the row has none
pub const DEFAULT_STATUS: &str = "PROTESTADO";

/// A fully extracted row, ready for entity resolution
#[derive(Debug, Clone, PartialEq)]
pub struct ProtestRow {
    pub debtor_name: String,
    pub guarantor_name: Option<String>,
    pub amount: f64,
    pub installment_number: Option<String>,
    pub registration_date: Option<String>,
    pub service_point: Option<String>,
    pub primary_contract_number: Option<String>,
    pub legacy_contract_number: Option<String>,
    pub kind: Option<String>,
    pub city: Option<String>,
    pub protocol_number: Option<String>,
    pub status: String,
    pub account_type: Option<String>,
    pub tax_id: Option<String>,
    pub situation: Option<String>,
    pub clearance_date: Option<String>,
}

impl ProtestRow {
    pub fn extract(row: &SourceRow) -> Result<Self, RowError> {
        let debtor_name =
            optional(row, COL_DEBTOR).ok_or(RowError::MissingField { column: COL_DEBTOR })?;

        let amount = match row.get(COL_AMOUNT) {
            Some(raw) => parse_amount(raw)?,
            None => return Err(RowError::MissingField { column: COL_AMOUNT }),
        };

        Ok(Self {
            debtor_name,
            guarantor_name: optional(row, COL_GUARANTOR),
            amount,
            installment_number: optional(row, COL_INSTALLMENT),
            registration_date: row.get(COL_REGISTRATION_DATE).and_then(normalize_date),
            service_point: optional(row, COL_SERVICE_POINT),
            primary_contract_number: optional(row, COL_PRIMARY_CONTRACT),
            legacy_contract_number: optional(row, COL_LEGACY_CONTRACT),
            kind: optional(row, COL_KIND),
            city: optional(row, COL_CITY),
            protocol_number: optional(row, COL_PROTOCOL),
            status: optional(row, COL_STATUS).unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            account_type: optional(row, COL_ACCOUNT_TYPE),
            tax_id: optional(row, COL_TAX_ID),
            situation: optional(row, COL_SITUATION),
            clearance_date: row.get(COL_CLEARANCE_DATE).and_then(normalize_date),
        })
    }
}

/// Trimmed value, `None` when the column is absent or blank
fn optional(row: &SourceRow, column: &str) -> Option<String> {
    row.get(column)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Log header columns that are not present; returns the missing required ones
pub fn check_header(headers: &Headers) -> Vec<&'static str> {
    for column in OPTIONAL_COLUMNS {
        if !headers.contains(column) {
            warn!(column = %column, "optional column missing from header; values read as empty");
        }
    }

    let missing: Vec<&'static str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| !headers.contains(c))
        .collect();
    for column in &missing {
        warn!(column = %column, "required column missing from header; every row will be rejected");
    }
    missing
}
