use std::fmt;

use serde::Serialize;

use crate::ingest::columns::{AliasSpec, CanonicalField, resolve_columns};
use crate::ingest::normalize::{CandidateInvoice, normalize_row};
use crate::ingest::table::parse_table;
use crate::{ClientError, ClientResult};

/// Where an uploaded spreadsheet was exported from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Origin {
    /// Bank statement export (`ITAU`).
    Itau,
    /// Accounting software export (`CONTA_AZUL`).
    ContaAzul,
}

impl Origin {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Itau => "ITAU",
            Self::ContaAzul => "CONTA_AZUL",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ITAU" | "BANK" => Some(Self::Itau),
            "CONTA_AZUL" | "ACCOUNTING" => Some(Self::ContaAzul),
            _ => None,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// An origin is only configuration: its header aliases plus the tag stamped
/// on every row it produces.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OriginAdapter {
    pub(crate) origin: Origin,
    pub(crate) aliases: &'static [AliasSpec],
}

const BANK_ALIASES: [AliasSpec; 5] = [
    AliasSpec {
        field: CanonicalField::Customer,
        aliases: &["cliente", "sacado", "nome do cliente"],
    },
    AliasSpec {
        field: CanonicalField::DueDate,
        aliases: &["vencimento", "data vencimento", "data_vencimento"],
    },
    AliasSpec {
        field: CanonicalField::Description,
        aliases: &["descricao", "descrição", "historico"],
    },
    AliasSpec {
        field: CanonicalField::OriginalAmount,
        aliases: &["valor", "valor original", "valor_original"],
    },
    AliasSpec {
        field: CanonicalField::Salesperson,
        aliases: &["vendedor", "carteira", "responsavel"],
    },
];

const ACCOUNTING_ALIASES: [AliasSpec; 5] = [
    AliasSpec {
        field: CanonicalField::Customer,
        aliases: &["cliente", "razao social", "nome"],
    },
    AliasSpec {
        field: CanonicalField::DueDate,
        aliases: &["vencimento", "data de vencimento", "data_vencimento"],
    },
    AliasSpec {
        field: CanonicalField::Description,
        aliases: &["descricao", "descrição", "observacao"],
    },
    AliasSpec {
        field: CanonicalField::OriginalAmount,
        aliases: &["valor original", "valor", "valor_original"],
    },
    AliasSpec {
        field: CanonicalField::Salesperson,
        aliases: &["vendedor", "responsavel", "conta"],
    },
];

pub(crate) const BANK_ADAPTER: OriginAdapter = OriginAdapter {
    origin: Origin::Itau,
    aliases: &BANK_ALIASES,
};

pub(crate) const ACCOUNTING_ADAPTER: OriginAdapter = OriginAdapter {
    origin: Origin::ContaAzul,
    aliases: &ACCOUNTING_ALIASES,
};

pub(crate) fn adapter_for(origin: Origin) -> OriginAdapter {
    match origin {
        Origin::Itau => BANK_ADAPTER,
        Origin::ContaAzul => ACCOUNTING_ADAPTER,
    }
}

#[derive(Debug, Clone)]
pub(crate) struct AdaptedTable {
    pub(crate) headers: Vec<String>,
    pub(crate) candidates: Vec<CandidateInvoice>,
}

/// Parses the upload, resolves columns once, then normalizes every row.
/// Any unresolved column fails before a single row is looked at.
pub(crate) fn read_candidates(
    adapter: &OriginAdapter,
    content: &[u8],
) -> ClientResult<AdaptedTable> {
    let origin_tag = adapter.origin.as_str();
    let table = parse_table(content, origin_tag)?;

    let columns = resolve_columns(&table.headers, adapter.aliases).map_err(|missing| {
        ClientError::invoice_schema_mismatch(
            missing.field.as_str(),
            missing.accepted,
            table.headers.clone(),
            origin_tag,
        )
    })?;

    let candidates = table
        .rows
        .iter()
        .map(|row| normalize_row(row, &columns, adapter.origin))
        .collect();

    Ok(AdaptedTable {
        headers: table.headers,
        candidates,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use serde_json::Value;

    use super::{ACCOUNTING_ADAPTER, BANK_ADAPTER, Origin, adapter_for, read_candidates};

    #[test]
    fn origin_tags_and_selectors_parse() {
        assert_eq!(Origin::parse("bank"), Some(Origin::Itau));
        assert_eq!(Origin::parse(" accounting "), Some(Origin::ContaAzul));
        assert_eq!(Origin::parse("CONTA_AZUL"), Some(Origin::ContaAzul));
        assert_eq!(Origin::parse("nubank"), None);
        assert_eq!(Origin::Itau.to_string(), "ITAU");
        assert_eq!(adapter_for(Origin::ContaAzul).origin, Origin::ContaAzul);
    }

    #[test]
    fn bank_adapter_stamps_itau_on_every_row() {
        let body = "Sacado;Data Vencimento;Historico;Valor;Carteira\n\
                    Acme;05/01/2024;Boleto 1;1.234,50;Ana\n\
                    Beta;06/01/2024;Boleto 2;10,00;Rui\n";
        let adapted = read_candidates(&BANK_ADAPTER, body.as_bytes());
        assert!(adapted.is_ok());
        if let Ok(table) = adapted {
            assert_eq!(table.candidates.len(), 2);
            assert!(
                table
                    .candidates
                    .iter()
                    .all(|candidate| candidate.origin == Origin::Itau)
            );
            assert_eq!(table.candidates[0].customer, "Acme");
            assert_eq!(
                table.candidates[0].due_date,
                NaiveDate::from_ymd_opt(2024, 1, 5)
            );
            assert_eq!(
                table.candidates[0].original_amount,
                Ok(Decimal::new(123450, 2))
            );
        }
    }

    #[test]
    fn accounting_adapter_prefers_valor_original() {
        let body = "Razao Social,Data de Vencimento,Observacao,Valor,Valor Original,Conta\n\
                    Acme,2024-01-05,Parcela,10.00,500.00,Ana\n";
        let adapted = read_candidates(&ACCOUNTING_ADAPTER, body.as_bytes());
        assert!(adapted.is_ok());
        if let Ok(table) = adapted {
            assert_eq!(
                table.candidates[0].original_amount,
                Ok(Decimal::new(50000, 2))
            );
            assert_eq!(table.candidates[0].salesperson, "Ana");
            assert_eq!(table.candidates[0].origin, Origin::ContaAzul);
        }
    }

    #[test]
    fn missing_column_fails_with_schema_mismatch() {
        let body = "cliente,vencimento,descricao,vendedor\nAcme,2024-01-05,Fatura,Ana\n";
        let adapted = read_candidates(&BANK_ADAPTER, body.as_bytes());
        assert!(adapted.is_err());
        if let Err(error) = adapted {
            assert_eq!(error.code, "invoice_schema_mismatch");
            assert!(error.data.is_some());
            if let Some(data) = error.data {
                assert_eq!(
                    data["missing_field"],
                    Value::String("original_amount".to_string())
                );
                assert_eq!(data["origin"], Value::String("ITAU".to_string()));
                assert_eq!(data["actual_headers"][0], Value::String("cliente".to_string()));
            }
        }
    }
}
