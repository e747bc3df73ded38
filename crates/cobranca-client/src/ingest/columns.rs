use thiserror::Error;

/// Canonical invoice fields, in the order they are resolved and reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum CanonicalField {
    Customer,
    DueDate,
    Description,
    OriginalAmount,
    Salesperson,
}

impl CanonicalField {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::DueDate => "due_date",
            Self::Description => "description",
            Self::OriginalAmount => "original_amount",
            Self::Salesperson => "salesperson",
        }
    }

    fn position(self) -> usize {
        match self {
            Self::Customer => 0,
            Self::DueDate => 1,
            Self::Description => 2,
            Self::OriginalAmount => 3,
            Self::Salesperson => 4,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct AliasSpec {
    pub(crate) field: CanonicalField,
    pub(crate) aliases: &'static [&'static str],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedColumn {
    pub(crate) header: String,
    pub(crate) index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResolvedColumns {
    columns: [ResolvedColumn; 5],
}

impl ResolvedColumns {
    pub(crate) fn get(&self, field: CanonicalField) -> &ResolvedColumn {
        &self.columns[field.position()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no header matches canonical field `{}`", field.as_str())]
pub(crate) struct MissingColumn {
    pub(crate) field: CanonicalField,
    pub(crate) accepted: Vec<String>,
}

pub(crate) fn header_key(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Matches every canonical field against the header row. Each alias list is
/// tried in priority order; the first unresolved field fails the whole table.
pub(crate) fn resolve_columns(
    headers: &[String],
    specs: &[AliasSpec],
) -> Result<ResolvedColumns, MissingColumn> {
    let keyed_headers = headers
        .iter()
        .map(|header| header_key(header))
        .collect::<Vec<String>>();
    let resolve = |field| resolve_field(field, headers, &keyed_headers, specs);

    // Array elements evaluate left to right, which keeps canonical order.
    Ok(ResolvedColumns {
        columns: [
            resolve(CanonicalField::Customer)?,
            resolve(CanonicalField::DueDate)?,
            resolve(CanonicalField::Description)?,
            resolve(CanonicalField::OriginalAmount)?,
            resolve(CanonicalField::Salesperson)?,
        ],
    })
}

fn resolve_field(
    field: CanonicalField,
    headers: &[String],
    keyed_headers: &[String],
    specs: &[AliasSpec],
) -> Result<ResolvedColumn, MissingColumn> {
    let aliases = specs
        .iter()
        .find(|spec| spec.field == field)
        .map(|spec| spec.aliases)
        .unwrap_or_default();

    let matched = aliases.iter().find_map(|alias| {
        let wanted = header_key(alias);
        keyed_headers.iter().position(|header| header == &wanted)
    });

    match matched {
        Some(index) => Ok(ResolvedColumn {
            header: headers[index].clone(),
            index,
        }),
        None => Err(MissingColumn {
            field,
            accepted: aliases.iter().map(|alias| (*alias).to_string()).collect(),
        }),
    }
}
