use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::contracts::types::UploadIssue;
use crate::ingest::normalize::{AmountCoercionError, CandidateInvoice};
use crate::ingest::origin::Origin;

pub(crate) const MALFORMED_AMOUNT_CODE: &str = "malformed_amount";

/// A row that passed every rule and may be offered to storage.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ValidInvoice {
    pub(crate) row: i64,
    pub(crate) customer: String,
    pub(crate) due_date: NaiveDate,
    pub(crate) description: String,
    pub(crate) original_amount: Decimal,
    pub(crate) salesperson: String,
    pub(crate) origin: Origin,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Verdict {
    Accept(ValidInvoice),
    Reject(Vec<UploadIssue>),
}

impl Verdict {
    pub(crate) fn is_malformed(&self) -> bool {
        match self {
            Self::Accept(_) => false,
            Self::Reject(issues) => issues
                .iter()
                .any(|issue| issue.code == MALFORMED_AMOUNT_CODE),
        }
    }
}

/// Only invoices already past due on `today` are accepted.
pub(crate) fn check(candidate: CandidateInvoice, today: NaiveDate) -> Verdict {
    let row = candidate.row;
    let mut issues = Vec::new();

    require_text(row, "customer", &candidate.customer, &mut issues);
    let due_date = check_due_date(row, candidate.due_date, today, &mut issues);
    require_text(row, "description", &candidate.description, &mut issues);
    let original_amount = check_amount(row, candidate.original_amount, &mut issues);
    require_text(row, "salesperson", &candidate.salesperson, &mut issues);

    match (due_date, original_amount) {
        (Some(due_date), Some(original_amount)) if issues.is_empty() => {
            Verdict::Accept(ValidInvoice {
                row,
                customer: candidate.customer,
                due_date,
                description: candidate.description,
                original_amount,
                salesperson: candidate.salesperson,
                origin: candidate.origin,
            })
        }
        _ => Verdict::Reject(issues),
    }
}

fn require_text(row: i64, field: &str, value: &str, issues: &mut Vec<UploadIssue>) {
    if value.is_empty() {
        issues.push(UploadIssue {
            row,
            field: field.to_string(),
            code: "missing_required_field".to_string(),
            description: format!("{field} must be present and non-empty."),
            expected: Some("non-empty text".to_string()),
            received: Some(String::new()),
        });
    }
}

fn check_due_date(
    row: i64,
    due_date: Option<NaiveDate>,
    today: NaiveDate,
    issues: &mut Vec<UploadIssue>,
) -> Option<NaiveDate> {
    let Some(due_date) = due_date else {
        issues.push(UploadIssue {
            row,
            field: "due_date".to_string(),
            code: "missing_due_date".to_string(),
            description: "due_date is missing or is not a recognizable date.".to_string(),
            expected: Some("YYYY-MM-DD or DD/MM/YYYY".to_string()),
            received: None,
        });
        return None;
    };

    if due_date >= today {
        issues.push(UploadIssue {
            row,
            field: "due_date".to_string(),
            code: "due_date_not_past".to_string(),
            description: format!("due_date {due_date} is not before {today}; invoice is not overdue."),
            expected: Some(format!("date before {today}")),
            received: Some(due_date.to_string()),
        });
        return None;
    }

    Some(due_date)
}

fn check_amount(
    row: i64,
    amount: Result<Decimal, AmountCoercionError>,
    issues: &mut Vec<UploadIssue>,
) -> Option<Decimal> {
    match amount {
        Ok(value) if value > Decimal::ZERO => Some(value),
        Ok(value) => {
            issues.push(UploadIssue {
                row,
                field: "original_amount".to_string(),
                code: "non_positive_amount".to_string(),
                description: "original_amount must be greater than zero.".to_string(),
                expected: Some("amount > 0".to_string()),
                received: Some(value.to_string()),
            });
            None
        }
        Err(error) => {
            issues.push(UploadIssue {
                row,
                field: "original_amount".to_string(),
                code: MALFORMED_AMOUNT_CODE.to_string(),
                description: format!("original_amount could not be read: {error}."),
                expected: Some("number such as 1234.56 or 1.234,56".to_string()),
                received: Some(error.raw),
            });
            None
        }
    }
}
