use chrono::{DateTime, NaiveDate, Utc};
use core::str::FromStr;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use salesdesk_core::{
    require_non_blank, require_non_negative, AdminId, CustomerId, DomainError, DomainResult,
    Entity, TransactionId,
};
use salesdesk_products::ProductCode;

/// Transaction status lifecycle.
///
/// `PENDING -> APPROVED | CANCELLED`, `APPROVED -> DELIVERED | CANCELLED`.
/// `DELIVERED` and `CANCELLED` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Approved,
    Delivered,
    Cancelled,
}

impl TransactionStatus {
    pub fn code(self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Approved => "APPROVED",
            TransactionStatus::Delivered => "DELIVERED",
            TransactionStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TransactionStatus::Delivered | TransactionStatus::Cancelled
        )
    }

    /// Staying in the same status is always allowed.
    pub fn can_transition_to(self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;
        self == next
            || matches!(
                (self, next),
                (Pending, Approved) | (Pending, Cancelled) | (Approved, Delivered) | (Approved, Cancelled)
            )
    }

    pub fn transition_to(self, next: TransactionStatus) -> DomainResult<TransactionStatus> {
        if !self.can_transition_to(next) {
            return Err(DomainError::invariant(format!(
                "cannot move transaction from {self} to {next}"
            )));
        }
        Ok(next)
    }
}

impl core::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for TransactionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(TransactionStatus::Pending),
            "APPROVED" => Ok(TransactionStatus::Approved),
            "DELIVERED" => Ok(TransactionStatus::Delivered),
            "CANCELLED" => Ok(TransactionStatus::Cancelled),
            _ => Err(DomainError::validation(format!("invalid status: {s:?}"))),
        }
    }
}

/// Line item: product, quantity and the unit price at the time of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionLine {
    pub product_code: ProductCode,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

/// Line as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInput {
    pub code: String,
    pub quantity: Decimal,
    pub price: Decimal,
}

impl LineInput {
    pub fn validate(self) -> DomainResult<TransactionLine> {
        let product_code = ProductCode::parse(self.code)?;
        if self.quantity <= Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "quantity for {product_code} must be positive"
            )));
        }
        let unit_price = require_non_negative("price", self.price)?;
        Ok(TransactionLine {
            product_code,
            quantity: self.quantity,
            unit_price,
        })
    }
}

/// Sales transaction header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub doc_num: String,
    pub transaction_date: NaiveDate,
    pub customer_id: CustomerId,
    /// Responsible salesperson; their region attributes the sale.
    pub admin_id: AdminId,
    pub total_price: Decimal,
    pub ref_doc_no: String,
    pub delivery_date: NaiveDate,
    pub shipping_method: String,
    pub commission: Decimal,
    pub status: TransactionStatus,
    /// Delivery location.
    pub location: String,
}

impl Entity for Transaction {
    type Id = TransactionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Header fields shared by create and edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionHeader {
    pub doc_num: String,
    pub transaction_date: NaiveDate,
    pub customer_id: CustomerId,
    pub admin_id: AdminId,
    pub total_price: Decimal,
    pub ref_doc_no: String,
    pub delivery_date: NaiveDate,
    pub shipping_method: String,
    pub commission: Decimal,
    #[serde(default)]
    pub location: String,
}

impl TransactionHeader {
    fn validate(self) -> DomainResult<TransactionHeader> {
        require_non_blank("doc_num", &self.doc_num)?;
        require_non_blank("ref_doc_no", &self.ref_doc_no)?;
        require_non_blank("shipping_method", &self.shipping_method)?;
        let total_price = require_non_negative("total_price", self.total_price)?;
        let commission = require_non_negative("commission", self.commission)?;
        Ok(TransactionHeader {
            doc_num: self.doc_num.trim().to_string(),
            ref_doc_no: self.ref_doc_no.trim().to_string(),
            shipping_method: self.shipping_method.trim().to_string(),
            location: self.location.trim().to_string(),
            total_price,
            commission,
            ..self
        })
    }

    pub fn into_transaction(self, id: TransactionId, status: TransactionStatus) -> Transaction {
        Transaction {
            id,
            doc_num: self.doc_num,
            transaction_date: self.transaction_date,
            customer_id: self.customer_id,
            admin_id: self.admin_id,
            total_price: self.total_price,
            ref_doc_no: self.ref_doc_no,
            delivery_date: self.delivery_date,
            shipping_method: self.shipping_method,
            commission: self.commission,
            status,
            location: self.location,
        }
    }
}

fn validate_lines(lines: Vec<LineInput>) -> DomainResult<Vec<TransactionLine>> {
    if lines.is_empty() {
        return Err(DomainError::validation(
            "transaction must have at least one line",
        ));
    }
    lines.into_iter().map(LineInput::validate).collect()
}

fn normalize_remark(remark: Option<String>) -> Option<String> {
    remark
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
}

/// Input for creating a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    #[serde(flatten)]
    pub header: TransactionHeader,
    pub lines: Vec<LineInput>,
    pub remark: Option<String>,
}

/// A validated create request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDraft {
    pub header: TransactionHeader,
    pub lines: Vec<TransactionLine>,
    pub remark: Option<String>,
}

impl NewTransaction {
    pub fn validate(self) -> DomainResult<TransactionDraft> {
        Ok(TransactionDraft {
            header: self.header.validate()?,
            lines: validate_lines(self.lines)?,
            remark: normalize_remark(self.remark),
        })
    }
}

/// Input for editing a transaction: replaces the header and every line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEdit {
    #[serde(flatten)]
    pub header: TransactionHeader,
    pub lines: Vec<LineInput>,
    pub remark: Option<String>,
    pub status: String,
}

/// A validated edit, with the status transition already checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedEdit {
    pub header: TransactionHeader,
    pub lines: Vec<TransactionLine>,
    pub remark: Option<String>,
    pub status: TransactionStatus,
    pub status_changed: bool,
}

impl TransactionEdit {
    pub fn validate(self, current: TransactionStatus) -> DomainResult<ValidatedEdit> {
        let requested: TransactionStatus = self.status.parse()?;
        let status = current.transition_to(requested)?;
        Ok(ValidatedEdit {
            header: self.header.validate()?,
            lines: validate_lines(self.lines)?,
            remark: normalize_remark(self.remark),
            status,
            status_changed: status != current,
        })
    }
}

/// Free-text note logged against a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remark {
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Newest remark first.
pub fn sort_remarks(remarks: &mut [Remark]) {
    remarks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn header() -> TransactionHeader {
        TransactionHeader {
            doc_num: "INV-2024-001".to_string(),
            transaction_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            customer_id: CustomerId::new(1),
            admin_id: AdminId::new(2),
            total_price: dec!(2900),
            ref_doc_no: "PO-88".to_string(),
            delivery_date: NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
            shipping_method: "Lorry".to_string(),
            commission: dec!(29),
            location: "Kuantan".to_string(),
        }
    }

    fn line(code: &str, quantity: Decimal, price: Decimal) -> LineInput {
        LineInput {
            code: code.to_string(),
            quantity,
            price,
        }
    }

    fn new_transaction() -> NewTransaction {
        NewTransaction {
            header: header(),
            lines: vec![line("GLD-001", dec!(2), dec!(1450))],
            remark: Some("  urgent  ".to_string()),
        }
    }

    #[test]
    fn validate_accepts_well_formed_transaction() {
        let draft = new_transaction().validate().unwrap();
        assert_eq!(draft.lines.len(), 1);
        assert_eq!(draft.remark.as_deref(), Some("urgent"));
    }

    #[test]
    fn blank_remark_is_dropped() {
        let mut input = new_transaction();
        input.remark = Some("   ".to_string());
        assert_eq!(input.validate().unwrap().remark, None);
    }

    #[test]
    fn empty_lines_are_rejected() {
        let mut input = new_transaction();
        input.lines.clear();
        assert!(matches!(input.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        for qty in [dec!(0), dec!(-3)] {
            let mut input = new_transaction();
            input.lines = vec![line("GLD-001", qty, dec!(10))];
            assert!(input.validate().is_err(), "accepted quantity {qty}");
        }
    }

    #[test]
    fn negative_commission_is_rejected() {
        let mut input = new_transaction();
        input.header.commission = dec!(-1);
        assert_eq!(
            input.validate().unwrap_err(),
            DomainError::Validation("commission must be a non-negative number".to_string())
        );
    }

    #[test]
    fn blank_doc_num_is_rejected() {
        let mut input = new_transaction();
        input.header.doc_num = String::new();
        assert_eq!(
            input.validate().unwrap_err(),
            DomainError::Validation("doc_num is required".to_string())
        );
    }

    #[test]
    fn lifecycle_transitions() {
        use TransactionStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Approved.can_transition_to(Delivered));
        assert!(Approved.can_transition_to(Cancelled));
        assert!(Delivered.can_transition_to(Delivered));

        assert!(!Pending.can_transition_to(Delivered));
        assert!(!Approved.can_transition_to(Pending));
        assert!(!Delivered.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Approved));
    }

    #[test]
    fn edit_reports_status_change() {
        let edit = TransactionEdit {
            header: header(),
            lines: vec![line("GLD-001", dec!(1), dec!(1450))],
            remark: None,
            status: "approved".to_string(),
        };
        let validated = edit.validate(TransactionStatus::Pending).unwrap();
        assert_eq!(validated.status, TransactionStatus::Approved);
        assert!(validated.status_changed);
    }

    #[test]
    fn edit_rejects_illegal_transition() {
        let edit = TransactionEdit {
            header: header(),
            lines: vec![line("GLD-001", dec!(1), dec!(1450))],
            remark: None,
            status: "PENDING".to_string(),
        };
        let err = edit.validate(TransactionStatus::Delivered).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn remarks_sort_newest_first() {
        let older = Remark {
            message: "first".to_string(),
            created_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        };
        let newer = Remark {
            message: "second".to_string(),
            created_at: DateTime::from_timestamp(1_700_000_100, 0).unwrap(),
        };
        let mut remarks = vec![older, newer];
        sort_remarks(&mut remarks);
        assert_eq!(remarks[0].message, "second");
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn any_status() -> impl Strategy<Value = TransactionStatus> {
            prop_oneof![
                Just(TransactionStatus::Pending),
                Just(TransactionStatus::Approved),
                Just(TransactionStatus::Delivered),
                Just(TransactionStatus::Cancelled),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 64,
                ..ProptestConfig::default()
            })]

            /// Property: terminal statuses never move to a different status.
            #[test]
            fn terminal_statuses_are_sticky(from in any_status(), to in any_status()) {
                if from.is_terminal() && from != to {
                    prop_assert!(!from.can_transition_to(to));
                }
            }

            /// Property: nothing ever moves back to PENDING.
            #[test]
            fn nothing_returns_to_pending(from in any_status()) {
                if from != TransactionStatus::Pending {
                    prop_assert!(from.transition_to(TransactionStatus::Pending).is_err());
                }
            }
        }
    }
}
