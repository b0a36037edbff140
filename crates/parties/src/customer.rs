use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use salesdesk_core::{
    require_non_blank, require_non_negative, AdminId, CustomerId, DomainResult, Entity,
};

use crate::admin::normalize_email;

/// Company registration details (all optional).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub ssm_registration_no: Option<String>,
    pub tax_identification_no: Option<String>,
    pub sst_no: Option<String>,
    pub msic_code: Option<String>,
    pub business_nature: Option<String>,
}

/// Customer account, owned by one responsible salesperson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub created_at: DateTime<Utc>,
    pub code: String,
    pub name: String,
    #[serde(flatten)]
    pub registration: Registration,
    /// Person in charge.
    pub pic_name: Option<String>,
    pub email: Option<String>,
    pub phone_no: String,
    pub address: String,
    pub credit_term: String,
    pub credit_limit: Decimal,
    pub admin_id: AdminId,
}

impl Entity for Customer {
    type Id = CustomerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Customer {
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        let optional = [self.email.as_deref(), self.pic_name.as_deref()];
        self.name.to_lowercase().contains(&needle)
            || self.code.to_lowercase().contains(&needle)
            || optional
                .iter()
                .flatten()
                .any(|v| v.to_lowercase().contains(&needle))
    }
}

/// Input for creating or replacing a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub code: String,
    pub name: String,
    #[serde(flatten)]
    pub registration: Registration,
    pub pic_name: Option<String>,
    pub email: Option<String>,
    pub phone_no: String,
    pub address: String,
    pub credit_term: String,
    pub credit_limit: Decimal,
    pub admin_id: AdminId,
}

/// Validated customer fields, ready to be assigned an id by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerDraft {
    pub code: String,
    pub name: String,
    pub registration: Registration,
    pub pic_name: Option<String>,
    pub email: Option<String>,
    pub phone_no: String,
    pub address: String,
    pub credit_term: String,
    pub credit_limit: Decimal,
    pub admin_id: AdminId,
}

impl CustomerDraft {
    pub fn into_customer(self, id: CustomerId, created_at: DateTime<Utc>) -> Customer {
        Customer {
            id,
            created_at,
            code: self.code,
            name: self.name,
            registration: self.registration,
            pic_name: self.pic_name,
            email: self.email,
            phone_no: self.phone_no,
            address: self.address,
            credit_term: self.credit_term,
            credit_limit: self.credit_limit,
            admin_id: self.admin_id,
        }
    }
}

impl NewCustomer {
    pub fn validate(self) -> DomainResult<CustomerDraft> {
        require_non_blank("code", &self.code)?;
        require_non_blank("name", &self.name)?;
        require_non_blank("phone_no", &self.phone_no)?;
        require_non_blank("address", &self.address)?;
        require_non_blank("credit_term", &self.credit_term)?;
        let credit_limit = require_non_negative("credit_limit", self.credit_limit)?;

        // An empty email means "no email" rather than an invalid one.
        let email = match self.email.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(e) => Some(normalize_email(e)?),
        };

        Ok(CustomerDraft {
            code: self.code.trim().to_string(),
            name: self.name.trim().to_string(),
            registration: Registration {
                ssm_registration_no: blank_to_none(self.registration.ssm_registration_no),
                tax_identification_no: blank_to_none(self.registration.tax_identification_no),
                sst_no: blank_to_none(self.registration.sst_no),
                msic_code: blank_to_none(self.registration.msic_code),
                business_nature: blank_to_none(self.registration.business_nature),
            },
            pic_name: blank_to_none(self.pic_name),
            email,
            phone_no: self.phone_no.trim().to_string(),
            address: self.address.trim().to_string(),
            credit_term: self.credit_term.trim().to_string(),
            credit_limit,
            admin_id: self.admin_id,
        })
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
