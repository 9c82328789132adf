//! Subscription invoices and supplier contracts
//!
//! Both statuses are set by backend triggers or by hand in the admin; no
//! transition rules are enforced here.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::nullable;
use crate::domain::value_objects::Money;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "Option<String>")]
pub enum InvoiceStatus { Pending, Paid, Overdue }

impl From<Option<String>> for InvoiceStatus {
    fn from(raw: Option<String>) -> Self {
        match raw.as_deref() {
            Some("paid") => Self::Paid,
            Some("overdue") => Self::Overdue,
            _ => Self::Pending,
        }
    }
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Pending => "pending", Self::Paid => "paid", Self::Overdue => "overdue" }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "Option<String>")]
pub enum ContractStatus { Draft, Active, Expired, Terminated }

impl From<Option<String>> for ContractStatus {
    fn from(raw: Option<String>) -> Self {
        match raw.as_deref() {
            Some("active") => Self::Active,
            Some("expired") => Self::Expired,
            Some("terminated") => Self::Terminated,
            _ => Self::Draft,
        }
    }
}

impl ContractStatus {
    pub const ALL: [ContractStatus; 4] = [Self::Draft, Self::Active, Self::Expired, Self::Terminated];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Terminated => "terminated",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    #[serde(default)]
    pub invoice_number: Option<String>,
    pub subscription_id: Uuid,
    pub supplier_id: Uuid,
    pub amount: Money,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Invoice {
    /// Columns to write when an admin sets the status. Marking an invoice
    /// paid stamps the payment time.
    pub fn status_change(status: InvoiceStatus, now: DateTime<Utc>) -> serde_json::Value {
        match status {
            InvoiceStatus::Paid => serde_json::json!({ "status": status, "paid_at": now }),
            _ => serde_json::json!({ "status": status }),
        }
    }
}

/// Invoice list filter: every invoice or one status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InvoiceFilter {
    #[default]
    All,
    Status(InvoiceStatus),
}

impl InvoiceFilter {
    pub fn admits(&self, invoice: &Invoice) -> bool {
        match self {
            Self::All => true,
            Self::Status(s) => invoice.status == *s,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct InvoiceSummary {
    /// Sum of paid invoices.
    pub collected: Money,
    /// Sum of invoices still pending. Overdue invoices are not included.
    pub outstanding: Money,
    pub count: usize,
    pub pending_count: usize,
}

impl InvoiceSummary {
    pub fn of<'a>(invoices: impl IntoIterator<Item = &'a Invoice>) -> Self {
        invoices.into_iter().fold(Self::default(), |mut s, i| {
            s.count += 1;
            match i.status {
                InvoiceStatus::Paid => s.collected = s.collected + i.amount,
                InvoiceStatus::Pending => {
                    s.outstanding = s.outstanding + i.amount;
                    s.pending_count += 1;
                }
                InvoiceStatus::Overdue => {}
            }
            s
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: Uuid,
    #[serde(default)]
    pub contract_number: Option<String>,
    pub supplier_id: Uuid,
    #[serde(default)]
    pub subscription_id: Option<Uuid>,
    pub title_ar: String,
    #[serde(default)]
    pub terms_ar: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default, deserialize_with = "nullable::or_default")]
    pub value: Money,
    pub status: ContractStatus,
    #[serde(default)]
    pub signed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub signed_by: Option<String>,
    #[serde(default, skip_serializing)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Contract {
    /// New contracts always start as drafts.
    pub fn draft(supplier_id: Uuid, subscription_id: Option<Uuid>, title_ar: String, terms_ar: Option<String>,
                 start_date: NaiveDate, end_date: NaiveDate, value: Money) -> Self {
        Self {
            id: Uuid::now_v7(), contract_number: None, supplier_id, subscription_id, title_ar, terms_ar,
            start_date, end_date, value, status: ContractStatus::Draft, signed_at: None, signed_by: None, created_at: None,
        }
    }
}

/// Number of contracts in each status, in display order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ContractCounts(pub Vec<(ContractStatus, usize)>);

impl ContractCounts {
    pub fn of(contracts: &[Contract]) -> Self {
        Self(ContractStatus::ALL.iter().map(|s| (*s, contracts.iter().filter(|c| c.status == *s).count())).collect())
    }

    pub fn get(&self, status: ContractStatus) -> usize {
        self.0.iter().find(|(s, _)| *s == status).map_or(0, |(_, n)| *n)
    }
}
