//! Subscription invoices and supplier contracts

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;
use crate::domain::aggregates::{Contract, ContractCounts, ContractStatus, Invoice, InvoiceFilter, InvoiceStatus, InvoiceSummary};
use crate::domain::value_objects::Money;
use crate::store::{fetch_typed, to_row, Direction, Query, Table};
use super::{ensure_found, parse_optional_ref, parse_ref, supplier_names, Store};
use crate::{CommerceError, Result};

#[derive(Clone, Debug, Serialize)]
pub struct InvoiceView {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub supplier_name: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ContractView {
    #[serde(flatten)]
    pub contract: Contract,
    pub supplier_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateContractRequest {
    #[validate(length(min = 1, message = "supplier_id is required"))]
    pub supplier_id: String,
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[validate(length(min = 1, message = "title_ar is required"))]
    pub title_ar: String,
    #[serde(default)]
    pub terms_ar: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub value: Option<Decimal>,
}

#[derive(Clone)]
pub struct BillingService {
    store: Store,
}

impl BillingService {
    pub fn new(store: Store) -> Self { Self { store } }

    async fn all_invoices(&self) -> Result<Vec<Invoice>> {
        let query = Query::from(Table::SubscriptionInvoices).order_by("created_at", Direction::Desc);
        Ok(fetch_typed(self.store.as_ref(), &query).await?)
    }

    pub async fn invoices(&self, filter: InvoiceFilter) -> Result<Vec<InvoiceView>> {
        let names = supplier_names(self.store.as_ref()).await?;
        Ok(self
            .all_invoices()
            .await?
            .into_iter()
            .filter(|i| filter.admits(i))
            .map(|invoice| InvoiceView { supplier_name: names.get(&invoice.supplier_id).map(str::to_string), invoice })
            .collect())
    }

    pub async fn invoice_summary(&self) -> Result<InvoiceSummary> {
        Ok(InvoiceSummary::of(&self.all_invoices().await?))
    }

    /// Any status may follow any other.
    pub async fn set_invoice_status(&self, id: Uuid, status: InvoiceStatus) -> Result<()> {
        let fields = to_row(&Invoice::status_change(status, Utc::now()))?;
        ensure_found(self.store.update_row(Table::SubscriptionInvoices, id, fields).await?, "invoice", id)?;
        tracing::info!(%id, status = status.as_str(), "invoice status changed");
        Ok(())
    }

    async fn all_contracts(&self) -> Result<Vec<Contract>> {
        let query = Query::from(Table::Contracts).order_by("created_at", Direction::Desc);
        Ok(fetch_typed(self.store.as_ref(), &query).await?)
    }

    pub async fn contracts(&self) -> Result<Vec<ContractView>> {
        let names = supplier_names(self.store.as_ref()).await?;
        Ok(self
            .all_contracts()
            .await?
            .into_iter()
            .map(|contract| ContractView { supplier_name: names.get(&contract.supplier_id).map(str::to_string), contract })
            .collect())
    }

    pub async fn contract_counts(&self) -> Result<ContractCounts> {
        Ok(ContractCounts::of(&self.all_contracts().await?))
    }

    pub async fn create_contract(&self, req: CreateContractRequest) -> Result<Contract> {
        req.validate()?;
        let supplier_id = parse_ref("supplier_id", &req.supplier_id)?;
        let subscription_id = parse_optional_ref("subscription_id", req.subscription_id.as_deref())?;
        let title = req.title_ar.trim();
        if title.is_empty() {
            return Err(CommerceError::validation("title_ar is required"));
        }
        let (Some(start), Some(end)) = (req.start_date, req.end_date) else {
            return Err(CommerceError::validation("start_date and end_date are required"));
        };
        if end < start {
            return Err(CommerceError::validation("end_date must not be before start_date"));
        }
        let value = Money::new(req.value.unwrap_or(Decimal::ZERO));
        let terms = req.terms_ar.filter(|t| !t.trim().is_empty());

        let contract = Contract::draft(supplier_id, subscription_id, title.to_string(), terms, start, end, value);
        let stored = self.store.insert_row(Table::Contracts, to_row(&contract)?).await?;
        tracing::info!(id = %contract.id, %supplier_id, "contract drafted");
        Ok(crate::store::decode(Table::Contracts, stored)?)
    }

    pub async fn set_contract_status(&self, id: Uuid, status: ContractStatus) -> Result<()> {
        let fields = to_row(&json!({ "status": status }))?;
        ensure_found(self.store.update_row(Table::Contracts, id, fields).await?, "contract", id)?;
        tracing::info!(%id, status = status.as_str(), "contract status changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    async fn setup() -> (Arc<MemoryStore>, BillingService, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let supplier = Uuid::new_v4();
        store.seed(Table::Suppliers, &json!({"id": supplier, "name_ar": "مياه حلوة"})).await;
        for (amount, status) in [(300, "paid"), (100, "pending"), (50, "overdue")] {
            store.seed(Table::SubscriptionInvoices, &json!({
                "invoice_number": format!("INV-{amount}"), "subscription_id": Uuid::new_v4(), "supplier_id": supplier,
                "amount": amount, "due_date": "2025-04-01", "status": status,
            })).await;
        }
        let svc = BillingService::new(store.clone());
        (store, svc, supplier)
    }

    fn contract_request(supplier: Uuid, start: &str, end: &str) -> CreateContractRequest {
        CreateContractRequest {
            supplier_id: supplier.to_string(),
            subscription_id: None,
            title_ar: "عقد توريد سنوي".into(),
            terms_ar: None,
            start_date: start.parse().ok(),
            end_date: end.parse().ok(),
            value: Some(Decimal::from(1200)),
        }
    }

    #[tokio::test]
    async fn test_invoice_listing_and_summary() {
        let (_, svc, _) = setup().await;
        let all = svc.invoices(InvoiceFilter::All).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|i| i.supplier_name.as_deref() == Some("مياه حلوة")));
        assert_eq!(svc.invoices(InvoiceFilter::Status(InvoiceStatus::Overdue)).await.unwrap().len(), 1);

        let summary = svc.invoice_summary().await.unwrap();
        assert_eq!(summary.collected.amount(), Decimal::from(300));
        assert_eq!(summary.outstanding.amount(), Decimal::from(100));
        assert_eq!(summary.count, 3);
    }

    #[tokio::test]
    async fn test_marking_paid_stamps_paid_at() {
        let (_, svc, _) = setup().await;
        let pending = svc.invoices(InvoiceFilter::Status(InvoiceStatus::Pending)).await.unwrap().remove(0).invoice;
        assert!(pending.paid_at.is_none());
        svc.set_invoice_status(pending.id, InvoiceStatus::Paid).await.unwrap();
        let paid = svc.invoices(InvoiceFilter::Status(InvoiceStatus::Paid)).await.unwrap();
        assert_eq!(paid.len(), 2);
        assert!(paid.iter().find(|i| i.invoice.id == pending.id).unwrap().invoice.paid_at.is_some());

        // any status may follow any other
        svc.set_invoice_status(pending.id, InvoiceStatus::Overdue).await.unwrap();
        assert!(matches!(svc.set_invoice_status(Uuid::new_v4(), InvoiceStatus::Paid).await, Err(CommerceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_contract_creation_and_counts() {
        let (store, svc, supplier) = setup().await;
        let contract = svc.create_contract(contract_request(supplier, "2025-01-01", "2025-12-31")).await.unwrap();
        assert_eq!(contract.status, ContractStatus::Draft);
        assert!(contract.created_at.is_some());

        svc.set_contract_status(contract.id, ContractStatus::Active).await.unwrap();
        let counts = svc.contract_counts().await.unwrap();
        assert_eq!(counts.get(ContractStatus::Active), 1);
        assert_eq!(counts.get(ContractStatus::Draft), 0);

        let listed = svc.contracts().await.unwrap();
        assert_eq!(listed[0].supplier_name.as_deref(), Some("مياه حلوة"));
        assert_eq!(store.rows(Table::Contracts).await.len(), 1);
    }

    #[tokio::test]
    async fn test_contract_validation() {
        let (store, svc, supplier) = setup().await;
        let backwards = contract_request(supplier, "2025-12-31", "2025-01-01");
        assert!(matches!(svc.create_contract(backwards).await, Err(CommerceError::Validation(_))));
        let undated = contract_request(supplier, "", "2025-01-01");
        assert!(matches!(svc.create_contract(undated).await, Err(CommerceError::Validation(_))));
        let mut untitled = contract_request(supplier, "2025-01-01", "2025-01-01");
        untitled.title_ar = "   ".into();
        assert!(matches!(svc.create_contract(untitled).await, Err(CommerceError::Validation(_))));
        assert!(store.rows(Table::Contracts).await.is_empty());
    }
}
