//! Subscription plans, supplier subscriptions and permission projection

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;
use crate::domain::aggregates::subscription::SubscriptionStatus;
use crate::domain::aggregates::{SubscriptionPlan, Supplier, SupplierPermissions, SupplierSubscription};
use crate::store::{fetch_one, fetch_typed, to_row, Direction, Query, Table};
use super::{parse_ref, supplier_names, EventBus, Store};
use crate::{CommerceError, Result};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSubscriptionRequest {
    #[validate(length(min = 1, message = "supplier_id is required"))]
    pub supplier_id: String,
    #[validate(length(min = 1, message = "plan_id is required"))]
    pub plan_id: String,
    #[validate(range(min = 1, message = "months must be at least 1"))]
    pub months: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlanView {
    #[serde(flatten)]
    pub plan: SubscriptionPlan,
    pub yearly_savings_percent: Option<Decimal>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub subscription: SupplierSubscription,
    pub supplier_name: Option<String>,
    pub plan_name: Option<String>,
}

#[derive(Clone)]
pub struct SubscriptionService {
    store: Store,
    events: EventBus,
}

impl SubscriptionService {
    pub fn new(store: Store, events: EventBus) -> Self { Self { store, events } }

    async fn all_plans(&self) -> Result<Vec<SubscriptionPlan>> {
        let query = Query::from(Table::SubscriptionPlans).order_by("sort_order", Direction::Asc);
        Ok(fetch_typed(self.store.as_ref(), &query).await?)
    }

    pub async fn plans(&self) -> Result<Vec<PlanView>> {
        Ok(self
            .all_plans()
            .await?
            .into_iter()
            .map(|plan| PlanView { yearly_savings_percent: plan.yearly_savings_percent(), plan })
            .collect())
    }

    pub async fn list(&self) -> Result<Vec<SubscriptionView>> {
        let query = Query::from(Table::SupplierSubscriptions).order_by("created_at", Direction::Desc);
        let subs: Vec<SupplierSubscription> = fetch_typed(self.store.as_ref(), &query).await?;
        let names = supplier_names(self.store.as_ref()).await?;
        let plans: HashMap<Uuid, String> = self.all_plans().await?.into_iter().map(|p| (p.id, p.name_ar)).collect();
        Ok(subs
            .into_iter()
            .map(|s| SubscriptionView {
                supplier_name: names.get(&s.supplier_id).map(str::to_string),
                plan_name: plans.get(&s.plan_id).cloned(),
                subscription: s,
            })
            .collect())
    }

    pub async fn create(&self, req: CreateSubscriptionRequest) -> Result<SupplierSubscription> {
        self.create_on(req, Utc::now().date_naive()).await
    }

    /// Starts an active subscription on `today`, charging the plan's monthly
    /// price for every month up front.
    pub async fn create_on(&self, req: CreateSubscriptionRequest, today: NaiveDate) -> Result<SupplierSubscription> {
        req.validate()?;
        let supplier_id = parse_ref("supplier_id", &req.supplier_id)?;
        let plan_id = parse_ref("plan_id", &req.plan_id)?;
        let supplier: Option<Supplier> = fetch_one(self.store.as_ref(), Table::Suppliers, supplier_id).await?;
        if supplier.is_none() {
            return Err(CommerceError::NotFound(format!("supplier {supplier_id}")));
        }
        let plan: SubscriptionPlan = fetch_one(self.store.as_ref(), Table::SubscriptionPlans, plan_id)
            .await?
            .ok_or_else(|| CommerceError::NotFound(format!("plan {plan_id}")))?;

        let (subscription, event) = SupplierSubscription::start(supplier_id, &plan, req.months, today)?;
        self.store.insert_row(Table::SupplierSubscriptions, to_row(&subscription)?).await?;
        tracing::info!(id = %subscription.id, %supplier_id, plan = %plan.name_ar, months = req.months, "subscription created");
        self.events.publish(vec![event]).await;
        Ok(subscription)
    }

    /// What each actively subscribed supplier may use.
    pub async fn permissions(&self) -> Result<Vec<SupplierPermissions>> {
        let query = Query::from(Table::SupplierSubscriptions).eq("status", SubscriptionStatus::Active.as_str());
        let subs: Vec<SupplierSubscription> = fetch_typed(self.store.as_ref(), &query).await?;
        let names = supplier_names(self.store.as_ref()).await?;
        let plans: HashMap<Uuid, SubscriptionPlan> = self.all_plans().await?.into_iter().map(|p| (p.id, p)).collect();
        Ok(subs
            .iter()
            .map(|s| SupplierPermissions::project(s, plans.get(&s.plan_id), names.get(&s.supplier_id)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::PlanLimit;
    use crate::store::MemoryStore;
    use chrono::Days;
    use serde_json::json;
    use std::sync::Arc;

    async fn setup() -> (Arc<MemoryStore>, SubscriptionService, Uuid, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let supplier = Uuid::new_v4();
        let plan = Uuid::new_v4();
        store.seed(Table::Suppliers, &json!({"id": supplier, "name_ar": "مياه تانيا"})).await;
        store.seed(Table::SubscriptionPlans, &json!({
            "id": plan, "name_ar": "الباقة الاحترافية", "price_monthly": 100, "price_yearly": 1000,
            "max_products": -1, "max_orders": 1000, "has_custom_domain": true, "has_driver_radar": true, "sort_order": 2,
        })).await;
        store.seed(Table::SubscriptionPlans, &json!({
            "name_ar": "الباقة الأساسية", "price_monthly": 50, "max_products": 20, "max_orders": 100, "sort_order": 1,
        })).await;
        let svc = SubscriptionService::new(store.clone(), EventBus::disabled());
        (store, svc, supplier, plan)
    }

    fn request(supplier: Uuid, plan: Uuid, months: u32) -> CreateSubscriptionRequest {
        CreateSubscriptionRequest { supplier_id: supplier.to_string(), plan_id: plan.to_string(), months }
    }

    #[tokio::test]
    async fn test_three_months_costs_three_monthly_prices() {
        let (store, svc, supplier, plan) = setup().await;
        let today = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        let sub = svc.create_on(request(supplier, plan, 3), today).await.unwrap();
        assert_eq!(sub.total_paid.amount(), Decimal::from(300));
        assert_eq!(sub.end_date, today.checked_add_days(Days::new(90)));
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(store.rows(Table::SupplierSubscriptions).await.len(), 1);

        let listed = svc.list().await.unwrap();
        assert_eq!(listed[0].supplier_name.as_deref(), Some("مياه تانيا"));
        assert_eq!(listed[0].plan_name.as_deref(), Some("الباقة الاحترافية"));
    }

    #[tokio::test]
    async fn test_rejects_bad_requests_without_writing() {
        let (store, svc, supplier, plan) = setup().await;
        let missing = CreateSubscriptionRequest { supplier_id: String::new(), plan_id: plan.to_string(), months: 1 };
        assert!(matches!(svc.create(missing).await, Err(CommerceError::Validation(_))));
        assert!(matches!(svc.create(request(supplier, plan, 0)).await, Err(CommerceError::Validation(_))));
        assert!(matches!(svc.create(request(supplier, Uuid::new_v4(), 1)).await, Err(CommerceError::NotFound(_))));
        assert!(store.rows(Table::SupplierSubscriptions).await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_supplier_is_not_found() {
        let (store, svc, _, plan) = setup().await;
        let ghost = Uuid::new_v4();
        let err = svc.create(request(ghost, plan, 1)).await.unwrap_err();
        assert!(matches!(err, CommerceError::NotFound(m) if m == format!("supplier {ghost}")));
        assert!(store.rows(Table::SupplierSubscriptions).await.is_empty());
    }

    #[tokio::test]
    async fn test_plans_sorted_with_savings() {
        let (_, svc, _, _) = setup().await;
        let plans = svc.plans().await.unwrap();
        assert_eq!(plans[0].plan.name_ar, "الباقة الأساسية");
        assert_eq!(plans[0].yearly_savings_percent, None);
        assert_eq!(plans[1].yearly_savings_percent, Some(Decimal::from(17)));
    }

    #[tokio::test]
    async fn test_permissions_only_for_active_subscriptions() {
        let (store, svc, supplier, plan) = setup().await;
        svc.create(request(supplier, plan, 1)).await.unwrap();
        store.seed(Table::SupplierSubscriptions, &json!({
            "supplier_id": Uuid::new_v4(), "plan_id": plan, "status": "expired",
        })).await;
        store.seed(Table::SupplierSubscriptions, &json!({
            "supplier_id": supplier, "plan_id": Uuid::new_v4(), "status": "active",
        })).await;

        let perms = svc.permissions().await.unwrap();
        assert_eq!(perms.len(), 2);
        let with_plan = perms.iter().find(|p| p.plan_name.is_some()).unwrap();
        assert!(with_plan.features.custom_domain && with_plan.features.driver_radar);
        assert_eq!(with_plan.max_products, PlanLimit::Unlimited);
        let orphan = perms.iter().find(|p| p.plan_name.is_none()).unwrap();
        assert_eq!(orphan.max_orders, PlanLimit::Max(0));
        assert!(!orphan.features.custom_domain);
    }
}
