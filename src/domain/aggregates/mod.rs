//! Aggregates module
pub mod billing;
pub mod cart;
pub mod order;
pub mod product;
pub mod session;
pub mod storefront;
pub mod subscription;
pub mod supplier;

pub use billing::{Contract, ContractCounts, ContractStatus, Invoice, InvoiceFilter, InvoiceStatus, InvoiceSummary};
pub use cart::{
    compute_totals, Cart, CartError, CartItem, CartTotals, NewCartItem, MAX_LINE_QUANTITY, MAX_UNIT_PRICE, VAT_RATE,
};
pub use order::{CheckoutDetails, LineItem, Order, OrderError, OrderFilter, OrderRecord, OrderStatus, PaymentMethod};
pub use product::{filter_products, Product, ProductFilter, Selection, StockState};
pub use session::{Region, SessionError, ShopperSession, REGIONS};
pub use storefront::{Storefront, StorefrontDraft, StorefrontError, StorefrontRecord, StorefrontStats, StorefrontStatus, SupportTicket};
pub use supplier::{Category, Supplier, SupplierNames};
pub use subscription::{PlanLimit, SubscriptionError, SubscriptionPlan, SupplierPermissions, SupplierSubscription};
