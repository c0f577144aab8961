//! Business logic layer; handlers stay thin and call in here.

pub mod cart;
pub mod checkout;
pub mod factors;
pub mod inventory;
pub mod invoices;
pub mod pricing;
pub mod store_products;

pub use cart::CartService;
pub use checkout::CheckoutService;
pub use factors::FactorService;
pub use inventory::StockService;
pub use invoices::InvoiceService;
pub use pricing::PricingService;
pub use store_products::StoreProductService;
