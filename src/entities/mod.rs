//! SeaORM entities for the marketplace core.

pub mod cart_line;
pub mod factor;
pub mod factor_item;
pub mod invoice;
pub mod invoice_item;
pub mod order_state;
pub mod store_product;
pub mod store_product_discount;

pub use cart_line::Entity as CartLine;
pub use factor::Entity as Factor;
pub use factor_item::Entity as FactorItem;
pub use invoice::Entity as Invoice;
pub use invoice_item::Entity as InvoiceItem;
pub use order_state::{OrderAction, OrderState};
pub use store_product::Entity as StoreProduct;
pub use store_product_discount::{DiscountType, Entity as StoreProductDiscount};
