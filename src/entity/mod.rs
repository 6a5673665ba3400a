pub mod products;
pub mod purchased_items;
pub mod users;

pub use products::Entity as Products;
pub use purchased_items::Entity as PurchasedItems;
pub use users::Entity as Users;
