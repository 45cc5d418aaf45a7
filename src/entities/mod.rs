pub mod alert_snooze;
pub mod customer;
pub mod document;
pub mod ledger_entry;
pub mod line_item;
pub mod organization;
pub mod organization_settings;
pub mod product;
pub mod user;

pub use alert_snooze::AlertCategory;
pub use document::{DocumentKind, DocumentStatus};
pub use ledger_entry::EntryType;
