pub mod alerts;
pub mod digest;
pub mod documents;
pub mod snooze;
pub mod stock;

pub use alerts::AlertService;
pub use digest::DigestJob;
pub use documents::DocumentService;
pub use snooze::SnoozeService;
pub use stock::StockLedger;
