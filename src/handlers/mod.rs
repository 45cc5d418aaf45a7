pub mod alerts;
pub mod common;
pub mod documents;

use crate::services::{AlertService, DocumentService, SnoozeService};

/// Service bundle shared by every handler through [`crate::AppState`].
#[derive(Clone)]
pub struct AppServices {
    pub documents: DocumentService,
    pub alerts: AlertService,
    pub snoozes: SnoozeService,
}
