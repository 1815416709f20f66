//! The presentation collaborator.

use gozbruh_core::{Conflict, UserChoice};
use gozbruh_sync::NetworkEndpoint;

/// What the user sees.
///
/// Calls are synchronous: a transfer waits on [`Presenter::on_conflict`]
/// until the user decides.
pub trait Presenter: Send + Sync {
    /// The link to `endpoint` went up or down.
    fn on_status_changed(&self, connected: bool, endpoint: &NetworkEndpoint);

    /// Ask what to do about a drifted object.
    fn on_conflict(&self, conflict: &Conflict) -> UserChoice;

    /// A transfer failed.
    fn on_error(&self, message: &str);
}

/// Headless presenter: logs everything and skips every conflict.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn on_status_changed(&self, connected: bool, endpoint: &NetworkEndpoint) {
        tracing::info!(%endpoint, connected, "link status");
    }

    fn on_conflict(&self, conflict: &Conflict) -> UserChoice {
        tracing::warn!(
            object = %conflict.object_name,
            stored = %conflict.stored_durable_id,
            "name drifted from stored ID, skipping"
        );
        UserChoice::Skip
    }

    fn on_error(&self, message: &str) {
        tracing::error!("{}", message);
    }
}

impl<P: Presenter + ?Sized> Presenter for std::sync::Arc<P> {
    fn on_status_changed(&self, connected: bool, endpoint: &NetworkEndpoint) {
        (**self).on_status_changed(connected, endpoint)
    }

    fn on_conflict(&self, conflict: &Conflict) -> UserChoice {
        (**self).on_conflict(conflict)
    }

    fn on_error(&self, message: &str) {
        (**self).on_error(message)
    }
}
