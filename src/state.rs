use std::sync::Arc;

use crate::{
    config::Config, identity::IdentityProvider, notify::Notifier, store::ClubStore,
    tracker::PuzzleTracker,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ClubStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub notifier: Arc<dyn Notifier>,
    pub tracker: PuzzleTracker,
    pub config: Config,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ClubStore>,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn Notifier>,
        config: Config,
    ) -> Self {
        let tracker = PuzzleTracker::new(store.clone(), config.answer_match);
        Self {
            store,
            identity,
            notifier,
            tracker,
            config,
        }
    }
}
