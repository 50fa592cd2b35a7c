use shared::protocol::ServerEvent;
use tokio::sync::{broadcast, mpsc};
use tracker::TrackerInput;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) events: broadcast::Sender<ServerEvent>,
    pub(crate) inputs: mpsc::Sender<TrackerInput>,
}
