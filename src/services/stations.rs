use crate::wifi_client::{StationEvent, StationEventObserver};
use log::info;
use std::sync::Arc;
use tokio::{sync::mpsc, task::JoinHandle};

/// Channel-backed observer handed to the radio.
///
/// The radio invokes it from its own delivery context; the observer only
/// enqueues, and the logging sink on the runtime is the single consumer.
pub struct StationEventQueue {
    events: mpsc::UnboundedSender<StationEvent>,
}

impl StationEventObserver for StationEventQueue {
    fn on_station_event(&self, event: StationEvent) {
        // Send only fails once the sink is gone, at which point the event
        // has nowhere to go anyway
        let _ = self.events.send(event);
    }
}

/// Creates the observer and its receiving end.
pub fn station_event_queue() -> (Arc<StationEventQueue>, mpsc::UnboundedReceiver<StationEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(StationEventQueue { events: tx }), rx)
}

/// Spawns the logging sink draining station events.
///
/// The task ends when the radio drops its observer registration.
pub fn spawn_station_logger(mut events: mpsc::UnboundedReceiver<StationEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if event.joined {
                info!("station {} join, aid={}", event.mac, event.aid);
            } else {
                info!("station {} leave, aid={}", event.mac, event.aid);
            }
        }
    })
}
