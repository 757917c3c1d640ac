use crossbeam_channel::Sender;
use strata_world::ChunkCoord;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChunkEvent {
    Ready(ChunkCoord),
    Unloaded(ChunkCoord),
}

/// Fire-and-forget receiver of provider notifications.
pub trait EventSink: Send + Sync {
    fn send(&self, event: ChunkEvent);
}

/// Drops every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn send(&self, _event: ChunkEvent) {}
}

impl EventSink for Sender<ChunkEvent> {
    fn send(&self, event: ChunkEvent) {
        // A hung-up receiver just means nobody is listening anymore.
        let _ = Sender::send(self, event);
    }
}
