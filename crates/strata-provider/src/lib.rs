//! Local chunk provider: relevance tracking, near cache over a far store,
//! readiness propagation, and eviction.
#![forbid(unsafe_code)]

mod config;
mod events;
mod provider;
mod region;
mod shared;

pub use config::ProviderConfig;
pub use events::{ChunkEvent, EventSink, NullSink};
pub use provider::{LocalChunkProvider, ProviderStats};
pub use region::{Observer, ObserverId, RegionListener, RelevanceRegion};
