//! Multi-source merge engine: one [`engine::PortContext`] per physical DMX
//! port, reached through [`engine::MergeEngine`].

mod engine;

pub use engine::{
    Clock, MergeEngine, MergeMode, MonotonicClock, PortStats, Source, SourceKey, SourceProtocol,
    SourceUpdate, MAX_SOURCES,
};

#[cfg(test)]
pub use engine::ManualClock;
