//! Per-port source tracking and merge, grounded on
//! `original_source/components/merge_engine/merge_engine.c` and generalized
//! from its fixed two-port C array into a `parking_lot`-guarded map, in the
//! style of the teacher's `network::source::SourceManager`.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::MergeError;

/// Up to this many concurrent senders are tracked per port (spec §3).
pub const MAX_SOURCES: usize = 4;

/// Protocol half of a [`SourceKey`]. `DmxIn` is carried for forward
/// compatibility with a physical DMX input sink; nothing in this crate
/// produces it yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceProtocol {
    ArtNet,
    Sacn,
    DmxIn,
}

/// Identifies one contributing sender to a port's merge (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceKey {
    pub protocol: SourceProtocol,
    pub ip: IpAddr,
}

/// The configured merge algorithm for a port (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    Htp,
    Ltp,
    Last,
    Backup,
    Disable,
}

/// Normalized update handed from a receiver to the router to the engine.
#[derive(Debug, Clone)]
pub struct SourceUpdate {
    pub key: SourceKey,
    pub universe: u16,
    pub data: [u8; 512],
    pub sequence: u8,
    pub priority: u8,
    pub source_name: String,
}

/// One per-port source slot.
#[derive(Debug, Clone)]
pub struct Source {
    pub key: SourceKey,
    pub universe: u16,
    pub data: [u8; 512],
    pub last_seen_us: u64,
    pub sequence: u8,
    pub priority: u8,
    pub source_name: String,
    pub valid: bool,
}

impl Source {
    fn empty() -> Self {
        Self {
            key: SourceKey {
                protocol: SourceProtocol::ArtNet,
                ip: IpAddr::from([0, 0, 0, 0]),
            },
            universe: 0,
            data: [0u8; 512],
            last_seen_us: 0,
            sequence: 0,
            priority: 100,
            source_name: String::new(),
            valid: false,
        }
    }
}

/// Monotonic microsecond clock, pluggable so tests can advance time without
/// sleeping (spec scenario S2/S3 "advance time 3000ms").
pub trait Clock: Send + Sync {
    fn now_us(&self) -> u64;
}

/// Default clock: microseconds elapsed since the clock was constructed.
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

/// Test clock that only moves when told to.
#[cfg(test)]
pub struct ManualClock(AtomicU64);

#[cfg(test)]
impl ManualClock {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn advance_ms(&self, ms: u64) {
        self.0.fetch_add(ms * 1000, Ordering::SeqCst);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now_us(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Monotonic counters per port (spec §4.4 "Statistics").
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PortStats {
    pub total_merges: u64,
    pub htp_merges: u64,
    pub ltp_merges: u64,
    pub last_merges: u64,
    pub backup_switches: u64,
    pub source_timeouts: u64,
}

struct PortContext {
    mode: MergeMode,
    timeout_us: u64,
    sources: [Source; MAX_SOURCES],
    source_count: usize,
    primary_index: Option<usize>,
    merged: [u8; 512],
    output_active: bool,
    stats: PortStats,
}

impl PortContext {
    fn new() -> Self {
        Self {
            mode: MergeMode::Htp,
            timeout_us: crate::config::DEFAULT_TIMEOUT_MS as u64 * 1000,
            sources: std::array::from_fn(|_| Source::empty()),
            source_count: 0,
            primary_index: None,
            merged: [0u8; 512],
            output_active: false,
            stats: PortStats::default(),
        }
    }

    /// Timeout sweep, per spec §4.4: runs before every merge. Leaves
    /// `primary_index` pointing at the now-invalid slot: `merge()`'s BACKUP
    /// branch needs to see the stale index to count the failover it causes.
    fn sweep_timeouts(&mut self, now_us: u64) {
        for i in 0..self.source_count {
            let s = &mut self.sources[i];
            if s.valid && now_us.saturating_sub(s.last_seen_us) > self.timeout_us {
                s.valid = false;
                self.stats.source_timeouts += 1;
            }
        }
    }

    fn push(&mut self, update: SourceUpdate, now_us: u64) -> Result<(), ()> {
        // 1. Matching valid slot.
        for i in 0..self.source_count {
            if self.sources[i].valid && self.sources[i].key == update.key {
                self.refresh_slot(i, update, now_us);
                return Ok(());
            }
        }
        // 2. Invalid or timed-out slot to reuse (staleness is judged by
        //    elapsed time here, not just the `valid` flag, so this slot is
        //    available even if no `get_output`/`list_active` call has run
        //    a sweep yet).
        for i in 0..self.source_count {
            let stale = !self.sources[i].valid
                || now_us.saturating_sub(self.sources[i].last_seen_us) > self.timeout_us;
            if stale {
                if self.sources[i].valid {
                    self.sources[i].valid = false;
                    self.stats.source_timeouts += 1;
                }
                self.refresh_slot(i, update, now_us);
                return Ok(());
            }
        }
        // 3. Fresh slot if there's room.
        if self.source_count < MAX_SOURCES {
            let i = self.source_count;
            self.source_count += 1;
            self.refresh_slot(i, update, now_us);
            return Ok(());
        }
        // 4. Full.
        Err(())
    }

    fn refresh_slot(&mut self, i: usize, update: SourceUpdate, now_us: u64) {
        let s = &mut self.sources[i];
        s.key = update.key;
        s.universe = update.universe;
        s.data = update.data;
        s.last_seen_us = now_us;
        s.sequence = update.sequence;
        s.priority = update.priority;
        s.source_name = update.source_name;
        s.valid = true;
    }

    /// Immediately invalidate the slot for `key`, if present and valid.
    /// Used for sACN Stream Terminated (spec §4.2). Leaves `primary_index`
    /// untouched for the same reason as `sweep_timeouts`.
    fn invalidate(&mut self, key: SourceKey) {
        for i in 0..self.source_count {
            if self.sources[i].valid && self.sources[i].key == key {
                self.sources[i].valid = false;
                self.stats.source_timeouts += 1;
                return;
            }
        }
    }

    fn valid_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.source_count).filter(|&i| self.sources[i].valid)
    }

    fn merge(&mut self) {
        self.stats.total_merges += 1;
        let active: Vec<usize> = self.valid_indices().collect();
        self.output_active = !active.is_empty();

        if active.is_empty() {
            self.merged = [0u8; 512];
            self.primary_index = None;
            return;
        }

        match self.mode {
            MergeMode::Htp => {
                self.stats.htp_merges += 1;
                let mut out = [0u8; 512];
                for &i in &active {
                    let s = &self.sources[i];
                    for c in 0..512 {
                        out[c] = out[c].max(s.data[c]);
                    }
                }
                self.merged = out;
            }
            MergeMode::Ltp => {
                self.stats.ltp_merges += 1;
                let mut out = [0xFFu8; 512];
                for &i in &active {
                    let s = &self.sources[i];
                    for c in 0..512 {
                        out[c] = out[c].min(s.data[c]);
                    }
                }
                self.merged = out;
            }
            MergeMode::Last => {
                self.stats.last_merges += 1;
                let latest = active
                    .iter()
                    .copied()
                    .max_by_key(|&i| self.sources[i].last_seen_us)
                    .expect("active is non-empty");
                self.merged = self.sources[latest].data;
            }
            MergeMode::Backup => {
                let primary = match self.primary_index {
                    Some(i) if self.sources[i].valid => i,
                    _ => {
                        let new_primary = active[0];
                        if self.primary_index.is_some() {
                            self.stats.backup_switches += 1;
                        }
                        self.primary_index = Some(new_primary);
                        new_primary
                    }
                };
                self.merged = self.sources[primary].data;
            }
            MergeMode::Disable => {
                let first = active[0];
                self.merged = self.sources[first].data;
            }
        }
    }

    fn blackout(&mut self) {
        for i in 0..self.source_count {
            self.sources[i].valid = false;
        }
        self.source_count = 0;
        self.merged = [0u8; 512];
        self.output_active = false;
        self.primary_index = None;
    }
}

/// Owns one [`PortContext`] per configured port behind its own lock, per
/// spec §4.4 "Concurrency": the mutex is never held across a socket or sink
/// call.
pub struct MergeEngine {
    ports: HashMap<u8, Mutex<PortContext>>,
    clock: Arc<dyn Clock>,
}

impl MergeEngine {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let mut ports = HashMap::new();
        ports.insert(1, Mutex::new(PortContext::new()));
        ports.insert(2, Mutex::new(PortContext::new()));
        Self { ports, clock }
    }

    fn port(&self, port: u8) -> Result<&Mutex<PortContext>, MergeError> {
        self.ports.get(&port).ok_or(MergeError::InvalidPort(port))
    }

    /// Sets merge mode and per-port timeout (clamped to a 100ms minimum,
    /// spec §4.4).
    pub fn configure(&self, port: u8, mode: MergeMode, timeout_ms: u32) -> Result<(), MergeError> {
        let mut ctx = self.port(port)?.lock();
        ctx.mode = mode;
        ctx.timeout_us = (timeout_ms.max(crate::config::MIN_TIMEOUT_MS) as u64) * 1000;
        Ok(())
    }

    /// Inserts or refreshes a source slot for `port` (spec §4.4 admission
    /// algorithm).
    pub fn push(&self, port: u8, update: SourceUpdate) -> Result<(), MergeError> {
        let now_us = self.clock.now_us();
        let mut ctx = self.port(port)?.lock();
        ctx.push(update, now_us).map_err(|_| MergeError::Full(port))
    }

    /// Immediately invalidates the source slot matching `key` on `port`,
    /// without waiting for the timeout sweep. Used for sACN Stream
    /// Terminated (spec §4.2).
    pub fn invalidate_source(&self, port: u8, key: SourceKey) -> Result<(), MergeError> {
        let mut ctx = self.port(port)?.lock();
        ctx.invalidate(key);
        Ok(())
    }

    /// Sweeps timeouts, runs the merge, and returns a copy of the merged
    /// buffer plus whether any source contributed (spec §4.4).
    pub fn get_output(&self, port: u8) -> Result<([u8; 512], bool), MergeError> {
        let now_us = self.clock.now_us();
        let mut ctx = self.port(port)?.lock();
        ctx.sweep_timeouts(now_us);
        ctx.merge();
        Ok((ctx.merged, ctx.output_active))
    }

    /// Invalidates all sources and zeros the merged buffer (spec §3
    /// "Explicit blackout").
    pub fn blackout(&self, port: u8) -> Result<(), MergeError> {
        let mut ctx = self.port(port)?.lock();
        ctx.blackout();
        Ok(())
    }

    /// Snapshot of currently-valid sources, after a timeout sweep.
    pub fn list_active(&self, port: u8) -> Result<Vec<Source>, MergeError> {
        let now_us = self.clock.now_us();
        let mut ctx = self.port(port)?.lock();
        ctx.sweep_timeouts(now_us);
        Ok(ctx
            .valid_indices()
            .map(|i| ctx.sources[i].clone())
            .collect())
    }

    pub fn stats(&self, port: u8) -> Result<PortStats, MergeError> {
        let ctx = self.port(port)?.lock();
        Ok(ctx.stats)
    }

    pub fn reset_stats(&self, port: u8) -> Result<(), MergeError> {
        let mut ctx = self.port(port)?.lock();
        ctx.stats = PortStats::default();
        Ok(())
    }
}
