//! Mock DMX adapter recording the frames it is sent.

use parking_lot::Mutex;
use roomctl_network::DmxFrame;
use std::sync::Arc;

use super::MockLink;
use crate::error::Result;
use crate::traits::DmxOutput;

#[derive(Debug, Default)]
struct DmxRecord {
    frames: u64,
    last: Option<Vec<u8>>,
    closed: bool,
}

/// Simulated USB-DMX adapter.
///
/// Unplugging it is simulated with `handle.link().set_reachable(false)`:
/// writes fail until it is reachable again.
#[derive(Debug)]
pub struct MockDmx {
    link: MockLink,
    record: Arc<Mutex<DmxRecord>>,
}

impl MockDmx {
    pub fn new() -> (Self, MockDmxHandle) {
        let link = MockLink::new("dmx");
        let record = Arc::new(Mutex::new(DmxRecord::default()));
        let handle = MockDmxHandle {
            link: link.clone(),
            record: Arc::clone(&record),
        };
        (Self { link, record }, handle)
    }
}

impl DmxOutput for MockDmx {
    async fn write_frame(&mut self, frame: &DmxFrame) -> Result<()> {
        self.link.exchange().await?;
        let mut record = self.record.lock();
        record.frames += 1;
        record.last = Some(frame.slots().to_vec());
        Ok(())
    }

    fn close(&mut self) {
        self.record.lock().closed = true;
    }
}

/// Inspection side of a [`MockDmx`].
#[derive(Debug, Clone)]
pub struct MockDmxHandle {
    link: MockLink,
    record: Arc<Mutex<DmxRecord>>,
}

impl MockDmxHandle {
    pub fn link(&self) -> &MockLink {
        &self.link
    }

    pub fn frames_written(&self) -> u64 {
        self.record.lock().frames
    }

    /// Value of DMX `channel` (1-based) in the last frame written.
    pub fn channel(&self, channel: usize) -> Option<u8> {
        let record = self.record.lock();
        let slots = record.last.as_ref()?;
        channel.checked_sub(1).and_then(|i| slots.get(i)).copied()
    }

    pub fn is_closed(&self) -> bool {
        self.record.lock().closed
    }
}
