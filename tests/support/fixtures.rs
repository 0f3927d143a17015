//! Collaborators that journal every call so tests can check ordering.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use sonocheck::audio::{AcquireError, AudioSource, SignalSource, SignalSpec, SignalStream};
use sonocheck::calibration::Calibration;
use sonocheck::diagnostics::{MachineProfile, builtin_catalog, find_profile};
use sonocheck::session::{HistoryRecord, Session, SessionEvents};
use sonocheck::storage::{MemoryStore, Persistence, StorageError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Call {
    Acquire,
    Release,
    Append,
}

pub type Journal = Rc<RefCell<Vec<Call>>>;

pub struct JournaledSource {
    pub inner: SignalSource,
    journal: Journal,
}

impl AudioSource for JournaledSource {
    type Stream = SignalStream;

    fn acquire(&mut self) -> Result<SignalStream, AcquireError> {
        let stream = self.inner.acquire()?;
        self.journal.borrow_mut().push(Call::Acquire);
        Ok(stream)
    }

    fn release(&mut self, stream: SignalStream) {
        self.journal.borrow_mut().push(Call::Release);
        self.inner.release(stream);
    }
}

pub struct JournaledStore {
    pub inner: MemoryStore,
    pub fail_appends: bool,
    journal: Journal,
}

impl Persistence for JournaledStore {
    fn load_calibration(&self) -> Result<Calibration, StorageError> {
        self.inner.load_calibration()
    }

    fn save_calibration(&mut self, calibration: Calibration) -> Result<(), StorageError> {
        self.inner.save_calibration(calibration)
    }

    fn load_history(&self) -> Result<Vec<HistoryRecord>, StorageError> {
        self.inner.load_history()
    }

    fn append_history(
        &mut self,
        record: HistoryRecord,
    ) -> Result<Vec<HistoryRecord>, StorageError> {
        self.journal.borrow_mut().push(Call::Append);
        if self.fail_appends {
            return Err(StorageError::NoConfigDir);
        }
        self.inner.append_history(record)
    }

    fn clear_history(&mut self) -> Result<(), StorageError> {
        self.inner.clear_history()
    }
}

pub type TestSession = Session<JournaledSource, JournaledStore>;

pub fn journaled_session(spec: SignalSpec) -> (TestSession, Journal) {
    let journal: Journal = Rc::default();
    let source = JournaledSource {
        inner: SignalSource::new(spec),
        journal: journal.clone(),
    };
    let store = JournaledStore {
        inner: MemoryStore::new(),
        fail_appends: false,
        journal: journal.clone(),
    };
    (Session::new(source, store), journal)
}

pub fn motor() -> MachineProfile {
    let catalog = builtin_catalog();
    find_profile(&catalog, "induction-motor")
        .cloned()
        .expect("built-in motor profile")
}

pub fn history_len(session: &TestSession) -> usize {
    session.persistence().inner.len()
}

/// Advance in `step` increments from `start` up to and including `until`,
/// collecting every event summary.
pub fn drive(
    session: &mut TestSession,
    start: Instant,
    step: Duration,
    until: Duration,
) -> Vec<SessionEvents> {
    let mut events = Vec::new();
    let mut elapsed = Duration::ZERO;
    while elapsed <= until {
        events.push(session.advance(start + elapsed));
        elapsed += step;
    }
    events
}
