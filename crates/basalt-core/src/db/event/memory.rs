use crate::db::event::{EntityChangeEvent, EventSink, PublishOutcome};
use parking_lot::Mutex;

///
/// InProcSink
///
/// In-process event buffer: the `inproc` config choice and the harness
/// sink. Can be switched into a refusing mode to exercise outbox paths.
///

#[derive(Default)]
pub struct InProcSink {
    refuse: Mutex<Option<PublishOutcome>>,
    events: Mutex<Vec<EntityChangeEvent>>,
}

impl InProcSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that refuses every publish with `Retryable`.
    #[must_use]
    pub fn refusing() -> Self {
        Self {
            refuse: Mutex::new(Some(PublishOutcome::Retryable)),
            events: Mutex::new(Vec::new()),
        }
    }

    /// Change the refusal mode; `None` accepts again.
    pub fn set_refusal(&self, outcome: Option<PublishOutcome>) {
        *self.refuse.lock() = outcome;
    }

    /// Drain and return everything accepted so far.
    #[must_use]
    pub fn take(&self) -> Vec<EntityChangeEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for InProcSink {
    fn publish(&self, event: &EntityChangeEvent) -> PublishOutcome {
        if let Some(outcome) = *self.refuse.lock() {
            return outcome;
        }

        self.events.lock().push(event.clone());

        PublishOutcome::Ack
    }
}

///
/// TESTS
///
