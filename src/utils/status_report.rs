// status_report publishes instance lifecycle events.
// if feature status-report is enabled, events go out over an unbounded channel,
// otherwise reporting compiles down to nothing.
use crate::prelude::*;

cfg_status_report!(
    use smol::channel::{unbounded, Receiver as AsyncReceiver, Sender as AsyncSender, TryRecvError};
);

/// Lifecycle transitions worth reporting.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Lifecycle {
    Performed,
    Started,
    Succeeded,
    Errored,
    Canceled,
    Dropped,
}

/// Where an instance reports its lifecycle.
#[derive(Clone, Default)]
pub(crate) struct StatusSink {
    #[cfg(feature = "status-report")]
    sender: Option<AsyncSender<PublicEvent>>,
}

impl StatusSink {
    #[cfg(feature = "status-report")]
    pub(crate) fn channel() -> (StatusSink, StatusReporter) {
        let (sender, receiver) = unbounded();
        (
            StatusSink {
                sender: Some(sender),
            },
            StatusReporter::new(receiver),
        )
    }

    #[cfg(feature = "status-report")]
    pub(crate) fn report(&self, lifecycle: Lifecycle, task_name: &str, instance_id: InstanceId) {
        if let Some(sender) = self.sender.as_ref() {
            let event = PublicEvent::new(lifecycle, task_name, instance_id);
            if let Err(e) = sender.try_send(event) {
                debug!("status report dropped: {}", e);
            }
        }
    }

    #[cfg(not(feature = "status-report"))]
    #[inline(always)]
    pub(crate) fn report(
        &self,
        _lifecycle: Lifecycle,
        _task_name: &str,
        _instance_id: InstanceId,
    ) {
    }
}

cfg_status_report!(
    /// Receiving end of a task's lifecycle events.
    #[derive(Debug, Clone)]
    pub struct StatusReporter {
        inner: AsyncReceiver<PublicEvent>,
    }

    impl StatusReporter {
        /// Take the next event without waiting.
        pub fn next_public_event(&self) -> Result<PublicEvent, TryRecvError> {
            self.inner.try_recv()
        }

        /// Wait for the next event; `None` once every sender is gone.
        pub async fn next_public_event_with_async_wait(&self) -> Option<PublicEvent> {
            self.inner.recv().await.ok()
        }

        pub(crate) fn new(inner: AsyncReceiver<PublicEvent>) -> Self {
            Self { inner }
        }
    }

    /// A lifecycle event: the task name and the instance id.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum PublicEvent {
        Performed(String, InstanceId),
        Started(String, InstanceId),
        Succeeded(String, InstanceId),
        Errored(String, InstanceId),
        Canceled(String, InstanceId),
        /// Canceled before it started.
        Dropped(String, InstanceId),
    }

    impl PublicEvent {
        fn new(lifecycle: Lifecycle, task_name: &str, instance_id: InstanceId) -> Self {
            let task_name = task_name.to_string();
            match lifecycle {
                Lifecycle::Performed => PublicEvent::Performed(task_name, instance_id),
                Lifecycle::Started => PublicEvent::Started(task_name, instance_id),
                Lifecycle::Succeeded => PublicEvent::Succeeded(task_name, instance_id),
                Lifecycle::Errored => PublicEvent::Errored(task_name, instance_id),
                Lifecycle::Canceled => PublicEvent::Canceled(task_name, instance_id),
                Lifecycle::Dropped => PublicEvent::Dropped(task_name, instance_id),
            }
        }

        pub fn instance_id(&self) -> InstanceId {
            match self {
                PublicEvent::Performed(_, id)
                | PublicEvent::Started(_, id)
                | PublicEvent::Succeeded(_, id)
                | PublicEvent::Errored(_, id)
                | PublicEvent::Canceled(_, id)
                | PublicEvent::Dropped(_, id) => *id,
            }
        }
    }
);
