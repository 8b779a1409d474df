/// State of the task instance.
pub mod instance {
    /// Set if the instance is queued and has not started yet.
    pub const WAITING: usize = 1 << 0;

    /// Set if the instance is running (including while suspended).
    pub const RUNNING: usize = 1 << 1;

    /// Set if the instance ran to completion, successfully or with an error.
    pub const FINISHED: usize = 1 << 2;

    /// Set if the instance was canceled after it started.
    pub const CANCELED: usize = 1 << 3;

    /// Set if the instance was canceled before it could start.
    pub const DROPPED: usize = 1 << 4;
}

/// State of the coroutine driver behind an instance.
pub(crate) mod driver {
    /// The body has not been invoked yet.
    pub(crate) const BEFORE_CREATE: usize = 1 << 1;

    /// The body is suspended and can take another step.
    pub(crate) const HAS_MORE_VALUES: usize = 1 << 2;

    /// The body returned or unwound; only finalization remains.
    pub(crate) const DONE: usize = 1 << 3;
}
