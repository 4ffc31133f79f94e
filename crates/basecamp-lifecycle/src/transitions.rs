//! The workspace state machine's permitted-transition table. Separated
//! from [`crate::engine`] so the table itself — the part a reviewer
//! actually needs to check — reads as one flat match rather than being
//! interleaved with provider calls.

use basecamp_storage::WorkspaceState;

/// The event a command maps to, for matching against the transition
/// table. Distinct from [`crate::types::LifecycleCommand`] because
/// `Apply`/`Rollback` are side-effect-only: they don't change `state` in
/// the table, so they're represented by their own event variant that
/// `permitted_transition` always accepts from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// `(none) -> requested`.
    Launch,
    /// `requested -> provisioning`.
    BeginProvisioning,
    /// The provider-call the engine kicked off for this command landed
    /// in its resting state: `provisioning -> running`, `stopping ->
    /// stopped`, or `hibernating -> hibernated`, depending on `from`.
    Settled,
    /// `provisioning -> provisioning_failed`.
    ProvisioningFailed,
    /// `running -> stopping`.
    Stop,
    /// `running -> hibernating`.
    Hibernate,
    /// `stopped -> running`.
    Start,
    /// `hibernated -> running`.
    Resume,
    /// `{requested, provisioning, running, stopped, hibernated} ->
    /// terminating`. Always accepted outside of `terminating`/terminal
    /// states; pre-empts an in-flight launch.
    Terminate,
    /// `terminating -> terminated`.
    ProviderReportsTerminated,
    /// Provider reports the instance gone without the engine having
    /// initiated termination.
    TerminatedUnexpectedly,
    /// Provider reports an error state, or polling exceeded its deadline.
    Stuck,
    /// `Apply`/`Rollback`: side effect only, no state change.
    SideEffect,
}

/// The command name used in [`crate::error::LifecycleError::IllegalTransition`]
/// messages.
impl LifecycleEvent {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Launch => "Launch",
            Self::BeginProvisioning => "BeginProvisioning",
            Self::Settled => "Settled",
            Self::ProvisioningFailed => "ProvisioningFailed",
            Self::Stop => "Stop",
            Self::Hibernate => "Hibernate",
            Self::Start => "Start",
            Self::Resume => "Resume",
            Self::Terminate => "Terminate",
            Self::ProviderReportsTerminated => "ProviderReportsTerminated",
            Self::TerminatedUnexpectedly => "TerminatedUnexpectedly",
            Self::Stuck => "Stuck",
            Self::SideEffect => "Apply/Rollback",
        }
    }
}

/// Look up the state `event` transitions a workspace in state `from` to.
///
/// Returns `None` when the table has no entry — the caller should treat
/// this as an illegal transition. `Apply`/`Rollback` ([`LifecycleEvent::SideEffect`])
/// are permitted from any non-terminal state and return `from` unchanged.
#[must_use]
pub fn next_state(from: WorkspaceState, event: LifecycleEvent) -> Option<WorkspaceState> {
    use WorkspaceState::{
        Hibernated, Hibernating, Provisioning, ProvisioningFailed, Requested, Running, Stopped,
        Stopping, Stuck, Terminated, Terminating, TerminatedUnexpectedly,
    };

    if event == LifecycleEvent::SideEffect {
        return if from.is_terminal() { None } else { Some(from) };
    }

    match (from, event) {
        (Requested, LifecycleEvent::BeginProvisioning) => Some(Provisioning),
        (Provisioning, LifecycleEvent::Settled) => Some(Running),
        (Provisioning, LifecycleEvent::ProvisioningFailed) => Some(ProvisioningFailed),
        (Running, LifecycleEvent::Stop) => Some(Stopping),
        (Stopping, LifecycleEvent::Settled) => Some(Stopped),
        (Running, LifecycleEvent::Hibernate) => Some(Hibernating),
        (Hibernating, LifecycleEvent::Settled) => Some(Hibernated),
        (Stopped, LifecycleEvent::Start) => Some(Running),
        (Hibernated, LifecycleEvent::Resume) => Some(Running),
        (
            Requested | Provisioning | Running | Stopped | Hibernated,
            LifecycleEvent::Terminate,
        ) => Some(Terminating),
        (Terminating, LifecycleEvent::ProviderReportsTerminated) => Some(Terminated),
        (Running | Provisioning | Stopped | Hibernated, LifecycleEvent::Stuck) => Some(Stuck),
        (Running, LifecycleEvent::TerminatedUnexpectedly) => Some(TerminatedUnexpectedly),
        _ => None,
    }
}

/// Whether `event` is permitted from `from` at all, without computing the
/// resulting state.
#[must_use]
pub fn is_permitted(from: WorkspaceState, event: LifecycleEvent) -> bool {
    next_state(from, event).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use LifecycleEvent::{Hibernate, Resume, SideEffect, Start, Stop, Terminate};
    use WorkspaceState::{Hibernated, Provisioning, Requested, Running, Stopped, Terminated};

    #[test]
    fn launch_sequence_reaches_running() {
        assert_eq!(next_state(Requested, LifecycleEvent::BeginProvisioning), Some(Provisioning));
        assert_eq!(next_state(Provisioning, LifecycleEvent::Settled), Some(Running));
    }

    #[test]
    fn stop_then_start_round_trips() {
        let stopping = next_state(Running, Stop).unwrap();
        let stopped = next_state(stopping, LifecycleEvent::Settled).unwrap();
        assert_eq!(stopped, Stopped);
        assert_eq!(next_state(stopped, Start), Some(Running));
    }

    #[test]
    fn hibernate_then_resume_round_trips() {
        let hibernating = next_state(Running, Hibernate).unwrap();
        let hibernated = next_state(hibernating, LifecycleEvent::Settled).unwrap();
        assert_eq!(hibernated, Hibernated);
        assert_eq!(next_state(hibernated, Resume), Some(Running));
    }

    #[test]
    fn terminate_reachable_from_every_non_terminal_state() {
        for state in [Requested, Provisioning, Running, Stopped, Hibernated] {
            assert!(is_permitted(state, Terminate), "{state:?} should accept Terminate");
        }
    }

    #[test]
    fn terminate_not_reachable_from_terminal_states() {
        assert!(!is_permitted(Terminated, Terminate));
        assert!(!is_permitted(WorkspaceState::ProvisioningFailed, Terminate));
    }

    #[test]
    fn side_effect_permitted_from_any_non_terminal_state() {
        for state in [Requested, Provisioning, Running, Stopped, Hibernated] {
            assert_eq!(next_state(state, SideEffect), Some(state));
        }
        assert_eq!(next_state(Terminated, SideEffect), None);
    }

    #[test]
    fn hibernate_illegal_from_stopped() {
        assert!(!is_permitted(Stopped, Hibernate));
    }

    #[test]
    fn start_illegal_from_running() {
        assert!(!is_permitted(Running, Start));
    }
}
