use parley_protocol::LoadRequestId;
use strum::Display;

/// Single in-flight load token gating snapshot and replay responses.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HydrationGuard {
    #[default]
    Idle,
    Awaiting(LoadRequestId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accept,
    Drop(DropReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum DropReason {
    /// No id while a load is outstanding.
    Untagged,
    /// Answer to a load that has since been superseded.
    Mismatched,
    /// Tagged response after the load already finished.
    Late,
}

impl HydrationGuard {
    /// Start a new load, superseding any earlier one.
    pub fn begin(&mut self, load_request_id: LoadRequestId) {
        if let HydrationGuard::Awaiting(previous) = self {
            tracing::debug!(
                target: "parley.hydration",
                "Load {} superseded by {}",
                previous,
                load_request_id
            );
        }
        *self = HydrationGuard::Awaiting(load_request_id);
    }

    /// Decide whether a hydration response may touch state. Accepting the
    /// awaited response returns the guard to `Idle`.
    pub fn admit(&mut self, incoming: Option<&LoadRequestId>) -> Admission {
        let admission = match (&*self, incoming) {
            (HydrationGuard::Awaiting(expected), Some(id)) if expected == id => Admission::Accept,
            (HydrationGuard::Awaiting(_), Some(_)) => Admission::Drop(DropReason::Mismatched),
            (HydrationGuard::Awaiting(_), None) => Admission::Drop(DropReason::Untagged),
            (HydrationGuard::Idle, None) => Admission::Accept,
            (HydrationGuard::Idle, Some(_)) => Admission::Drop(DropReason::Late),
        };

        match admission {
            Admission::Accept => *self = HydrationGuard::Idle,
            Admission::Drop(reason) => {
                tracing::warn!(
                    target: "parley.hydration",
                    "Dropping hydration response ({}): incoming={:?} guard={:?}",
                    reason,
                    incoming.map(LoadRequestId::as_str),
                    self.awaiting().map(LoadRequestId::as_str)
                );
            }
        }
        admission
    }

    pub fn awaiting(&self) -> Option<&LoadRequestId> {
        match self {
            HydrationGuard::Awaiting(id) => Some(id),
            HydrationGuard::Idle => None,
        }
    }

    pub fn is_awaiting(&self) -> bool {
        matches!(self, HydrationGuard::Awaiting(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn awaiting(id: &str) -> HydrationGuard {
        HydrationGuard::Awaiting(LoadRequestId::from(id))
    }

    #[rstest]
    #[case::awaited_id(awaiting("load-7"), Some("load-7"), Admission::Accept, HydrationGuard::Idle)]
    #[case::other_id(
        awaiting("load-7"),
        Some("load-6"),
        Admission::Drop(DropReason::Mismatched),
        awaiting("load-7")
    )]
    #[case::untagged_while_awaiting(
        awaiting("load-7"),
        None,
        Admission::Drop(DropReason::Untagged),
        awaiting("load-7")
    )]
    #[case::late_tagged(
        HydrationGuard::Idle,
        Some("load-7"),
        Admission::Drop(DropReason::Late),
        HydrationGuard::Idle
    )]
    #[case::organic(HydrationGuard::Idle, None, Admission::Accept, HydrationGuard::Idle)]
    fn admission_table(
        #[case] mut guard: HydrationGuard,
        #[case] incoming: Option<&str>,
        #[case] expected: Admission,
        #[case] after: HydrationGuard,
    ) {
        let incoming = incoming.map(LoadRequestId::from);
        assert_eq!(guard.admit(incoming.as_ref()), expected);
        assert_eq!(guard, after);
    }

    #[test]
    fn begin_supersedes_earlier_load() {
        let mut guard = HydrationGuard::default();
        guard.begin(LoadRequestId::from("load-1"));
        guard.begin(LoadRequestId::from("load-2"));

        assert_eq!(
            guard.admit(Some(&LoadRequestId::from("load-1"))),
            Admission::Drop(DropReason::Mismatched)
        );
        assert_eq!(
            guard.admit(Some(&LoadRequestId::from("load-2"))),
            Admission::Accept
        );
        assert!(!guard.is_awaiting());
    }
}
