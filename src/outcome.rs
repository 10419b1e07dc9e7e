/// Control signal threaded through every recursive search.
///
/// Callbacks answer with `Continue` or `Stop`. A search returns `Stop` when a
/// callback asked for it and `Exhausted` when its search tree ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Continue,
    Stop,
    Exhausted,
}

impl SearchOutcome {
    pub fn is_stop(self) -> bool {
        self == SearchOutcome::Stop
    }

    pub fn from_continue(cont: bool) -> Self {
        if cont {
            SearchOutcome::Continue
        } else {
            SearchOutcome::Stop
        }
    }
}
