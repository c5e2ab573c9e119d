use std::fmt;

/// Состояние форвардера.
///
/// `Init → Bound → Relaying`, из `Init`/`Bound`/`Relaying` возможен переход в
/// терминальный `Failed`. `Stopped` терминален и означает штатную остановку
/// по отмене.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForwarderState {
    Init,
    Bound,
    Relaying,
    Failed,
    Stopped,
}

impl ForwarderState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Stopped)
    }

    /// Допустим ли переход `self → next`.
    pub fn can_transition_to(
        self,
        next: ForwarderState,
    ) -> bool {
        use ForwarderState::*;
        matches!(
            (self, next),
            (Init, Bound)
                | (Bound, Relaying)
                | (Init | Bound | Relaying, Failed)
                | (Init | Bound | Relaying, Stopped)
        )
    }
}

impl fmt::Display for ForwarderState {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let s = match self {
            Self::Init => "INIT",
            Self::Bound => "BOUND",
            Self::Relaying => "RELAYING",
            Self::Failed => "FAILED",
            Self::Stopped => "STOPPED",
        };
        f.write_str(s)
    }
}
