pub const ANALYZE_LABEL: &str = "Analyze";
pub const ANALYZING_LABEL: &str = "Analyzing...";
pub const NO_FILE_MESSAGE: &str = "Please select a file to analyze!";

/// Identifies one submission. Completions carrying an older ticket are stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitState {
    Idle,
    Analyzing(Ticket),
}

/// State of the "Analyze" control.
#[derive(Debug)]
pub struct Submitter {
    state: SubmitState,
    issued: u64,
}

impl Default for Submitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Submitter {
    pub fn new() -> Self {
        Self {
            state: SubmitState::Idle,
            issued: 0,
        }
    }

    pub fn state(&self) -> SubmitState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state, SubmitState::Analyzing(_))
    }

    pub fn button_label(&self) -> &'static str {
        match self.state {
            SubmitState::Idle => ANALYZE_LABEL,
            SubmitState::Analyzing(_) => ANALYZING_LABEL,
        }
    }

    /// Idle -> Analyzing. A submission already in flight becomes stale.
    pub fn begin(&mut self) -> Ticket {
        self.issued += 1;
        let ticket = Ticket(self.issued);
        self.state = SubmitState::Analyzing(ticket);
        ticket
    }

    /// Analyzing -> Idle, if `ticket` is the current submission.
    ///
    /// Returns false for stale tickets, which leave the state alone.
    pub fn finish(&mut self, ticket: Ticket) -> bool {
        match self.state {
            SubmitState::Analyzing(current) if current == ticket => {
                self.state = SubmitState::Idle;
                true
            }
            _ => false,
        }
    }

    /// Back to Idle without waiting. Whatever is in flight becomes stale.
    pub fn abandon(&mut self) {
        self.state = SubmitState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_analyzing_idle() {
        let mut s = Submitter::new();
        assert_eq!(s.button_label(), ANALYZE_LABEL);
        assert!(!s.is_busy());

        let t = s.begin();
        assert_eq!(s.button_label(), ANALYZING_LABEL);
        assert_eq!(s.state(), SubmitState::Analyzing(t));

        assert!(s.finish(t));
        assert_eq!(s.button_label(), ANALYZE_LABEL);
        assert_eq!(s.state(), SubmitState::Idle);
    }

    #[test]
    fn stale_ticket_is_ignored() {
        let mut s = Submitter::new();
        let first = s.begin();
        let second = s.begin();
        assert_ne!(first, second);

        assert!(!s.finish(first));
        assert_eq!(s.button_label(), ANALYZING_LABEL);

        assert!(s.finish(second));
        assert_eq!(s.button_label(), ANALYZE_LABEL);
    }

    #[test]
    fn abandoned_submission_goes_stale() {
        let mut s = Submitter::new();
        let t = s.begin();
        s.abandon();
        assert_eq!(s.button_label(), ANALYZE_LABEL);

        let next = s.begin();
        assert!(!s.finish(t));
        assert!(s.finish(next));
    }

    #[test]
    fn finishing_twice_is_a_noop() {
        let mut s = Submitter::new();
        let t = s.begin();
        assert!(s.finish(t));
        assert!(!s.finish(t));
        assert_eq!(s.state(), SubmitState::Idle);
    }
}
