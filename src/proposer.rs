use crate::ballot::{self, Ballot};
use crate::messages::{Accept, Accepted, Prepare, Promise};
use crate::value::{Value, ValueSource};

/// Outcome of an iteration: the value a quorum accepted under `ballot`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decision {
    pub iteration: u64,
    pub ballot: Ballot,
    pub value: Value,
}

/// Phase of the proposer within an iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No attempt started yet
    Idle,
    /// PREPARE sent, collecting PROMISE replies
    Preparing,
    /// ACCEPT sent, collecting ACCEPTED replies
    Accepting,
    /// The iteration was decided; the next `prepare` starts the next one
    Deciding,
}

/// Per-phase state of the outstanding attempt.
#[derive(Debug)]
enum Round {
    Idle,
    Preparing {
        /// Promises counted toward the quorum
        acks: usize,
        /// Highest accepted ballot reported by a PROMISE so far
        adopted: Ballot,
        adopted_value: Option<Value>,
    },
    Accepting {
        /// Grants counted toward the quorum
        acks: usize,
        /// Value sent with ACCEPT
        value: Value,
    },
    Deciding,
}

/// The proposer drives one attempt at a time: Phase 1 collects promises and
/// adopts the highest accepted value reported, Phase 2 collects acceptances.
/// It never sends messages itself; the caller delivers the returned
/// `Prepare`/`Accept` and feeds replies back.
pub struct Proposer<S> {
    /// Ballot of the outstanding attempt; persists across attempts
    current: Ballot,
    round: Round,
    quorum: usize,
    index: u64,
    proposers: u64,
    values: S,
}

impl<S: ValueSource> Proposer<S> {
    /// Creates a proposer starting at `first_iteration` that needs `quorum`
    /// replies per phase.
    pub fn new(first_iteration: u64, quorum: usize, values: S) -> Proposer<S> {
        assert!(quorum > 0);
        Proposer {
            current: Ballot::initial(first_iteration),
            round: Round::Idle,
            quorum,
            index: 0,
            proposers: 1,
            values,
        }
    }

    /// Restricts ballot counters to this proposer's residue class,
    /// `index` out of `proposers`.
    pub fn with_identity(mut self, index: u64, proposers: u64) -> Proposer<S> {
        assert!(index < proposers);
        self.index = index;
        self.proposers = proposers;
        self
    }

    pub fn phase(&self) -> Phase {
        match self.round {
            Round::Idle => Phase::Idle,
            Round::Preparing { .. } => Phase::Preparing,
            Round::Accepting { .. } => Phase::Accepting,
            Round::Deciding => Phase::Deciding,
        }
    }

    /// Ballot of the outstanding (or next) attempt
    pub fn current_ballot(&self) -> Ballot {
        self.current
    }

    /// Iteration the proposer is working on
    pub fn iteration(&self) -> u64 {
        self.current.iteration
    }

    /// Starts a new attempt with a higher counter and forgets anything
    /// adopted in the previous attempt.
    pub fn prepare(&mut self) -> Prepare {
        self.current = self.current.next_counter(self.index, self.proposers);
        self.round = Round::Preparing {
            acks: 0,
            adopted: Ballot::initial(self.current.iteration),
            adopted_value: None,
        };

        debug!("Starting prepare with {}", self.current);
        Prepare(self.current)
    }

    /// Note a promise from an acceptor. An ACCEPT message is returned when
    /// the promise completes the Phase 1 quorum.
    pub fn receive_promise(&mut self, promise: Promise) -> Option<Accept> {
        let (acks, adopted, adopted_value) = match &mut self.round {
            Round::Preparing {
                acks,
                adopted,
                adopted_value,
            } => (acks, adopted, adopted_value),
            _ => {
                trace!("Ignoring PROMISE outside of Phase 1");
                return None;
            }
        };

        let Promise(accepted, value) = promise;
        if adopted.less(&accepted) {
            debug!("Adopting value accepted under {}", accepted);
            *adopted = accepted;
            *adopted_value = value;
        }

        *acks += 1;
        if *acks < self.quorum {
            return None;
        }

        let adopted = *adopted;
        let value = match adopted_value.take() {
            Some(value) => value,
            None => self.values.next_value(self.current),
        };
        self.current = ballot::max(self.current, adopted);
        self.round = Round::Accepting {
            acks: 0,
            value: value.clone(),
        };

        debug!("Quorum reached for Phase 1 of {}", self.current);
        Some(Accept(self.current, value))
    }

    /// Note an ACCEPTED reply. Replies for any ballot other than the one sent
    /// mean the acceptor did not grant the proposal and are not counted.
    /// Returns the decision when the Phase 2 quorum completes, after which
    /// the proposer moves on to the next iteration.
    pub fn receive_accepted(&mut self, accepted: Accepted) -> Option<Decision> {
        let (acks, value) = match &mut self.round {
            Round::Accepting { acks, value } => (acks, value),
            _ => {
                trace!("Ignoring ACCEPTED outside of Phase 2");
                return None;
            }
        };

        let Accepted(ballot) = accepted;
        if ballot != self.current {
            debug!(
                "ACCEPT for {} not granted, acceptor is at {}",
                self.current, ballot
            );
            return None;
        }

        *acks += 1;
        if *acks < self.quorum {
            return None;
        }

        let decision = Decision {
            iteration: self.current.iteration,
            ballot: self.current,
            value: value.clone(),
        };
        info!(
            "Decided {} in iteration {} with {}",
            decision.value, decision.iteration, decision.ballot
        );

        self.current = self.current.next_iteration();
        self.round = Round::Deciding;
        Some(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acceptor::Acceptor;

    fn b(iteration: u64, counter: u64) -> Ballot {
        Ballot::new(iteration, counter)
    }

    fn fixed(v: &'static str) -> impl FnMut(Ballot) -> Value {
        move |_| Value::from(v)
    }

    #[test]
    fn prepare_increments_counter() {
        let mut proposer = Proposer::new(1, 2, fixed("v"));
        assert_eq!(proposer.phase(), Phase::Idle);
        assert_eq!(proposer.prepare(), Prepare(b(1, 1)));
        assert_eq!(proposer.phase(), Phase::Preparing);
        assert_eq!(proposer.prepare(), Prepare(b(1, 2)));
        assert_eq!(proposer.current_ballot(), b(1, 2));
    }

    #[test]
    fn invents_value_when_nothing_accepted() {
        let mut proposer = Proposer::new(1, 2, fixed("fresh"));
        proposer.prepare();

        assert_eq!(proposer.receive_promise(Promise(b(1, 0), None)), None);
        assert_eq!(
            proposer.receive_promise(Promise(b(1, 0), None)),
            Some(Accept(b(1, 1), "fresh".into()))
        );
        assert_eq!(proposer.phase(), Phase::Accepting);

        // extra promises after quorum are ignored
        assert_eq!(proposer.receive_promise(Promise(b(1, 0), None)), None);
    }

    #[test]
    fn adopts_highest_accepted_value() {
        let mut proposer = Proposer::new(1, 3, fixed("fresh"));
        proposer.prepare();
        proposer.prepare();
        proposer.prepare();

        assert_eq!(proposer.receive_promise(Promise(b(1, 1), Some("low".into()))), None);
        assert_eq!(proposer.receive_promise(Promise(b(1, 2), Some("high".into()))), None);
        assert_eq!(
            proposer.receive_promise(Promise(b(1, 0), None)),
            Some(Accept(b(1, 3), "high".into()))
        );
    }

    #[test]
    fn adopted_ballot_above_current_is_used_for_accept() {
        let mut proposer = Proposer::new(1, 2, fixed("fresh"));
        proposer.prepare();

        proposer.receive_promise(Promise(b(1, 5), Some("other".into())));
        assert_eq!(
            proposer.receive_promise(Promise(b(1, 0), None)),
            Some(Accept(b(1, 5), "other".into()))
        );
        assert_eq!(proposer.current_ballot(), b(1, 5));

        // next attempt counts on from the adopted ballot
        assert_eq!(proposer.prepare(), Prepare(b(1, 6)));
    }

    #[test]
    fn stale_iteration_promises_are_not_adopted() {
        let mut proposer = Proposer::new(2, 2, fixed("fresh"));
        proposer.prepare();
        proposer.receive_promise(Promise(b(1, 9), Some("old".into())));
        assert_eq!(
            proposer.receive_promise(Promise(b(2, 0), None)),
            Some(Accept(b(2, 1), "fresh".into()))
        );
    }

    #[test]
    fn decides_on_accept_quorum_and_advances_iteration() {
        let mut proposer = Proposer::new(1, 2, fixed("v"));
        proposer.prepare();
        proposer.receive_promise(Promise(b(1, 0), None));
        proposer.receive_promise(Promise(b(1, 0), None));

        assert_eq!(proposer.receive_accepted(Accepted(b(1, 1))), None);
        assert_eq!(
            proposer.receive_accepted(Accepted(b(1, 1))),
            Some(Decision {
                iteration: 1,
                ballot: b(1, 1),
                value: "v".into(),
            })
        );
        assert_eq!(proposer.phase(), Phase::Deciding);
        assert_eq!(proposer.iteration(), 2);
        assert_eq!(proposer.prepare(), Prepare(b(2, 2)));
    }

    #[test]
    fn decision_carries_value_sent_with_accept() {
        let mut proposer = Proposer::new(1, 2, fixed("fresh"));
        proposer.prepare();
        let accept = proposer.receive_promise(Promise(b(1, 1), Some("earlier".into())));
        assert_eq!(accept, None);

        // a new attempt drops the adopted value of the abandoned one
        proposer.prepare();
        proposer.receive_promise(Promise(b(1, 0), None));
        let Accept(ballot, value) = proposer.receive_promise(Promise(b(1, 0), None)).unwrap();
        assert_eq!((ballot, value.clone()), (b(1, 2), Value::from("fresh")));

        proposer.receive_accepted(Accepted(ballot));
        let decision = proposer.receive_accepted(Accepted(ballot)).unwrap();
        assert_eq!(decision.value, value);
        assert_eq!(proposer.receive_accepted(Accepted(ballot)), None);
    }

    #[test]
    fn rejected_accepts_do_not_count() {
        let mut proposer = Proposer::new(1, 2, fixed("v"));
        proposer.prepare();
        proposer.receive_promise(Promise(b(1, 0), None));
        proposer.receive_promise(Promise(b(1, 0), None));

        // superseded by a higher ballot, or still at an older one
        assert_eq!(proposer.receive_accepted(Accepted(b(1, 4))), None);
        assert_eq!(proposer.receive_accepted(Accepted(b(1, 0))), None);
        assert_eq!(proposer.receive_accepted(Accepted(b(1, 1))), None);
        assert_eq!(proposer.phase(), Phase::Accepting);
        assert!(proposer.receive_accepted(Accepted(b(1, 1))).is_some());
    }

    #[test]
    fn accepted_outside_phase_two_is_ignored() {
        let mut proposer = Proposer::new(1, 1, fixed("v"));
        assert_eq!(proposer.receive_accepted(Accepted(b(1, 0))), None);
        proposer.prepare();
        assert_eq!(proposer.receive_accepted(Accepted(b(1, 1))), None);
        assert_eq!(proposer.phase(), Phase::Preparing);
    }

    #[test]
    fn adoption_rule_against_real_acceptors() {
        // an earlier attempt got "first" accepted by one acceptor only
        let mut acceptors: Vec<Acceptor> = (0..3).map(|_| Acceptor::new()).collect();
        acceptors[0].receive_prepare(Prepare(b(1, 1)));
        acceptors[0].receive_accept(Accept(b(1, 1), "first".into()));

        let mut proposer = Proposer::new(1, 2, fixed("second"));
        proposer.prepare();
        proposer.prepare();
        let prepare = Prepare(b(1, 2));

        let mut accept = None;
        for acceptor in acceptors.iter_mut().take(2) {
            accept = proposer.receive_promise(acceptor.receive_prepare(prepare));
        }
        assert_eq!(accept, Some(Accept(b(1, 2), "first".into())));
    }

    #[test]
    fn end_to_end_against_real_acceptors() {
        let mut acceptors: Vec<Acceptor> = (0..3).map(|_| Acceptor::new()).collect();
        let mut proposer = Proposer::new(1, 2, fixed("V"));

        let prepare = proposer.prepare();
        assert_eq!(prepare, Prepare(b(1, 1)));
        let mut accept = None;
        for acceptor in acceptors.iter_mut() {
            if let Some(a) = proposer.receive_promise(acceptor.receive_prepare(prepare)) {
                accept = Some(a);
            }
        }
        let accept = accept.unwrap();
        assert_eq!(accept, Accept(b(1, 1), "V".into()));

        let mut decision = None;
        for acceptor in acceptors.iter_mut() {
            if let Some(d) = proposer.receive_accepted(acceptor.receive_accept(accept.clone())) {
                decision = Some(d);
            }
        }
        assert_eq!(decision.unwrap().value, Value::from("V"));
        for acceptor in acceptors.iter() {
            assert_eq!(acceptor.state().accepted_value, Some("V".into()));
        }
    }
}
