//! Property-based tests for the state machine
//!
//! These tests drive the pure transition function with arbitrary event
//! sequences, apply the log effects to a real `MessageLog`, and check that the
//! key invariants hold after every step.

use super::*;
use crate::session::ConversationId;
use crate::stream::StreamEvent;
use crate::transport::TransportError;
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> ConvContext {
    ConvContext::new(ConversationId::from("test-conv"), "Hello!", "Reset done.")
}

/// Event shapes, resolved against the exchange in flight when applied
#[derive(Debug, Clone)]
enum Step {
    Send(String),
    Content { text: String, stale: bool },
    Malformed,
    Done { stale: bool },
    ServerError(String),
    Ended,
    Failed(TransportError),
    Reset,
}

/// Pure simulation of the runtime: transition, then apply log effects
struct Sim {
    state: ConvState,
    log: MessageLog,
    last_exchange: ExchangeId,
    ctx: ConvContext,
}

impl Sim {
    fn new() -> Self {
        let ctx = test_context();
        Self {
            state: ConvState::Idle,
            log: MessageLog::new(Message::assistant(ctx.greeting.clone())),
            last_exchange: ExchangeId::default(),
            ctx,
        }
    }

    fn resolve(&self, step: Step) -> Event {
        // Stale events point at an exchange that is not (or no longer) in flight
        let current = self.state.exchange().unwrap_or(self.last_exchange);
        let pick = |stale: bool| if stale { current.next() } else { current };
        match step {
            Step::Send(text) => Event::UserMessage {
                text,
                exchange: self.last_exchange.next(),
            },
            Step::Content { text, stale } => Event::content(pick(stale), text),
            Step::Malformed => Event::Stream {
                exchange: current,
                event: StreamEvent::MalformedFragment {
                    payload: "{".to_string(),
                },
            },
            Step::Done { stale } => Event::done(pick(stale)),
            Step::ServerError(message) => Event::Stream {
                exchange: current,
                event: StreamEvent::ServerError { message },
            },
            Step::Ended => Event::StreamEnded { exchange: current },
            Step::Failed(error) => Event::TransportFailed {
                exchange: current,
                error,
            },
            Step::Reset => Event::Reset,
        }
    }

    fn apply(&mut self, event: Event) -> Result<Vec<Effect>, TransitionError> {
        let accepted_exchange = match &event {
            Event::UserMessage { exchange, .. } => Some(*exchange),
            _ => None,
        };
        let result = transition(&self.state, &self.ctx, event)?;
        self.state = result.new_state;
        if let Some(exchange) = accepted_exchange {
            self.last_exchange = exchange;
        }
        for effect in &result.effects {
            let applied = match effect.clone() {
                Effect::AppendMessage { message } => self.log.append(message),
                Effect::AppendToPending { text } => self.log.append_to_pending(&text),
                Effect::FinishPending => self.log.finish_pending(),
                Effect::FailPending { text } => self.log.fail_pending(text),
                Effect::ReplaceLog { greeting } => {
                    self.log.replace(greeting);
                    Ok(())
                }
                Effect::PostMessage { .. } | Effect::PostReset | Effect::AbortStream => Ok(()),
            };
            assert!(applied.is_ok(), "log rejected {effect:?}: {applied:?}");
        }
        Ok(result.effects)
    }
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_transport_error() -> impl Strategy<Value = TransportError> {
    prop_oneof![
        Just(TransportError::connection("connection refused")),
        (400u16..600).prop_map(|status| TransportError::server(status, status.to_string())),
        Just(TransportError::unexpected("boom")),
    ]
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => prop_oneof!["[a-zA-Z ]{1,12}", Just(String::new()), Just("   ".to_string())]
            .prop_map(Step::Send),
        4 => ("[a-zA-Z áñ]{0,8}", prop::bool::weighted(0.2))
            .prop_map(|(text, stale)| Step::Content { text, stale }),
        1 => Just(Step::Malformed),
        2 => prop::bool::weighted(0.2).prop_map(|stale| Step::Done { stale }),
        1 => "[a-z ]{0,10}".prop_map(Step::ServerError),
        1 => Just(Step::Ended),
        1 => arb_transport_error().prop_map(Step::Failed),
        1 => Just(Step::Reset),
    ]
}

// ============================================================================
// State Validity Checkers
// ============================================================================

fn pending_count(log: &MessageLog) -> usize {
    log.messages().iter().filter(|m| m.pending).count()
}

fn check_invariants(sim: &Sim) -> Result<(), TestCaseError> {
    let pending = pending_count(&sim.log);
    prop_assert!(pending <= 1, "{} pending messages", pending);
    if pending == 1 {
        prop_assert!(sim.log.last().is_some_and(|m| m.pending), "pending message is not last");
    }
    // A pending reply exists exactly while an exchange is in flight
    prop_assert_eq!(pending == 1, sim.state.is_busy());
    prop_assert!(!sim.log.is_empty());
    Ok(())
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Invariant 1: single pending reply, always last, iff busy
    #[test]
    fn prop_single_pending_invariant(steps in proptest::collection::vec(arb_step(), 0..40)) {
        let mut sim = Sim::new();
        for step in steps {
            let event = sim.resolve(step);
            let _ = sim.apply(event);
            check_invariants(&sim)?;
        }
    }

    // Invariant 2: rejected events leave state and log untouched
    #[test]
    fn prop_rejection_is_a_no_op(steps in proptest::collection::vec(arb_step(), 0..40)) {
        let mut sim = Sim::new();
        for step in steps {
            let event = sim.resolve(step);
            let (state, log) = (sim.state, sim.log.clone());
            if sim.apply(event).is_err() {
                prop_assert_eq!(sim.state, state);
                prop_assert_eq!(&sim.log, &log);
            }
        }
    }

    // Invariant 3: blank sends never change anything
    #[test]
    fn prop_blank_send_rejected(
        blank in "[ \t\n]{0,5}",
        steps in proptest::collection::vec(arb_step(), 0..10),
    ) {
        let mut sim = Sim::new();
        for step in steps {
            let event = sim.resolve(step);
            let _ = sim.apply(event);
        }
        let event = sim.resolve(Step::Send(blank));
        prop_assert_eq!(sim.apply(event), Err(TransitionError::EmptyMessage));
    }

    // Invariant 4: reply text is the in-order concatenation of fragments
    #[test]
    fn prop_fragments_concatenate(
        fragments in proptest::collection::vec("[a-zA-Z0-9 ¿?áé🙂]{0,8}", 0..15),
        finish_with_done in any::<bool>(),
    ) {
        let mut sim = Sim::new();
        let event = sim.resolve(Step::Send("Hello".to_string()));
        sim.apply(event).unwrap();

        for fragment in &fragments {
            let event = sim.resolve(Step::Content { text: fragment.clone(), stale: false });
            sim.apply(event).unwrap();
        }
        let end = if finish_with_done { Step::Done { stale: false } } else { Step::Ended };
        let event = sim.resolve(end);
        sim.apply(event).unwrap();

        let reply = sim.log.last().unwrap();
        prop_assert_eq!(&reply.text, &fragments.concat());
        prop_assert!(!reply.pending);
        prop_assert_eq!(sim.state, ConvState::Idle);
    }

    // Invariant 5: reset always lands on the single reset greeting, Idle
    #[test]
    fn prop_reset_always_clears(steps in proptest::collection::vec(arb_step(), 0..30)) {
        let mut sim = Sim::new();
        for step in steps {
            let event = sim.resolve(step);
            let _ = sim.apply(event);
        }
        let effects = sim.apply(Event::Reset).unwrap();

        prop_assert_eq!(sim.state, ConvState::Idle);
        prop_assert_eq!(sim.log.messages(), &[Message::assistant("Reset done.")]);
        prop_assert!(effects.contains(&Effect::PostReset));
        prop_assert!(effects.contains(&Effect::AbortStream));
    }

    // Invariant 6: a busy conversation rejects sends until a terminal event
    #[test]
    fn prop_busy_rejects_send(fragments in proptest::collection::vec("[a-z]{1,5}", 0..5)) {
        let mut sim = Sim::new();
        let event = sim.resolve(Step::Send("first".to_string()));
        sim.apply(event).unwrap();
        for fragment in fragments {
            let event = sim.resolve(Step::Content { text: fragment, stale: false });
            sim.apply(event).unwrap();
            let event = sim.resolve(Step::Send("second".to_string()));
            prop_assert_eq!(sim.apply(event), Err(TransitionError::Busy));
        }
        let event = sim.resolve(Step::Done { stale: false });
        sim.apply(event).unwrap();
        let event = sim.resolve(Step::Send("second".to_string()));
        prop_assert!(sim.apply(event).is_ok());
    }

    // Invariant 7: transport failures always surface an apology and go Idle
    #[test]
    fn prop_failure_replaces_reply(
        partial in "[a-z]{0,10}",
        error in arb_transport_error(),
    ) {
        let mut sim = Sim::new();
        let event = sim.resolve(Step::Send("Hello".to_string()));
        sim.apply(event).unwrap();
        let event = sim.resolve(Step::Content { text: partial, stale: false });
        sim.apply(event).unwrap();
        let event = sim.resolve(Step::Failed(error.clone()));
        sim.apply(event).unwrap();

        prop_assert_eq!(sim.state, ConvState::Idle);
        prop_assert_eq!(sim.log.last(), Some(&Message::assistant(apology_for(&error))));
    }

    // Invariant 8: only log effects touch the log
    #[test]
    fn prop_io_effects_are_not_log_edits(steps in proptest::collection::vec(arb_step(), 0..20)) {
        let mut sim = Sim::new();
        for step in steps {
            let event = sim.resolve(step);
            if let Ok(effects) = sim.apply(event) {
                for effect in effects {
                    let io = matches!(
                        effect,
                        Effect::PostMessage { .. } | Effect::PostReset | Effect::AbortStream
                    );
                    prop_assert_eq!(io, !effect.edits_log());
                }
            }
        }
    }
}
