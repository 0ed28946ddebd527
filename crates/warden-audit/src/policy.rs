//! Policy classifier.
//!
//! [`classify`] is a pure function of the current event and the prior
//! [`AuditState`]. The three rules are evaluated independently and their
//! results accumulate; no rule suppresses another.

use crate::alert::{AlertFlag, AlertSet};
use crate::event::{Event, Transport};
use crate::history::AuditState;

/// Reported state differs from physical state on this event.
#[must_use]
pub fn is_spoofing(event: &Event) -> bool {
    event.reported_state != event.physical_state
}

/// A physical transition happened since the prior event but the report
/// stayed where it was. Never true without a prior event.
#[must_use]
pub fn is_masking(event: &Event, prior: &AuditState) -> bool {
    match (prior.last_physical_state, prior.last_reported_state) {
        (Some(last_physical), Some(last_reported)) => {
            event.physical_state != last_physical && event.reported_state == last_reported
        }
        _ => false,
    }
}

/// The event arrived over an insecure transport.
#[must_use]
pub fn is_tls_violation(event: &Event) -> bool {
    event.transport == Transport::Insecure
}

/// Classifies `event` against `prior`.
///
/// Returns the raised flags and the history to carry forward. The new
/// history always reflects this event, whatever was raised.
#[must_use]
pub fn classify(event: &Event, prior: &AuditState) -> (AlertSet, AuditState) {
    let mut alerts = AlertSet::empty();
    for flag in AlertFlag::ALL {
        let raised = match flag {
            AlertFlag::Spoofing => is_spoofing(event),
            AlertFlag::Masking => is_masking(event, prior),
            AlertFlag::TlsViolation => is_tls_violation(event),
        };
        if raised {
            alerts.insert(flag);
        }
    }
    (alerts, AuditState::observed(event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::DeviceState::{Off, On};
    use crate::event::{DeviceState, Transport::Insecure, Transport::Secure};
    use proptest::prelude::*;
    use test_case::test_case;

    fn ev(seq: u64, physical: DeviceState, reported: DeviceState, transport: Transport) -> Event {
        Event::new(seq, physical, reported, transport)
    }

    fn flags(list: &[AlertFlag]) -> AlertSet {
        list.iter().copied().collect()
    }

    fn run(events: &[Event]) -> Vec<AlertSet> {
        let mut state = AuditState::unknown();
        events
            .iter()
            .map(|e| {
                let (alerts, next) = classify(e, &state);
                state = next;
                alerts
            })
            .collect()
    }

    #[test]
    fn spoofing_only_on_fresh_history() {
        let (alerts, _) = classify(&ev(1, On, Off, Secure), &AuditState::unknown());
        assert_eq!(alerts, flags(&[AlertFlag::Spoofing]));
    }

    #[test]
    fn masking_across_two_events() {
        let alerts = run(&[ev(1, Off, Off, Secure), ev(2, On, Off, Secure)]);
        assert!(alerts[0].is_empty());
        // Second event is also spoofing: physical on, reported off.
        assert!(alerts[1].contains(AlertFlag::Masking));
    }

    #[test]
    fn masking_without_spoofing() {
        // Device was on while claiming off; it turns off and the claim
        // does not move, so the report is now accidentally truthful.
        let prior = AuditState {
            last_physical_state: Some(On),
            last_reported_state: Some(Off),
        };
        let (alerts, _) = classify(&ev(2, Off, Off, Secure), &prior);
        assert_eq!(alerts, flags(&[AlertFlag::Masking]));
    }

    #[test]
    fn tls_violation_alone() {
        let (alerts, _) = classify(&ev(1, Off, Off, Insecure), &AuditState::unknown());
        assert_eq!(alerts, flags(&[AlertFlag::TlsViolation]));
    }

    #[test]
    fn all_three_at_once() {
        let prior = AuditState {
            last_physical_state: Some(Off),
            last_reported_state: Some(Off),
        };
        let (alerts, _) = classify(&ev(2, On, Off, Insecure), &prior);
        assert_eq!(alerts, flags(&AlertFlag::ALL));
    }

    #[test]
    fn ok_when_consistent_and_secure() {
        let alerts = run(&[ev(1, On, On, Secure), ev(2, On, On, Secure)]);
        assert!(alerts.iter().all(AlertSet::is_empty));
    }

    #[test]
    fn honest_transition_is_not_masking() {
        let alerts = run(&[ev(1, Off, Off, Secure), ev(2, On, On, Secure)]);
        assert!(alerts[1].is_empty());
    }

    #[test]
    fn history_tracks_events_after_alerts() {
        // Event 2 is spoofed; event 3 must be judged against event 2's
        // states, not against the last clean event.
        let alerts = run(&[
            ev(1, Off, Off, Secure),
            ev(2, On, Off, Secure),
            ev(3, Off, Off, Secure),
        ]);
        assert!(alerts[2].contains(AlertFlag::Masking));
        assert!(!alerts[2].contains(AlertFlag::Spoofing));
    }

    #[test_case(On, On, Secure, &[] ; "ok on")]
    #[test_case(Off, Off, Secure, &[] ; "ok off")]
    #[test_case(On, Off, Secure, &[AlertFlag::Spoofing] ; "spoof off")]
    #[test_case(Off, On, Secure, &[AlertFlag::Spoofing] ; "spoof on")]
    #[test_case(On, On, Insecure, &[AlertFlag::TlsViolation] ; "tls on")]
    #[test_case(On, Off, Insecure, &[AlertFlag::Spoofing, AlertFlag::TlsViolation] ; "spoof and tls")]
    fn first_event_truth_table(
        physical: DeviceState,
        reported: DeviceState,
        transport: Transport,
        expected: &[AlertFlag],
    ) {
        let (alerts, next) = classify(&ev(1, physical, reported, transport), &AuditState::unknown());
        assert_eq!(alerts, flags(expected));
        assert_eq!(next.last_physical_state, Some(physical));
        assert_eq!(next.last_reported_state, Some(reported));
    }

    fn state() -> impl Strategy<Value = DeviceState> {
        prop_oneof![Just(On), Just(Off)]
    }

    fn transport() -> impl Strategy<Value = Transport> {
        prop_oneof![Just(Secure), Just(Insecure)]
    }

    fn event() -> impl Strategy<Value = Event> {
        (any::<u64>(), state(), state(), transport())
            .prop_map(|(seq, p, r, t)| ev(seq, p, r, t))
    }

    fn prior() -> impl Strategy<Value = AuditState> {
        (proptest::option::of(state()), proptest::option::of(state())).prop_map(|(p, r)| {
            AuditState {
                last_physical_state: p,
                last_reported_state: r,
            }
        })
    }

    proptest! {
        #[test]
        fn classify_is_deterministic(e in event(), p in prior()) {
            prop_assert_eq!(classify(&e, &p), classify(&e, &p));
        }

        #[test]
        fn first_event_never_masks(e in event()) {
            let (alerts, _) = classify(&e, &AuditState::unknown());
            prop_assert!(!alerts.contains(AlertFlag::Masking));
        }

        #[test]
        fn new_state_always_mirrors_event(e in event(), p in prior()) {
            let (_, next) = classify(&e, &p);
            prop_assert_eq!(next, AuditState::observed(&e));
        }

        #[test]
        fn spoof_over_insecure_raises_both(p in prior()) {
            let (alerts, _) = classify(&ev(1, On, Off, Insecure), &p);
            prop_assert!(alerts.contains(AlertFlag::Spoofing));
            prop_assert!(alerts.contains(AlertFlag::TlsViolation));
            let transitioned = p.last_physical_state == Some(Off)
                && p.last_reported_state == Some(Off);
            prop_assert_eq!(alerts.contains(AlertFlag::Masking), transitioned);
        }

        #[test]
        fn steady_consistent_secure_is_ok(s in state()) {
            let prior = AuditState { last_physical_state: Some(s), last_reported_state: Some(s) };
            let (alerts, _) = classify(&ev(2, s, s, Secure), &prior);
            prop_assert!(alerts.is_empty());
        }
    }
}
