//! Integration tests for the grant protocol, driven call by call.
//!
//! These tests call `request` / `release` / `try_grant` directly and check
//! the resulting states and signals, with a `TransitionLog` attached so every
//! intermediate state is checked for mutual exclusion as well.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use dining_core::{ProtocolError, StateRegistry, TransitionLog};
use dining_types::{ActorId, ActorState, GrantPolicy};

fn audited(seats: usize, policy: GrantPolicy) -> (StateRegistry, TransitionLog) {
    let log = TransitionLog::new();
    let registry = StateRegistry::with_observer(seats, policy, Box::new(log.clone())).unwrap();
    (registry, log)
}

#[test]
fn non_adjacent_requests_are_both_granted_in_either_order() {
    for order in [[0, 2], [2, 0]] {
        let (reg, log) = audited(5, GrantPolicy::NeighbourCheck);
        for seat in order {
            assert!(reg.request(ActorId(seat)).unwrap(), "seat {seat} in {order:?}");
        }
        assert_eq!(reg.state(ActorId(0)).unwrap(), ActorState::Eating);
        assert_eq!(reg.state(ActorId(2)).unwrap(), ActorState::Eating);
        assert_eq!(log.violations(), 0);
    }
}

#[test]
fn adjacent_requests_grant_only_the_first_until_release() {
    for (first, second) in [(0, 1), (1, 0)] {
        let (reg, log) = audited(5, GrantPolicy::NeighbourCheck);
        assert!(reg.request(ActorId(first)).unwrap());
        assert!(!reg.request(ActorId(second)).unwrap());
        assert_eq!(reg.state(ActorId(second)).unwrap(), ActorState::Hungry);
        assert!(!reg.try_consume_grant(ActorId(second)).unwrap());

        assert!(reg.try_consume_grant(ActorId(first)).unwrap());
        reg.release(ActorId(first)).unwrap();

        assert_eq!(reg.state(ActorId(second)).unwrap(), ActorState::Eating);
        assert!(reg.try_consume_grant(ActorId(second)).unwrap());
        assert_eq!(log.violations(), 0);
        assert!(log.cycles_are_well_formed());
    }
}

#[test]
fn release_re_evaluates_both_neighbours() {
    let (reg, _log) = audited(5, GrantPolicy::NeighbourCheck);
    assert!(reg.request(ActorId(2)).unwrap());
    assert!(!reg.request(ActorId(1)).unwrap());
    assert!(!reg.request(ActorId(3)).unwrap());

    reg.release(ActorId(2)).unwrap();
    // 1 and 3 are not adjacent; both become eligible at once.
    assert_eq!(reg.state(ActorId(1)).unwrap(), ActorState::Eating);
    assert_eq!(reg.state(ActorId(3)).unwrap(), ActorState::Eating);
}

#[test]
fn hungry_actor_between_two_eaters_waits_for_both() {
    let (reg, _log) = audited(5, GrantPolicy::NeighbourCheck);
    assert!(reg.request(ActorId(0)).unwrap());
    assert!(reg.request(ActorId(2)).unwrap());
    assert!(!reg.request(ActorId(1)).unwrap());

    assert!(reg.try_consume_grant(ActorId(0)).unwrap());
    reg.release(ActorId(0)).unwrap();
    assert_eq!(reg.state(ActorId(1)).unwrap(), ActorState::Hungry);

    reg.release(ActorId(2)).unwrap();
    assert_eq!(reg.state(ActorId(1)).unwrap(), ActorState::Eating);
}

#[test]
fn try_grant_is_idempotent() {
    let (reg, log) = audited(5, GrantPolicy::NeighbourCheck);

    // Thinking actor: nothing changes.
    assert!(!reg.try_grant(ActorId(4)).unwrap());
    assert!(log.transitions().is_empty());

    // Eating actor: re-evaluation neither changes state nor raises again.
    assert!(reg.request(ActorId(4)).unwrap());
    let before = log.transitions().len();
    assert!(!reg.try_grant(ActorId(4)).unwrap());
    assert!(!reg.try_grant(ActorId(4)).unwrap());
    assert_eq!(log.transitions().len(), before);
    assert!(reg.try_consume_grant(ActorId(4)).unwrap());
    assert!(!reg.try_consume_grant(ActorId(4)).unwrap());

    // Blocked hungry actor stays blocked.
    assert!(!reg.request(ActorId(0)).unwrap());
    assert!(!reg.try_grant(ActorId(0)).unwrap());
    assert_eq!(reg.state(ActorId(0)).unwrap(), ActorState::Hungry);
}

#[test]
fn two_seat_table_alternates() {
    let (reg, log) = audited(2, GrantPolicy::NeighbourCheck);
    assert!(reg.request(ActorId(0)).unwrap());
    assert!(!reg.request(ActorId(1)).unwrap());
    assert!(reg.try_consume_grant(ActorId(0)).unwrap());
    reg.release(ActorId(0)).unwrap();
    assert!(reg.try_consume_grant(ActorId(1)).unwrap());
    assert!(!reg.request(ActorId(0)).unwrap());
    reg.release(ActorId(1)).unwrap();
    assert!(reg.try_consume_grant(ActorId(0)).unwrap());
    assert_eq!(log.violations(), 0);
}

#[test]
fn errors_name_the_problem() {
    let (reg, _log) = audited(5, GrantPolicy::Ordered);
    let err = reg.release(ActorId(1)).unwrap_err();
    assert_eq!(
        err,
        ProtocolError::InvalidTransition {
            actor: ActorId(1),
            from: ActorState::Thinking,
            to: ActorState::Thinking,
        }
    );
    assert_eq!(err.to_string(), "actor 1 cannot go from thinking to thinking");
    assert!(matches!(
        reg.state(ActorId(9)),
        Err(ProtocolError::UnknownActor { seats: 5, .. })
    ));
}

#[tokio::test]
async fn release_wakes_a_waiting_neighbour() {
    let log = TransitionLog::new();
    let reg = Arc::new(
        StateRegistry::with_observer(5, GrantPolicy::NeighbourCheck, Box::new(log.clone()))
            .unwrap(),
    );
    assert!(reg.request(ActorId(0)).unwrap());
    assert!(!reg.request(ActorId(1)).unwrap());

    let waiter = {
        let reg = Arc::clone(&reg);
        tokio::spawn(async move { reg.await_grant(ActorId(1)).await })
    };
    tokio::task::yield_now().await;
    assert!(!waiter.is_finished());

    reg.await_grant(ActorId(0)).await.unwrap();
    reg.release(ActorId(0)).unwrap();

    let joined = tokio::time::timeout(Duration::from_secs(5), waiter).await;
    assert!(matches!(joined, Ok(Ok(Ok(())))));
    assert_eq!(log.grants_for(ActorId(1)), 1);
}
