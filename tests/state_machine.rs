//! Exhaustive and property-based checks of the record and phase state machines.

use commissioner::store::InMemoryTaskStore;
use commissioner::{CommissionerError, TaskPhase, TaskState, TaskType};
use proptest::prelude::*;
use serde_json::json;

const ALL_STATES: [TaskState; 5] = [
    TaskState::Created,
    TaskState::Running,
    TaskState::Success,
    TaskState::Failure,
    TaskState::Aborted,
];

const ALL_PHASES: [TaskPhase; 5] = [
    TaskPhase::Validating,
    TaskPhase::Committing,
    TaskPhase::RollingBack,
    TaskPhase::Succeeded,
    TaskPhase::Failed,
];

mod state_matrix_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // ─── Record lifecycle ───────────────────────────────────────────────

    #[test]
    fn valid_state_transitions() {
        let valid = [
            (TaskState::Created, TaskState::Running),
            (TaskState::Created, TaskState::Aborted),
            (TaskState::Running, TaskState::Success),
            (TaskState::Running, TaskState::Failure),
            (TaskState::Running, TaskState::Aborted),
        ];
        for from in ALL_STATES {
            for to in ALL_STATES {
                assert_eq!(
                    from.can_transition_to(&to),
                    valid.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for state in ALL_STATES.iter().filter(|s| s.is_terminal()) {
            assert!(ALL_STATES.iter().all(|to| !state.can_transition_to(to)));
        }
        assert_eq!(ALL_STATES.iter().filter(|s| s.is_terminal()).count(), 3);
    }

    #[test]
    fn state_serializes_snake_case() {
        for state in ALL_STATES {
            assert_eq!(serde_json::to_value(state).unwrap(), json!(state.to_string()));
        }
    }

    // ─── Body phases ────────────────────────────────────────────────────

    #[test]
    fn valid_phase_transitions() {
        let valid = [
            (TaskPhase::Validating, TaskPhase::Committing),
            (TaskPhase::Validating, TaskPhase::Failed),
            (TaskPhase::Committing, TaskPhase::Succeeded),
            (TaskPhase::Committing, TaskPhase::RollingBack),
            (TaskPhase::RollingBack, TaskPhase::Failed),
        ];
        for from in ALL_PHASES {
            for to in ALL_PHASES {
                assert_eq!(
                    from.can_transition_to(&to),
                    valid.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn success_is_unreachable_from_rollback() {
        assert!(!TaskPhase::RollingBack.can_transition_to(&TaskPhase::Succeeded));
        assert!(!TaskPhase::Failed.can_transition_to(&TaskPhase::Succeeded));
    }

    #[tokio::test]
    async fn phase_requires_running_record() {
        let store = InMemoryTaskStore::default();
        let record = store.create(TaskType::CloudBootstrap, json!({}), None).await.unwrap();

        let err = store.set_phase(record.task_id, TaskPhase::Validating).await.unwrap_err();
        assert!(matches!(err, CommissionerError::InvalidPhaseTransition { from: None, .. }));

        store
            .transition_from(record.task_id, TaskState::Created, TaskState::Running, None)
            .await
            .unwrap();
        let err = store.set_phase(record.task_id, TaskPhase::Committing).await.unwrap_err();
        assert!(matches!(err, CommissionerError::InvalidPhaseTransition { .. }));
        store.set_phase(record.task_id, TaskPhase::Validating).await.unwrap();
    }
}

// ─── Random walks through the store ─────────────────────────────────────────

fn state_strategy() -> impl Strategy<Value = TaskState> {
    prop::sample::select(ALL_STATES.to_vec())
}

fn phase_strategy() -> impl Strategy<Value = TaskPhase> {
    prop::sample::select(ALL_PHASES.to_vec())
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    /// The store accepts exactly the transitions the state machine allows,
    /// and a terminal record never changes again.
    #[test]
    fn store_follows_state_machine(targets in prop::collection::vec(state_strategy(), 1..12)) {
        runtime().block_on(async {
            let store = InMemoryTaskStore::default();
            let record = store.create(TaskType::CloudBootstrap, json!({}), None).await.unwrap();
            let mut current = TaskState::Created;

            for to in targets {
                let result = store.transition_from(record.task_id, current, to, None).await;
                if current.can_transition_to(&to) {
                    prop_assert!(result.is_ok());
                    current = to;
                } else {
                    let is_invalid = matches!(result, Err(CommissionerError::InvalidTransition { .. }));
                    prop_assert!(is_invalid);
                }
                let stored = store.get(record.task_id).await.unwrap();
                prop_assert_eq!(stored.state, current);
                prop_assert_eq!(stored.completed_at.is_some(), current.is_terminal());
            }
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// Phases only ever move along the phase machine while running.
    #[test]
    fn store_follows_phase_machine(targets in prop::collection::vec(phase_strategy(), 1..12)) {
        runtime().block_on(async {
            let store = InMemoryTaskStore::default();
            let record = store.create(TaskType::CloudBootstrap, json!({}), None).await.unwrap();
            store
                .transition_from(record.task_id, TaskState::Created, TaskState::Running, None)
                .await
                .unwrap();
            let mut current: Option<TaskPhase> = None;

            for to in targets {
                let allowed = match current {
                    None => to == TaskPhase::Validating,
                    Some(phase) => phase.can_transition_to(&to),
                };
                let result = store.set_phase(record.task_id, to).await;
                prop_assert_eq!(result.is_ok(), allowed);
                if allowed {
                    current = Some(to);
                }
                prop_assert_eq!(store.get(record.task_id).await.unwrap().phase, current);
            }
            Ok::<(), TestCaseError>(())
        })?;
    }
}
