//! State-machine semantics driven through the dispatcher: emergency-stop
//! targeting and the mode/e-stop latch interplay.

use segmentd::protocol::command::{EmergencyStop, SetMode, StartHoming};
use segmentd::protocol::dispatch::Dispatcher;
use segmentd::protocol::{ErrorCode, Mode, BROADCAST_SEGMENT_ID};
use segmentd::state::SharedState;

fn harness(segment_id: u8) -> (Dispatcher, SharedState) {
    let state = SharedState::new(segment_id);
    (Dispatcher::new(state.clone()), state)
}

fn stop_frame(target: u8) -> Vec<u8> {
    EmergencyStop {
        segment_id: target,
        stop_reason: 0x01,
    }
    .encode()
}

fn mode_frame(segment_id: u8, mode: Mode) -> Vec<u8> {
    SetMode {
        segment_id,
        mode: mode as u8,
    }
    .encode()
}

#[test]
fn broadcast_stop_applies_to_every_segment_id() {
    for own_id in [0u8, 1, 4, 8] {
        let (dispatcher, state) = harness(own_id);
        state.set_mode(Mode::Operation);

        dispatcher.dispatch(&stop_frame(BROADCAST_SEGMENT_ID)).unwrap();

        assert!(state.emergency_stop(), "segment {own_id} ignored broadcast");
        assert_eq!(state.mode(), Mode::Idle);
    }
}

#[test]
fn targeted_stop_applies_only_to_own_id() {
    let (dispatcher, state) = harness(4);
    state.set_mode(Mode::Operation);

    dispatcher.dispatch(&stop_frame(4)).unwrap();

    assert!(state.emergency_stop());
    assert_eq!(state.mode(), Mode::Idle);
}

#[test]
fn stop_for_another_segment_is_valid_but_inert() {
    let (dispatcher, state) = harness(4);
    state.set_mode(Mode::Operation);

    dispatcher.dispatch(&stop_frame(5)).unwrap();

    assert!(!state.emergency_stop());
    assert_eq!(state.mode(), Mode::Operation);
    assert_eq!(state.error_count(), 0);
}

#[test]
fn estop_latch_survives_idle_and_homing_requests() {
    let (dispatcher, state) = harness(1);

    dispatcher.dispatch(&stop_frame(BROADCAST_SEGMENT_ID)).unwrap();
    assert!(state.emergency_stop());

    dispatcher.dispatch(&mode_frame(1, Mode::Idle)).unwrap();
    assert!(state.emergency_stop());
    assert_eq!(state.mode(), Mode::Idle);

    dispatcher.dispatch(&mode_frame(1, Mode::Homing)).unwrap();
    assert!(state.emergency_stop());
    assert_eq!(state.mode(), Mode::Homing);

    dispatcher
        .dispatch(
            &StartHoming {
                segment_id: 1,
                homing_mode: 0x02,
            }
            .encode(),
        )
        .unwrap();
    assert!(state.emergency_stop());
}

#[test]
fn operation_request_clears_the_latch() {
    let (dispatcher, state) = harness(1);

    dispatcher.dispatch(&stop_frame(1)).unwrap();
    assert!(state.emergency_stop());

    dispatcher.dispatch(&mode_frame(1, Mode::Operation)).unwrap();

    assert!(!state.emergency_stop());
    assert_eq!(state.mode(), Mode::Operation);
}

#[test]
fn stop_and_restart_cycle() {
    let (dispatcher, state) = harness(2);

    // Commission, run, stop, re-arm, run again.
    dispatcher
        .dispatch(
            &StartHoming {
                segment_id: 2,
                homing_mode: 0x01,
            }
            .encode(),
        )
        .unwrap();
    assert_eq!(state.mode(), Mode::Homing);

    dispatcher.dispatch(&mode_frame(2, Mode::Operation)).unwrap();
    assert_eq!(state.mode(), Mode::Operation);

    dispatcher.dispatch(&stop_frame(BROADCAST_SEGMENT_ID)).unwrap();
    assert_eq!(state.mode(), Mode::Idle);
    assert!(state.emergency_stop());

    dispatcher.dispatch(&mode_frame(2, Mode::Operation)).unwrap();
    assert_eq!(state.mode(), Mode::Operation);
    assert!(!state.emergency_stop());

    assert_eq!(state.error_count(), 0);
    assert_eq!(state.last_error(), ErrorCode::NoError);
}
