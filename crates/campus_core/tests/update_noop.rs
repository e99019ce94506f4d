use campus_core::{update, AppState, Msg};

#[test]
fn update_is_noop() {
    let state = AppState::new("http://localhost:8000");
    let (next, effects) = update(state.clone(), Msg::NoOp);

    assert_eq!(state, next);
    assert!(effects.is_empty());
}
