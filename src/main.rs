//! End-to-end walkthrough: an authoritative store, two mirrors, and a
//! one-shot snapshot, all over the in-memory hub.

use mirror_bridge::{
    BridgeConfig, DispatchError, MemoryHub, MemoryStore, Message, MirrorConfig, MirrorLink,
    MirrorStore, StateSource, StoreBridge,
};
use mirror_diff::DeepDiff;
use mirror_state::{Action, Primitive, StateMap, Value};
use std::sync::Arc;
use std::time::Duration;

fn main() {
    tracing_subscriber::fmt::init();

    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(demo());
}

fn initial_state() -> StateMap {
    let mut settings = StateMap::new();
    settings.insert("theme".to_string(), Value::from("dark"));

    let mut state = StateMap::new();
    state.insert("count".to_string(), Value::from(0));
    state.insert("settings".to_string(), Value::Mapping(settings));
    state
}

fn reducer(state: &mut StateMap, action: &Action) -> Result<Value, DispatchError> {
    match action.kind.as_str() {
        "increment" => {
            let step = match &action.payload {
                Value::Primitive(Primitive::Int(n)) => *n,
                _ => 1,
            };
            let current = match state.get("count") {
                Some(Value::Primitive(Primitive::Int(n))) => *n,
                _ => 0,
            };
            state.insert("count".to_string(), Value::from(current + step));
            Ok(Value::from(current + step))
        }
        "set-theme" => {
            match state.get_mut("settings") {
                Some(Value::Mapping(settings)) => {
                    settings.insert("theme".to_string(), action.payload.clone());
                }
                _ => return Err(DispatchError::Rejected("no settings".to_string())),
            }
            Ok(action.payload.clone())
        }
        other => Err(DispatchError::Rejected(format!("unknown action: {}", other))),
    }
}

async fn demo() {
    println!("=== mirrorstore demo ===\n");

    let store = Arc::new(MemoryStore::new(initial_state(), reducer));
    let hub = Arc::new(MemoryHub::new());

    let config = BridgeConfig::builder("demo-app")
        .diff_strategy(DeepDiff::new())
        .allow_one_shot_connections(true)
        .build()
        .unwrap();
    let bridge = StoreBridge::spawn(store.clone(), hub.as_ref(), config).unwrap();

    // Two mirrors attach; each bootstraps from the full state.
    let alice = MirrorStore::connect(hub.clone(), MirrorConfig::new("demo-app"))
        .await
        .unwrap();
    let bob = MirrorStore::connect(hub.clone(), MirrorConfig::new("demo-app"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    println!("attached mirrors: {}", bridge.session_count());
    println!("alice bootstrap: {:?}\n", alice.get_state());

    // A mirror dispatches; the authoritative store mutates; both
    // mirrors converge via patches.
    let value = alice
        .dispatch(Action::new("increment", Value::from(3)))
        .await
        .unwrap();
    println!("dispatch outcome: {:?}", value);

    bob.dispatch(Action::new("set-theme", Value::from("light")))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    println!("authoritative: {:?}", store.get_state());
    println!("alice:         {:?}", alice.get_state());
    println!("bob:           {:?}\n", bob.get_state());

    // A rejected dispatch comes back as data, not a crash.
    let failure = bob.dispatch(Action::new("explode", Value::null())).await;
    println!("rejected dispatch: {:?}\n", failure);

    // A one-shot connection gets a single snapshot and nothing more.
    let reply = hub.request(Message::Connect).await.unwrap();
    println!("one-shot snapshot: {:?}\n", reply);

    // Disconnecting detaches the session on the authoritative side.
    bob.disconnect();
    drop(bob);
    tokio::time::sleep(Duration::from_millis(50)).await;
    println!(
        "attached mirrors after disconnect: {}",
        bridge.session_count()
    );

    bridge.shutdown();
    println!("\ndemo complete");
}
