//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::{Map, Value};

use chorus_core::{AgentBuilder, AgentKind, Ed25519PublicKey, Keypair, RecordId, TrackBuilder};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random RecordId.
pub fn record_id() -> impl Strategy<Value = RecordId> {
    any::<[u8; 32]>().prop_map(RecordId::from_bytes)
}

/// Generate a random Ed25519PublicKey.
pub fn public_key() -> impl Strategy<Value = Ed25519PublicKey> {
    keypair().prop_map(|kp| kp.public_key())
}

pub fn agent_kind() -> impl Strategy<Value = AgentKind> {
    prop_oneof![
        Just(AgentKind::Person),
        Just(AgentKind::MusicGroup),
        Just(AgentKind::Organization),
    ]
}

/// Generate a display name.
pub fn name() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{1,12}( [A-Z][a-z]{1,12}){0,2}".prop_map(String::from)
}

pub fn email() -> impl Strategy<Value = String> {
    "[a-z]{1,10}@[a-z]{1,10}\\.(com|org|example)".prop_map(String::from)
}

/// Generate an agent record that passes the structural gate.
pub fn agent_record() -> impl Strategy<Value = (AgentKind, Keypair, Value)> {
    (agent_kind(), any::<[u8; 32]>(), name(), email()).prop_map(|(kind, seed, name, email)| {
        let keypair = Keypair::from_seed(&seed);
        let record = AgentBuilder::new(kind, name, email, keypair.public_key()).build();
        (kind, keypair, record)
    })
}

/// Generate a track record linked to `artist` and `publisher`.
pub fn track_record(artist: RecordId, publisher: RecordId) -> impl Strategy<Value = Value> {
    (name(), 1u32..=3600).prop_map(move |(title, secs)| {
        TrackBuilder::new(title, artist)
            .publisher(publisher)
            .duration(format!("PT{}M{}S", secs / 60, secs % 60))
            .build()
    })
}

/// Generate an arbitrary float-free JSON value.
pub fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        any::<u64>().prop_map(Value::from),
        "\\PC{0,16}".prop_map(Value::String),
    ];

    leaf.prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
            prop::collection::btree_map("[a-zA-Z@]{1,10}", inner, 0..8)
                .prop_map(|m| Value::Object(m.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

/// Generate an arbitrary float-free JSON object.
pub fn json_record() -> impl Strategy<Value = Value> {
    prop::collection::btree_map("[a-zA-Z@]{1,10}", json_value(), 0..10)
        .prop_map(|m| Value::Object(m.into_iter().collect()))
}
