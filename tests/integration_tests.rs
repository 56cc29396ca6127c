//! Integration tests for cross-tree interactions.
//!
//! Producer and consumer trees talk over the in-memory loopback network:
//! fetching, on-demand production, cache answers, re-expression, sync
//! between trees, shutdown, and the crypto collaborators wired into the
//! pipelines.

use bytes::Bytes;
use nametree_core::object::as_blob;
use nametree_core::{
    BlobObject, Data, Interest, InterestOutcome, MetaInfo, NackReason, Namespace, NamespaceError,
    NamespaceState, NamespaceValidateState, OnDeserialized, PendingInterestTable, Signer,
    SyncDepth, Transport, TreeConfig,
};
use nametree_crypto::{
    AeadKey, ContentDecryptor, ContentEncryptor, Ed25519Signer, Ed25519Validator, SigningKey,
};
use nametree_integration_tests::fixtures::{
    LoopbackNetwork, RecordingChannel, StateRecorder, SyncHub, TwoTreeFixture, name,
};
use nametree_integration_tests::init_tracing;
use parking_lot::Mutex;
use rand_core::OsRng;
use std::sync::Arc;
use std::time::Duration;

fn blob_text(node: &Namespace) -> Option<Vec<u8>> {
    node.object()
        .as_ref()
        .and_then(as_blob)
        .map(|bytes| bytes.to_vec())
}

// ============================================================================
// Fetching
// ============================================================================

#[test]
fn test_fetch_round_trip() {
    init_tracing();
    let fixture = TwoTreeFixture::new(&name("/app")).unwrap();
    fixture.publish(&name("/app/doc"), b"hello").unwrap();

    let node = fixture.consumer_node(&name("/app/doc")).unwrap();
    let recorder = StateRecorder::attach(&fixture.consumer);
    node.object_needed(false).unwrap();

    assert_eq!(node.state(), NamespaceState::ObjectReady);
    assert_eq!(blob_text(&node).unwrap(), b"hello");
    assert_eq!(node.validate_state(), NamespaceValidateState::ValidateSuccess);
    assert_eq!(
        recorder.states_of(&name("/app/doc")),
        vec![
            NamespaceState::InterestExpressed,
            NamespaceState::DataReceived,
            NamespaceState::ObjectReady,
        ]
    );
    assert_eq!(fixture.network.expressed().len(), 1);
    assert_eq!(fixture.network.outstanding(), 0);
    fixture.cleanup();
}

#[test]
fn test_cache_hit_reannounces_without_interest() {
    let fixture = TwoTreeFixture::new(&name("/app")).unwrap();
    fixture.publish(&name("/app/doc"), b"hello").unwrap();

    let node = fixture.consumer_node(&name("/app/doc")).unwrap();
    node.object_needed(false).unwrap();
    let recorder = StateRecorder::attach(&node);

    node.object_needed(false).unwrap();
    assert_eq!(fixture.network.expressed().len(), 1);
    assert_eq!(
        recorder.states_of(&name("/app/doc")),
        vec![NamespaceState::ObjectReady]
    );
}

#[test]
fn test_subtree_request_returns_greatest_longest_match() {
    let fixture = TwoTreeFixture::new(&name("/app")).unwrap();
    fixture.publish(&name("/app/video/seg0"), b"zero").unwrap();
    fixture.publish(&name("/app/video/seg1"), b"one").unwrap();

    let video = fixture.consumer_node(&name("/app/video")).unwrap();
    video.object_needed(false).unwrap();

    // The requester sees the arrival; the object lands on the Data's node.
    assert_eq!(video.state(), NamespaceState::DataReceived);
    assert!(video.object().is_none());
    let seg1 = fixture.consumer_node(&name("/app/video/seg1")).unwrap();
    assert_eq!(seg1.state(), NamespaceState::ObjectReady);
    assert_eq!(blob_text(&seg1).unwrap(), b"one");
    assert!(!fixture.consumer.has_descendant(&name("/app/video/seg0")).unwrap());
}

#[test]
fn test_on_demand_production_answers_pending_interest() {
    let fixture = TwoTreeFixture::new(&name("/app")).unwrap();
    let requested: Arc<Mutex<Vec<Namespace>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&requested);
    fixture
        .producer
        .add_on_object_needed(move |_, needed, _| {
            sink.lock().push(needed.clone());
            true
        })
        .unwrap();

    let node = fixture.consumer_node(&name("/app/live")).unwrap();
    node.object_needed(false).unwrap();
    assert_eq!(node.state(), NamespaceState::InterestExpressed);
    assert_eq!(fixture.network.outstanding(), 1);

    let needed = requested.lock().pop().unwrap();
    assert_eq!(needed.name(), name("/app/live"));
    assert_eq!(needed.state(), NamespaceState::ProducingObject);

    needed
        .serialize_object(BlobObject::object(&b"live frame"[..]))
        .unwrap();
    assert_eq!(needed.state(), NamespaceState::ObjectReady);
    assert_eq!(node.state(), NamespaceState::ObjectReady);
    assert_eq!(blob_text(&node).unwrap(), b"live frame");
    assert_eq!(fixture.network.outstanding(), 0);
}

#[test]
fn test_producer_to_cache_round_trip() {
    let fixture = TwoTreeFixture::new(&name("/app")).unwrap();
    let produced = fixture.publish(&name("/app/doc"), b"payload").unwrap();

    let received = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&received);
    let transport: Arc<dyn Transport> = fixture.network.clone();
    transport
        .express_interest(
            Interest::new(name("/app/doc")),
            Box::new(move |outcome| *sink.lock() = Some(outcome)),
        )
        .unwrap();
    let outcome = received.lock().take();
    match outcome {
        Some(InterestOutcome::Data(data)) => assert_eq!(Some(data), produced.data()),
        other => panic!("expected Data, got {other:?}"),
    }

    let consumer = fixture.consumer_node(&name("/app/doc")).unwrap();
    consumer.object_needed(false).unwrap();
    assert_eq!(blob_text(&consumer), blob_text(&produced));
    assert_eq!(consumer.data(), produced.data());
}

#[test]
fn test_pending_table_answers_each_channel_once() {
    let mut table = PendingInterestTable::new();
    let first = RecordingChannel::new();
    let second = RecordingChannel::new();
    table.add(Interest::new(name("/app/doc")), first.clone());
    table.add(Interest::new(name("/app")), second.clone());
    table.add(Interest::new(name("/app/other")), RecordingChannel::new());

    let data = Data::new(name("/app/doc/v1"), &b"x"[..]);
    assert_eq!(table.satisfy_interests(&data), 2);
    assert_eq!(table.satisfy_interests(&data), 0);
    assert_eq!(table.len(), 1);
    assert_eq!(first.sent(), vec![data.clone()]);
    assert_eq!(second.sent(), vec![data]);
}

// ============================================================================
// Failure outcomes
// ============================================================================

#[test]
fn test_no_route_is_network_nack() {
    let network = LoopbackNetwork::new();
    let consumer = Namespace::new(name("/app"));
    consumer.set_transport(network.clone(), false).unwrap();

    let node = consumer.get_child("missing").unwrap();
    node.object_needed(false).unwrap();
    assert_eq!(node.state(), NamespaceState::InterestNetworkNack);
    assert_eq!(node.network_nack().unwrap().reason, NackReason::NoRoute);
}

#[test]
fn test_timeouts_reexpress_with_doubling_lifetime() {
    let fixture = TwoTreeFixture::new(&name("/app")).unwrap();
    let node = fixture.consumer_node(&name("/app/never")).unwrap();
    node.object_needed(false).unwrap();

    assert_eq!(fixture.network.time_out_outstanding(), 1);
    assert_eq!(node.state(), NamespaceState::InterestExpressed);
    assert_eq!(fixture.network.time_out_outstanding(), 1);
    assert_eq!(node.state(), NamespaceState::InterestExpressed);
    assert_eq!(fixture.network.time_out_outstanding(), 1);
    assert_eq!(node.state(), NamespaceState::InterestTimeout);
    assert_eq!(fixture.network.outstanding(), 0);

    let lifetimes: Vec<_> = fixture
        .network
        .expressed()
        .iter()
        .map(|interest| interest.lifetime())
        .collect();
    assert_eq!(
        lifetimes,
        vec![
            Some(Duration::from_secs(4)),
            Some(Duration::from_secs(8)),
            Some(Duration::from_secs(16)),
        ]
    );
}

#[test]
fn test_configured_lifetimes_and_node_cap() {
    let config = TreeConfig::from_toml_str(
        "interest_lifetime = 1000\ndefault_max_interest_lifetime = 2000\n",
    )
    .unwrap();
    let network = LoopbackNetwork::new();
    let producer = Namespace::new(name("/app"));
    producer.set_transport(network.clone(), true).unwrap();
    let consumer = Namespace::with_config(name("/app"), config).unwrap();
    consumer.set_transport(network.clone(), false).unwrap();

    let node = consumer.get_child("a").unwrap();
    node.object_needed(false).unwrap();
    while network.time_out_outstanding() > 0 {}
    assert_eq!(node.state(), NamespaceState::InterestTimeout);
    assert_eq!(network.expressed().len(), 2);

    // A node-level cap overrides the configured default.
    let capped = consumer.get_child("b").unwrap();
    capped.set_max_interest_lifetime(Duration::from_millis(1000));
    capped.object_needed(false).unwrap();
    while network.time_out_outstanding() > 0 {}
    assert_eq!(capped.state(), NamespaceState::InterestTimeout);
    assert_eq!(network.expressed().len(), 3);
}

#[test]
fn test_closed_transport_is_reported() {
    let fixture = TwoTreeFixture::new(&name("/app")).unwrap();
    fixture.network.close();

    let node = fixture.consumer_node(&name("/app/doc")).unwrap();
    assert!(matches!(
        node.object_needed(false),
        Err(NamespaceError::Transport(_))
    ));
}

#[test]
fn test_fresh_request_skips_stale_cache() {
    let fixture = TwoTreeFixture::new(&name("/app")).unwrap();
    fixture
        .producer
        .set_new_data_meta_info(MetaInfo::with_freshness_period(Duration::ZERO));
    fixture.publish(&name("/app/doc"), b"v1").unwrap();

    let node = fixture.consumer_node(&name("/app/doc")).unwrap();
    node.object_needed(false).unwrap();
    assert_eq!(fixture.network.expressed().len(), 1);

    // Stale everywhere, so the fresh request waits at the producer.
    node.object_needed(true).unwrap();
    assert_eq!(fixture.network.expressed().len(), 2);
    assert!(fixture.network.expressed()[1].must_be_fresh());
    assert_eq!(fixture.network.outstanding(), 1);

    node.object_needed(false).unwrap();
    assert_eq!(fixture.network.expressed().len(), 2);
}

// ============================================================================
// Handlers
// ============================================================================

#[test]
fn test_consumer_deserializer_builds_typed_object() {
    let fixture = TwoTreeFixture::new(&name("/app")).unwrap();
    fixture.publish(&name("/app/greeting"), b"bonjour").unwrap();

    fixture
        .consumer
        .add_on_deserialize_needed(|_, content: &Bytes, on_deserialized: OnDeserialized, _| {
            let text = String::from_utf8_lossy(content).to_uppercase();
            on_deserialized(Arc::new(text) as nametree_core::Object);
            true
        })
        .unwrap();

    let node = fixture.consumer_node(&name("/app/greeting")).unwrap();
    node.object_needed(false).unwrap();
    let object = node.object().unwrap();
    assert_eq!(object.downcast_ref::<String>().unwrap(), "BONJOUR");
}

// ============================================================================
// Sync
// ============================================================================

#[test]
fn test_sync_spreads_names_between_trees() {
    let hub = SyncHub::new();
    let alice = Namespace::new(name("/chat"));
    let bob = Namespace::new(name("/chat"));
    for tree in [&alice, &bob] {
        tree.set_sync_provider(hub.provider()).unwrap();
        tree.enable_sync(None).unwrap();
    }
    let group = name("/nametree-sync");
    assert_eq!(hub.member_count(&group), 2);

    let recorder = StateRecorder::attach(&bob);
    alice.get_descendant(&name("/chat/alice/msg1")).unwrap();

    assert!(bob.has_descendant(&name("/chat/alice/msg1")).unwrap());
    assert_eq!(
        recorder.states_of(&name("/chat/alice/msg1")),
        vec![NamespaceState::NameExists]
    );
    // Names learned from the group are not published back.
    assert_eq!(hub.names(&group), vec![name("/chat/alice/msg1")]);

    bob.get_child("bob").unwrap();
    assert!(alice.has_descendant(&name("/chat/bob")).unwrap());
}

#[test]
fn test_sync_depth_limits_published_names() {
    let hub = SyncHub::new();
    let alice = Namespace::new(name("/chat"));
    let bob = Namespace::new(name("/chat"));
    alice.set_sync_provider(hub.provider()).unwrap();
    bob.set_sync_provider(hub.provider()).unwrap();
    alice.enable_sync(Some(SyncDepth::Limited(1))).unwrap();
    bob.enable_sync(None).unwrap();

    alice.get_child("room").unwrap();
    alice.get_descendant(&name("/chat/room/msg")).unwrap();

    assert!(bob.has_descendant(&name("/chat/room")).unwrap());
    assert!(!bob.has_descendant(&name("/chat/room/msg")).unwrap());
}

#[test]
fn test_sync_ignores_names_outside_tree() {
    let hub = SyncHub::new();
    let chat = Namespace::new(name("/chat"));
    let other = Namespace::new(name("/other"));
    for tree in [&chat, &other] {
        tree.set_sync_provider(hub.provider()).unwrap();
        tree.enable_sync(None).unwrap();
    }

    chat.get_child("msg").unwrap();
    assert_eq!(other.tree_size(), 1);
}

#[test]
fn test_sync_join_failure() {
    let hub = SyncHub::new();
    hub.refuse_joins();
    let tree = Namespace::new(name("/chat"));
    tree.set_sync_provider(hub.provider()).unwrap();
    assert!(matches!(
        tree.enable_sync(None),
        Err(NamespaceError::Sync(_))
    ));

    let child = tree.get_child("x").unwrap();
    assert!(matches!(
        child.set_sync_provider(hub.provider()),
        Err(NamespaceError::NotRoot(_))
    ));
}

// ============================================================================
// Shutdown
// ============================================================================

#[test]
fn test_producer_shutdown_withdraws_prefix() {
    let fixture = TwoTreeFixture::new(&name("/app")).unwrap();
    fixture.publish(&name("/app/doc"), b"hello").unwrap();
    assert_eq!(fixture.network.route_count(), 1);

    fixture.producer.shutdown().unwrap();
    assert_eq!(fixture.network.route_count(), 0);

    let node = fixture.consumer_node(&name("/app/doc")).unwrap();
    node.object_needed(false).unwrap();
    assert_eq!(node.state(), NamespaceState::InterestNetworkNack);
}

#[test]
fn test_consumer_shutdown_stops_everything() {
    let fixture = TwoTreeFixture::new(&name("/app")).unwrap();
    fixture.publish(&name("/app/doc"), b"hello").unwrap();
    let node = fixture.consumer_node(&name("/app/doc")).unwrap();
    node.object_needed(false).unwrap();

    fixture.consumer.shutdown().unwrap();
    assert!(node.is_shut_down());

    // Reads still work, mutations are ignored, navigation fails.
    assert_eq!(blob_text(&node).unwrap(), b"hello");
    node.object_needed(false).unwrap();
    node.set_state(NamespaceState::NameExists);
    assert_eq!(node.state(), NamespaceState::ObjectReady);
    assert_eq!(fixture.network.expressed().len(), 1);
    assert!(matches!(
        fixture.consumer.get_child("x"),
        Err(NamespaceError::ShutDown(_))
    ));
    assert!(matches!(node.parent(), Err(NamespaceError::ShutDown(_))));
}

#[test]
fn test_shutdown_during_pending_fetch() {
    let fixture = TwoTreeFixture::new(&name("/app")).unwrap();
    let node = fixture.consumer_node(&name("/app/slow")).unwrap();
    node.object_needed(false).unwrap();

    fixture.consumer.shutdown().unwrap();
    while fixture.network.time_out_outstanding() > 0 {}
    assert_eq!(node.state(), NamespaceState::InterestExpressed);
    assert_eq!(fixture.network.expressed().len(), 3);
}

// ============================================================================
// Crypto collaborators
// ============================================================================

#[test]
fn test_encrypted_signed_round_trip() {
    let fixture = TwoTreeFixture::new(&name("/app")).unwrap();
    let content_key_name = name("/app/KEYS/CK/1");
    let content_key = AeadKey::generate(&mut OsRng);
    let signing_key_name = name("/app/KEYS/ID/1");
    let signer = Ed25519Signer::new(signing_key_name.clone(), SigningKey::generate(&mut OsRng));

    let encryptor = ContentEncryptor::new(content_key_name.clone(), content_key.clone());
    let mut data = encryptor
        .encrypt_data(name("/app/secret"), b"attack at dawn")
        .unwrap();
    signer.sign(&mut data).unwrap();
    fixture
        .producer
        .get_child("secret")
        .unwrap()
        .set_data(data)
        .unwrap();

    let decryptor = ContentDecryptor::new();
    decryptor.add_key(content_key_name, content_key);
    let validator = Ed25519Validator::new();
    validator.trust(signing_key_name, signer.verifying_key());
    fixture.consumer.set_decryptor(Arc::new(decryptor));
    fixture.consumer.set_validator(Arc::new(validator));

    let node = fixture.consumer_node(&name("/app/secret")).unwrap();
    let recorder = StateRecorder::attach(&node);
    node.object_needed(false).unwrap();

    assert_eq!(node.state(), NamespaceState::ObjectReady);
    assert_eq!(node.validate_state(), NamespaceValidateState::ValidateSuccess);
    assert_eq!(blob_text(&node).unwrap(), b"attack at dawn");
    assert_eq!(
        recorder.states_of(&name("/app/secret")),
        vec![
            NamespaceState::InterestExpressed,
            NamespaceState::DataReceived,
            NamespaceState::Decrypting,
            NamespaceState::ObjectReady,
        ]
    );
}

#[test]
fn test_missing_content_key_is_decryption_error() {
    let fixture = TwoTreeFixture::new(&name("/app")).unwrap();
    let encryptor = ContentEncryptor::new(name("/app/KEYS/CK/1"), AeadKey::new([4u8; 32]));
    let data = encryptor.encrypt_data(name("/app/secret"), b"x").unwrap();
    fixture
        .producer
        .get_child("secret")
        .unwrap()
        .set_data(data)
        .unwrap();
    fixture
        .consumer
        .set_decryptor(Arc::new(ContentDecryptor::new()));

    let node = fixture.consumer_node(&name("/app/secret")).unwrap();
    node.object_needed(false).unwrap();
    assert_eq!(node.state(), NamespaceState::DecryptionError);
    assert!(node.decryption_error().unwrap().contains("NoDecryptKey"));
    assert!(node.object().is_none());
}

#[test]
fn test_plain_content_with_decryptor_is_bad_envelope() {
    let fixture = TwoTreeFixture::new(&name("/app")).unwrap();
    fixture.publish(&name("/app/plain"), b"not encrypted").unwrap();
    fixture
        .consumer
        .set_decryptor(Arc::new(ContentDecryptor::new()));

    let node = fixture.consumer_node(&name("/app/plain")).unwrap();
    node.object_needed(false).unwrap();
    assert_eq!(node.state(), NamespaceState::DecryptionError);
    assert!(
        node.decryption_error()
            .unwrap()
            .starts_with("Error decoding the EncryptedContent")
    );
}

#[test]
fn test_ed25519_producer_and_untrusting_consumer() {
    let fixture = TwoTreeFixture::new(&name("/app")).unwrap();
    let key_name = name("/app/KEYS/ID/1");
    let signer = Ed25519Signer::new(key_name.clone(), SigningKey::generate(&mut OsRng));
    let verifying_key = signer.verifying_key();

    let signed_subtree = fixture.producer.get_child("signed").unwrap();
    signed_subtree.set_signer(Arc::new(signer));
    fixture.publish(&name("/app/signed/doc"), b"mine").unwrap();

    // Trusted consumer validates.
    let trusted = fixture.consumer_node(&name("/app/signed")).unwrap();
    let validator = Ed25519Validator::new();
    validator.trust(key_name, verifying_key);
    trusted.set_validator(Arc::new(validator));
    let doc = fixture.consumer_node(&name("/app/signed/doc")).unwrap();
    doc.object_needed(false).unwrap();
    assert_eq!(doc.validate_state(), NamespaceValidateState::ValidateSuccess);

    // The root digest validator rejects the Ed25519 signature, without
    // holding back the object.
    let other = TwoTreeFixture::new(&name("/app")).unwrap();
    let other_signer = Ed25519Signer::new(name("/app/KEYS/ID/2"), SigningKey::generate(&mut OsRng));
    other
        .producer
        .get_child("signed")
        .unwrap()
        .set_signer(Arc::new(other_signer));
    other.publish(&name("/app/signed/doc"), b"theirs").unwrap();
    let untrusted = other.consumer_node(&name("/app/signed/doc")).unwrap();
    untrusted.object_needed(false).unwrap();
    assert_eq!(untrusted.validate_state(), NamespaceValidateState::ValidateFailure);
    assert!(untrusted.validation_error().is_some());
    assert_eq!(untrusted.state(), NamespaceState::ObjectReady);
}

#[test]
fn test_data_for_wrong_node_rejected() {
    let tree = Namespace::new(name("/app"));
    let node = tree.get_child("a").unwrap();
    let data = Data::new(name("/app/b"), &b"x"[..]);
    assert!(matches!(
        node.set_data(data),
        Err(NamespaceError::NameMismatch { .. })
    ));
}
