use huddle_core::{ClientMessage, RoomId, ServerMessage, UserId};
use serde_json::json;

use crate::utils::{TestPeer, create_relay, init_tracing};

fn offer_to(target: &str, from: &str) -> ClientMessage {
    ClientMessage::WebrtcOffer {
        offer: json!({"type": "offer", "sdp": "v=0 mock"}),
        target_user_id: UserId::from(target),
        from_user_id: UserId::from(from),
    }
}

#[tokio::test]
async fn offer_reaches_only_the_target() {
    init_tracing();
    let (relay, _store) = create_relay();
    let room = RoomId::from("ABC123");

    let mut alice = TestPeer::join(&relay, &room, "alice").await;
    let mut bob = TestPeer::join(&relay, &room, "bob").await;
    let mut carol = TestPeer::join(&relay, &room, "carol").await;
    let _ = alice.recv().await.unwrap();
    let _ = alice.recv().await.unwrap();
    let _ = bob.recv().await.unwrap();

    alice.send(&relay, offer_to("bob", "alice")).await;

    let msg = bob.recv().await.expect("bob should get the offer");
    let ServerMessage::WebrtcOffer {
        offer,
        target_user_id,
        from_user_id,
    } = msg
    else {
        panic!("expected forwarded offer");
    };
    assert_eq!(offer["sdp"], "v=0 mock");
    assert_eq!(target_user_id, UserId::from("bob"));
    assert_eq!(from_user_id, UserId::from("alice"));

    carol.assert_silent().expect("directed messages do not fan out");
    alice.assert_silent().expect("sender gets no copy");
}

#[tokio::test]
async fn answer_and_candidate_follow_the_same_route() {
    init_tracing();
    let (relay, _store) = create_relay();
    let room = RoomId::from("ABC123");

    let mut alice = TestPeer::join(&relay, &room, "alice").await;
    let bob = TestPeer::join(&relay, &room, "bob").await;
    let _ = alice.recv().await.unwrap();

    bob.send(
        &relay,
        ClientMessage::WebrtcAnswer {
            answer: json!({"type": "answer", "sdp": "v=0 reply"}),
            target_user_id: alice.user.clone(),
            from_user_id: bob.user.clone(),
        },
    )
    .await;
    bob.send(
        &relay,
        ClientMessage::IceCandidate {
            candidate: json!({"candidate": "candidate:0"}),
            target_user_id: alice.user.clone(),
            from_user_id: bob.user.clone(),
        },
    )
    .await;

    assert!(matches!(
        alice.recv().await.unwrap(),
        ServerMessage::WebrtcAnswer { .. }
    ));
    assert!(matches!(
        alice.recv().await.unwrap(),
        ServerMessage::IceCandidate { .. }
    ));
}

#[tokio::test]
async fn directed_message_to_unknown_user_is_silently_dropped() {
    init_tracing();
    let (relay, _store) = create_relay();
    let room = RoomId::from("ABC123");

    let mut alice = TestPeer::join(&relay, &room, "alice").await;

    alice.send(&relay, offer_to("nobody", "alice")).await;

    // No error comes back and the connection keeps working.
    alice.assert_silent().expect("no error surfaced to sender");
    let mut bob = TestPeer::join(&relay, &room, "bob").await;
    assert!(matches!(
        alice.recv().await.unwrap(),
        ServerMessage::UserJoined { .. }
    ));
    bob.assert_silent().unwrap();
}

#[tokio::test]
async fn forwarding_ignores_room_boundaries_only_by_exact_user_match() {
    init_tracing();
    let (relay, _store) = create_relay();

    let alice = TestPeer::join(&relay, &RoomId::from("ROOM-A"), "alice").await;
    let mut bob = TestPeer::join(&relay, &RoomId::from("ROOM-B"), "bob").await;

    // Case-sensitive exact match: "Bob" is not "bob".
    alice.send(&relay, offer_to("Bob", "alice")).await;
    bob.assert_silent().expect("near-miss target must not match");

    alice.send(&relay, offer_to("bob", "alice")).await;
    assert!(matches!(
        bob.recv().await.unwrap(),
        ServerMessage::WebrtcOffer { .. }
    ));
}
