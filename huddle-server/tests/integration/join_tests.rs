use huddle_core::{RoomId, ServerMessage, UserId};

use crate::utils::{StoreOp, TestPeer, create_relay, init_tracing};

#[tokio::test]
async fn join_notifies_existing_members_but_not_joiner() {
    init_tracing();
    let (relay, _store) = create_relay();
    let room = RoomId::from("ABC123");

    let mut alice = TestPeer::join(&relay, &room, "alice").await;
    alice.assert_silent().expect("first joiner hears nothing");

    let mut bob = TestPeer::join(&relay, &room, "bob").await;

    let msg = alice.recv().await.expect("alice should be notified");
    assert_eq!(
        msg,
        ServerMessage::UserJoined {
            user_id: UserId::from("bob"),
            user_name: "bob".to_string(),
        }
    );
    bob.assert_silent().expect("joiner gets no echo of its own join");
}

#[tokio::test]
async fn join_is_scoped_to_one_room() {
    init_tracing();
    let (relay, _store) = create_relay();

    let mut alice = TestPeer::join(&relay, &RoomId::from("ROOM-A"), "alice").await;
    let _bob = TestPeer::join(&relay, &RoomId::from("ROOM-B"), "bob").await;

    alice
        .assert_silent()
        .expect("joins in other rooms are invisible");
}

#[tokio::test]
async fn join_records_participant_before_broadcast_side() {
    init_tracing();
    let (relay, store) = create_relay();
    let room = RoomId::from("ABC123");

    TestPeer::join(&relay, &room, "alice").await;

    let ops = store.ops().await;
    assert_eq!(
        ops,
        vec![StoreOp::AddParticipant {
            room: room.clone(),
            user: UserId::from("alice"),
        }]
    );
}

#[tokio::test]
async fn rejoining_replaces_the_room_binding() {
    init_tracing();
    let (relay, _store) = create_relay();
    let room_a = RoomId::from("ROOM-A");
    let room_b = RoomId::from("ROOM-B");

    let mut mover = TestPeer::join(&relay, &room_a, "mover").await;
    let mut watcher_a = TestPeer::join(&relay, &room_a, "watcher-a").await;
    let _ = mover.recv().await.expect("mover sees watcher-a join");

    // Same connection joins a different room: old binding replaced.
    TestPeer::join(&relay, &room_b, "other").await;
    mover
        .send(
            &relay,
            huddle_core::ClientMessage::JoinRoom {
                room_id: room_b.clone(),
                user_id: mover.user.clone(),
                user_name: "mover".to_string(),
            },
        )
        .await;

    assert_eq!(relay.registry().members(&room_a).len(), 1);
    assert_eq!(relay.registry().members(&room_b).len(), 2);
    watcher_a.assert_silent().expect("no leave broadcast on rebind");
}
