#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::collections::{HashMap, HashSet};

use common::{of_type, World};
use forumhub_core::protocol::ClientEvent;
use forumhub_core::{ForumId, TopicId};
use forumhub_gateway::presence::Location;

fn f(n: u32) -> ForumId {
    ForumId::from(n)
}

fn t(n: u32) -> TopicId {
    TopicId::from(n)
}

#[test]
fn first_visitor_gets_snapshot_exactly_once() {
    let w = World::new(3);
    let mut c1 = w.connect("9.9.9.9");

    c1.hub.enter_forum(f(1)).unwrap();

    let frames = c1.drain();
    assert_eq!(frames.len(), 1, "no double send: {frames:?}");
    assert_eq!(frames[0]["type"], "TotalConnectedUsers");
    assert_eq!(frames[0]["data"]["forum_count"], 1);
    assert!(frames[0]["data"]["topics"].as_object().unwrap().is_empty());
}

#[test]
fn duplicate_ip_replies_to_caller_only() {
    let w = World::new(3);
    let mut c1 = w.connect("9.9.9.9");
    let mut c2 = w.connect("9.9.9.9");

    c1.hub.enter_forum(f(1)).unwrap();
    c1.drain();

    c2.hub.enter_forum(f(1)).unwrap();

    let direct = c2.drain();
    assert_eq!(direct.len(), 1);
    assert_eq!(direct[0]["data"]["forum_count"], 1);
    assert!(c1.drain().is_empty(), "duplicate ip must not re-notify the forum");
    assert_eq!(w.registry.forum_connection_count(f(1)), Some(2));
}

#[test]
fn new_ip_is_broadcast_to_the_forum() {
    let w = World::new(3);
    let mut a = w.connect("1.1.1.1");
    let mut b = w.connect("2.2.2.2");
    let mut elsewhere = w.connect("3.3.3.3");

    elsewhere.hub.enter_forum(f(2)).unwrap();
    a.hub.enter_forum(f(1)).unwrap();
    a.drain();
    elsewhere.drain();

    b.hub.enter_forum(f(1)).unwrap();

    let seen_by_a = a.drain();
    assert_eq!(seen_by_a.len(), 1);
    assert_eq!(seen_by_a[0]["data"]["forum_count"], 2);
    assert_eq!(b.drain().len(), 1);
    assert!(elsewhere.drain().is_empty());
}

#[test]
fn leave_forum_broadcasts_only_when_ip_disappears() {
    let w = World::new(1);
    let mut a1 = w.connect("1.1.1.1");
    let mut a2 = w.connect("1.1.1.1");
    let mut b = w.connect("2.2.2.2");
    for c in [&a1, &a2, &b] {
        c.hub.enter_forum(f(1)).unwrap();
    }
    a1.drain();
    a2.drain();
    b.drain();

    a1.hub.leave_forum(f(1)).unwrap();
    assert!(b.drain().is_empty(), "1.1.1.1 still present through a2");

    a2.hub.leave_forum(f(1)).unwrap();
    let frames = b.drain();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["type"], "TotalConnectedUsers");
    assert_eq!(frames[0]["data"]["forum_count"], 1);
    assert!(frames[0]["data"].get("topics").is_none());
    assert!(a1.drain().is_empty());
}

#[test]
fn enter_then_leave_restores_forum_count() {
    let w = World::new(2);
    let base = w.connect("5.5.5.5");
    base.hub.enter_forum(f(2)).unwrap();
    let before = w.registry.forum_distinct_count(f(2));

    let c = w.connect("6.6.6.6");
    c.hub.enter_forum(f(2)).unwrap();
    assert_eq!(w.registry.forum_distinct_count(f(2)), Some(2));
    c.hub.leave_forum(f(2)).unwrap();

    assert_eq!(w.registry.forum_distinct_count(f(2)), before);
}

#[test]
fn forum_count_matches_unique_ips_after_every_operation() {
    let w = World::new(1);
    let ips = ["10.0.0.1", "10.0.0.2", "10.0.0.3"];
    let clients: Vec<_> = (0..9).map(|i| w.connect(ips[i % ips.len()])).collect();
    let mut model: HashMap<usize, &str> = HashMap::new();

    // Deterministic pseudo-random walk.
    let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
    for _ in 0..400 {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        let i = (seed % clients.len() as u64) as usize;

        if model.contains_key(&i) {
            clients[i].hub.leave_forum(f(1)).unwrap();
            model.remove(&i);
        } else {
            clients[i].hub.enter_forum(f(1)).unwrap();
            model.insert(i, ips[i % ips.len()]);
        }

        let expected: HashSet<&str> = model.values().copied().collect();
        assert_eq!(w.registry.forum_distinct_count(f(1)), Some(expected.len()));
        assert_eq!(w.registry.forum_connection_count(f(1)), Some(model.len()));
    }
}

#[test]
fn enter_topic_is_idempotent_per_ip() {
    let w = World::new(1);
    let mut observer = w.connect("8.8.8.8");
    let c1 = w.connect("1.1.1.1");
    let c2 = w.connect("1.1.1.1");
    observer.hub.enter_forum(f(1)).unwrap();
    observer.drain();

    c1.hub.enter_topic(f(1), t(99)).unwrap();
    c1.hub.enter_topic(f(1), t(99)).unwrap();
    c2.hub.enter_topic(f(1), t(99)).unwrap();

    assert_eq!(w.registry.topic_connection_count(t(99)), Some(2));
    assert_eq!(w.registry.topic_distinct_count(t(99)), Some(1));

    let updates = observer.drain();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0]["type"], "UpdateCounterPost");
    assert_eq!(updates[0]["data"]["topic_id"], 99);
    assert_eq!(updates[0]["data"]["count"], 1);
}

#[test]
fn topic_counts_go_to_parent_forum_observers() {
    let w = World::new(2);
    let mut in_forum = w.connect("1.1.1.1");
    let mut other_forum = w.connect("2.2.2.2");
    let viewer = w.connect("3.3.3.3");
    in_forum.hub.enter_forum(f(1)).unwrap();
    other_forum.hub.enter_forum(f(2)).unwrap();
    in_forum.drain();
    other_forum.drain();

    viewer.hub.enter_topic(f(1), t(7)).unwrap();

    assert_eq!(of_type(&in_forum.drain(), "UpdateCounterPost").len(), 1);
    assert!(other_forum.drain().is_empty());
}

#[test]
fn topic_entry_is_removed_after_last_viewer_leaves() {
    let w = World::new(1);
    let mut observer = w.connect("8.8.8.8");
    let viewer = w.connect("1.1.1.1");
    observer.hub.enter_forum(f(1)).unwrap();
    viewer.hub.enter_topic(f(1), t(42)).unwrap();
    observer.drain();

    viewer.hub.leave_topic(f(1), t(42)).unwrap();

    assert!(!w.registry.is_topic_tracked(t(42)));
    assert_eq!(w.registry.topic_distinct_count(t(42)), None);
    let frames = observer.drain();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["data"]["count"], 0);
}

#[test]
fn forum_snapshot_lists_active_topics() {
    let w = World::new(1);
    let v1 = w.connect("1.1.1.1");
    let v2 = w.connect("2.2.2.2");
    v1.hub.enter_topic(f(1), t(10)).unwrap();
    v2.hub.enter_topic(f(1), t(10)).unwrap();

    let mut c = w.connect("3.3.3.3");
    c.hub.enter_forum(f(1)).unwrap();

    let frames = c.drain();
    assert_eq!(frames[0]["data"]["topics"]["10"], 2);
}

#[test]
fn disconnect_keeps_counts_while_ip_persists() {
    let w = World::new(5);
    let a = w.connect("1.1.1.1");
    let mut b = w.connect("1.1.1.1");
    let mut observer = w.connect("8.8.8.8");
    observer.hub.enter_forum(f(5)).unwrap();
    a.hub.enter_forum(f(5)).unwrap();
    b.hub.enter_forum(f(5)).unwrap();
    a.hub.enter_topic(f(5), t(99)).unwrap();
    b.hub.enter_topic(f(5), t(99)).unwrap();
    b.drain();
    observer.drain();

    w.drop_client(&a);

    assert_eq!(w.registry.forum_distinct_count(f(5)), Some(2));
    assert_eq!(w.registry.topic_distinct_count(t(99)), Some(1));
    assert!(b.drain().is_empty(), "no count changed, nothing to broadcast");
    assert!(observer.drain().is_empty());
}

#[test]
fn same_ip_tabs_keep_topic_counted_until_both_leave() {
    let w = World::new(1);
    let mut observer = w.connect("8.8.8.8");
    let a = w.connect("1.1.1.1");
    let b = w.connect("1.1.1.1");
    observer.hub.enter_forum(f(1)).unwrap();
    a.hub.enter_topic(f(1), t(4)).unwrap();
    b.hub.enter_topic(f(1), t(4)).unwrap();
    observer.drain();

    a.hub.leave_topic(f(1), t(4)).unwrap();
    assert_eq!(w.registry.topic_distinct_count(t(4)), Some(1));
    assert!(observer.drain().is_empty());

    b.hub.leave_topic(f(1), t(4)).unwrap();
    assert!(!w.registry.is_topic_tracked(t(4)));
    let frames = observer.drain();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["data"]["count"], 0);
}

#[test]
fn reentering_topic_under_another_forum_moves_its_parent() {
    let w = World::new(2);
    let mut old_parent = w.connect("1.1.1.1");
    let mut new_parent = w.connect("2.2.2.2");
    let viewer = w.connect("3.3.3.3");
    old_parent.hub.enter_forum(f(1)).unwrap();
    new_parent.hub.enter_forum(f(2)).unwrap();
    viewer.hub.enter_topic(f(1), t(9)).unwrap();

    viewer.hub.enter_topic(f(2), t(9)).unwrap();
    assert_eq!(
        w.registry.location(viewer.hub.connection_id()).topic.map(|s| s.forum),
        Some(f(2))
    );
    assert_eq!(w.registry.topic_distinct_count(t(9)), Some(1));
    old_parent.drain();
    new_parent.drain();

    w.drop_client(&viewer);

    assert!(old_parent.drain().is_empty());
    let frames = new_parent.drain();
    let topic = of_type(&frames, "UpdateCounterPost");
    assert_eq!(topic.len(), 1);
    assert_eq!(topic[0]["data"]["count"], 0);
}

#[test]
fn disconnect_matches_explicit_leaves() {
    fn setup(w: &World) -> (common::Client, common::Client, common::Client) {
        let a = w.connect("1.1.1.1");
        let b = w.connect("1.1.1.1");
        let c = w.connect("2.2.2.2");
        for x in [&a, &b, &c] {
            x.hub.enter_forum(f(5)).unwrap();
        }
        a.hub.enter_topic(f(5), t(99)).unwrap();
        c.hub.enter_topic(f(5), t(99)).unwrap();
        b.hub.enter_topic(f(5), t(12)).unwrap();
        (a, b, c)
    }

    let left = World::new(5);
    let (a1, _b1, _c1) = setup(&left);
    a1.hub.leave_topic(f(5), t(99)).unwrap();
    a1.hub.leave_forum(f(5)).unwrap();

    let dropped = World::new(5);
    let (a2, _b2, _c2) = setup(&dropped);
    dropped.drop_client(&a2);

    for w in [&left, &dropped] {
        assert_eq!(w.registry.forum_distinct_count(f(5)), Some(2));
        assert_eq!(w.registry.forum_connection_count(f(5)), Some(2));
        assert_eq!(w.registry.topic_distinct_count(t(99)), Some(1));
        assert_eq!(w.registry.topic_distinct_count(t(12)), Some(1));
    }
    assert_eq!(left.registry.stats(), dropped.registry.stats());
    assert_eq!(dropped.registry.location(a2.hub.connection_id()), Location::default());
}

#[test]
fn disconnect_of_last_topic_viewer_notifies_forum() {
    let w = World::new(5);
    let a = w.connect("1.1.1.1");
    let mut b = w.connect("2.2.2.2");
    a.hub.enter_forum(f(5)).unwrap();
    b.hub.enter_forum(f(5)).unwrap();
    a.hub.enter_topic(f(5), t(99)).unwrap();
    b.drain();

    w.drop_client(&a);

    assert!(!w.registry.is_topic_tracked(t(99)));
    let frames = b.drain();
    let forum = of_type(&frames, "TotalConnectedUsers");
    let topic = of_type(&frames, "UpdateCounterPost");
    assert_eq!(forum.len(), 1);
    assert_eq!(forum[0]["data"]["forum_count"], 1);
    assert_eq!(topic.len(), 1);
    assert_eq!(topic[0]["data"]["count"], 0);
}

#[test]
fn disconnect_after_leaving_forum_still_reaches_topic_parent() {
    let w = World::new(3);
    let a = w.connect("1.1.1.1");
    let mut observer = w.connect("2.2.2.2");
    observer.hub.enter_forum(f(3)).unwrap();
    a.hub.enter_forum(f(3)).unwrap();
    a.hub.enter_topic(f(3), t(5)).unwrap();
    a.hub.leave_forum(f(3)).unwrap();
    observer.drain();

    w.drop_client(&a);

    let frames = observer.drain();
    let topic = of_type(&frames, "UpdateCounterPost");
    assert_eq!(topic.len(), 1);
    assert_eq!(topic[0]["data"]["topic_id"], 5);
    assert!(!w.registry.is_topic_tracked(t(5)));
}

#[test]
fn unknown_forum_fails_without_touching_state() {
    let w = World::new(3);
    let mut c = w.connect("1.1.1.1");
    let before = w.registry.stats();

    let err = c.hub.enter_forum(f(4)).unwrap_err();
    assert_eq!(err.client_code().as_str(), "UNKNOWN_FORUM");
    let err = c.hub.enter_topic(f(9), t(1)).unwrap_err();
    assert_eq!(err.client_code().as_str(), "UNKNOWN_FORUM");
    assert!(c.hub.leave_forum(f(0)).is_err());

    assert!(!w.registry.is_topic_tracked(t(1)));
    assert_eq!(w.registry.stats(), before);
    assert!(c.drain().is_empty());
}

#[test]
fn leave_without_enter_is_a_no_op() {
    let w = World::new(2);
    let mut observer = w.connect("8.8.8.8");
    observer.hub.enter_forum(f(1)).unwrap();
    observer.drain();

    let c = w.connect("1.1.1.1");
    c.hub.leave_forum(f(1)).unwrap();
    c.hub.leave_topic(f(1), t(3)).unwrap();
    c.hub.disconnect();

    assert!(observer.drain().is_empty());
    assert!(!w.registry.is_topic_tracked(t(3)));
}

#[test]
fn entering_another_forum_moves_the_connection() {
    let w = World::new(2);
    let mut observer = w.connect("8.8.8.8");
    let mut c = w.connect("1.1.1.1");
    observer.hub.enter_forum(f(1)).unwrap();
    c.hub.enter_forum(f(1)).unwrap();
    observer.drain();

    c.hub.enter_forum(f(2)).unwrap();

    assert_eq!(w.registry.forum_distinct_count(f(1)), Some(1));
    assert_eq!(w.registry.forum_distinct_count(f(2)), Some(1));
    let frames = observer.drain();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["data"]["forum_count"], 1);
    assert_eq!(c.drain().last().unwrap()["data"]["forum_count"], 1);
}

#[test]
fn handle_routes_decoded_events() {
    let w = World::new(1);
    let c = w.connect("1.1.1.1");
    let ev = ClientEvent::decode(r#"{"v":1,"type":"EnterTopic","data":{"forum_id":1,"topic_id":3}}"#).unwrap();

    c.hub.handle(ev).unwrap();

    assert_eq!(w.registry.topic_distinct_count(t(3)), Some(1));
}

#[test]
fn new_hub_with_same_forum_count_keeps_presence() {
    let w = World::new(4);
    let c = w.connect("1.1.1.1");
    c.hub.enter_forum(f(4)).unwrap();

    let _again = w.connect("2.2.2.2");

    assert_eq!(w.registry.forum_distinct_count(f(4)), Some(1));
}

#[test]
fn new_hub_with_different_forum_count_resets_forums() {
    let w = World::new(2);
    let c = w.connect("1.1.1.1");
    c.hub.enter_forum(f(1)).unwrap();
    c.hub.enter_topic(f(1), t(6)).unwrap();

    let _resized = w.connect_with_forums("2.2.2.2", 3);

    assert_eq!(w.registry.forum_distinct_count(f(1)), Some(0));
    assert_eq!(w.registry.forum_distinct_count(f(3)), Some(0));
    assert_eq!(w.registry.location(c.hub.connection_id()).forum, None);
    assert_eq!(w.registry.topic_distinct_count(t(6)), Some(1));
}

#[test]
fn full_queue_drops_frames_without_failing() {
    let w = World::new(1);
    let mut slow = w.connect_with_queue("1.1.1.1", 1);
    slow.hub.enter_forum(f(1)).unwrap();

    for i in 0..4 {
        let c = w.connect(&format!("2.2.2.{i}"));
        c.hub.enter_forum(f(1)).unwrap();
    }

    assert_eq!(slow.drain().len(), 1);
    assert!(w.realtime.dropped_full() >= 4);
    assert_eq!(w.registry.forum_distinct_count(f(1)), Some(5));
}
