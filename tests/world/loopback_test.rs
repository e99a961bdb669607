/*!
 * Loopback Group Tests
 * Delivery order, disconnection and handler isolation between ranks
 */

use group_runtime::core::limits::FIRST_USER_HANDLER;
use group_runtime::world::ActiveMessage;
use group_runtime::{init_tracing, LoopbackNetwork, World, WorldError, WorldResult};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[test]
fn test_messages_from_one_sender_arrive_in_order() {
    init_tracing();
    let net = LoopbackNetwork::new(3, 8).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&seen);
    net.world(2)
        .unwrap()
        .register_handler(
            FIRST_USER_HANDLER,
            Arc::new(move |_: &dyn World, msg: ActiveMessage| -> WorldResult<()> {
                let n: u32 = msg.decode()?;
                sink.lock().push((msg.src, n));
                Ok(())
            }),
        )
        .unwrap();

    for n in 0..50u32 {
        let src = n % 2;
        let msg = ActiveMessage::encode(src, FIRST_USER_HANDLER, &n).unwrap();
        net.world(src).unwrap().send_one_way(2, msg.handler, msg.payload).unwrap();
    }
    assert_eq!(net.poll(), 50);

    let seen = seen.lock();
    for src in 0..2 {
        let from_src: Vec<u32> = seen.iter().filter(|(s, _)| *s == src).map(|(_, n)| *n).collect();
        let expected: Vec<u32> = (0..50).filter(|n| n % 2 == src).collect();
        assert_eq!(from_src, expected);
    }
}

#[test]
fn test_handlers_are_per_rank() {
    let net = LoopbackNetwork::new(2, 8).unwrap();
    let noop = |_: &dyn World, _: ActiveMessage| -> WorldResult<()> { Ok(()) };

    net.world(0).unwrap().register_handler(FIRST_USER_HANDLER, Arc::new(noop)).unwrap();
    net.world(1).unwrap().register_handler(FIRST_USER_HANDLER, Arc::new(noop)).unwrap();
    assert!(matches!(
        net.world(1).unwrap().register_handler(FIRST_USER_HANDLER, Arc::new(noop)),
        Err(WorldError::HandlerExists(_))
    ));
}

#[test]
fn test_send_to_dropped_rank_is_disconnected() {
    let net = LoopbackNetwork::new(2, 8).unwrap();
    let survivor = Arc::clone(net.world(0).unwrap());
    drop(net);

    assert_eq!(survivor.size(), 2);
    assert!(matches!(
        survivor.send_one_way(1, FIRST_USER_HANDLER, bytes::Bytes::new()),
        Err(WorldError::Disconnected(1))
    ));
    assert!(survivor.resolve_group(8).is_some());
}
