/*!
 * Remote Reference Tests
 * Ownership transfer, release routing and count reconciliation
 */

use bytes::Bytes;
use group_runtime::core::bincode::{decode_payload, encode_payload};
use group_runtime::core::limits::{DECREMENT_HANDLER, FIRST_USER_HANDLER};
use group_runtime::world::{ActiveMessage, Handler};
use group_runtime::{
    ExportTable, GroupId, GroupRegistry, HandlerId, LoopbackNetwork, LoopbackWorld, ProcessId,
    RemoteRefWire, RemoteReference, World, WorldError, WorldResult,
};
use mockall::{mock, predicate::eq};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::thread;

#[derive(Debug, PartialEq)]
struct Block {
    rows: usize,
    data: Vec<f64>,
}

fn block() -> Arc<Block> {
    Arc::new(Block {
        rows: 2,
        data: vec![1.0, 2.0, 3.0, 4.0],
    })
}

mock! {
    pub Group {}

    impl World for Group {
        fn rank(&self) -> ProcessId;
        fn size(&self) -> ProcessId;
        fn id(&self) -> GroupId;
        fn send_one_way(&self, dest: ProcessId, handler: HandlerId, payload: Bytes) -> WorldResult<()>;
        fn register_handler(&self, id: HandlerId, handler: Handler) -> WorldResult<()>;
        fn resolve_group(&self, id: GroupId) -> Option<Arc<dyn World>>;
        fn exports(&self) -> &ExportTable;
    }
}

#[test]
fn test_round_trip_decrements_exactly_once() {
    let net = LoopbackNetwork::new(2, 1).unwrap();
    let owner: &LoopbackWorld = net.world(0).unwrap();
    let holder: &LoopbackWorld = net.world(1).unwrap();

    let value = block();
    let reference = RemoteReference::new(owner, Arc::clone(&value));
    assert_eq!(Arc::strong_count(&value), 2);
    assert_eq!(reference.owner(), 0);
    assert_eq!(reference.group_id(), 1);

    // Ship the triple to rank 1 through a user handler
    let inbox: Arc<Mutex<Vec<RemoteReference<Block>>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&inbox);
    holder
        .register_handler(
            FIRST_USER_HANDLER,
            Arc::new(move |_: &dyn World, msg: ActiveMessage| -> WorldResult<()> {
                let wire: RemoteRefWire = msg.decode()?;
                sink.lock().push(RemoteReference::from_wire(wire));
                Ok(())
            }),
        )
        .unwrap();
    let payload = encode_payload(&reference.into_wire()).unwrap();
    owner.send_one_way(1, FIRST_USER_HANDLER, payload).unwrap();
    assert_eq!(net.poll(), 1);

    let mut received = inbox.lock().pop().unwrap();
    assert!(!received.is_null());
    assert!(received.as_local(holder).is_none());
    assert_eq!(Arc::strong_count(&value), 2);

    received.release(holder).unwrap();
    assert!(received.is_null());
    // Decrement is in flight until the owner polls
    assert_eq!(Arc::strong_count(&value), 2);

    assert_eq!(net.poll(), 1);
    assert_eq!(Arc::strong_count(&value), 1);
    assert!(owner.exports().is_empty());

    // Releasing or dropping the released copy has no further effect
    received.release(holder).unwrap();
    drop(received);
    assert_eq!(net.poll(), 0);
    assert_eq!(Arc::strong_count(&value), 1);
}

#[test]
fn test_owner_release_is_local() {
    let net = LoopbackNetwork::new(2, 4).unwrap();
    let owner: &LoopbackWorld = net.world(0).unwrap();

    let value = block();
    let mut reference = RemoteReference::new(owner, Arc::clone(&value));
    assert_eq!(*reference.as_local(owner).unwrap(), *value);

    reference.release(owner).unwrap();
    assert_eq!(Arc::strong_count(&value), 1);
    assert_eq!(owner.pending(), 0);
}

#[test]
fn test_non_owner_release_sends_one_message() {
    let wire = RemoteRefWire {
        addr: 0xbeef0,
        owner: 3,
        group: 77,
    };
    let expected = encode_payload(&wire).unwrap();
    let mut reference = RemoteReference::<Block>::from_wire(wire);

    let mut world = MockGroup::new();
    world.expect_rank().return_const(1u32);
    world.expect_id().return_const(77u64);
    world.expect_exports().never();
    world
        .expect_send_one_way()
        .with(eq(3u32), eq(DECREMENT_HANDLER), eq(expected))
        .times(1)
        .returning(|_, _, _| Ok(()));

    reference.release(&world).unwrap();
    assert!(reference.is_null());

    // Second release of the same instance is a no-op
    reference.release(&world).unwrap();
}

#[test]
fn test_failed_send_keeps_reference() {
    let mut reference = RemoteReference::<Block>::from_wire(RemoteRefWire {
        addr: 0x1000,
        owner: 2,
        group: 5,
    });

    let mut world = MockGroup::new();
    world.expect_rank().return_const(0u32);
    world.expect_id().return_const(5u64);
    world
        .expect_send_one_way()
        .times(1)
        .returning(|dest, _, _| Err(WorldError::Disconnected(dest)));

    assert!(matches!(
        reference.release(&world),
        Err(WorldError::Disconnected(2))
    ));
    assert!(!reference.is_null());

    let wire = reference.into_wire();
    assert_eq!(wire.addr, 0x1000);
}

#[test]
fn test_double_release_is_reported_by_owner() {
    let net = LoopbackNetwork::new(2, 1).unwrap();
    let owner: &LoopbackWorld = net.world(0).unwrap();
    let holder: &LoopbackWorld = net.world(1).unwrap();

    let value = block();
    let bytes = encode_payload(&RemoteReference::new(owner, Arc::clone(&value)).into_wire()).unwrap();

    // A protocol bug: the same bytes are decoded twice
    let mut first = RemoteReference::<Block>::from_wire(decode_payload(&bytes).unwrap());
    let mut second = RemoteReference::<Block>::from_wire(decode_payload(&bytes).unwrap());
    first.release(holder).unwrap();
    second.release(holder).unwrap();

    assert_eq!(net.poll(), 2);
    assert_eq!(owner.dispatched(), 1);
    assert_eq!(owner.failed(), 1);
    assert_eq!(Arc::strong_count(&value), 1);
}

#[test]
fn test_local_double_release_returns_error() {
    let net = LoopbackNetwork::new(1, 1).unwrap();
    let owner: &LoopbackWorld = net.world(0).unwrap();

    let value = block();
    let wire = RemoteReference::new(owner, Arc::clone(&value)).into_wire();
    let bytes = encode_payload(&wire).unwrap();
    let mut first = RemoteReference::<Block>::from_wire(wire);
    let mut copy = RemoteReference::<Block>::from_wire(decode_payload(&bytes).unwrap());

    first.release(owner).unwrap();
    assert!(matches!(
        copy.release(owner),
        Err(WorldError::DoubleRelease { .. })
    ));
    assert_eq!(Arc::strong_count(&value), 1);

    // Nothing left to release; disarm the copy
    let _ = copy.into_wire();
}

#[test]
fn test_duplicate_increments_owner() {
    let net = LoopbackNetwork::new(2, 1).unwrap();
    let owner: &LoopbackWorld = net.world(0).unwrap();
    let holder: &LoopbackWorld = net.world(1).unwrap();

    let value = block();
    let local = RemoteReference::new(owner, Arc::clone(&value));

    // On the owner: immediate
    let mut local_copy = local.duplicate(owner).unwrap();
    assert_eq!(owner.exports().outstanding(local.addr()), 2);
    local_copy.release(owner).unwrap();

    // On a non-owner: increment travels ahead of the release
    let mut remote = RemoteReference::<Block>::from_wire(local.into_wire());
    let mut remote_copy = remote.duplicate(holder).unwrap();
    remote.release(holder).unwrap();
    assert_eq!(net.poll(), 2);
    assert_eq!(Arc::strong_count(&value), 2);

    remote_copy.release(holder).unwrap();
    net.poll();
    assert_eq!(Arc::strong_count(&value), 1);
}

#[test]
fn test_typed_access_is_checked() {
    let net = LoopbackNetwork::new(1, 1).unwrap();
    let owner: &LoopbackWorld = net.world(0).unwrap();

    let value = Arc::new(7u64);
    let wire = RemoteReference::new(owner, Arc::clone(&value)).into_wire();
    let mut wrong = RemoteReference::<String>::from_wire(wire);

    assert!(wrong.as_local(owner).is_none());
    assert!(matches!(
        wrong.try_as_local(owner),
        Err(WorldError::TypeMismatch { .. })
    ));

    // Release uses the exported type regardless
    wrong.release(owner).unwrap();
    assert_eq!(Arc::strong_count(&value), 1);
}

#[test]
fn test_release_resolves_other_group() {
    let registries: Vec<_> = (0..2).map(|_| Arc::new(GroupRegistry::new())).collect();
    let numerics = LoopbackNetwork::with_registries(10, registries.clone()).unwrap();
    let io = LoopbackNetwork::with_registries(20, registries).unwrap();

    let value = block();
    let reference = RemoteReference::new(&**numerics.world(0).unwrap(), Arc::clone(&value));
    let mut remote = RemoteReference::<Block>::from_wire(reference.into_wire());

    // Released through rank 1's handle of a different group
    let io_rank1: &LoopbackWorld = io.world(1).unwrap();
    remote.release(io_rank1).unwrap();
    assert_eq!(io.poll(), 0);
    assert_eq!(numerics.poll(), 1);
    assert_eq!(Arc::strong_count(&value), 1);
}

#[test]
fn test_unknown_group_is_reported() {
    let net = LoopbackNetwork::new(2, 1).unwrap();
    let stranger = LoopbackNetwork::new(2, 2).unwrap();

    let value = block();
    let reference = RemoteReference::new(&**net.world(0).unwrap(), Arc::clone(&value));
    let mut remote = RemoteReference::<Block>::from_wire(reference.into_wire());

    let other: &LoopbackWorld = stranger.world(1).unwrap();
    assert!(matches!(
        remote.release(other),
        Err(WorldError::UnknownGroup(1))
    ));
    assert!(!remote.is_null());

    remote.release(&**net.world(1).unwrap()).unwrap();
    net.poll();
    assert_eq!(Arc::strong_count(&value), 1);
}

#[test]
fn test_concurrent_remote_releases() {
    const REFS: usize = 256;
    const THREADS: usize = 4;
    let net = LoopbackNetwork::new(2, 1).unwrap();
    let owner = Arc::clone(net.world(0).unwrap());
    let holder = Arc::clone(net.world(1).unwrap());

    let value = block();
    let mut wires: Vec<RemoteRefWire> = (0..REFS)
        .map(|_| RemoteReference::new(&*owner, Arc::clone(&value)).into_wire())
        .collect();
    assert_eq!(Arc::strong_count(&value), REFS + 1);

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let batch: Vec<_> = wires.drain(..REFS / THREADS).collect();
            let holder = Arc::clone(&holder);
            thread::spawn(move || {
                for wire in batch {
                    let mut reference = RemoteReference::<Block>::from_wire(wire);
                    reference.release(&*holder).unwrap();
                }
            })
        })
        .collect();

    // Owner drains concurrently with the senders
    while handles.iter().any(|h| !h.is_finished()) {
        owner.poll();
    }
    for handle in handles {
        handle.join().unwrap();
    }
    net.poll();

    assert_eq!(Arc::strong_count(&value), 1);
    assert_eq!(owner.dispatched(), REFS as u64);
}
