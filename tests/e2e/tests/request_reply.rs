//! Full request/reply cycles across two dispatchers joined by the discovery
//! handshake, with every hop passing through the wire codec.

use meshq_e2e_tests::{connect, pump, Node};
use network::{Connection, Result, ServiceHandler};
use std::sync::Arc;
use types::{
    BufferPool, Priority, ResponseStatus, ServiceAddress, ServiceKey, WorkItem,
};

/// Echoes the request payload back as the response payload.
struct EchoService {
    address: ServiceAddress,
}

impl ServiceHandler for EchoService {
    fn service_keys(&self) -> Vec<ServiceKey> {
        vec![self.address.key()]
    }

    fn process_request(&self, request: WorkItem) -> Result<Option<WorkItem>> {
        let mut reply = request.reply();
        reply.response_payload = request.request_payload.clone();
        reply.request_payload = None;
        Ok(Some(reply))
    }
}

fn echo_address() -> ServiceAddress {
    ServiceAddress::new(3, 1, 5)
}

fn mesh(lock_free: bool) -> (Node, Node) {
    let a = Node::new(1, lock_free);
    let b = Node::new(2, lock_free);
    b.dispatcher.register_local_service(Arc::new(EchoService {
        address: echo_address(),
    }));
    (a, b)
}

#[test]
fn request_reply_round_trip_over_the_wire() {
    for lock_free in [false, true] {
        let (a, b) = mesh(lock_free);
        let (a_to_b, b_to_a) = connect(&a, &b);

        // The handshake taught a about b's echo function.
        assert!(a
            .dispatcher
            .discovery_data()
            .service_keys
            .contains(&echo_address().key()));

        let pool = BufferPool::new();
        let request = WorkItem::request(
            echo_address(),
            ServiceAddress::new(1, 1, 1),
            Priority::Normal,
            true,
            a.dispatcher.sequences(),
        )
        .with_request_payload(pool.payload_from_slice(b"ping"));
        let id = request.unique_id;

        a.dispatcher.schedule_request(request);
        assert_eq!(a.dispatcher.send_work_items(), 1);
        assert_eq!(pump(&a_to_b, &b.dispatcher), 1);

        // b answered synchronously; its reply is waiting in its outbound queue.
        assert_eq!(b.dispatcher.send_work_items(), 1);
        assert_eq!(pump(&b_to_a, &a.dispatcher), 1);

        let response = a
            .dispatcher
            .get_processed_response(id)
            .expect("reply correlated to the original request");
        assert_eq!(response.response_status, ResponseStatus::Success);
        assert_eq!(response.response_payload.unwrap().as_slice(), b"ping");
        assert!(a.dispatcher.get_processed_response(id).is_none());
    }
}

#[test]
fn unreachable_function_bounces_an_error_reply() {
    let (a, b) = mesh(false);
    let (a_to_b, b_to_a) = connect(&a, &b);

    // A function nobody serves.
    let request = WorkItem::request(
        ServiceAddress::new(9, 9, 9),
        ServiceAddress::new(1, 1, 1),
        Priority::Normal,
        true,
        a.dispatcher.sequences(),
    );
    let id = request.unique_id;

    a.dispatcher.schedule_request(request);
    a.dispatcher.send_work_items();
    assert_eq!(a_to_b.queued(), 0, "unroutable request left the node");

    // The bounce completed the pending request locally.
    let response = a.dispatcher.get_processed_response(id).unwrap();
    assert_eq!(
        response.response_status,
        ResponseStatus::DestinationUnreachable
    );

    // b never saw anything.
    assert_eq!(pump(&b_to_a, &a.dispatcher), 0);
    assert_eq!(b.dispatcher.outbound_depth(), 0);
}

#[test]
fn dropping_the_peer_makes_its_functions_unreachable() {
    let (a, b) = mesh(false);
    let (a_to_b, _b_to_a) = connect(&a, &b);
    drop(b);

    a.dispatcher.drop_connection(a_to_b.id());

    let request = WorkItem::request(
        echo_address(),
        ServiceAddress::new(1, 1, 1),
        Priority::Normal,
        true,
        a.dispatcher.sequences(),
    );
    let id = request.unique_id;
    a.dispatcher.schedule_request(request);
    a.dispatcher.send_work_items();

    assert_eq!(a_to_b.queued(), 0);
    let response = a.dispatcher.get_processed_response(id).unwrap();
    assert_eq!(
        response.response_status,
        ResponseStatus::DestinationUnreachable
    );
}
