use core::pin::pin;

use picows::network::application::websocket::{Echo, Opcode};
use picows::network::error::Error;
use picows::network::{Config, Connection, Io, Link, session};
use picows::system::io_lock::{Phase, TaskChannel, YieldReason};
use picows::system::sub_task::SubTask;

use crate::mock::*;

type TestLink = Link<MockTransport, 1024, 256>;

#[test]
fn test_peer_close_during_handshake() {
    let config = Config::default();
    let (transport, wire) = MockTransport::new(4096);
    let link: TestLink = Link::new(transport, &config).unwrap();
    connect!(conn, link, config, Echo);

    feed(&conn, &REQUEST[..20], 20);
    assert_eq!(conn.waiting(), YieldReason::Recv);

    conn.on_closed();
    assert!(conn.is_finished());
    assert_eq!(conn.phase(), Phase::Idle);
    let w = wire.lock().unwrap();
    assert!(w.sent.is_empty());
    assert_eq!(w.closed, 1);
    assert_eq!(w.recved, 20);
}

#[test]
fn test_error_releases_transport_without_close() {
    let config = Config::default();
    let (transport, wire) = MockTransport::new(4096);
    let link: TestLink = Link::new(transport, &config).unwrap();
    connect!(conn, link, config, Echo);
    feed(&conn, REQUEST, 64);

    conn.on_error(Error::ConnectionReset);

    assert!(conn.is_finished());
    assert!(!link.is_open());
    assert_eq!(link.error(), Some(Error::ConnectionReset));
    assert_eq!(wire.lock().unwrap().closed, 0);
}

#[test]
fn test_idle_timeout() {
    let config = Config {
        idle_timeout_polls: Some(3),
        ..Config::default()
    };
    let (transport, wire) = MockTransport::new(4096);
    let link: TestLink = Link::new(transport, &config).unwrap();
    connect!(conn, link, config, Echo);

    conn.on_poll();
    conn.on_poll();
    // Traffic restarts the count.
    feed(&conn, b"GET", 3);
    conn.on_poll();
    conn.on_poll();
    assert!(!conn.is_finished());

    conn.on_poll();
    assert!(conn.is_finished());
    assert_eq!(link.error(), Some(Error::Timeout));
    assert_eq!(wire.lock().unwrap().closed, 1);
}

#[test]
fn test_no_timeout_without_limit() {
    let config = Config::default();
    let (transport, _wire) = MockTransport::new(4096);
    let link: TestLink = Link::new(transport, &config).unwrap();
    connect!(conn, link, config, Echo);

    for _ in 0..1000 {
        conn.on_poll();
    }
    assert!(!conn.is_finished());
    assert_eq!(conn.waiting(), YieldReason::Recv);
}

#[test]
fn test_receive_credit_reported_once_per_callback() {
    let config = Config::default();
    let (transport, wire) = MockTransport::new(4096);
    let link: TestLink = Link::new(transport, &config).unwrap();
    connect!(conn, link, config, Echo);

    conn.on_recv(REQUEST);
    {
        let w = wire.lock().unwrap();
        assert_eq!(w.recved, REQUEST.len());
        assert_eq!(w.recved_calls, 1);
    }

    feed(&conn, &client_frame(Opcode::Text, true, b"ping", MASK), 2);
    let w = wire.lock().unwrap();
    assert_eq!(w.recved, REQUEST.len() + 10);
    assert_eq!(w.recved_calls, 6);
}

#[test]
fn test_full_inbound_queue_pushes_back() {
    let config = Config::default();
    let (transport, wire) = MockTransport::new(4096);
    let link: Link<MockTransport, 1024, 16> = Link::new(transport, &config).unwrap();
    connect!(conn, link, config, Echo);

    let mut rest = REQUEST;
    while !rest.is_empty() {
        let n = conn.on_recv(rest);
        assert!(n > 0 && n <= 16);
        rest = &rest[n..];
    }

    let w = wire.lock().unwrap();
    let (head, _) = split_head(&w.sent);
    assert!(head.contains(ACCEPT));
    assert_eq!(w.recved, REQUEST.len());
}

#[test]
fn test_callbacks_after_finish_are_ignored() {
    let config = Config::default();
    let (transport, wire) = MockTransport::new(4096);
    let link: TestLink = Link::new(transport, &config).unwrap();
    connect!(conn, link, config, Echo);
    conn.on_closed();
    assert!(conn.is_finished());

    conn.on_recv(b"GET / HTTP/1.1\r\n\r\n");
    conn.on_sent(10);
    conn.on_poll();
    conn.on_error(Error::ConnectionReset);

    assert!(conn.is_finished());
    assert_eq!(link.error(), Some(Error::ConnectionClosed));
    let w = wire.lock().unwrap();
    assert!(w.sent.is_empty());
    assert_eq!(w.closed, 1);
}

#[test]
fn test_connection_slot_reuse() {
    let config = Config::default();
    let (first, first_wire) = MockTransport::new(4096);
    let (second, second_wire) = MockTransport::new(4096);
    let link: TestLink = Link::new(first, &config).unwrap();
    let (first_channel, second_channel) = (TaskChannel::new(), TaskChannel::new());
    let (mut first_echo, mut second_echo) = (Echo, Echo);
    let first_body = pin!(session(
        Io::new(&link, first_channel.yielder()),
        &config,
        PAGE,
        &mut first_echo,
    ));
    let second_body = pin!(session(
        Io::new(&link, second_channel.yielder()),
        &config,
        PAGE,
        &mut second_echo,
    ));
    let conn = Connection::new(&link);

    conn.start(SubTask::new(&first_channel), first_body).unwrap();
    conn.on_recv(b"GET / HTTP/1.1\r\n\r\n");
    ack_all(&conn, &first_wire);
    assert!(conn.is_finished());
    assert_eq!(first_wire.lock().unwrap().closed, 1);

    link.reset(second);
    assert!(link.is_open());
    assert_eq!(link.error(), None);
    conn.start(SubTask::new(&second_channel), second_body).unwrap();
    assert!(!conn.is_finished());
    assert_eq!(conn.waiting(), YieldReason::Recv);

    conn.on_recv(REQUEST);
    let w = second_wire.lock().unwrap();
    let (head, _) = split_head(&w.sent);
    assert!(head.contains(ACCEPT));
    assert_eq!(w.closed, 0);
}

#[test]
fn test_ack_wait_resumes_on_next_acknowledgement() {
    let config = Config::default();
    let (transport, _wire) = MockTransport::new(4096);
    let link: TestLink = Link::new(transport, &config).unwrap();
    let channel = TaskChannel::new();
    let io = Io::new(&link, channel.yielder());
    let body = pin!(async move {
        io.wait(YieldReason::Ack).await.unwrap();
        io.wait(YieldReason::Ack).await.unwrap();
    });
    let conn = Connection::new(&link);

    conn.start(SubTask::new(&channel), body).unwrap();
    assert_eq!(conn.waiting(), YieldReason::Ack);

    // Inbound data is not what the task waits for.
    conn.on_recv(b"x");
    assert_eq!(conn.waiting(), YieldReason::Ack);

    // Each wait starts from the acknowledgements seen so far.
    conn.on_sent(0);
    assert!(!conn.is_finished());
    assert_eq!(conn.waiting(), YieldReason::Ack);

    conn.on_sent(0);
    assert!(conn.is_finished());
}
