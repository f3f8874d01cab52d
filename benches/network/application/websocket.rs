use core::pin::pin;
use std::hint::black_box;

use criterion::{Criterion, Throughput};
use picows::network::application::websocket::frame::{FrameHeader, apply_mask};
use picows::network::application::websocket::ring::{Append, FrameRing};
use picows::network::application::websocket::{Echo, Framing, Opcode};
use picows::network::{Config, Connection, Io, Link, session};
use picows::system::io_lock::TaskChannel;
use picows::system::sub_task::SubTask;

use crate::network::{REQUEST, Sink};

pub fn bench_apply_mask(c: &mut Criterion) {
    let mut group = c.benchmark_group("mask");
    let mut buf = vec![0x5au8; 4096];
    group.throughput(Throughput::Bytes(buf.len() as u64));
    group.bench_function("apply_mask", |b| {
        b.iter(|| apply_mask(black_box(&mut buf), black_box([0x37, 0xfa, 0x21, 0x3d])))
    });
    group.finish();
}

pub fn bench_ring_append_and_ack(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring");
    let payload = [0x42u8; 256];
    group.throughput(Throughput::Bytes(payload.len() as u64 * 64));
    group.bench_function("append_and_ack", |b| {
        let mut ring: FrameRing<4096> = FrameRing::new(1024, 512);
        let mut sink = Sink::default();
        b.iter(|| {
            for _ in 0..64 {
                let mut bytes = &payload[..];
                while !bytes.is_empty() {
                    match ring
                        .append(Framing::WebSocket(Opcode::Binary), bytes, &mut sink)
                        .unwrap()
                    {
                        Append::Took(n) => bytes = &bytes[n..],
                        Append::Blocked(_) => {
                            ring.on_ack(core::mem::take(&mut sink.unacked));
                        }
                    }
                }
            }
            ring.finish(&mut sink).unwrap();
            ring.on_ack(core::mem::take(&mut sink.unacked));
        })
    });
    group.finish();
}

pub fn bench_echo(c: &mut Criterion) {
    let mut group = c.benchmark_group("echo");
    let message = vec![b'e'; 1024];
    let mask = [0x37, 0xfa, 0x21, 0x3d];
    let header = FrameHeader {
        fin: true,
        opcode: Opcode::Text,
        mask: Some(mask),
        payload_len: message.len() as u64,
    };
    let mut frame = vec![0u8; header.encoded_len()];
    header.encode(&mut frame).unwrap();
    let mut payload = message.clone();
    apply_mask(&mut payload, mask);
    frame.extend_from_slice(&payload);

    let config = Config::default();
    let link: Link<Sink, 4096, 2048> = Link::new(Sink::default(), &config).unwrap();
    let channel = TaskChannel::new();
    let mut echo = Echo;
    let body = pin!(session(
        Io::new(&link, channel.yielder()),
        &config,
        "",
        &mut echo
    ));
    let conn = Connection::new(&link);
    conn.start(SubTask::new(&channel), body).unwrap();
    conn.on_recv(REQUEST);

    let ack = || {
        let n = link
            .with_transport(|sink| core::mem::take(&mut sink.unacked))
            .unwrap_or(0);
        if n > 0 {
            conn.on_sent(n);
        }
    };
    ack();

    group.throughput(Throughput::Bytes(message.len() as u64));
    group.bench_function("echo_1k", |b| {
        b.iter(|| {
            let mut rest = &frame[..];
            while !rest.is_empty() {
                let n = conn.on_recv(black_box(rest));
                rest = &rest[n..];
                ack();
            }
        })
    });
    group.finish();
}
