//! Criterion benchmarks for the data-channel payload codec.
//!
//! File messages carry whole files inline, so decoding cost grows with file
//! size; these benches keep an eye on that.
//!
//! Run with:
//! ```bash
//! cargo bench --package peerchat-core --bench payload_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use peerchat_core::{
    decode_data_uri, decode_frame, encode_data_uri, encode_payload, ChatMessage, FileInfo,
    PeerIdentity,
};

// ── Message fixtures ──────────────────────────────────────────────────────────

fn sender() -> PeerIdentity {
    PeerIdentity::parse("SwiftPhoenix4821").unwrap()
}

fn make_text() -> ChatMessage {
    ChatMessage::text(&sender(), "The quick brown fox jumps over the lazy dog")
}

fn make_file(size: usize) -> ChatMessage {
    let bytes = vec![0xA5u8; size];
    ChatMessage::file(
        &sender(),
        encode_data_uri("application/octet-stream", &bytes),
        FileInfo {
            name: "payload.bin".to_string(),
            size: size as u64,
            mime_type: "application/octet-stream".to_string(),
        },
    )
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_text(c: &mut Criterion) {
    let msg = make_text();
    let frame = encode_payload(&msg).unwrap();

    c.bench_function("encode_text", |b| b.iter(|| encode_payload(black_box(&msg))));
    c.bench_function("decode_text", |b| b.iter(|| decode_frame(black_box(&frame))));
}

fn bench_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_file");
    for size in [1024usize, 64 * 1024, 1024 * 1024] {
        let frame = encode_payload(&make_file(size)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), &frame, |b, frame| {
            b.iter(|| {
                let msg = decode_frame(black_box(frame)).ok()?;
                decode_data_uri(&msg.content).ok()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_text, bench_file);
criterion_main!(benches);
