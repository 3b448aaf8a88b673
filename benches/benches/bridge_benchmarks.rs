//! Bridge Performance Benchmarks
//!
//! This module benchmarks the string-tensor codec and the two conversion
//! directions with various element counts and payload sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use kiln_ndbridge::codec::{decode_elems, encode_elems};
use kiln_ndbridge::{
    array_to_tensor, tensor_to_array, ArrayElem, ArrayValue, DType, NativeTensor, NdArray,
};

// ============================================================================
// String Codec Benchmarks
// ============================================================================

fn string_elems(count: usize, len: usize) -> Vec<ArrayElem> {
    (0..count)
        .map(|i| ArrayElem::Bytes(vec![(i % 251) as u8; len]))
        .collect()
}

fn bench_codec_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec_encode");

    for (count, len) in [(16usize, 8usize), (256, 32), (1024, 128)] {
        let elems = string_elems(count, len);
        group.throughput(Throughput::Bytes((count * len) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{count}x{len}")),
            &elems,
            |b, elems| b.iter(|| encode_elems(black_box(elems)).unwrap()),
        );
    }

    group.finish();
}

fn bench_codec_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec_decode");

    for (count, len) in [(16usize, 8usize), (256, 32), (1024, 128)] {
        let elems = string_elems(count, len);
        let buf = encode_elems(&elems).unwrap();
        group.throughput(Throughput::Bytes(buf.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{count}x{len}")),
            &buf,
            |b, buf| b.iter(|| decode_elems(black_box(buf), count).unwrap()),
        );
    }

    group.finish();
}

// ============================================================================
// Conversion Benchmarks
// ============================================================================

fn bench_tensor_to_array_copy(c: &mut Criterion) {
    let mut group = c.benchmark_group("tensor_to_array_copy");

    // Element sizes straddling the small-copy specialization threshold.
    for nbytes in [4usize, 16, 64, 4096, 1 << 20] {
        group.throughput(Throughput::Bytes(nbytes as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(nbytes),
            &nbytes,
            |b, &nbytes| {
                b.iter(|| {
                    let tensor =
                        NativeTensor::new(DType::UInt8, vec![nbytes as i64], vec![0u8; nbytes])
                            .unwrap();
                    // Keep a sibling alive so the move is refused and the
                    // copy path runs.
                    let sibling = tensor.alias();
                    let array = tensor_to_array(Some(black_box(tensor))).unwrap();
                    black_box((array, sibling))
                })
            },
        );
    }

    group.finish();
}

fn bench_array_to_tensor_alias(c: &mut Criterion) {
    let mut group = c.benchmark_group("array_to_tensor_alias");

    for nbytes in [64usize, 4096, 1 << 20] {
        group.throughput(Throughput::Bytes(nbytes as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(nbytes),
            &nbytes,
            |b, &nbytes| {
                b.iter(|| {
                    let array =
                        NdArray::from_data(DType::UInt8, vec![nbytes as i64], vec![0u8; nbytes])
                            .unwrap();
                    let tensor = array_to_tensor(ArrayValue::Array(black_box(array))).unwrap();
                    black_box(tensor)
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_codec_encode,
    bench_codec_decode,
    bench_tensor_to_array_copy,
    bench_array_to_tensor_alias
);
criterion_main!(benches);
