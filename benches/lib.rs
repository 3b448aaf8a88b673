//! Kiln Benchmarks
//!
//! This crate contains performance benchmarks for the ndarray bridge.
//! Run with: cargo bench -p kiln-benchmarks

// This file exists only to satisfy Cargo's requirement for a lib target.
// The actual benchmarks are in bridge_benchmarks.rs
