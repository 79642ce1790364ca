// Layers, bottom up:
//  - Storage: byte-addressed random access (file or simulated)
//  - Header: root address, free-list head, field schema
//  - Allocator: free list threaded through released records
//  - AVL engine: insert/remove/rebalance, one record read or write at a time
//  - Queries: point lookups and in-order traversal
//
// The driver binary replays a command script against a file-backed tree.

pub mod config;
mod e2e_tests;
pub mod script;
pub mod simulation;
pub mod storage;
#[cfg(test)]
mod testing;
