#![doc = include_str!("../RUSTDOC.md")]

pub mod firestore;
