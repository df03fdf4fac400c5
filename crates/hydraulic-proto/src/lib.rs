//! Protocol Buffer type definitions for persisted predictor artifacts.
//!
//! Types are generated at build time from `proto/artifact.proto`.
//! Uses protoc-bin-vendored to avoid requiring protoc installation.

pub mod artifact {
    include!(concat!(env!("OUT_DIR"), "/hydraulic.artifact.rs"));
}

pub use artifact::*;
