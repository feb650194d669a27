//! Protobuf bindings generated by `tonic-build` from `proto/assistant.proto`
//! and committed so builds do not require `protoc`.

#[allow(clippy::all, clippy::nursery, clippy::pedantic)]
pub mod v1 {
    include!("assistant.v1.rs");
}
