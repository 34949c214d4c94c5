//! Protobuf messages for `castmesh.v1`
//!
//! Equivalent schema:
//!
//! ```proto
//! enum CastKind { CAST_KIND_UNSPECIFIED = 0; SOCKET = 1; ROOM = 2; BROADCAST = 3; }
//! message PropagateRequest {
//!   CastKind cast_kind = 1;
//!   string target = 2;
//!   string event_name = 3;
//!   bytes payload = 4;
//!   bool binary = 5;
//! }
//! message PropagateAck {}
//! service Propagate { rpc Propagate(PropagateRequest) returns (PropagateAck); }
//! ```

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum WireCastKind {
    Unspecified = 0,
    Socket = 1,
    Room = 2,
    Broadcast = 3,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PropagateRequest {
    #[prost(enumeration = "WireCastKind", tag = "1")]
    pub cast_kind: i32,
    /// Socket id or room name; empty for broadcast
    #[prost(string, tag = "2")]
    pub target: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub event_name: ::prost::alloc::string::String,
    #[prost(bytes = "bytes", tag = "4")]
    pub payload: ::bytes::Bytes,
    #[prost(bool, tag = "5")]
    pub binary: bool,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct PropagateAck {}

include!(concat!(env!("OUT_DIR"), "/castmesh.v1.Propagate.rs"));
