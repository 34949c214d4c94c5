// Generates the Propagate client/server stubs. Message types are written by
// hand in src/pb.rs, so no protoc is needed.
fn main() {
    let propagate = tonic_build::manual::Service::builder()
        .name("Propagate")
        .package("castmesh.v1")
        .method(
            tonic_build::manual::Method::builder()
                .name("propagate")
                .route_name("Propagate")
                .input_type("crate::pb::PropagateRequest")
                .output_type("crate::pb::PropagateAck")
                .codec_path("tonic::codec::ProstCodec")
                .build(),
        )
        .build();

    tonic_build::manual::Builder::new().compile(&[propagate]);

    println!("cargo:rerun-if-changed=build.rs");
}
