//! Generated protobuf/gRPC types, included from `OUT_DIR` at build time.

pub mod common {
    tonic::include_proto!("common");
}

pub mod health {
    tonic::include_proto!("health");
}

pub mod matcher {
    tonic::include_proto!("matcher");
}

pub mod job_store {
    tonic::include_proto!("job_store");
}
