use std::env;
use std::io::{Error, ErrorKind};
use std::path::PathBuf;

fn main() -> std::io::Result<()> {
    // Protocol definitions live next to the manifest
    let manifest_dir = env::var("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .map_err(|e| Error::new(ErrorKind::NotFound, e))?;
    let proto_dir = manifest_dir.join("device-protocol");

    if !proto_dir.exists() {
        eprintln!("ERROR: Protocol directory does not exist: {:?}", proto_dir);
        return Err(Error::new(
            ErrorKind::NotFound,
            format!("Protocol directory not found: {:?}", proto_dir),
        ));
    }

    let types_proto = proto_dir.join("types.proto");
    if !types_proto.exists() {
        eprintln!("ERROR: types.proto does not exist: {:?}", types_proto);
        return Err(Error::new(
            ErrorKind::NotFound,
            format!("types.proto not found: {:?}", types_proto),
        ));
    }

    println!("cargo:rerun-if-changed={}", proto_dir.display());

    // Set protoc environment variables for vendored protoc
    let protoc = protoc_bin_vendored::protoc_bin_path()
        .map_err(|e| Error::new(ErrorKind::NotFound, e.to_string()))?;
    let protoc_include = protoc_bin_vendored::include_path()
        .map_err(|e| Error::new(ErrorKind::NotFound, e.to_string()))?;
    env::set_var("PROTOC", protoc);
    env::set_var("PROTOC_INCLUDE", protoc_include);

    let mut config = prost_build::Config::new();
    config.compile_protos(
        &[types_proto, proto_dir.join("messages.proto")],
        &[proto_dir],
    )?;

    Ok(())
}
