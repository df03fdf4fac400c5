use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Use protoc-bin-vendored to avoid needing protoc installed
    std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);

    let proto_dir = PathBuf::from("proto");
    let protos = [proto_dir.join("artifact.proto")];

    let mut config = prost_build::Config::new();
    config.compile_protos(&protos, &[&proto_dir])?;
    Ok(())
}
