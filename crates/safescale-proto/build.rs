fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var_os("PROTOC").is_none() {
        std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    }
    // Proto file is at workspace root
    let proto_path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../proto/safescale.proto");
    println!("cargo:rerun-if-changed={proto_path}");
    tonic_build::compile_protos(proto_path)?;
    Ok(())
}
