fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Use the vendored protoc so the build doesn't depend on a system install.
    std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);

    tonic_build::compile_protos("../protos/coordinator.proto")?;
    Ok(())
}
