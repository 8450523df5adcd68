use std::env;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    if env::var_os("PROTOC").is_none() {
        env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    }

    tonic_prost_build::configure()
        .file_descriptor_set_path(out_dir.join("orchestrator.bin"))
        .include_file("mod.rs")
        .compile_protos(
            &["proto/training/v1/orchestrator.proto"],
            &["proto"],
        )?;

    Ok(())
}
