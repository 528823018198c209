use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=ffi/wrapper.h");

    let include_paths = check_sane();
    bindgen_sane(&include_paths);
}

fn check_sane() -> Vec<PathBuf> {
    // Most distributions ship sane-backends.pc, but some only install the headers.
    match pkg_config::Config::new()
        .atleast_version("1.0.27")
        .cargo_metadata(false)
        .probe("sane-backends")
    {
        Ok(library) => library.include_paths,
        Err(err) => {
            println!("cargo:warning=sane-backends not found by pkg-config ({err}), using default include paths");
            Vec::new()
        }
    }
}

fn bindgen_sane(include_paths: &[PathBuf]) {
    println!("cargo:rustc-link-lib=dylib=sane");

    let out_dir = std::env::var("OUT_DIR").unwrap();
    let bindings_path = PathBuf::from(out_dir).join("bindings.rs");

    bindgen::builder()
        .header("ffi/wrapper.h")
        .clang_args(include_paths.iter().map(|path| format!("-I{}", path.display())))
        .allowlist_function("sane_.*")
        .allowlist_type("SANE_.*")
        .allowlist_var("SANE_.*")
        .generate()
        .expect("Failed to generate bindings")
        .write_to_file(bindings_path)
        .expect("Failed to write bindings");
}
