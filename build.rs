fn main() {
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }

    if std::env::var("CARGO_FEATURE_CNN_ACCELERATOR").is_ok() {
        // Typically: .embuild/espressif/tools/riscv32-esp-elf/esp-<VER>/riscv32-esp-elf/bin/riscv32-esp-elf-gcc
        let compiler = find_compiler().unwrap_or_else(|| "riscv32-esp-elf-gcc".into());
        build_cnn(&compiler);
    }
}

fn find_compiler() -> Option<std::path::PathBuf> {
    use std::path::PathBuf;
    // Check local .embuild first, then global ~/.espressif
    let search_dirs = vec![
        PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").unwrap()).join(".embuild"),
        dirs::home_dir().map(|h| h.join(".espressif")).unwrap_or_default(),
    ];

    for root in search_dirs {
        let tools_dir = root.join("espressif/tools/riscv32-esp-elf");
        let Ok(entries) = std::fs::read_dir(&tools_dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let candidate = entry.path().join("riscv32-esp-elf/bin/riscv32-esp-elf-gcc");
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }
    None
}

/// Compile the generated accelerator driver (cnn.c, weights.h) shipped with
/// the trained network. The weights are produced by the model toolchain and
/// are not part of this repository.
fn build_cnn(compiler_path: &std::path::Path) {
    let driver_dir = std::env::var("CNN_DRIVER_DIR")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::path::PathBuf::from("cnn"));

    let mut build = cc::Build::new();
    build
        .compiler(compiler_path)
        .flag("-std=c11")
        .flag("-O2")
        .include(&driver_dir);

    for entry in std::fs::read_dir(&driver_dir).expect("Failed to read accelerator driver directory") {
        let path = entry.expect("Failed to read directory entry").path();
        if path.extension().is_some_and(|ext| ext == "c") {
            build.file(&path);
        }
    }

    build.compile("cnn-driver");

    println!("cargo:rerun-if-changed={}", driver_dir.display());
    println!("cargo:rerun-if-env-changed=CNN_DRIVER_DIR");
}
