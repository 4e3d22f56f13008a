use std::env;

fn main() {
    // Compiled default of the force-defaults flag stored at the start of the
    // parameter image. When true, the firmware overwrites persisted parameters
    // with the compiled defaults on every boot.
    if let Ok(force) = env::var("KUGLE_FORCE_DEFAULT_PARAMETERS") {
        println!("cargo:rustc-env=KUGLE_FORCE_DEFAULT_PARAMETERS={}", force);
        println!(
            "cargo:warning=Using KUGLE_FORCE_DEFAULT_PARAMETERS from environment: {}",
            force
        );
    } else {
        println!("cargo:rustc-env=KUGLE_FORCE_DEFAULT_PARAMETERS=false");
    }

    println!("cargo:rerun-if-env-changed=KUGLE_FORCE_DEFAULT_PARAMETERS");
}
