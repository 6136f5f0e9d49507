use std::env;

fn main() {
    // Build-time defaults for PrefsConfig::default()
    // Each can be overridden from the environment.

    // Namespace (max 15 bytes)
    if let Ok(namespace) = env::var("PREFS_NAMESPACE") {
        if namespace.is_empty() || namespace.len() > 15 {
            panic!("PREFS_NAMESPACE must be 1..=15 bytes, got {:?}", namespace);
        }
        println!("cargo:rustc-env=PREFS_NAMESPACE={}", namespace);
        println!(
            "cargo:warning=Using PREFS_NAMESPACE from environment: {}",
            namespace
        );
    } else {
        println!("cargo:rustc-env=PREFS_NAMESPACE=zPref");
    }

    // Schema version (u32)
    if let Ok(version) = env::var("PREFS_VERSION") {
        if version.parse::<u32>().is_err() {
            panic!("PREFS_VERSION must be a u32, got {:?}", version);
        }
        println!("cargo:rustc-env=PREFS_VERSION={}", version);
        println!(
            "cargo:warning=Using PREFS_VERSION from environment: {}",
            version
        );
    } else {
        println!("cargo:rustc-env=PREFS_VERSION=1");
    }

    // Partition label
    if let Ok(partition) = env::var("PREFS_PARTITION") {
        println!("cargo:rustc-env=PREFS_PARTITION={}", partition);
        println!(
            "cargo:warning=Using PREFS_PARTITION from environment: {}",
            partition
        );
    } else {
        println!("cargo:rustc-env=PREFS_PARTITION=nvs");
    }

    // Rerun if environment variables change
    println!("cargo:rerun-if-env-changed=PREFS_NAMESPACE");
    println!("cargo:rerun-if-env-changed=PREFS_VERSION");
    println!("cargo:rerun-if-env-changed=PREFS_PARTITION");
}
