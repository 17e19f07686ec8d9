use std::env;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn main() {
    let rustc = env::var("RUSTC").unwrap_or_else(|_| String::from("rustc"));
    let version = Command::new(&rustc)
        .arg("--version")
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|text| text.trim().to_owned())
        .unwrap_or_default();

    println!("cargo:rustc-env=DFXML_RUSTC_VERSION={version}");
    println!(
        "cargo:rustc-env=DFXML_TARGET={}",
        env::var("TARGET").unwrap_or_default()
    );
    println!(
        "cargo:rustc-env=DFXML_PROFILE={}",
        env::var("PROFILE").unwrap_or_default()
    );
    // SOURCE_DATE_EPOCH wins so reproducible builds report a fixed date.
    let build_epoch = env::var("SOURCE_DATE_EPOCH").ok().unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|since| since.as_secs().to_string())
            .unwrap_or_default()
    });
    println!("cargo:rustc-env=DFXML_BUILD_EPOCH={build_epoch}");
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    println!("cargo:rerun-if-env-changed=RUSTFLAGS");
    println!("cargo:rerun-if-changed=build.rs");
}
