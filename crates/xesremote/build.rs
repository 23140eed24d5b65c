// Embeds the build target for `xesremote version --extended`. GIT_HASH is
// supplied by the release pipeline; a change to it must relink the binary.
fn main() {
    if let Ok(target) = std::env::var("TARGET") {
        println!("cargo:rustc-env=XESREMOTE_BUILD_TARGET={target}");
    }
    println!("cargo:rerun-if-env-changed=TARGET");
    println!("cargo:rerun-if-env-changed=GIT_HASH");
}
