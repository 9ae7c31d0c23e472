fn main() {
    // Enables `doc(cfg(..))` annotations for the Windows-only interop module on nightly docs builds.
    #[rustversion::nightly]
    fn emit_nightly_cfg() {
        println!("cargo:rustc-cfg=nightly");
    }
    #[rustversion::not(nightly)]
    fn emit_nightly_cfg() {}

    println!("cargo::rustc-check-cfg=cfg(nightly)");
    emit_nightly_cfg();
}
