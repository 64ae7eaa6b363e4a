fn main() {
    println!("cargo:rerun-if-changed=config/channels.json");

    // Host builds (unit/integration tests) skip the ESP-IDF environment.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
