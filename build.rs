fn main() {
    println!("cargo:rerun-if-env-changed=TELEMON_CMD_ARGS");

    // ESP-IDF link arguments only matter for device builds.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
