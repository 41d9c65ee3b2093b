fn main() {
    // Only the firmware image needs the ESP-IDF environment; host builds
    // (tests, simulation) skip it.
    #[cfg(feature = "espidf")]
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }
}
