pub fn about() -> Vec<String> {
    vec![
        "Configuration and control utility for Pololu Tic stepper motor controllers.".to_string(),
        "\n".to_string(),
        format!("Version {}", env!("CARGO_PKG_VERSION")),
        "This program comes with ABSOLUTELY NO WARRANTY.".to_string(),
    ]
}
