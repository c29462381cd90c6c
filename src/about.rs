pub fn about() -> Vec<String> {
    vec![
        "Shows the device location on a map and lets you replace it with a \
        virtual location entered by hand.".to_string(),
        "Virtual locations are saved and can be picked again later.".to_string(),
        "\n".to_string(),
        "While a virtual location is set, live position updates are ignored. \
        Press \"当前位置\" to go back to the live position.".to_string(),
        format!("Version: {}", env!("CARGO_PKG_VERSION")),
    ]
}
