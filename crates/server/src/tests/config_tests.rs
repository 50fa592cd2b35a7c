use super::*;

fn no_env(_: &str) -> Option<String> {
    None
}

#[test]
fn defaults_apply_without_file_or_env() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = load_settings_from(&dir.path().join("missing.toml"), no_env);
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.sensor_command, "bin/euler_60");
}

#[test]
fn file_values_override_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("server.toml");
    fs::write(
        &path,
        "bind_addr = \"127.0.0.1:9000\"\nsensor_command = \"bin/euler_120 --fast\"\ndrift_path = \"state/drift\"\n",
    )
    .expect("write");

    let settings = load_settings_from(&path, no_env);
    assert_eq!(settings.server_bind, "127.0.0.1:9000");
    assert_eq!(settings.sensor_command, "bin/euler_120 --fast");
    assert_eq!(settings.drift_path, "state/drift");
    assert_eq!(settings.webroot, Settings::default().webroot);
}

#[test]
fn environment_overrides_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("server.toml");
    fs::write(&path, "webroot = \"./from-file\"\n").expect("write");

    let settings = load_settings_from(&path, |key| match key {
        "APP__WEBROOT" => Some("./from-env".to_string()),
        "SERVER_BIND" => Some("127.0.0.1:1".to_string()),
        "APP__BIND_ADDR" => Some("127.0.0.1:2".to_string()),
        _ => None,
    });
    assert_eq!(settings.webroot, "./from-env");
    assert_eq!(settings.server_bind, "127.0.0.1:2");
}

#[test]
fn malformed_file_is_ignored() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("server.toml");
    fs::write(&path, "this is [not toml").expect("write");

    assert_eq!(load_settings_from(&path, no_env), Settings::default());
}

#[test]
fn port_flag_replaces_configured_port() {
    let settings = Settings::default();
    assert_eq!(
        bind_addr(&settings, None).expect("addr"),
        "0.0.0.0:8000".parse::<SocketAddr>().expect("addr")
    );
    assert_eq!(
        bind_addr(&settings, Some(8123)).expect("addr").port(),
        8123
    );
}

#[test]
fn invalid_bind_address_is_an_error() {
    let settings = Settings {
        server_bind: "localhost".into(),
        ..Settings::default()
    };
    let err = bind_addr(&settings, None).expect_err("should fail");
    assert!(err.to_string().contains("invalid bind address"));
}
