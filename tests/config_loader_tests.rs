use gantry::config::ConfigLoader;
use std::{
    env, fs,
    path::PathBuf,
    sync::{Mutex, MutexGuard, OnceLock},
};
use tempfile::TempDir;

const MANAGED_VARS: &[&str] = &[
    "GANTRY_PROFILE",
    "GANTRY_API_BIND_ADDR",
    "GANTRY_LOG_LEVEL",
    "GANTRY_OPERATOR_TOKEN",
    "GANTRY_OPERATOR_TOKENS",
    "GANTRY_GITHUB_APP_ID",
    "GANTRY_GITHUB_CLIENT_ID",
    "GANTRY_GITHUB_CLIENT_SECRET",
    "GANTRY_GITHUB_APP_SECRET_PATH",
    "GANTRY_PROVISIONER_IMAGE_TAG",
    "GANTRY_TOKEN_REFRESH_EXPIRY_LEEWAY_SECONDS",
    "GANTRY_TOKEN_REFRESH_FALLBACK_TTL_SECONDS",
    "GANTRY_DB_MAX_CONNECTIONS",
];

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn env_guard() -> MutexGuard<'static, ()> {
    env_lock()
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

fn clear_env() {
    for var in MANAGED_VARS {
        unsafe {
            env::remove_var(var);
        }
    }
}

fn write_env_file(dir: &TempDir, name: &str, contents: &str) {
    let path = dir.path().join(name);
    fs::write(path, contents).unwrap();
}

fn loader(dir: &TempDir) -> ConfigLoader {
    ConfigLoader::with_base_dir(PathBuf::from(dir.path()))
}

#[test]
fn loads_defaults_when_only_operator_token_is_set() {
    let _guard = env_guard();
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    unsafe {
        env::set_var("GANTRY_OPERATOR_TOKEN", "local-token");
    }

    let cfg = loader(&temp_dir).load().expect("config loads with defaults");

    assert_eq!(cfg.profile, "local");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:8080");
    assert_eq!(cfg.operator_tokens, vec!["local-token".to_string()]);
    assert_eq!(cfg.token_refresh.expiry_leeway_seconds, 10);
    assert_eq!(cfg.token_refresh.fallback_ttl_seconds, 8 * 60 * 60);
    assert_eq!(cfg.github_app.api_base, "https://api.github.com");
    cfg.bind_addr().expect("default bind addr parses");
    clear_env();
}

#[test]
fn missing_operator_tokens_is_rejected() {
    let _guard = env_guard();
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    let err = loader(&temp_dir)
        .load()
        .expect_err("operator token is required");

    assert!(err.to_string().contains("no operator tokens configured"));
}

#[test]
fn layered_env_files_apply_in_order() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "GANTRY_API_BIND_ADDR=127.0.0.1:3000\n");
    write_env_file(
        &temp_dir,
        ".env.test",
        "GANTRY_API_BIND_ADDR=192.168.0.10:5000\n",
    );
    write_env_file(
        &temp_dir,
        ".env.test.local",
        "GANTRY_API_BIND_ADDR=10.0.0.5:6000\n",
    );

    // Select profile via .env.local before profile-specific files load.
    write_env_file(
        &temp_dir,
        ".env.local",
        "GANTRY_PROFILE=test\nGANTRY_API_BIND_ADDR=127.0.0.1:4000\nGANTRY_OPERATOR_TOKENS=one, two\n",
    );

    let cfg = loader(&temp_dir)
        .load()
        .expect("config loads with layered env files");

    assert_eq!(cfg.profile, "test");
    assert_eq!(cfg.api_bind_addr, "10.0.0.5:6000");
    assert_eq!(cfg.operator_tokens, vec!["one".to_string(), "two".to_string()]);
    clear_env();
}

#[test]
fn os_environment_has_highest_precedence() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        "GANTRY_API_BIND_ADDR=127.0.0.1:3000\nGANTRY_OPERATOR_TOKEN=from-file\n",
    );

    unsafe {
        env::set_var("GANTRY_API_BIND_ADDR", "0.0.0.0:9090");
    }

    let cfg = loader(&temp_dir)
        .load()
        .expect("config loads with env override");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:9090");
    assert_eq!(cfg.operator_tokens, vec!["from-file".to_string()]);

    clear_env();
}

#[test]
fn invalid_bind_addr_returns_error() {
    let _guard = env_guard();
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    unsafe {
        env::set_var("GANTRY_API_BIND_ADDR", "not-an-addr");
        env::set_var("GANTRY_OPERATOR_TOKEN", "token");
    }
    let err = loader(&temp_dir)
        .load()
        .expect_err("invalid bind addr should fail");
    assert!(err.to_string().contains("invalid api bind address"));

    clear_env();
}

#[test]
fn unparsable_numeric_setting_names_the_key() {
    let _guard = env_guard();
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    unsafe {
        env::set_var("GANTRY_OPERATOR_TOKEN", "token");
        env::set_var("GANTRY_DB_MAX_CONNECTIONS", "many");
    }
    let err = loader(&temp_dir)
        .load()
        .expect_err("non-numeric pool size should fail");
    assert!(err.to_string().contains("DB_MAX_CONNECTIONS"));

    clear_env();
}

#[test]
fn production_profile_requires_github_app_registration() {
    let _guard = env_guard();
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    unsafe {
        env::set_var("GANTRY_PROFILE", "prod");
        env::set_var("GANTRY_OPERATOR_TOKEN", "token");
    }
    let err = loader(&temp_dir)
        .load()
        .expect_err("GitHub App id is required in prod");
    assert!(err.to_string().contains("GANTRY_GITHUB_APP_ID"));

    unsafe {
        env::set_var("GANTRY_GITHUB_APP_ID", "12345");
        env::set_var("GANTRY_GITHUB_CLIENT_ID", "Iv1.client");
        env::set_var("GANTRY_GITHUB_CLIENT_SECRET", "secret");
        env::set_var("GANTRY_GITHUB_APP_SECRET_PATH", "/etc/gantry/app.pem");
        env::set_var("GANTRY_PROVISIONER_IMAGE_TAG", "v1.2.3");
    }
    let cfg = loader(&temp_dir).load().expect("complete prod config loads");
    assert_eq!(cfg.github_app.app_id, Some(12345));
    assert_eq!(cfg.provisioner.image_tag, "v1.2.3");

    clear_env();
}

#[test]
fn token_refresh_leeway_is_bounded() {
    let _guard = env_guard();
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    unsafe {
        env::set_var("GANTRY_OPERATOR_TOKEN", "token");
        env::set_var("GANTRY_TOKEN_REFRESH_EXPIRY_LEEWAY_SECONDS", "7200");
    }
    let err = loader(&temp_dir)
        .load()
        .expect_err("leeway over an hour should fail");
    assert!(err.to_string().contains("expiry leeway"));

    clear_env();
}

#[test]
fn token_refresh_fallback_ttl_is_bounded() {
    let _guard = env_guard();
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    unsafe {
        env::set_var("GANTRY_OPERATOR_TOKEN", "token");
        env::set_var(
            "GANTRY_TOKEN_REFRESH_FALLBACK_TTL_SECONDS",
            "100000000000000000",
        );
    }
    let err = loader(&temp_dir)
        .load()
        .expect_err("fallback TTL beyond thirty days should fail");
    assert!(err.to_string().contains("fallback TTL"));

    clear_env();
}
