use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Vinculo";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when RUST_LOG is unset
pub fn default_log_filter() -> String {
    "vinculo=info".to_string()
}

/// Get the application data directory
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Vinculo")
}

/// Get the database path
pub fn database_path() -> PathBuf {
    app_data_dir().join("vinculo.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with("Vinculo"));
    }

    #[test]
    fn database_under_app_data() {
        let db = database_path();
        assert!(db.starts_with(app_data_dir()));
        assert!(db.ends_with("vinculo.db"));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, env!("CARGO_PKG_VERSION"));
    }
}
