use std::path::PathBuf;

use anyhow::anyhow;

/// Runtime configuration, resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub home_dir: PathBuf,
    pub database_path: PathBuf,
    pub log_file: PathBuf,
    /// Password for the login screen. `None` disables the login gate.
    pub admin_password: Option<String>,
}

impl Configuration {
    pub fn create() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// `BETWEEN_HOME` > `$HOME/.todo` for the data directory,
    /// `BETWEEN_DATABASE` > `<home>/todos.sqlite` for the database.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let home_dir = match non_empty("BETWEEN_HOME") {
            Some(home) => PathBuf::from(home),
            None => non_empty("HOME")
                .map(|home| PathBuf::from(home).join(".todo"))
                .ok_or_else(|| anyhow!("could not determine home directory"))?,
        };
        let database_path = non_empty("BETWEEN_DATABASE")
            .map(PathBuf::from)
            .unwrap_or_else(|| home_dir.join("todos.sqlite"));
        let log_file = home_dir.join("between.log");
        let admin_password = non_empty("BETWEEN_ADMIN_PASSWORD");

        Ok(Self {
            home_dir,
            database_path,
            log_file,
            admin_password,
        })
    }

    pub fn ensure_dirs(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.home_dir)?;
        Ok(())
    }
}
