//! Persistent user settings.
//!
//! Settings are `key=value` lines in `<dir>/<resource>/<resource>.conf`.
//! System directories from `XDG_CONFIG_DIRS` are read first and the user's
//! config home last, so user settings win. Only the user file is written.

use log::{debug, warn};
use std::collections::BTreeMap;
use std::env;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// A loaded settings file.
#[derive(Debug, Clone)]
pub struct Config {
    resource: String,
    home: PathBuf,
    data: BTreeMap<String, String>,
    dirty: bool,
}

fn config_home() -> Option<PathBuf> {
    env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .filter(|p| p.is_absolute())
        .or_else(dirs::config_dir)
}

fn system_config_dirs() -> Vec<PathBuf> {
    let dirs = env::var_os("XDG_CONFIG_DIRS")
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "/etc/xdg".into());
    env::split_paths(&dirs).filter(|p| p.is_absolute()).collect()
}

impl Config {
    /// Load `resource` from the XDG configuration directories.
    pub fn load(resource: &str) -> Result<Self> {
        let home = config_home()
            .ok_or_else(|| Error::Config("cannot determine the configuration directory".into()))?;
        let mut config = Self::empty(resource, home);
        // Lowest precedence first.
        let mut dirs = system_config_dirs();
        dirs.reverse();
        dirs.push(config.home.clone());
        for dir in dirs {
            config.merge_file(&dir.join(resource).join(config.file_name()))?;
        }
        config.dirty = false;
        Ok(config)
    }

    /// Load `resource` from a single configuration directory.
    pub fn at(dir: impl Into<PathBuf>, resource: &str) -> Result<Self> {
        let mut config = Self::empty(resource, dir.into());
        let path = config.path();
        config.merge_file(&path)?;
        Ok(config)
    }

    fn empty(resource: &str, home: PathBuf) -> Self {
        Self {
            resource: resource.to_string(),
            home,
            data: BTreeMap::new(),
            dirty: false,
        }
    }

    fn file_name(&self) -> String {
        format!("{}.conf", self.resource)
    }

    /// The file [`flush`](Config::flush) writes.
    pub fn path(&self) -> PathBuf {
        self.home.join(&self.resource).join(self.file_name())
    }

    fn merge_file(&mut self, path: &Path) -> Result<()> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        debug!("reading settings from {}", path.display());
        for line in contents.lines() {
            let line = line.trim_end();
            match line.split_once('=') {
                Some((key, value)) => {
                    self.data.insert(key.to_string(), value.to_string());
                }
                None if line.is_empty() => {}
                None => warn!("{}: ignoring line without '=': {:?}", path.display(), line),
            }
        }
        Ok(())
    }

    pub fn read(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    pub fn read_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.read(key).unwrap_or(default)
    }

    pub fn read_int(&self, key: &str, default: i64) -> Result<i64> {
        match self.read(key) {
            None => Ok(default),
            Some(value) => value.trim().parse().map_err(|_| {
                Error::Config(format!("{} must be an integer, found {:?}", key, value))
            }),
        }
    }

    /// Booleans are stored as integers; any non-zero value is true.
    pub fn read_bool(&self, key: &str, default: bool) -> Result<bool> {
        Ok(self.read_int(key, i64::from(default))? != 0)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl ToString) {
        self.data.insert(key.into(), value.to_string());
        self.dirty = true;
    }

    pub fn set_bool(&mut self, key: impl Into<String>, value: bool) {
        self.set(key, i32::from(value));
    }

    /// Remove every `key[...]` entry.
    pub fn remove_array(&mut self, key: &str) {
        let prefix = format!("{}[", key);
        let before = self.data.len();
        self.data.retain(|k, _| !k.starts_with(&prefix));
        if self.data.len() != before {
            self.dirty = true;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write the settings if they changed. The file is replaced atomically.
    pub fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let dir = self.home.join(&self.resource);
        fs::create_dir_all(&dir)?;
        let path = self.path();
        let tmp_path = dir.join(format!("{}.tmp", self.file_name()));
        {
            let mut file = File::create(&tmp_path)?;
            for (key, value) in &self.data {
                writeln!(file, "{}={}", key, value)?;
            }
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &path)?;
        debug!("saved settings to {}", path.display());
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::at(dir.path(), "redjvu").unwrap();
        assert_eq!(config.read("missing"), None);
        config.set("external_editor", "gvim -f");
        config.set_bool("outline.show", true);
        config.set("recent[0]", "/a.djvu");
        config.set("recent[1]", "/b.djvu");
        config.flush().unwrap();
        assert!(config.path().is_file());

        let mut loaded = Config::at(dir.path(), "redjvu").unwrap();
        assert_eq!(loaded.read("external_editor"), Some("gvim -f"));
        assert!(loaded.read_bool("outline.show", false).unwrap());
        loaded.remove_array("recent");
        assert_eq!(loaded.read("recent[0]"), None);
        assert!(loaded.is_dirty());
    }

    #[test]
    fn test_read_int() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::at(dir.path(), "redjvu").unwrap();
        assert_eq!(config.read_int("width", 640).unwrap(), 640);
        config.set("width", "abc");
        assert!(matches!(config.read_int("width", 640), Err(Error::Config(_))));
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("redjvu");
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join("redjvu.conf"), "a=1\nnonsense\n\nb=x=y\n").unwrap();
        let config = Config::at(dir.path(), "redjvu").unwrap();
        assert_eq!(config.read("a"), Some("1"));
        assert_eq!(config.read("b"), Some("x=y"));
        assert_eq!(config.read_or("c", "d"), "d");
    }

    #[test]
    fn test_clean_flush_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::at(dir.path(), "redjvu").unwrap();
        config.flush().unwrap();
        assert!(!config.path().exists());
    }
}
