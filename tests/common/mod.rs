//! Shared utilities for integration tests.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use pandora::config::load_settings;
use pandora::Settings;

/// Write `content` as `config.yml` inside `dir` and load it.
#[allow(dead_code)]
pub fn settings_from_yaml(dir: &Path, content: &str) -> Settings {
    let path = dir.join("config.yml");
    std::fs::write(&path, content).unwrap();
    load_settings(&path).unwrap()
}

/// Write a self-signed `localhost` certificate and key into `dir`.
#[allow(dead_code)]
pub fn self_signed_tls(dir: &Path) -> (PathBuf, PathBuf) {
    let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let cert = dir.join("cert.pem");
    let key = dir.join("key.pem");
    std::fs::write(&cert, certified.cert.pem()).unwrap();
    std::fs::write(&key, certified.key_pair.serialize_pem()).unwrap();
    (cert, key)
}

/// In-memory writer for capturing access log lines.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct Capture(Arc<Mutex<Vec<u8>>>);

#[allow(dead_code)]
impl Capture {
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8(self.0.lock().unwrap().clone())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
