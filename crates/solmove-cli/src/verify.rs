//! Optional check of generated modules with the Aptos CLI.
//!
//! The modules are written into a throwaway Move package and compiled with
//! `aptos move compile`. A missing binary is reported as unavailable, never as a failure.

use anyhow::{Context, Result};
use serde::Serialize;
use solmove_transform::ModuleOutput;
use std::fs;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum Verification {
    Passed,
    Failed(String),
    Unavailable(String),
}

pub struct Verifier {
    binary: String,
    address: String,
    timeout: Duration,
}

impl Verifier {
    pub fn new(binary: impl Into<String>, address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            address: address.into(),
            timeout,
        }
    }

    pub fn verify(&self, modules: &[ModuleOutput]) -> Result<Verification> {
        let package = tempfile::tempdir().context("creating verification package")?;
        self.write_package(package.path(), modules)?;

        let spawned = Command::new(&self.binary)
            .args(["move", "compile", "--package-dir"])
            .arg(package.path())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();
        let child = match spawned {
            Ok(child) => child,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Ok(Verification::Unavailable(format!(
                    "{} was not found on PATH",
                    self.binary
                )))
            }
            Err(err) => return Err(err).context(format!("starting {}", self.binary)),
        };
        self.wait(child)
    }

    fn write_package(&self, dir: &Path, modules: &[ModuleOutput]) -> Result<()> {
        let sources = dir.join("sources");
        fs::create_dir_all(&sources)?;
        fs::write(dir.join("Move.toml"), manifest(&self.address))?;
        for module in modules {
            fs::write(
                sources.join(format!("{}.move", module.module_name)),
                &module.source,
            )?;
        }
        Ok(())
    }

    fn wait(&self, mut child: Child) -> Result<Verification> {
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                let output = format!(
                    "{}{}",
                    stdout.join().unwrap_or_default(),
                    stderr.join().unwrap_or_default()
                );
                return Ok(if status.success() {
                    Verification::Passed
                } else {
                    Verification::Failed(output.trim().to_string())
                });
            }
            if started.elapsed() >= self.timeout {
                child.kill()?;
                child.wait()?;
                return Ok(Verification::Unavailable(format!(
                    "{} did not finish within {}s",
                    self.binary,
                    self.timeout.as_secs()
                )));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Reads a child pipe to the end on its own thread.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut text = String::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_string(&mut text);
        }
        text
    })
}

/// Minimal manifest binding the named address and pulling in the framework.
fn manifest(address: &str) -> String {
    format!(
        r#"[package]
name = "solmove_verify"
version = "0.0.1"

[addresses]
{} = "0xcafe"

[dependencies.AptosFramework]
git = "https://github.com/aptos-labs/aptos-core.git"
rev = "mainnet"
subdir = "aptos-move/framework/aptos-framework"
"#,
        address
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary_is_unavailable() {
        let verifier = Verifier::new(
            "solmove-no-such-aptos-binary",
            "solmove",
            Duration::from_secs(5),
        );
        let outcome = verifier.verify(&[]).unwrap();
        assert!(matches!(outcome, Verification::Unavailable(_)));
    }

    #[test]
    fn test_manifest_binds_the_module_address() {
        let text = manifest("vault_addr");
        assert!(text.contains("[addresses]\nvault_addr = \"0xcafe\""));
        assert!(text.contains("[dependencies.AptosFramework]"));
    }
}
