// src/repository/signer.rs

//! Signature-tool capability
//!
//! Commit signatures are checked against exactly one trusted key that
//! lives inside the recipe repository. The key is imported into a
//! throwaway keyring so the operator's own keyring never influences the
//! result. The production implementation shells out to `gpg`.

use crate::error::{Error, Result};
use crate::shell::run_tool;
use std::path::Path;
use std::time::Duration;

const SIGNER_TIMEOUT: Duration = Duration::from_secs(60);

/// Operations the synchronizer needs from the signature tool
pub trait Signer {
    /// Import a public key into the keyring at `home`.
    fn import_key(&self, home: &Path, key: &Path) -> Result<()>;

    /// Fingerprint of the (single) key in the keyring at `home`.
    fn fingerprint(&self, home: &Path) -> Result<String>;
}

/// Production implementation shelling out to `gpg`
#[derive(Debug, Default)]
pub struct GpgCli;

impl Signer for GpgCli {
    fn import_key(&self, home: &Path, key: &Path) -> Result<()> {
        let home = home.to_string_lossy();
        let key = key.to_string_lossy();
        run_tool(
            "gpg",
            &["--import", key.as_ref()],
            None,
            &[("GNUPGHOME", home.as_ref())],
            Some(SIGNER_TIMEOUT),
        )?;
        Ok(())
    }

    fn fingerprint(&self, home: &Path) -> Result<String> {
        let home = home.to_string_lossy();
        let out = run_tool(
            "gpg",
            &["--with-colons", "--fingerprint"],
            None,
            &[("GNUPGHOME", home.as_ref())],
            Some(SIGNER_TIMEOUT),
        )?;
        parse_fingerprint(&out.stdout)
    }
}

/// Extract the fingerprint from `--with-colons` output: the tenth field
/// of the first `fpr` record.
pub fn parse_fingerprint(colons: &str) -> Result<String> {
    for line in colons.lines() {
        if let Some(rest) = line.strip_prefix("fpr:") {
            let fields: Vec<&str> = rest.split(':').collect();
            if let Some(fpr) = fields.get(8).filter(|f| !f.is_empty()) {
                return Ok((*fpr).to_string());
            }
        }
    }
    Err(Error::Subprocess {
        command: "gpg --with-colons --fingerprint".to_string(),
        stderr: "no fingerprint record in output".to_string(),
    })
}
