// tests/common/mod.rs
#![allow(dead_code)] // each test binary uses its own subset of helpers

//! Shared test utilities and helpers for integration tests.
//!
//! Provides a throwaway data root with a seeded recipe repository,
//! archive builders, a loopback HTTP server for source downloads, and
//! no-op capability fakes for the version-control and signature tools.

use blink::{
    Installer, Layout, ManifestStore, RecipeCache, RepoConfig, Repositories, ScriptedPrompter,
    Signer, SourceAcquirer, SystemArchiver, Vcs,
};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock};
use tempfile::TempDir;

/// The installer changes the process working directory and environment;
/// tests that drive it hold this lock so they never interleave.
pub fn pipeline_lock() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(Mutex::default)
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Version-control fake: the repository working trees are seeded
/// directly on disk, so sync becomes a no-op that resolves a fixed head.
pub struct NoopVcs;

impl Vcs for NoopVcs {
    fn clone_repo(
        &self,
        _url: &str,
        _reference: Option<&str>,
        dest: &Path,
    ) -> blink::Result<()> {
        fs::create_dir_all(dest)?;
        Ok(())
    }

    fn fetch(&self, _repo: &Path) -> blink::Result<()> {
        Ok(())
    }

    fn rev_parse(&self, _repo: &Path, _refspec: &str) -> blink::Result<String> {
        Ok("0000000000000000000000000000000000000000".to_string())
    }

    fn hard_reset(&self, _repo: &Path, _commit: &str) -> blink::Result<()> {
        Ok(())
    }

    fn fast_forward(&self, _repo: &Path, _commit: &str) -> blink::Result<()> {
        Ok(())
    }

    fn verify_commit_raw(
        &self,
        _repo: &Path,
        _commit: &str,
        _gnupg_home: &Path,
    ) -> blink::Result<String> {
        Ok(String::new())
    }
}

pub struct NoopSigner;

impl Signer for NoopSigner {
    fn import_key(&self, _home: &Path, _key: &Path) -> blink::Result<()> {
        Ok(())
    }

    fn fingerprint(&self, _home: &Path) -> blink::Result<String> {
        Ok("TESTFINGERPRINT".to_string())
    }
}

/// A temp data root with one configured repository named `main`.
pub struct TestRoot {
    pub layout: Layout,
    pub repos: Vec<RepoConfig>,
    _temp: TempDir,
}

impl TestRoot {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let layout = Layout::new(temp.path().to_str().unwrap()).unwrap();
        layout.ensure_dirs().unwrap();
        fs::create_dir_all(layout.repository_dir("main").join("recipes")).unwrap();

        let repos = vec![RepoConfig {
            name: "main".to_string(),
            url: "https://example.org/main.git".to_string(),
            reference: Some("main".to_string()),
            pin: None,
            trusted_key: None,
        }];

        Self {
            layout,
            repos,
            _temp: temp,
        }
    }

    pub fn root_path(&self) -> &Path {
        self.layout.root()
    }

    /// Write a recipe into the seeded repository working tree.
    pub fn seed_recipe(&self, name: &str, body: &str) {
        let dir = self.layout.repository_dir("main").join("recipes");
        fs::write(dir.join(format!("{name}.json")), body).unwrap();
    }

    /// Build a gzipped tar archive from `(path, content)` pairs and drop
    /// it into `sources/` under `file_name`. Returns its SHA-256.
    pub fn seed_targz(&self, file_name: &str, files: &[(&str, &str)]) -> String {
        let staging = self.layout.base().join("staging").join(file_name);
        let _ = fs::remove_dir_all(&staging);
        let mut top_level = Vec::new();
        for (path, content) in files {
            let dest = staging.join(path);
            fs::create_dir_all(dest.parent().unwrap()).unwrap();
            fs::write(&dest, content).unwrap();
            let top = path.split('/').next().unwrap().to_string();
            if !top_level.contains(&top) {
                top_level.push(top);
            }
        }

        let archive = self.layout.sources_dir().join(file_name);
        let mut args = vec![
            "-czf".to_string(),
            archive.to_str().unwrap().to_string(),
            "-C".to_string(),
            staging.to_str().unwrap().to_string(),
        ];
        args.extend(top_level);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        blink::shell::run_tool("tar", &args, None, &[], None).unwrap();

        sha256_file(&archive)
    }

    /// Build an archive whose single entry is stored as `../evil`.
    pub fn seed_malicious_targz(&self, file_name: &str) -> String {
        let staging = self.layout.base().join("staging").join("hostile");
        let inner = staging.join("inner");
        fs::create_dir_all(&inner).unwrap();
        fs::write(staging.join("evil"), "pwned").unwrap();

        let archive = self.layout.sources_dir().join(file_name);
        blink::shell::run_tool(
            "tar",
            &["-P", "-czf", archive.to_str().unwrap(), "../evil"],
            Some(&inner),
            &[],
            None,
        )
        .unwrap();

        sha256_file(&archive)
    }

    pub fn manifest(&self) -> ManifestStore {
        let store = ManifestStore::new(&self.layout);
        store.ensure().unwrap();
        store
    }
}

pub fn sha256_file(path: &Path) -> String {
    let mut hasher = Sha256::new();
    let mut file = fs::File::open(path).unwrap();
    std::io::copy(&mut file, &mut hasher).unwrap();
    format!("{:x}", hasher.finalize())
}

/// Wire the full component graph with scripted prompter answers and run
/// `body` against the installer.
pub fn with_installer<F>(root: &TestRoot, answers: &[&str], body: F)
where
    F: FnOnce(&Installer, &ManifestStore),
{
    let prompter = ScriptedPrompter::new(answers.iter().copied());
    let vcs = NoopVcs;
    let signer = NoopSigner;
    let archiver = SystemArchiver;

    let repositories = Repositories::new(&root.layout, &root.repos, &vcs, &signer);
    let manifest = root.manifest();
    let cache = RecipeCache::new(&root.layout, &root.repos, &prompter);
    let sources = SourceAcquirer::new(&root.layout, &archiver);
    let installer = Installer::new(
        &root.layout,
        &manifest,
        &cache,
        &sources,
        &repositories,
        &prompter,
    );

    body(&installer, &manifest);
}

/// Serve a directory's files over loopback HTTP; returns the base URL.
/// Unknown paths answer 404.
pub fn serve_dir(dir: PathBuf) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };

            // Read until the end of the request headers.
            let mut raw = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = stream.read(&mut buf).unwrap_or(0);
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
                if raw.windows(4).any(|w| w == b"\r\n\r\n") || raw.len() > 8192 {
                    break;
                }
            }
            let request = String::from_utf8_lossy(&raw).into_owned();
            let path = request
                .split_whitespace()
                .nth(1)
                .unwrap_or("/")
                .trim_start_matches('/')
                .to_string();

            match fs::read(dir.join(&path)) {
                Ok(bytes) => {
                    let _ = write!(
                        stream,
                        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        bytes.len()
                    );
                    let _ = stream.write_all(&bytes);
                }
                Err(_) => {
                    let _ = write!(
                        stream,
                        "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                    );
                }
            }
        }
    });

    format!("http://{addr}")
}
