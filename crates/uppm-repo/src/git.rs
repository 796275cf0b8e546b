//! Git working-tree repository backend
//!
//! A Git repository is cloned into a checkout folder derived from its
//! URL, kept on `master`, and then scanned exactly like a filesystem
//! repository. Fetches happen at most once per process unless force
//! re-synchronization is switched on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use git2::build::RepoBuilder;
use git2::{CertificateCheckStatus, Cred, FetchOptions, RemoteCallbacks, ResetType};
use uppm_core::{
    infer, loader, Catalog, CompleteReference, EngineRegistry, Package, PartialReference,
    Repository, ScriptEngine,
};
use uppm_fs::NormalizedPath;

use crate::error;
use crate::url::{classify, UrlKind};

/// When set, every repository fetches again on its next refresh even if
/// it already synchronized this process.
static FORCE_RESYNC: AtomicBool = AtomicBool::new(false);

pub fn set_force_synchronization(force: bool) {
    FORCE_RESYNC.store(force, Ordering::Relaxed);
}

pub fn force_synchronization() -> bool {
    FORCE_RESYNC.load(Ordering::Relaxed)
}

/// Plaintext credentials for remotes that need them.
#[derive(Debug, Clone, Default)]
pub struct GitCredentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Backend configuration shared by every Git repository.
#[derive(Debug, Clone)]
pub struct GitOptions {
    /// Checkouts live under `<temporary_folder>/repositories/`.
    pub temporary_folder: NormalizedPath,
    pub credentials: GitCredentials,
    /// Accept remotes with invalid TLS certificates.
    pub accept_invalid_certificates: bool,
    /// Extra headers sent with fetch requests, `Name: value` form.
    pub custom_headers: Vec<String>,
}

impl GitOptions {
    pub fn new(temporary_folder: NormalizedPath) -> Self {
        Self {
            temporary_folder,
            credentials: GitCredentials::default(),
            accept_invalid_certificates: false,
            custom_headers: Vec::new(),
        }
    }
}

#[derive(Default)]
struct State {
    catalog: Catalog,
    ready: bool,
    last_error: Option<String>,
    remote_reachable: bool,
    synchronized: bool,
}

/// A repository backed by a remote Git working tree.
pub struct GitRepository {
    url: String,
    checkout_folder: NormalizedPath,
    engines: Arc<EngineRegistry>,
    options: GitOptions,
    state: RwLock<State>,
}

impl GitRepository {
    pub fn new(url: &str, engines: Arc<EngineRegistry>, options: GitOptions) -> Self {
        let checkout_folder = options
            .temporary_folder
            .join("repositories")
            .join(checkout_dir_name(url));
        Self {
            url: url.to_string(),
            checkout_folder,
            engines,
            options,
            state: RwLock::new(State::default()),
        }
    }

    /// Where the working tree is (or will be) checked out.
    pub fn local_checkout_folder(&self) -> &NormalizedPath {
        &self.checkout_folder
    }

    pub fn synchronized(&self) -> bool {
        self.state.read().expect("state lock").synchronized
    }

    pub fn remote_reachable(&self) -> bool {
        self.state.read().expect("state lock").remote_reachable
    }

    fn remote_callbacks(&self) -> RemoteCallbacks<'_> {
        let mut callbacks = RemoteCallbacks::new();

        let credentials = self.options.credentials.clone();
        callbacks.credentials(move |_url, username_from_url, _allowed| {
            if let (Some(username), Some(password)) =
                (&credentials.username, &credentials.password)
            {
                return Cred::userpass_plaintext(username, password);
            }
            match username_from_url {
                Some(username) => Cred::ssh_key_from_agent(username),
                None => Cred::default(),
            }
        });

        if self.options.accept_invalid_certificates {
            callbacks.certificate_check(|_certificate, _host| {
                Ok(CertificateCheckStatus::CertificateOk)
            });
        }

        callbacks
    }

    fn fetch_options(&self) -> FetchOptions<'_> {
        let mut options = FetchOptions::new();
        options.remote_callbacks(self.remote_callbacks());
        if !self.options.custom_headers.is_empty() {
            let headers: Vec<&str> = self
                .options
                .custom_headers
                .iter()
                .map(String::as_str)
                .collect();
            options.custom_headers(&headers);
        }
        options
    }

    /// Bring the checkout up to date: clone on first use, otherwise
    /// fetch `master` and hard-reset onto it. Skipped entirely when this
    /// repository already synchronized and force mode is off.
    fn synchronize(&self) -> error::Result<()> {
        if self.synchronized() && !force_synchronization() {
            tracing::debug!(url = %self.url, "already synchronized this run, skipping fetch");
            return Ok(());
        }

        if self.checkout_folder.join(".git").exists() {
            tracing::info!(url = %self.url, "fetching into existing checkout");
            let repo = git2::Repository::open(self.checkout_folder.to_native())?;
            {
                let mut remote = repo.find_remote("origin")?;
                remote.fetch(&["master"], Some(&mut self.fetch_options()), None)?;
            }
            let oid = repo.refname_to_id("refs/remotes/origin/master")?;
            let target = repo.find_object(oid, None)?;
            repo.reset(&target, ResetType::Hard, None)?;
        } else {
            tracing::info!(url = %self.url, checkout = %self.checkout_folder, "cloning");
            uppm_fs::ensure_dir(&self.checkout_folder)?;
            RepoBuilder::new()
                .branch("master")
                .fetch_options(self.fetch_options())
                .clone(&self.url, &self.checkout_folder.to_native())?;
        }

        self.state.write().expect("state lock").synchronized = true;
        Ok(())
    }
}

impl Repository for GitRepository {
    fn url(&self) -> &str {
        &self.url
    }

    fn ready(&self) -> bool {
        self.state.read().expect("state lock").ready
    }

    fn last_refresh_error(&self) -> Option<String> {
        self.state.read().expect("state lock").last_error.clone()
    }

    fn reference_syntactically_valid(&self) -> bool {
        classify(&self.url) == UrlKind::Git
    }

    fn exists(&self) -> bool {
        let reachable = http_head_ok(&self.url);
        self.state.write().expect("state lock").remote_reachable = reachable;
        reachable
    }

    fn refresh(&self) -> uppm_core::Result<()> {
        if let Err(error) = self.synchronize() {
            let mut state = self.state.write().expect("state lock");
            state.ready = false;
            state.last_error = Some(error.to_string());
            return Err(error.into_refresh_failure(&self.url));
        }

        let catalog = crate::catalog::scan(&self.checkout_folder, &self.url, &self.engines);
        let mut state = self.state.write().expect("state lock");
        state.catalog = catalog;
        state.ready = true;
        state.last_error = None;
        tracing::info!(url = %self.url, packages = state.catalog.len(), "repository refreshed");
        Ok(())
    }

    fn catalog(&self) -> Catalog {
        self.state.read().expect("state lock").catalog.clone()
    }

    fn try_get_package_text(&self, reference: &CompleteReference) -> Option<String> {
        let path = {
            let state = self.state.read().expect("state lock");
            state.catalog.get(reference)?.clone()
        };
        match uppm_fs::read_text(&path) {
            Ok(text) => Some(text),
            Err(error) => {
                tracing::warn!(%path, %error, "failed to read package text");
                None
            }
        }
    }

    fn try_get_script_engine(
        &self,
        reference: &CompleteReference,
    ) -> Option<Arc<dyn ScriptEngine>> {
        let extension = {
            let state = self.state.read().expect("state lock");
            state.catalog.get(reference)?.extension()?.to_string()
        };
        self.engines.by_extension(&extension)
    }

    fn try_infer_reference(&self, partial: &PartialReference) -> Option<CompleteReference> {
        let state = self.state.read().expect("state lock");
        infer::complete_reference(&state.catalog, &self.url, partial)
    }

    fn try_get_package(&self, partial: &PartialReference) -> uppm_core::Result<Package> {
        loader::load_package(self, partial)
    }
}

/// Derive the checkout directory name from the URL host and path.
fn checkout_dir_name(url: &str) -> String {
    let sanitize = |s: &str| {
        s.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect::<String>()
    };

    match url::Url::parse(url) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or("local");
            format!("{}{}", sanitize(host), sanitize(parsed.path()))
        }
        Err(_) => sanitize(url),
    }
}

/// Probe the remote with an HTTP HEAD request, expecting 200.
fn http_head_ok(url: &str) -> bool {
    let client = match reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
    {
        Ok(client) => client,
        Err(_) => return false,
    };
    match client.head(url).send() {
        Ok(response) => response.status() == reqwest::StatusCode::OK,
        Err(error) => {
            tracing::debug!(url, %error, "remote probe failed");
            false
        }
    }
}
