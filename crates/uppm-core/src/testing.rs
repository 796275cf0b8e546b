//! Test doubles shared by the core's unit tests

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, RwLock};

use indexmap::IndexSet;
use tempfile::TempDir;
use uppm_fs::NormalizedPath;

use crate::engine::{ActionHost, EngineRegistry, ImportSource, ScriptEngine};
use crate::loader;
use crate::meta::{HeaderExtractor, PackageMeta};
use crate::package::Package;
use crate::prompt::UserInput;
use crate::reference::{CompleteReference, PartialReference};
use crate::registry::RepositoryRegistry;
use crate::repository::{Catalog, Repository};
use crate::resolver::ResolveContext;
use crate::target::{TargetApp, TargetAppRegistry};
use crate::{Error, Result};

pub const TEST_APP: &str = "testapp";
pub const TEST_REPO_URL: &str = "/stub/repo";

/// Render a pack script with a csup-style header.
pub fn pack_script(name: &str, version: &str, dependencies: &[&str]) -> String {
    script(name, version, dependencies, TEST_APP, false)
}

fn script(
    name: &str,
    version: &str,
    dependencies: &[&str],
    target_app: &str,
    force_global: bool,
) -> String {
    let dependency_list = dependencies
        .iter()
        .map(|d| format!("\"{d}\""))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "/*\nuppm 0.1 {{\n    name: {name}\n    version: \"{version}\"\n    targetApp: {target_app}\n    license: MIT\n    forceGlobal: {force_global}\n    dependencies: [ {dependency_list} ]\n}}\n*/\nscript body of {name}\n"
    )
}

/// Engine double: real header extraction, recorded actions.
pub struct StubEngine {
    extension: String,
    extractor: HeaderExtractor,
    log: Arc<Mutex<Vec<(String, String)>>>,
    fail_on: Arc<Mutex<Option<String>>>,
}

impl StubEngine {
    pub fn new(extension: &str) -> Self {
        Self {
            extension: extension.to_string(),
            extractor: HeaderExtractor::new(r"/\*", r"\*/"),
            log: Arc::new(Mutex::new(Vec::new())),
            fail_on: Arc::new(Mutex::new(None)),
        }
    }
}

impl ScriptEngine for StubEngine {
    fn name(&self) -> &str {
        "stub"
    }

    fn extension(&self) -> &str {
        &self.extension
    }

    fn try_get_meta(
        &self,
        text: &str,
        reference: Option<&CompleteReference>,
    ) -> Result<PackageMeta> {
        self.extractor.extract(text, reference)
    }

    fn try_get_script_text(
        &self,
        text: &str,
        _imports: &IndexSet<PartialReference>,
        _parent_repository: Option<&str>,
        _source: &dyn ImportSource,
        _temporary_folder: &NormalizedPath,
    ) -> Result<String> {
        Ok(text.to_string())
    }

    fn run_action(
        &self,
        package: &Package,
        action: &str,
        _host: &ActionHost,
        _source: &dyn ImportSource,
    ) -> Result<()> {
        if self
            .fail_on
            .lock()
            .unwrap()
            .as_deref()
            .is_some_and(|name| name.eq_ignore_ascii_case(&package.meta.name))
        {
            return Err(Error::ActionFailed {
                action: action.to_string(),
                reference: package.reference().to_string(),
                message: "scripted failure".to_string(),
            });
        }
        self.log
            .lock()
            .unwrap()
            .push((package.meta.name.clone(), action.to_string()));
        Ok(())
    }
}

/// In-memory repository backed by a catalog map.
pub struct StubRepository {
    url: String,
    engine: Arc<StubEngine>,
    state: RwLock<StubState>,
}

#[derive(Default)]
struct StubState {
    catalog: Catalog,
    texts: HashMap<CompleteReference, String>,
}

impl StubRepository {
    pub fn new(url: &str, engine: Arc<StubEngine>) -> Self {
        Self {
            url: url.to_string(),
            engine,
            state: RwLock::new(StubState::default()),
        }
    }

    pub fn insert(&self, name: &str, version: &str, text: String) {
        let complete = CompleteReference::new(name, version, &self.url);
        let path = NormalizedPath::new(format!(
            "{}/someone/{name}/{version}.{}",
            self.url,
            self.engine.extension()
        ));
        let mut state = self.state.write().unwrap();
        state.catalog.insert(complete.clone(), path);
        state.texts.insert(complete, text);
    }
}

impl Repository for StubRepository {
    fn url(&self) -> &str {
        &self.url
    }

    fn ready(&self) -> bool {
        true
    }

    fn last_refresh_error(&self) -> Option<String> {
        None
    }

    fn reference_syntactically_valid(&self) -> bool {
        true
    }

    fn exists(&self) -> bool {
        true
    }

    fn refresh(&self) -> Result<()> {
        Ok(())
    }

    fn catalog(&self) -> Catalog {
        self.state.read().unwrap().catalog.clone()
    }

    fn try_get_package_text(&self, reference: &CompleteReference) -> Option<String> {
        self.state.read().unwrap().texts.get(reference).cloned()
    }

    fn try_get_script_engine(
        &self,
        _reference: &CompleteReference,
    ) -> Option<Arc<dyn ScriptEngine>> {
        Some(self.engine.clone())
    }

    fn try_infer_reference(&self, partial: &PartialReference) -> Option<CompleteReference> {
        crate::infer::complete_reference(&self.state.read().unwrap().catalog, &self.url, partial)
    }

    fn try_get_package(&self, partial: &PartialReference) -> Result<Package> {
        loader::load_package(self, partial)
    }
}

/// Prompt double that records questions and pops scripted answers,
/// falling back to the suggested default.
#[derive(Default)]
pub struct ScriptedPrompt {
    answers: Mutex<VecDeque<bool>>,
    questions: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn answering(answers: Vec<bool>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            questions: Mutex::new(Vec::new()),
        }
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().unwrap().clone()
    }
}

impl UserInput for ScriptedPrompt {
    fn confirm(&self, question: &str, default_answer: bool) -> bool {
        self.questions.lock().unwrap().push(question.to_string());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(default_answer)
    }
}

/// A complete wired-up environment: one stub repository registered as
/// default, one engine, one target app with pack folders in a temp dir.
pub struct TestWorld {
    pub temp: TempDir,
    pub engines: EngineRegistry,
    pub repositories: RepositoryRegistry,
    pub targets: TargetAppRegistry,
    pub prompt: ScriptedPrompt,
    pub repo: Arc<StubRepository>,
    engine: Arc<StubEngine>,
}

impl TestWorld {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let root = NormalizedPath::new(temp.path());

        let engine = Arc::new(StubEngine::new("csup"));
        let mut engines = EngineRegistry::new();
        engines.register(engine.clone());

        let repo = Arc::new(StubRepository::new(TEST_REPO_URL, engine.clone()));
        let repositories = RepositoryRegistry::new();
        repositories.register_default(repo.clone());

        let app = TargetApp {
            short_name: TEST_APP.to_string(),
            architecture: None,
            app_folder: root.join("app"),
            global_packs_folder: root.join("packs-global"),
            local_packs_folder: root.join("packs-local"),
            executable: None,
            default_repository: None,
        };
        let mut targets = TargetAppRegistry::new();
        targets.register(app);
        targets.set_current(TEST_APP, &repositories).unwrap();

        Self {
            temp,
            engines,
            repositories,
            targets,
            prompt: ScriptedPrompt::default(),
            repo,
            engine,
        }
    }

    pub fn add_pack(&mut self, name: &str, version: &str, dependencies: &[&str]) {
        self.repo
            .insert(name, version, pack_script(name, version, dependencies));
    }

    pub fn add_pack_forced_global(&mut self, name: &str, version: &str) {
        self.repo
            .insert(name, version, script(name, version, &[], TEST_APP, true));
    }

    pub fn add_pack_for_app(&mut self, name: &str, version: &str, target_app: &str) {
        self.repo
            .insert(name, version, script(name, version, &[], target_app, false));
    }

    pub fn load_root(&self, name: &str) -> Package {
        self.repo
            .try_get_package(&PartialReference::new(name))
            .unwrap()
    }

    pub fn context(&self) -> ResolveContext<'_> {
        ResolveContext {
            repositories: &self.repositories,
            targets: &self.targets,
            engines: &self.engines,
            prompt: &self.prompt,
            temporary_folder: NormalizedPath::new(self.temp.path()).join("temp"),
            unattended: true,
        }
    }

    pub fn resolve(&self, root: &mut Package) -> Result<()> {
        crate::resolver::resolve_dependencies(root, &self.context())
    }

    pub fn action_log(&self) -> Vec<(String, String)> {
        self.engine.log.lock().unwrap().clone()
    }

    pub fn fail_action_for(&self, name: &str) {
        *self.engine.fail_on.lock().unwrap() = Some(name.to_string());
    }
}

/// Write an installed package into the test app's local pack folder.
pub fn install_pack(world: &TestWorld, name: &str, version: &str) {
    let folder = NormalizedPath::new(world.temp.path())
        .join("packs-local")
        .join(name);
    uppm_fs::write_text(&folder.join(format!("{name}.csup")), &pack_script(name, version, &[]))
        .unwrap();
}
