//! Configuration tree: one [`Module`] per directory, owning its resources and
//! the modules it includes.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

use crate::attributes::{AttributeExt, AttributeSet};
use crate::config::blocks::{Block, ResourceKind, extract_blocks};
use crate::config::parser::{ConfigParser, HclConfigParser, is_config_file};
use crate::error::{EstimateError, EstimateResult};

/// Identifier and name of the root module
pub const ROOT_MODULE: &str = "root";

/// A configuration namespace: the root directory or a nested module inclusion
#[derive(Debug, Clone, Default, Serialize)]
pub struct Module {
    pub name: String,
    /// Dotted path, e.g. `root.module.network`
    pub identifier: String,
    /// `source` attribute of the including block, if any
    pub source: Option<String>,
    /// Raw attribute set of the including block
    pub attributes: AttributeSet,
    /// Declared variables and their defaults (`None` when no default)
    pub variables: BTreeMap<String, Option<Value>>,
    /// Caller-supplied inputs, captured unresolved
    pub inputs: AttributeSet,
    pub resources: Vec<Resource>,
    pub modules: Vec<Module>,
    /// Blocks this engine does not interpret
    pub opaque: Vec<OpaqueBlock>,
}

/// One declared resource or data block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    pub name: String,
    /// Unique dotted path: `<module>.<kind>.<type>.<name>`
    pub identifier: String,
    pub kind: ResourceKind,
    pub resource_type: String,
    pub attributes: AttributeSet,
}

/// A block kept verbatim (provider, output, locals, terraform...)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpaqueBlock {
    pub kind: String,
    pub name: String,
    pub body: Value,
}

impl Module {
    pub fn new(name: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identifier: identifier.into(),
            ..Default::default()
        }
    }

    pub fn root() -> Self {
        Self::new(ROOT_MODULE, ROOT_MODULE)
    }

    /// Add a resource; a later declaration with the same identifier shadows
    /// the earlier one in place.
    pub fn add_resource(&mut self, resource: Resource) {
        match self
            .resources
            .iter_mut()
            .find(|r| r.identifier == resource.identifier)
        {
            Some(existing) => {
                warn!(
                    identifier = %resource.identifier,
                    "Duplicate resource declaration, later declaration shadows earlier"
                );
                *existing = resource;
            }
            None => self.resources.push(resource),
        }
    }

    /// Add a child module; a later declaration with the same identifier
    /// shadows the earlier one (and its subtree) in place.
    pub fn add_module(&mut self, module: Module) {
        match self
            .modules
            .iter_mut()
            .find(|m| m.identifier == module.identifier)
        {
            Some(existing) => {
                warn!(
                    identifier = %module.identifier,
                    "Duplicate module declaration, later declaration shadows earlier"
                );
                *existing = module;
            }
            None => self.modules.push(module),
        }
    }

    pub fn declare_variable(&mut self, name: String, default: Option<Value>) {
        if self.variables.contains_key(&name) {
            warn!(
                module = %self.identifier,
                variable = %name,
                "Variable declared more than once, later default wins"
            );
        }
        self.variables.insert(name, default);
    }

    /// Every resource in this subtree, own resources before child modules
    pub fn all_resources(&self) -> Vec<&Resource> {
        let mut out: Vec<&Resource> = self.resources.iter().collect();
        for child in &self.modules {
            out.extend(child.all_resources());
        }
        out
    }

    /// Find a module in this subtree by identifier
    pub fn find_module(&self, identifier: &str) -> Option<&Module> {
        if self.identifier == identifier {
            return Some(self);
        }
        self.modules.iter().find_map(|m| m.find_module(identifier))
    }

    /// Find a resource in this subtree by identifier
    pub fn find_resource(&self, identifier: &str) -> Option<&Resource> {
        self.all_resources()
            .into_iter()
            .find(|r| r.identifier == identifier)
    }
}

/// Builds a [`Module`] tree from a directory of configuration files
pub struct TreeBuilder<P: ConfigParser = HclConfigParser> {
    parser: P,
}

impl TreeBuilder<HclConfigParser> {
    pub fn new() -> Self {
        Self {
            parser: HclConfigParser,
        }
    }
}

impl Default for TreeBuilder<HclConfigParser> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
struct BuildStats {
    files_read: usize,
    files_skipped: usize,
    blocks: usize,
}

impl<P: ConfigParser> TreeBuilder<P> {
    pub fn with_parser(parser: P) -> Self {
        Self { parser }
    }

    /// Build the tree rooted at `root`.
    ///
    /// Files that fail to read or parse are skipped with a warning. Fails with
    /// [`EstimateError::NoConfigurationFound`] when no block was found
    /// anywhere in the traversal.
    #[instrument(skip(self, root), fields(root = %root.as_ref().display()))]
    pub fn build(&self, root: impl AsRef<Path>) -> EstimateResult<Module> {
        let root = root.as_ref();
        let files = list_config_files(root).map_err(|source| EstimateError::Io {
            path: root.to_path_buf(),
            source,
        })?;

        let mut module = Module::root();
        let mut stats = BuildStats::default();
        let mut stack = vec![canonical(root)];
        self.load_files(&files, &mut module, &mut stack, &mut stats);

        info!(
            files_read = stats.files_read,
            files_skipped = stats.files_skipped,
            blocks = stats.blocks,
            resources = module.all_resources().len(),
            "Configuration tree built"
        );

        if stats.blocks == 0 {
            return Err(EstimateError::NoConfigurationFound {
                path: root.to_path_buf(),
            });
        }

        Ok(module)
    }

    fn load_files(
        &self,
        files: &[PathBuf],
        module: &mut Module,
        stack: &mut Vec<PathBuf>,
        stats: &mut BuildStats,
    ) {
        for file in files {
            let Some(blocks) = self.read_blocks(file) else {
                stats.files_skipped += 1;
                continue;
            };
            stats.files_read += 1;
            stats.blocks += blocks.len();

            for block in blocks {
                self.attach(block, file, module, stack, stats);
            }
        }
    }

    fn read_blocks(&self, file: &Path) -> Option<Vec<Block>> {
        let text = match fs::read_to_string(file) {
            Ok(text) => text,
            Err(e) => {
                warn!(file = %file.display(), error = %e, "Skipping unreadable file");
                return None;
            }
        };

        let document = match self.parser.parse(&text, file) {
            Ok(document) => document,
            Err(e) => {
                warn!(file = %file.display(), error = %e, "Skipping file that failed to parse");
                return None;
            }
        };

        let blocks = extract_blocks(&document);
        if blocks.is_none() {
            warn!(file = %file.display(), "Skipping file without a top-level mapping");
        }
        blocks
    }

    fn attach(
        &self,
        block: Block,
        file: &Path,
        module: &mut Module,
        stack: &mut Vec<PathBuf>,
        stats: &mut BuildStats,
    ) {
        match block {
            Block::Module { name, body } => {
                let child = self.build_child(name, body, file, module, stack, stats);
                module.add_module(child);
            }
            Block::Resource {
                kind,
                resource_type,
                name,
                body,
            } => {
                let identifier = format!(
                    "{}.{}.{}.{}",
                    module.identifier, kind, resource_type, name
                );
                debug!(identifier = %identifier, "Found resource");
                module.add_resource(Resource {
                    name,
                    identifier,
                    kind,
                    resource_type,
                    attributes: body,
                });
            }
            Block::Variable { name, default } => module.declare_variable(name, default),
            Block::Other { kind, name, body } => module.opaque.push(OpaqueBlock { kind, name, body }),
        }
    }

    fn build_child(
        &self,
        name: String,
        body: AttributeSet,
        file: &Path,
        parent: &Module,
        stack: &mut Vec<PathBuf>,
        stats: &mut BuildStats,
    ) -> Module {
        let identifier = format!("{}.module.{}", parent.identifier, name);
        let mut child = Module::new(name, identifier);
        child.source = body.str_attr("source").map(str::to_string);
        child.inputs = body
            .iter()
            .filter(|(key, _)| key.as_str() != "source")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        child.attributes = body;

        let Some(source) = child.source.clone().filter(|s| s.starts_with('.')) else {
            debug!(
                module = %child.identifier,
                source = ?child.source,
                "Module source is not local, children not expanded"
            );
            return child;
        };

        let base = file.parent().unwrap_or_else(|| Path::new("."));
        let directory = base.join(&source);
        let canonical_dir = canonical(&directory);
        if stack.contains(&canonical_dir) {
            warn!(
                module = %child.identifier,
                source = %source,
                "Module source includes itself, not expanded"
            );
            return child;
        }

        match list_config_files(&directory) {
            Ok(files) => {
                stack.push(canonical_dir);
                self.load_files(&files, &mut child, stack, stats);
                stack.pop();
            }
            Err(e) => warn!(
                module = %child.identifier,
                directory = %directory.display(),
                error = %e,
                "Module source directory could not be read"
            ),
        }

        child
    }
}

/// Recognised configuration files in `dir`, sorted by file name
pub fn list_config_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_config_file(&path) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_identifiers_follow_module_path() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "main.tf",
            r#"
resource "google_storage_bucket" "logs" {
  location = "US"
}

data "google_compute_image" "debian" {
  family = "debian-12"
}

module "network" {
  source = "./network"
  region = "us-east1"
}
"#,
        );
        write(
            dir.path(),
            "network/main.tf",
            r#"
resource "google_compute_address" "ip" {
  region = var.region
}
"#,
        );

        let root = TreeBuilder::new().build(dir.path()).unwrap();

        let ids: Vec<_> = root
            .all_resources()
            .iter()
            .map(|r| r.identifier.clone())
            .collect();
        assert_eq!(
            ids,
            vec![
                "root.resource.google_storage_bucket.logs",
                "root.data.google_compute_image.debian",
                "root.module.network.resource.google_compute_address.ip",
            ]
        );

        let network = root.find_module("root.module.network").unwrap();
        assert_eq!(network.source.as_deref(), Some("./network"));
        assert_eq!(network.inputs.get("region"), Some(&json!("us-east1")));
        assert!(!network.inputs.contains_key("source"));
        assert_eq!(network.resources[0].attributes["region"], json!("${var.region}"));
    }

    #[test]
    fn test_identifiers_are_unique_with_shadowing() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "a.tf",
            r#"
resource "google_compute_address" "ip" {
  region = "us-central1"
}
"#,
        );
        write(
            dir.path(),
            "b.tf",
            r#"
resource "google_compute_address" "ip" {
  region = "europe-west1"
}
"#,
        );

        let root = TreeBuilder::new().build(dir.path()).unwrap();
        let resources = root.all_resources();
        let unique: HashSet<_> = resources.iter().map(|r| &r.identifier).collect();

        assert_eq!(resources.len(), unique.len());
        assert_eq!(resources.len(), 1);
        // b.tf sorts after a.tf, so its declaration wins
        assert_eq!(resources[0].attributes["region"], json!("europe-west1"));
    }

    #[test]
    fn test_malformed_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "broken.tf", "resource \"google_compute_address\" {");
        write(
            dir.path(),
            "good.tf",
            r#"
resource "google_compute_address" "ip" {
  region = "us-central1"
}
"#,
        );

        let root = TreeBuilder::new().build(dir.path()).unwrap();
        assert_eq!(root.all_resources().len(), 1);
    }

    #[test]
    fn test_empty_directory_is_no_configuration() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "README.md", "# nothing here");

        let err = TreeBuilder::new().build(dir.path()).unwrap_err();
        assert!(matches!(err, EstimateError::NoConfigurationFound { .. }));
    }

    #[test]
    fn test_missing_root_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = TreeBuilder::new()
            .build(dir.path().join("does-not-exist"))
            .unwrap_err();
        assert!(matches!(err, EstimateError::Io { .. }));
    }

    #[test]
    fn test_variables_and_remote_modules() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "variables.tf",
            r#"
variable "region" {
  default = "us-central1"
}

variable "project" {}
"#,
        );
        write(
            dir.path(),
            "main.tf",
            r#"
module "vpc" {
  source  = "terraform-google-modules/network/google"
  version = "9.0.0"
}

provider "google" {
  project = "demo"
}
"#,
        );

        let root = TreeBuilder::new().build(dir.path()).unwrap();
        assert_eq!(root.variables.get("region"), Some(&Some(json!("us-central1"))));
        assert_eq!(root.variables.get("project"), Some(&None));

        let vpc = root.find_module("root.module.vpc").unwrap();
        assert!(vpc.resources.is_empty());
        assert_eq!(vpc.inputs.get("version"), Some(&json!("9.0.0")));

        assert!(root.opaque.iter().any(|b| b.kind == "provider" && b.name == "google"));
    }

    #[test]
    fn test_self_including_module_terminates() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "main.tf",
            r#"
module "again" {
  source = "./"
}

resource "google_compute_address" "ip" {
  region = "us-central1"
}
"#,
        );

        let root = TreeBuilder::new().build(dir.path()).unwrap();
        let again = root.find_module("root.module.again").unwrap();
        assert!(again.resources.is_empty());
        assert_eq!(root.all_resources().len(), 1);
    }

    #[test]
    fn test_missing_local_module_leaves_child_empty() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "main.tf",
            r#"
module "gone" {
  source = "./gone"
}
"#,
        );

        let root = TreeBuilder::new().build(dir.path()).unwrap();
        let gone = root.find_module("root.module.gone").unwrap();
        assert!(gone.resources.is_empty() && gone.modules.is_empty());
    }
}
