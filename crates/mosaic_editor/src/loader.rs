//! Model loading.
//!
//! Loaders turn raw file bytes into a node tree. The editor only ever sees
//! the finished tree, which enters the scene through an
//! [`AddObjectCommand`] so that it can be undone like any other edit.

use std::collections::HashMap;

use mosaic_scene::{Node, NodeKind, NodeTree};
use thiserror::Error;

use crate::commands::{AddObjectCommand, AddTilesetCommand, CommandError};
use crate::editor::Editor;

/// Diagnostics key for files with no registered loader.
pub const LOADER_NOT_FOUND: &str = "error-loader-manager-loader-not-found";

/// Error during model loading
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no loader for extension '{0}'")]
    ExtensionNotFound(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Result of parsing a model file.
#[derive(Clone, Debug, Default)]
pub struct LoadedModel {
    /// `None` when the file holds no geometry
    pub root: Option<NodeTree>,
    pub animations: Vec<String>,
}

/// Trait for model loaders
pub trait Loader: Send + Sync {
    /// File extensions this loader handles, without the dot
    fn extensions(&self) -> &[&str];

    /// Parse raw file data
    fn parse(&self, name: &str, bytes: &[u8]) -> Result<LoadedModel, LoadError>;
}

/// Loader for node trees stored as JSON.
#[derive(Debug, Default)]
pub struct NodeJsonLoader;

impl Loader for NodeJsonLoader {
    fn extensions(&self) -> &[&str] {
        &["json"]
    }

    fn parse(&self, name: &str, bytes: &[u8]) -> Result<LoadedModel, LoadError> {
        let tree: NodeTree = serde_json::from_slice(bytes)
            .map_err(|e| LoadError::Parse(format!("{}: {}", name, e)))?;
        Ok(LoadedModel {
            root: Some(tree),
            animations: Vec::new(),
        })
    }
}

/// Registry of loaders keyed by lower-cased extension.
#[derive(Default)]
pub struct LoaderManager {
    by_extension: HashMap<String, usize>,
    loaders: Vec<Box<dyn Loader>>,
}

impl LoaderManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Manager with the built-in loaders.
    pub fn with_builtin() -> Self {
        let mut manager = Self::new();
        manager.register(NodeJsonLoader);
        manager
    }

    /// Register a loader. Later registrations win for shared extensions.
    pub fn register<L: Loader + 'static>(&mut self, loader: L) {
        let index = self.loaders.len();
        for &ext in loader.extensions() {
            self.by_extension.insert(ext.to_lowercase(), index);
        }
        self.loaders.push(Box::new(loader));
    }

    pub fn supports_extension(&self, ext: &str) -> bool {
        self.by_extension.contains_key(&ext.to_lowercase())
    }

    pub fn loader_for(&self, file_name: &str) -> Option<&dyn Loader> {
        let (_, ext) = file_name.rsplit_once('.')?;
        let index = *self.by_extension.get(&ext.to_lowercase())?;
        self.loaders.get(index).map(|l| l.as_ref())
    }

    /// Parse a file and add the result to the scene through history.
    ///
    /// Returns the history entry id, or `None` when the file holds no
    /// geometry. A missing loader is reported to diagnostics and leaves
    /// scene and history untouched.
    pub fn load_file(&self, editor: &mut Editor, name: &str, bytes: &[u8]) -> Result<Option<u64>, LoadError> {
        let Some(loader) = self.loader_for(name) else {
            let ext = name.rsplit_once('.').map_or("", |(_, ext)| ext).to_lowercase();
            editor
                .state
                .diagnostics
                .error(LOADER_NOT_FOUND, format!("no loader for '{}'", name));
            return Err(LoadError::ExtensionNotFound(ext));
        };

        let model = loader.parse(name, bytes)?;
        let Some(mut root) = model.root else {
            log::warn!("'{}' contains no objects", name);
            return Ok(None);
        };
        if root.node.name.is_empty() {
            root.node.name = name.to_string();
        }
        if !model.animations.is_empty() {
            log::debug!("'{}' carries {} animations", name, model.animations.len());
        }

        let id = editor.execute(Box::new(AddObjectCommand::new(root)), None)?;
        log::info!("Loaded '{}'", name);
        Ok(Some(id))
    }

    /// Add a streamed tileset root for `url`.
    pub fn load_tileset(&self, editor: &mut Editor, url: &str) -> Result<u64, LoadError> {
        let name = url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("Tileset");
        let node = Node::new(name).with_kind(NodeKind::Tileset { url: url.to_string() });

        let id = editor.execute(Box::new(AddTilesetCommand::new(node)), None)?;
        log::info!("Added tileset '{}'", url);
        Ok(id)
    }
}

impl std::fmt::Debug for LoaderManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut extensions: Vec<&str> = self.by_extension.keys().map(String::as_str).collect();
        extensions.sort_unstable();
        f.debug_struct("LoaderManager")
            .field("extensions", &extensions)
            .finish()
    }
}
