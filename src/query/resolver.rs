//! Cross-file context resolution
//!
//! A request names a byte span of an origin file. Definitions fully inside
//! the span seed a breadth-first walk over the file's dependency graph, and
//! every definition reached is marked in that file's [`IntervalSet`]. Names
//! a file does not define are handed to the files it includes, one hop
//! deeper each time, until the depth bound. Marked runs become the result.
//!
//! Nothing here fails the request: unreadable files, unsupported languages,
//! syntax errors and unresolvable includes only mean fewer items.

use crate::adapter::{default_registry, AdapterRegistry};
use crate::builder::{analyze, BuildMode, FileAnalysis};
use crate::config::ResolverConfig;
use crate::graph::FileIndex;
use crate::interval::{IntervalSet, EXCLUDED, INCLUDED};
use crate::query::include::{extract_includes, IncludeResolver};
use crate::scope::GLOBAL;
use crate::symbol::{shrink_to_chars, snap_to_chars, ContextItem, ItemKind, LineIndex};
use crate::tree::ContextTreeNode;
use crate::workspace::{normalize_path, DiskFiles, FileProvider, Workspace, WorkspaceProvider};
use crate::{Error, Result};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

/// A span of interest in one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveRequest {
    pub path: PathBuf,
    /// Content of the origin, e.g. an unsaved buffer. Read from disk when `None`.
    pub source: Option<String>,
    pub start: usize,
    pub end: usize,
}

impl ResolveRequest {
    pub fn new(path: impl Into<PathBuf>, start: usize, end: usize) -> Self {
        Self {
            path: path.into(),
            source: None,
            start,
            end,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Items resolved in one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContext {
    pub path: PathBuf,
    pub items: Vec<ContextItem>,
}

/// Resolution output: files in order of first visit, origin first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedContext {
    files: Vec<FileContext>,
}

impl ResolvedContext {
    pub fn files(&self) -> &[FileContext] {
        &self.files
    }

    pub fn get(&self, path: &Path) -> Option<&[ContextItem]> {
        let path = normalize_path(path);
        self.files
            .iter()
            .find(|file| file.path == path)
            .map(|file| file.items.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn item_count(&self) -> usize {
        self.files.iter().map(|file| file.items.len()).sum()
    }

    /// Every item once per `path:startLine~endLine` key, in output order.
    pub fn deduplicated(&self) -> Vec<(&Path, &ContextItem)> {
        let mut seen = HashSet::new();
        self.files
            .iter()
            .flat_map(|file| file.items.iter().map(move |item| (file.path.as_path(), item)))
            .filter(|(path, item)| seen.insert(item.identity_key(path)))
            .collect()
    }
}

impl Serialize for ResolvedContext {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.files.len()))?;
        for file in &self.files {
            map.serialize_entry(&file.path.display().to_string(), &file.items)?;
        }
        map.end()
    }
}

/// One include written in a file and where it leads.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct IncludeEntry {
    pub include: String,
    pub resolved: Option<PathBuf>,
}

/// Entry point: owns the language registry and the file and workspace services.
pub struct ContextResolver {
    registry: AdapterRegistry,
    files: Box<dyn FileProvider>,
    workspace: Box<dyn WorkspaceProvider>,
    config: ResolverConfig,
}

impl ContextResolver {
    /// Resolver over the local disk, with the configured workspace folders.
    pub fn new(config: ResolverConfig) -> Self {
        let workspace = Workspace::new(config.workspace_folders());
        Self {
            registry: default_registry(),
            files: Box::new(DiskFiles),
            workspace: Box::new(workspace),
            config,
        }
    }

    pub fn with_files(mut self, files: impl FileProvider + 'static) -> Self {
        self.files = Box::new(files);
        self
    }

    pub fn with_workspace(mut self, workspace: impl WorkspaceProvider + 'static) -> Self {
        self.workspace = Box::new(workspace);
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// File content as resolution sees it (line endings normalized if configured).
    pub fn load_source(&self, path: &Path) -> Result<String> {
        let source = self.files.read_to_string(path)?;
        if self.config.normalize_line_endings && source.contains('\r') {
            return Ok(source.replace("\r\n", "\n"));
        }
        Ok(source)
    }

    /// Definition tree of a file.
    pub fn outline(&self, path: &Path) -> Result<ContextTreeNode> {
        let adapter = self
            .registry
            .find_adapter(path)
            .ok_or_else(|| Error::UnsupportedLanguage(path.display().to_string()))?;
        let source = self.load_source(path)?;
        let tree = adapter.parse(&source, self.config.tolerate_syntax_errors)?;
        let analysis = analyze(&tree, &source, adapter.rules(), BuildMode::Outline);
        Ok(analysis.outline.unwrap_or_else(ContextTreeNode::empty))
    }

    /// Includes written in a file, each with the path it resolves to.
    pub fn includes(&self, path: &Path) -> Result<Vec<IncludeEntry>> {
        let source = self.load_source(path)?;
        let resolver = self.include_resolver();
        Ok(extract_includes(path, &source)
            .into_iter()
            .map(|include| {
                let resolved = resolver.resolve(path, &include);
                IncludeEntry { include, resolved }
            })
            .collect())
    }

    /// Context a reader of `request`'s span needs. Never fails; problems
    /// are logged and yield fewer items.
    pub fn resolve(&self, request: &ResolveRequest) -> ResolvedContext {
        let path = normalize_path(&request.path);
        let source = match &request.source {
            Some(source) => source.clone(),
            None => match self.load_source(&path) {
                Ok(source) => source,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "cannot read origin file");
                    return ResolvedContext::default();
                }
            },
        };

        let (start, end) = (request.start, request.end);
        if start >= end || end > source.len() {
            tracing::debug!(start, end, len = source.len(), "empty or out-of-range span");
            return ResolvedContext::default();
        }
        // A span cutting a char in half excludes the whole char.
        let (start, end) = snap_to_chars(&source, start, end);

        let mut session = Session::new(self);
        session.open_origin(path, source, start, end);
        session.run();
        session.finish(start, end)
    }

    fn include_resolver(&self) -> IncludeResolver<'_> {
        IncludeResolver::new(self.files.as_ref(), self.workspace.as_ref())
    }

    /// Parse and analyze one file. `None` when there is no adapter or the parse fails.
    fn analyze_file(&self, path: &Path, source: &str, mode: BuildMode) -> Option<FileAnalysis> {
        let Some(adapter) = self.registry.find_adapter(path) else {
            tracing::debug!(path = %path.display(), "no parser for file");
            return None;
        };
        match adapter.parse(source, self.config.tolerate_syntax_errors) {
            Ok(tree) => Some(analyze(&tree, source, adapter.rules(), mode)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "parse failed, file contributes no items");
                None
            }
        }
    }
}

/// Per-request state of one visited file.
struct FileState {
    path: PathBuf,
    source: String,
    lines: LineIndex,
    /// `None` when the file could not be parsed
    index: Option<FileIndex>,
    marks: IntervalSet,
    /// Names already looked up here
    attempted: HashSet<String>,
    /// Definitions marked so far
    marked: Vec<ContextItem>,
    includes: Option<Vec<PathBuf>>,
}

impl FileState {
    fn new(path: PathBuf, source: String, index: Option<FileIndex>) -> Self {
        let lines = LineIndex::new(&source);
        let marks = IntervalSet::new(source.len());
        Self {
            path,
            source,
            lines,
            index,
            marks,
            attempted: HashSet::new(),
            marked: Vec::new(),
            includes: None,
        }
    }

    /// Marked runs as items, each named after the definition that owns it.
    fn emit(&mut self) -> Vec<ContextItem> {
        self.marked
            .sort_by_key(|item| (item.range.start, Reverse(item.range.end)));

        self.marks
            .ranges(0, self.source.len(), INCLUDED)
            .into_iter()
            .filter_map(|(start, end)| {
                let (start, end) = shrink_to_chars(&self.source, start, end);
                if start >= end {
                    return None;
                }
                let owner = self
                    .marked
                    .iter()
                    .find(|item| start <= item.range.start && item.range.start < end)
                    .or_else(|| self.marked.iter().find(|item| item.range.overlaps(start, end)));
                let (kind, name) = match owner {
                    Some(item) => (item.kind, item.qualified_name.clone()),
                    None => (ItemKind::Excerpt, format!("{}>{}~{}", GLOBAL, start, end)),
                };
                Some(ContextItem::from_source(kind, name, &self.source, &self.lines, start, end))
            })
            .collect()
    }
}

/// Names to look up in one file.
struct FileTask {
    file: usize,
    depth: usize,
    names: Vec<String>,
}

struct Session<'r> {
    resolver: &'r ContextResolver,
    files: Vec<FileState>,
    by_path: HashMap<PathBuf, usize>,
    /// Names resolved in any file
    found: HashSet<String>,
    tasks: VecDeque<FileTask>,
}

impl<'r> Session<'r> {
    fn new(resolver: &'r ContextResolver) -> Self {
        Self {
            resolver,
            files: Vec::new(),
            by_path: HashMap::new(),
            found: HashSet::new(),
            tasks: VecDeque::new(),
        }
    }

    fn open_origin(&mut self, path: PathBuf, source: String, start: usize, end: usize) {
        let analysis = self.resolver.analyze_file(&path, &source, BuildMode::Full);

        let mut seeds: Vec<String> = Vec::new();
        let index = analysis.map(|analysis| {
            if let Some(outline) = &analysis.outline {
                for item in outline.query_range(start, end) {
                    if !seeds.contains(&item.qualified_name) {
                        seeds.push(item.qualified_name.clone());
                    }
                }
            }
            // Names read in the span, even when no definition lies inside it
            for name in analysis.uses_within(start, end) {
                if !seeds.iter().any(|seed| seed == name) {
                    seeds.push(name.to_string());
                }
            }
            analysis.index
        });
        tracing::debug!(path = %path.display(), seeds = seeds.len(), "origin parsed");

        let mut state = FileState::new(path.clone(), source, index);
        state.marks.update(start, end, EXCLUDED);
        self.by_path.insert(path, self.files.len());
        self.tasks.push_back(FileTask {
            file: self.files.len(),
            depth: 0,
            names: seeds,
        });
        self.files.push(state);
    }

    fn run(&mut self) {
        let max_depth = self.resolver.config.max_depth;
        while let Some(task) = self.tasks.pop_front() {
            let misses = self.drain(task.file, task.names);
            if misses.is_empty() {
                continue;
            }
            if task.depth >= max_depth {
                tracing::debug!(
                    path = %self.files[task.file].path.display(),
                    unresolved = misses.len(),
                    "depth bound reached"
                );
                continue;
            }

            for include in self.includes_of(task.file) {
                let Some(next) = self.load(&include) else {
                    continue;
                };
                self.tasks.push_back(FileTask {
                    file: next,
                    depth: task.depth + 1,
                    names: misses.clone(),
                });
            }
        }
    }

    /// Mark every name this file defines, following its dependency edges.
    /// Returns the names it does not define.
    fn drain(&mut self, file: usize, names: Vec<String>) -> Vec<String> {
        let state = &mut self.files[file];
        let mut queue: VecDeque<String> = names.into();
        let mut misses = Vec::new();

        while let Some(name) = queue.pop_front() {
            if self.found.contains(&name) || !state.attempted.insert(name.clone()) {
                continue;
            }
            let Some(index) = &state.index else {
                misses.push(name);
                continue;
            };
            match index.definitions.get(&name) {
                Some(item) => {
                    state.marks.update(item.range.start, item.range.end, INCLUDED);
                    state.marked.push(item.clone());
                    queue.extend(index.dependencies.neighbors(&name).map(str::to_string));
                    self.found.insert(name);
                }
                None => misses.push(name),
            }
        }
        misses
    }

    /// Resolved include targets of a file, computed once per request.
    fn includes_of(&mut self, file: usize) -> Vec<PathBuf> {
        if let Some(includes) = &self.files[file].includes {
            return includes.clone();
        }

        let state = &self.files[file];
        let resolver = self.resolver.include_resolver();
        let mut targets: Vec<PathBuf> = Vec::new();
        for include in extract_includes(&state.path, &state.source) {
            match resolver.resolve(&state.path, &include) {
                Some(target) if target != state.path && !targets.contains(&target) => targets.push(target),
                Some(_) => {}
                None => tracing::debug!(path = %state.path.display(), include = %include, "unresolved include"),
            }
        }

        self.files[file].includes = Some(targets.clone());
        targets
    }

    /// Index of a file's state, reading and parsing it on first visit.
    fn load(&mut self, path: &Path) -> Option<usize> {
        let path = normalize_path(path);
        if let Some(&file) = self.by_path.get(&path) {
            return Some(file);
        }

        let source = match self.resolver.load_source(&path) {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read included file");
                return None;
            }
        };
        let index = self
            .resolver
            .analyze_file(&path, &source, BuildMode::Dependencies)
            .map(|analysis| analysis.index);
        tracing::debug!(path = %path.display(), parsed = index.is_some(), "visiting include");

        let file = self.files.len();
        self.by_path.insert(path.clone(), file);
        self.files.push(FileState::new(path, source, index));
        Some(file)
    }

    fn finish(self, start: usize, end: usize) -> ResolvedContext {
        let mut files = Vec::new();
        for (position, mut state) in self.files.into_iter().enumerate() {
            if position == 0 {
                state.marks.update(start, end, EXCLUDED);
            }
            let items = state.emit();
            if !items.is_empty() {
                files.push(FileContext {
                    path: state.path,
                    items,
                });
            }
        }
        ResolvedContext { files }
    }
}
