//! Include extraction and resolution
//!
//! Resolution order for an include written in `current`:
//! 1. Relative to the directory of `current`
//! 2. Common ancestor: the nearest ancestor directory named like the
//!    include's first component
//! 3. Workspace root
//! 4. Workspace `lib/` folder
//! 5. Package lookup through `node_modules/<name>/package.json`
//!
//! Every strategy tries the path as written, then known extensions, then
//! directory entry files. The first hit wins.

use crate::workspace::{normalize_path, FileProvider, WorkspaceProvider};
use regex::Regex;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

/// Extensions tried after the literal path.
const EXTENSIONS: &[&str] = &["lua", "js", "ts", "py", "c", "cpp", "h", "hpp"];

/// Entry files of a package directory, after `index.<ext>`.
const DIRECTORY_ENTRIES: &[&str] = &["init.lua", "__init__.py"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeSyntax {
    C,
    Lua,
    Python,
    JavaScript,
}

impl IncludeSyntax {
    pub fn for_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "c" | "cc" | "cpp" | "cxx" | "h" | "hh" | "hpp" => Some(Self::C),
            "lua" => Some(Self::Lua),
            "py" | "pyi" => Some(Self::Python),
            "js" | "jsx" | "mjs" | "cjs" | "ts" | "tsx" | "mts" | "cts" => Some(Self::JavaScript),
            _ => None,
        }
    }

    fn pattern(self) -> Option<&'static Regex> {
        static PATTERNS: OnceLock<Vec<(IncludeSyntax, Regex)>> = OnceLock::new();
        PATTERNS
            .get_or_init(|| {
                [
                    (IncludeSyntax::C, r#"#include\s+["<]([^">]+)[">]"#),
                    (IncludeSyntax::Lua, r#"(?:require|Include)\s*\(?['"]([^'"]+)['"]\)?"#),
                    (IncludeSyntax::Python, r"import\s+([^\s#]+)|from\s+([^\s#]+)\s+import"),
                    (
                        IncludeSyntax::JavaScript,
                        r#"import\s+.*['"]([^'"]+)['"]|require\s*\(['"]([^'"]+)['"]\)"#,
                    ),
                ]
                .into_iter()
                .filter_map(|(syntax, pattern)| Regex::new(pattern).ok().map(|re| (syntax, re)))
                .collect()
            })
            .iter()
            .find(|(syntax, _)| *syntax == self)
            .map(|(_, re)| re)
    }

    /// Turn a module name into a relative path.
    fn normalize(self, raw: &str) -> String {
        let raw = raw.trim().trim_end_matches([',', ';']);
        match self {
            IncludeSyntax::Lua if !raw.contains('/') && !raw.ends_with(".lua") => raw.replace('.', "/"),
            IncludeSyntax::Python => {
                let rest = raw.trim_start_matches('.');
                let dots = raw.len() - rest.len();
                let prefix = match dots {
                    0 => String::new(),
                    1 => "./".to_string(),
                    n => "../".repeat(n - 1),
                };
                let joined = format!("{}{}", prefix, rest.replace('.', "/"));
                match joined.trim_end_matches('/') {
                    "" => ".".to_string(),
                    trimmed => trimmed.to_string(),
                }
            }
            _ => raw.to_string(),
        }
    }
}

/// Include targets written in `source`, normalized to relative paths, in
/// order of first appearance.
pub fn extract_includes(path: &Path, source: &str) -> Vec<String> {
    let Some(syntax) = IncludeSyntax::for_path(path) else {
        return Vec::new();
    };
    let Some(pattern) = syntax.pattern() else {
        return Vec::new();
    };

    let mut includes: Vec<String> = Vec::new();
    for captures in pattern.captures_iter(source) {
        let Some(raw) = captures.iter().skip(1).flatten().next() else {
            continue;
        };
        let include = syntax.normalize(raw.as_str());
        if !include.is_empty() && !includes.contains(&include) {
            includes.push(include);
        }
    }
    includes
}

pub struct IncludeResolver<'a> {
    files: &'a dyn FileProvider,
    workspace: &'a dyn WorkspaceProvider,
}

impl<'a> IncludeResolver<'a> {
    pub fn new(files: &'a dyn FileProvider, workspace: &'a dyn WorkspaceProvider) -> Self {
        Self { files, workspace }
    }

    /// Path `include` written in `current` refers to, if any strategy finds it.
    pub fn resolve(&self, current: &Path, include: &str) -> Option<PathBuf> {
        let include_path = Path::new(include);
        if include_path.is_absolute() {
            return self.try_path(include_path);
        }
        let dir = current.parent().unwrap_or_else(|| Path::new(""));

        self.try_path(&dir.join(include_path))
            .or_else(|| self.common_ancestor(dir, include_path))
            .or_else(|| {
                let root = self.workspace.root_for(current)?;
                self.try_path(&root.join(include_path))
                    .or_else(|| self.try_path(&root.join("lib").join(include_path)))
            })
            .or_else(|| self.package(dir, include_path))
    }

    fn common_ancestor(&self, dir: &Path, include: &Path) -> Option<PathBuf> {
        let Some(Component::Normal(first)) = include.components().next() else {
            return None;
        };
        dir.ancestors()
            .filter(|ancestor| ancestor.file_name() == Some(first))
            .find_map(|ancestor| self.try_path(&ancestor.parent()?.join(include)))
    }

    fn package(&self, dir: &Path, include: &Path) -> Option<PathBuf> {
        let Some(Component::Normal(_)) = include.components().next() else {
            return None;
        };
        let name = include.file_name()?.to_str()?;

        dir.ancestors().find_map(|ancestor| {
            let package = ancestor.join("node_modules").join(include);
            if !self.files.is_dir(&package) {
                return None;
            }
            if let Some(main) = self.manifest_main(&package) {
                if let Some(found) = self.try_path(&package.join(main)) {
                    return Some(found);
                }
            }
            [format!("{}.js", name), format!("{}.ts", name), "index.js".into(), "index.ts".into()]
                .iter()
                .map(|entry| normalize_path(&package.join(entry)))
                .find(|candidate| self.files.is_file(candidate))
        })
    }

    /// `main` entry of `package/package.json`.
    fn manifest_main(&self, package: &Path) -> Option<String> {
        let manifest = self.files.read_to_string(&package.join("package.json")).ok()?;
        let value: serde_json::Value = match serde_json::from_str(&manifest) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(package = %package.display(), error = %e, "unreadable package manifest");
                return None;
            }
        };
        value.get("main")?.as_str().map(str::to_string)
    }

    fn try_path(&self, candidate: &Path) -> Option<PathBuf> {
        let candidate = normalize_path(candidate);
        if self.files.is_file(&candidate) {
            return Some(candidate);
        }

        for ext in EXTENSIONS {
            let mut with_ext = OsString::from(candidate.as_os_str());
            with_ext.push(".");
            with_ext.push(ext);
            let with_ext = PathBuf::from(with_ext);
            if self.files.is_file(&with_ext) {
                return Some(with_ext);
            }
        }

        if self.files.is_dir(&candidate) {
            let index = EXTENSIONS.iter().map(|ext| format!("index.{}", ext));
            let entries = DIRECTORY_ENTRIES.iter().map(|entry| entry.to_string());
            return index
                .chain(entries)
                .map(|entry| candidate.join(entry))
                .find(|path| self.files.is_file(path));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::{DiskFiles, Workspace};
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_extract_per_language() {
        let lua = "local s = require('util.strings')\nlocal t = require \"net/http\"\nInclude(\"common\")\n";
        assert_eq!(
            extract_includes(Path::new("a.lua"), lua),
            vec!["util/strings", "net/http", "common"]
        );

        let py = "import os\nfrom ..models import User\nfrom . import views\nimport pkg.sub  # comment\n";
        assert_eq!(
            extract_includes(Path::new("a.py"), py),
            vec!["os", "../models", ".", "pkg/sub"]
        );

        let js = "import x, { y } from './x';\nconst z = require('z');\nimport './side-effect';\n";
        assert_eq!(
            extract_includes(Path::new("a.ts"), js),
            vec!["./x", "z", "./side-effect"]
        );

        let c = "#include <stdio.h>\n#include \"engine/core.h\"\n#include \"engine/core.h\"\n";
        assert_eq!(extract_includes(Path::new("a.cpp"), c), vec!["stdio.h", "engine/core.h"]);

        assert!(extract_includes(Path::new("README.md"), "import x").is_empty());
        assert!(extract_includes(Path::new("a.lua"), "print(1)").is_empty());
    }

    #[test]
    fn test_resolution_strategies() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let main = write(root, "src/main.lua", "");
        let strings = write(root, "src/util/strings.lua", "");
        let common = write(root, "lib/common.lua", "");
        let config = write(root, "config.lua", "");
        let core_cpp = write(root, "src/engine/core.cpp", "");
        let core_h = write(root, "src/engine/core.h", "");
        let net = write(root, "src/net/init.lua", "");

        let workspace = Workspace::new([root]);
        let resolver = IncludeResolver::new(&DiskFiles, &workspace);
        let found = |from: &Path, include: &str| resolver.resolve(from, include).map(|p| normalize_path(&p));

        assert_eq!(found(&main, "util/strings"), Some(normalize_path(&strings)));
        assert_eq!(found(&main, "net"), Some(normalize_path(&net)));
        assert_eq!(found(&main, "config"), Some(normalize_path(&config)));
        assert_eq!(found(&main, "common"), Some(normalize_path(&common)));
        assert_eq!(found(&core_cpp, "engine/core.h"), Some(normalize_path(&core_h)));
        assert_eq!(found(&main, "missing/module"), None);
    }

    #[test]
    fn test_python_relative_and_package_init() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let view = write(root, "app/web/views.py", "");
        let models = write(root, "app/models/__init__.py", "");

        let workspace = Workspace::new([root]);
        let resolver = IncludeResolver::new(&DiskFiles, &workspace);
        for include in extract_includes(&view, "from ..models import User\n") {
            assert_eq!(resolver.resolve(&view, &include), Some(normalize_path(&models)));
        }
    }

    #[test]
    fn test_node_package_lookup() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let app = write(root, "web/src/app.js", "");
        write(root, "node_modules/leftpad/package.json", r#"{ "name": "leftpad", "main": "lib/pad" }"#);
        let entry = write(root, "node_modules/leftpad/lib/pad.js", "");
        write(root, "web/node_modules/tiny/index.ts", "");

        let workspace = Workspace::new([root.join("web")]);
        let resolver = IncludeResolver::new(&DiskFiles, &workspace);
        assert_eq!(resolver.resolve(&app, "leftpad"), Some(normalize_path(&entry)));
        assert_eq!(
            resolver.resolve(&app, "tiny"),
            Some(normalize_path(&root.join("web/node_modules/tiny/index.ts")))
        );
        assert_eq!(resolver.resolve(&app, "absent"), None);
    }
}
