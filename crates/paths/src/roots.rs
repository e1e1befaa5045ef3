//! Named path spaces ("roots") and translation between them
//!
//! A root is a caller-chosen id (e.g. `garrysmod`) mapped to one or more base
//! directories, searched in order. Ids may also be aliases for other ids.

use std::path::{Path, PathBuf};

use ahash::AHashMap;
use smallvec::SmallVec;

use crate::normalize::{fix_slashes, join, normalize, remove_dot_slashes};

/// Maximum alias hops before a lookup gives up (guards against cycles)
const MAX_ALIAS_DEPTH: usize = 8;

/// Ordered search paths of one root (slash-fixed, case preserved)
type SearchPaths = SmallVec<[String; 2]>;

/// Table of named roots
#[derive(Debug, Clone, Default)]
pub struct Roots {
    roots: AHashMap<String, SearchPaths>,
    aliases: AHashMap<String, String>,
}

impl Roots {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a root with its ordered search paths
    pub fn insert<I, P>(&mut self, id: impl Into<String>, search_paths: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let paths = search_paths
            .into_iter()
            .map(|p| trim_separator(&fix_slashes(&p.as_ref().to_string_lossy())))
            .collect();
        self.roots.insert(id.into(), paths);
    }

    /// Builder form of [`Roots::insert`]
    pub fn with_root<I, P>(mut self, id: impl Into<String>, search_paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.insert(id, search_paths);
        self
    }

    /// Make `alias` stand for `target`
    pub fn alias(&mut self, alias: impl Into<String>, target: impl Into<String>) {
        self.aliases.insert(alias.into(), target.into());
    }

    /// Builder form of [`Roots::alias`]
    pub fn with_alias(mut self, alias: impl Into<String>, target: impl Into<String>) -> Self {
        self.alias(alias, target);
        self
    }

    /// Follow aliases until a registered root id is reached
    pub fn resolve_id<'a>(&'a self, id: &'a str) -> Option<&'a str> {
        let mut current = id;
        for _ in 0..=MAX_ALIAS_DEPTH {
            if self.roots.contains_key(current) {
                return Some(current);
            }
            current = self.aliases.get(current)?.as_str();
        }
        None
    }

    /// Search paths of a root (aliases resolved)
    pub fn search_paths(&self, id: &str) -> Option<&[String]> {
        let id = self.resolve_id(id)?;
        self.roots.get(id).map(|paths| paths.as_slice())
    }

    /// Registered root ids (aliases excluded), sorted
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.roots.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Registered aliases as `(alias, target)`, sorted
    pub fn aliases(&self) -> Vec<(&str, &str)> {
        let mut aliases: Vec<(&str, &str)> = self
            .aliases
            .iter()
            .map(|(alias, target)| (alias.as_str(), target.as_str()))
            .collect();
        aliases.sort_unstable();
        aliases
    }

    /// Resolve a root-relative path to its on-disk location
    ///
    /// The first search path under which the path exists wins. Case is
    /// preserved so the result can be handed to the OS. Returns `None` for an
    /// unknown root, a path that escapes the root, or a path that exists
    /// under no search path.
    pub fn locate(&self, relative: &str, id: &str) -> Option<PathBuf> {
        let relative = remove_dot_slashes(relative)?;
        let relative = relative.trim_start_matches('/');

        self.search_paths(id)?
            .iter()
            .map(|base| {
                if relative.is_empty() {
                    base.clone()
                } else {
                    join(base, relative)
                }
            })
            .find(|candidate| Path::new(candidate).exists())
            .map(PathBuf::from)
    }

    /// Resolve a root-relative path to a canonical full path
    pub fn relative_to_full(&self, relative: &str, id: &str) -> Option<String> {
        self.locate(relative, id)
            .map(|path| normalize(&path.to_string_lossy()))
    }

    /// Express a full path relative to a root
    ///
    /// Returns `None` when the path lies outside every search path of the
    /// root. The result is normalized.
    pub fn full_to_relative(&self, full: &str, id: &str) -> Option<String> {
        let full = normalize(full);
        let bases = self.search_paths(id)?;

        bases.iter().find_map(|base| {
            let base = normalize(base);
            if full == base {
                return Some(String::new());
            }
            let rest = full.strip_prefix(base.as_str())?;
            // A filesystem or drive root already ends with the separator
            if base.ends_with('/') {
                Some(rest.to_string())
            } else {
                rest.strip_prefix('/').map(str::to_string)
            }
        })
    }

    /// Re-express a path relative to `from` as a path relative to `to`
    pub fn transverse(&self, relative: &str, from: &str, to: &str) -> Option<String> {
        let full = self.relative_to_full(relative, from)?;
        self.full_to_relative(&full, to)
    }
}

/// Drop trailing separators, keeping `/` and drive roots like `C:/` intact
fn trim_separator(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && !path.is_empty() {
        "/".to_string()
    } else if trimmed.len() < path.len() && trimmed.ends_with(':') {
        format!("{}/", trimmed)
    } else {
        trimmed.to_string()
    }
}
