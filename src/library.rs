use std::{
    collections::{BTreeSet, HashMap},
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::{
    ast::Statement,
    error::{ExecuteError, LibraryError},
    interpreter::parser::core::{ParseOutcome, parse_source},
    session::Session,
};

/// The extension library sources carry.
pub const DEFAULT_EXTENSION: &str = "kiln";

/// Where library sources live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryConfig {
    /// Directory searched recursively.
    pub root:      PathBuf,
    /// File extension of source units, without the dot.
    pub extension: String,
}

impl LibraryConfig {
    /// Library sources under `root` with the default extension.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root:      root.into(),
               extension: DEFAULT_EXTENSION.to_string(), }
    }
}

/// One library source, parsed and scanned for its namespace and imports.
struct Unit {
    path:      PathBuf,
    outcome:   ParseOutcome,
    namespace: Option<String>,
    imports:   Vec<String>,
}

/// Loads every library source under the configured root into `session`.
///
/// Units are run before any user code, a unit that declares a namespace
/// before every unit importing it. Units with no ordering constraint between
/// them run in path order. Returns the paths in the order they ran.
///
/// # Errors
/// - [`LibraryError::Walk`] or [`LibraryError::Io`] if the sources cannot be
///   read.
/// - [`LibraryError::ImportCycle`] if units import each other in a cycle.
/// - [`LibraryError::Execute`] for the first unit that fails to parse or run.
///
/// # Example
/// ```
/// use kiln::{
///     library::{LibraryConfig, load},
///     session::Session,
/// };
///
/// let mut session = Session::new().unwrap();
/// let loaded = load(&mut session, &LibraryConfig::new("no/such/directory"));
///
/// assert!(loaded.is_err());
/// ```
pub fn load(session: &mut Session, config: &LibraryConfig) -> Result<Vec<PathBuf>, LibraryError> {
    let units = discover(config)?.into_iter()
                                 .map(|path| scan(&path).map(|(outcome, namespace, imports)| Unit { path,
                                                                                                    outcome,
                                                                                                    namespace,
                                                                                                    imports }))
                                 .collect::<Result<Vec<_>, _>>()?;
    let order = dependency_order(&units)?;

    let mut units = units.into_iter().map(Some).collect::<Vec<_>>();
    let mut loaded = Vec::with_capacity(units.len());
    for index in order {
        let Some(unit) = units[index].take() else {
            continue;
        };
        let name = unit.path.display().to_string();
        if let Err(source) = session.execute_parsed(&name, unit.outcome, false) {
            return Err(LibraryError::Execute { path: unit.path,
                                               source });
        }
        debug!(unit = %name, namespace = ?unit.namespace, "library unit loaded");
        loaded.push(unit.path);
    }
    info!(units = loaded.len(), root = %config.root.display(), "library loaded");
    Ok(loaded)
}

/// Finds the source files under the root, sorted by path.
fn discover(config: &LibraryConfig) -> Result<Vec<PathBuf>, LibraryError> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(&config.root).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file()
           && entry.path()
                   .extension()
                   .is_some_and(|ext| ext == config.extension.as_str())
        {
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}

/// Parses a unit and collects the namespace it declares and those it imports.
fn scan(path: &Path) -> Result<(ParseOutcome, Option<String>, Vec<String>), LibraryError> {
    let source = fs::read_to_string(path).map_err(|source| LibraryError::Io { path: path.to_path_buf(),
                                                                                source })?;
    let outcome = parse_source(&path.display().to_string(), &source);
    if !outcome.is_clean() {
        return Err(LibraryError::Execute { path:   path.to_path_buf(),
                                           source: ExecuteError::Syntax { source_name: path.display()
                                                                                           .to_string(),
                                                                          errors:      outcome.errors, }, });
    }
    let mut namespace = None;
    let mut imports = Vec::new();
    for statement in &outcome.statements {
        match statement {
            Statement::Namespace { name, .. } if namespace.is_none() => namespace = Some(name.clone()),
            Statement::Import { namespace: imported, .. } => imports.push(imported.clone()),
            _ => {},
        }
    }
    Ok((outcome, namespace, imports))
}

/// Orders units so that each runs after the units declaring the namespaces
/// it imports (Kahn's algorithm, lowest index first). Imports of namespaces
/// no unit declares impose no constraint.
fn dependency_order(units: &[Unit]) -> Result<Vec<usize>, LibraryError> {
    let mut declared_by: HashMap<&str, Vec<usize>> = HashMap::new();
    for (index, unit) in units.iter().enumerate() {
        if let Some(namespace) = &unit.namespace {
            declared_by.entry(namespace).or_default().push(index);
        }
    }

    let mut dependents = vec![Vec::new(); units.len()];
    let mut pending = vec![0usize; units.len()];
    for (index, unit) in units.iter().enumerate() {
        let providers = unit.imports
                            .iter()
                            .filter_map(|import| declared_by.get(import.as_str()))
                            .flatten()
                            .copied()
                            .filter(|provider| *provider != index)
                            .collect::<BTreeSet<_>>();
        for provider in providers {
            dependents[provider].push(index);
            pending[index] += 1;
        }
    }

    let mut ready = (0..units.len()).filter(|index| pending[*index] == 0)
                                    .collect::<BTreeSet<_>>();
    let mut order = Vec::with_capacity(units.len());
    while let Some(index) = ready.pop_first() {
        order.push(index);
        for &dependent in &dependents[index] {
            pending[dependent] -= 1;
            if pending[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() < units.len() {
        let namespaces = units.iter()
                              .zip(&pending)
                              .filter(|(_, count)| **count > 0)
                              .filter_map(|(unit, _)| unit.namespace.clone())
                              .collect::<BTreeSet<_>>()
                              .into_iter()
                              .collect();
        return Err(LibraryError::ImportCycle { namespaces });
    }
    Ok(order)
}
