use std::{fs, path::Path};

use kiln::{
    error::{ExecuteError, LibraryError},
    interpreter::value::core::Value,
    library::{LibraryConfig, load},
    session::Session,
};
use tempfile::TempDir;

fn write(root: &Path, relative: &str, source: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, source).unwrap();
}

fn session() -> Session {
    Session::with_output(Box::new(std::io::sink())).unwrap()
}

fn file_names(paths: &[std::path::PathBuf]) -> Vec<String> {
    paths.iter()
         .filter_map(|path| path.file_name())
         .map(|name| name.to_string_lossy().into_owned())
         .collect()
}

#[test]
fn units_run_after_the_namespaces_they_import() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a_shapes.kiln", "namespace shapes\nimport geometry\nlet square = (Int s) => area(s, s)");
    write(dir.path(), "nested/z_geometry.kiln", "namespace geometry\nlet area = (Int w, Int h) => w * h");
    write(dir.path(), "b_plain.kiln", "let greeting = \"hi\"");
    write(dir.path(), "notes.txt", "this is not kiln source");

    let mut session = session();
    let loaded = load(&mut session, &LibraryConfig::new(dir.path())).unwrap();

    assert_eq!(file_names(&loaded), vec!["b_plain.kiln", "z_geometry.kiln", "a_shapes.kiln"]);
    assert!(session.knows_namespace("shapes"));
    assert!(session.knows_namespace("geometry"));

    let report = session.execute("user", "square(4)", false).unwrap();
    assert_eq!(report.last(), Some(&Value::Int(16)));
}

#[test]
fn import_cycles_are_reported() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "one.kiln", "namespace one\nimport two");
    write(dir.path(), "two.kiln", "namespace two\nimport one");
    write(dir.path(), "free.kiln", "let x = 1");

    let mut session = session();
    match load(&mut session, &LibraryConfig::new(dir.path())) {
        Err(LibraryError::ImportCycle { namespaces }) => {
            assert_eq!(namespaces, vec!["one".to_string(), "two".to_string()]);
        },
        other => panic!("Expected an import cycle, got {other:?}"),
    }
    assert!(session.globals().is_empty());
}

#[test]
fn syntax_errors_name_the_unit() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "broken.kiln", "let = 1");

    let mut session = session();
    match load(&mut session, &LibraryConfig::new(dir.path())) {
        Err(LibraryError::Execute { path,
                                    source: ExecuteError::Syntax { errors, .. }, }) => {
            assert!(path.ends_with("broken.kiln"));
            assert_eq!(errors.len(), 1);
        },
        other => panic!("Expected a syntax error, got {other:?}"),
    }
}

#[test]
fn runtime_errors_stop_loading() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.kiln", "let a = 1");
    write(dir.path(), "b.kiln", "let b = missing");
    write(dir.path(), "c.kiln", "let c = 3");

    let mut session = session();
    let error = load(&mut session, &LibraryConfig::new(dir.path())).unwrap_err();

    assert!(matches!(error, LibraryError::Execute { source: ExecuteError::Runtime(_), .. }));
    let globals = session.globals();
    assert!(globals.contains(&"a".to_string()));
    assert!(!globals.contains(&"c".to_string()));
}

#[test]
fn custom_extension() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "lib.k", "let answer = 42");
    write(dir.path(), "ignored.kiln", "let ignored = 0");

    let mut session = session();
    let config = LibraryConfig { root:      dir.path().to_path_buf(),
                                 extension: "k".to_string(), };
    let loaded = load(&mut session, &config).unwrap();

    assert_eq!(loaded.len(), 1);
    assert_eq!(session.globals(), vec!["answer".to_string()]);
}

#[test]
fn missing_root_is_a_walk_error() {
    let dir = TempDir::new().unwrap();
    let mut session = session();
    let error = load(&mut session, &LibraryConfig::new(dir.path().join("absent"))).unwrap_err();

    assert!(matches!(error, LibraryError::Walk(_)));
}
