use solrepl_solc::imports::collect_sources;
use solrepl_solc::FsImportResolver;
use solrepl_synth::{ImportError, ImportResolver};
use std::fs;

#[test]
fn project_root_wins_over_node_modules() {
    let tmp = tempfile::tempdir().unwrap();
    let deps = tmp.path().join("node_modules").join("lib");
    fs::create_dir_all(&deps).unwrap();
    fs::create_dir_all(tmp.path().join("lib")).unwrap();
    fs::write(tmp.path().join("lib/Token.sol"), "contract Local {}").unwrap();
    fs::write(deps.join("Token.sol"), "contract Dep {}").unwrap();
    fs::write(deps.join("Only.sol"), "contract OnlyDep {}").unwrap();

    let resolver = FsImportResolver::new(tmp.path());
    assert_eq!(resolver.resolve("lib/Token.sol").unwrap(), "contract Local {}");
    assert_eq!(resolver.resolve("lib/Only.sol").unwrap(), "contract OnlyDep {}");
}

#[test]
fn missing_file_lists_every_root() {
    let tmp = tempfile::tempdir().unwrap();
    let resolver = FsImportResolver::new(tmp.path());

    let err = resolver.resolve("Nope.sol").unwrap_err();
    match &err {
        ImportError::NotFound { path, searched } => {
            assert_eq!(path, "Nope.sol");
            assert_eq!(
                searched,
                &vec![
                    tmp.path().join("Nope.sol"),
                    tmp.path().join("node_modules").join("Nope.sol"),
                ]
            );
        }
        other => panic!("expected NotFound, got {:?}", other),
    }
    assert!(err.to_string().starts_with("File not found in:\n"));
}

#[test]
fn extra_roots_are_searched_last_and_once() {
    let tmp = tempfile::tempdir().unwrap();
    let vendor = tmp.path().join("vendor");
    fs::create_dir_all(&vendor).unwrap();
    fs::write(vendor.join("V.sol"), "library V {}").unwrap();

    let mut resolver = FsImportResolver::new(tmp.path());
    resolver.add_root(vendor.clone());
    resolver.add_root(vendor);
    assert_eq!(resolver.roots().len(), 3);
    assert_eq!(resolver.resolve("V.sol").unwrap(), "library V {}");
}

#[test]
fn collects_imports_from_disk() {
    let tmp = tempfile::tempdir().unwrap();
    fs::create_dir_all(tmp.path().join("contracts")).unwrap();
    fs::write(
        tmp.path().join("contracts/A.sol"),
        "import \"./B.sol\";\ncontract A {}",
    )
    .unwrap();
    fs::write(tmp.path().join("contracts/B.sol"), "contract B {}").unwrap();

    let resolver = FsImportResolver::new(tmp.path());
    let (sources, unresolved) = collect_sources(
        "main.sol",
        "import \"contracts/A.sol\";\ncontract Main {}",
        &resolver,
    );
    assert!(unresolved.is_empty());
    assert_eq!(sources["contracts/B.sol"], "contract B {}");
    assert_eq!(sources.len(), 3);
}
