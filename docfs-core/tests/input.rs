use std::io::Read;

use docfs_core::{FilePath, InputError, Origin};


use fixture::Fixture;

#[test]
fn test_live_file_exists_iff_on_disk() {
    let fixture = Fixture::new();
    fixture.write(fixture.docset_dir.path(), "docs/a.md", "alpha");
    fixture.write(fixture.fallback_dir.path(), "shared/b.md", "beta");
    let manager = fixture.manager();

    let cases = [
        (FilePath::default_origin("docs/a.md"), Some(fixture.docset_path().join("docs/a.md"))),
        (FilePath::default_origin("docs/missing.md"), None),
        (FilePath::fallback("shared/b.md"), Some(fixture.fallback_path().join("shared/b.md"))),
        (FilePath::fallback("docs/a.md"), None),
    ];

    for (file, physical) in cases {
        assert_eq!(physical.is_some(), manager.exists(&file), "{file}");
        assert_eq!(physical, manager.try_get_physical_path(&file), "{file}");
    }
}

#[test]
fn test_committed_file_has_no_physical_path() {
    let mut fixture = Fixture::new();
    let commit = fixture.commit_dependency("dep", &[("a.md", "alpha")]);
    let manager = fixture.manager();

    for file in [
        FilePath::dependency("dep/a.md", "dep"),
        FilePath::dependency("dep/a.md", "dep").with_commit(commit),
    ] {
        assert!(manager.exists(&file), "{file}");
        assert_eq!(None, manager.try_get_physical_path(&file), "{file}");
    }
}

#[test]
fn test_repeated_access_reads_git_once() {
    let mut fixture = Fixture::new();
    fixture.commit_dependency("dep", &[("a.md", "alpha")]);
    let manager = fixture.manager();
    let file = FilePath::dependency("dep/a.md", "dep");

    assert!(manager.exists(&file));
    assert_eq!("alpha", manager.read_string(&file).unwrap());
    let mut content = String::new();
    manager
        .read_stream(&file)
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    assert_eq!("alpha", content);
    assert_eq!(None, manager.try_get_physical_path(&file));
    assert!(manager.exists(&file));

    assert_eq!(1, fixture.reader.reads());
    assert_eq!(1, manager.blob_cache_len());
}

#[test]
fn test_dependency_file_has_one_cache_key() {
    let mut fixture = Fixture::new();
    fixture.commit_dependency("dep", &[("a.md", "alpha")]);
    let manager = fixture.manager();

    for file in [
        FilePath::dependency("dep/a.md", "dep"),
        FilePath::dependency("dep\\a.md", "dep"),
        FilePath::dependency("./dep/a.md", "dep"),
    ] {
        assert_eq!("alpha", manager.read_string(&file).unwrap(), "{file}");
    }
    assert_eq!(1, fixture.reader.reads());
    assert_eq!(1, manager.blob_cache_len());

    // Without the dependency prefix the path does not name a dependency file.
    let unprefixed = FilePath::dependency("a.md", "dep");
    assert!(!manager.exists(&unprefixed));
    assert!(matches!(
        manager.read_string(&unprefixed).unwrap_err(),
        InputError::OutsideDependency { .. }
    ));
    assert_eq!(1, fixture.reader.reads());
}

#[test]
fn test_missing_object_is_cached_and_reported() {
    let mut fixture = Fixture::new();
    let commit = fixture.commit_dependency("dep", &[("a.md", "alpha")]);
    let manager = fixture.manager();
    let file = FilePath::dependency("dep/gone.md", "dep");

    assert!(!manager.exists(&file));
    assert!(!manager.exists(&file));

    let err = manager.read_stream(&file).err().unwrap();
    assert!(err.is_not_found());
    match err {
        InputError::ObjectNotFound {
            file: name,
            commit: missing_commit,
        } => {
            assert!(name.contains("dep/gone.md"));
            assert_eq!(commit, missing_commit);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(manager
        .read_string(&file)
        .unwrap_err()
        .to_string()
        .contains("file not found in git object storage"));

    assert_eq!(1, fixture.reader.reads());
}

#[test]
fn test_clones_share_the_cache() {
    let mut fixture = Fixture::new();
    fixture.commit_dependency("dep", &[("a.md", "alpha")]);
    let manager = fixture.manager();
    let other = manager.clone();
    let file = FilePath::dependency("dep/a.md", "dep");

    manager.read_string(&file).unwrap();
    other.read_string(&file).unwrap();
    assert_eq!(1, fixture.reader.reads());
}

#[test]
fn test_sessions_do_not_share_the_cache() {
    let mut fixture = Fixture::new();
    fixture.commit_dependency("dep", &[("a.md", "alpha")]);
    let file = FilePath::dependency("dep/a.md", "dep");

    fixture.manager().read_string(&file).unwrap();
    fixture.manager().read_string(&file).unwrap();
    assert_eq!(2, fixture.reader.reads());
}

#[test]
fn test_template_files() {
    let mut fixture = Fixture::new();
    fixture.checkout_template(&[("layout/page.html", "<html/>")]);
    let manager = fixture.manager();

    let file = FilePath::template("layout/page.html");
    assert!(manager.exists(&file));
    assert_eq!("<html/>", manager.read_string(&file).unwrap());
    assert!(manager.try_get_physical_path(&file).is_some());
    assert!(!manager.exists(&FilePath::template("layout/missing.html")));
}

#[test]
fn test_pinned_template_file_reads_from_git() {
    let mut fixture = Fixture::new();
    let first = fixture.commit_template(&[("layout/page.html", "v1")]);
    fixture.commit_template(&[("layout/page.html", "v2")]);
    let manager = fixture.manager();

    let file = FilePath::template("layout/page.html").with_commit(first);
    assert_eq!("v1", manager.read_string(&file).unwrap());
    assert_eq!(None, manager.try_get_physical_path(&file));
}

#[test]
fn test_list_template_always_fails() {
    let fixture = Fixture::new();
    let err = fixture
        .manager()
        .list_files_recursive(&Origin::Template)
        .unwrap_err();
    assert!(matches!(err, InputError::Unsupported { .. }));
}
