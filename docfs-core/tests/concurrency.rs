use std::sync::Barrier;
use std::thread;

use docfs_core::FilePath;


use fixture::Fixture;

#[test]
fn test_parallel_requests_for_one_file_read_git_once() {
    let mut fixture = Fixture::new();
    fixture.commit_dependency("dep", &[("a.md", "alpha")]);
    let manager = fixture.manager();
    let file = FilePath::dependency("dep/a.md", "dep");
    let barrier = Barrier::new(50);

    thread::scope(|scope| {
        for i in 0..50 {
            let (manager, file, barrier) = (&manager, &file, &barrier);
            scope.spawn(move || {
                barrier.wait();
                if i % 2 == 0 {
                    assert_eq!("alpha", manager.read_string(file).unwrap());
                } else {
                    assert!(manager.exists(file));
                }
            });
        }
    });

    assert_eq!(1, fixture.reader.reads());
}

#[test]
fn test_parallel_requests_for_many_files() {
    let mut fixture = Fixture::new();
    let files: Vec<(String, String)> = (0..20)
        .map(|i| (format!("{i}.md"), format!("content {i}")))
        .collect();
    let entries: Vec<(&str, &str)> = files
        .iter()
        .map(|(path, content)| (path.as_str(), content.as_str()))
        .collect();
    fixture.commit_dependency("dep", &entries);
    let manager = fixture.manager();
    let barrier = Barrier::new(40);

    thread::scope(|scope| {
        for i in 0..40 {
            let (manager, barrier) = (&manager, &barrier);
            scope.spawn(move || {
                barrier.wait();
                let n = i % 20;
                let file = FilePath::dependency(format!("dep/{n}.md"), "dep");
                assert_eq!(format!("content {n}"), manager.read_string(&file).unwrap());
            });
        }
    });

    assert_eq!(20, fixture.reader.reads());
    assert_eq!(20, manager.blob_cache_len());
}
