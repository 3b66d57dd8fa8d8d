//! End-to-end runs of the patch pipeline over temporary trees.

use std::path::{Path, PathBuf};

use bt_patch::{PatchEngine, PatchError, PatchNaming, PatchOptions, PatchPipeline, PipelineError};

struct Trees {
    _dir: tempfile::TempDir,
    patches: PathBuf,
    clean: PathBuf,
    target: PathBuf,
}

fn trees() -> Trees {
    let dir = tempfile::tempdir().unwrap();
    let patches = dir.path().join("nms-patches");
    let clean = dir.path().join("decompile-7852b855");
    let target = dir.path().join("patched");
    std::fs::create_dir_all(&patches).unwrap();
    std::fs::create_dir_all(&clean).unwrap();
    Trees {
        patches,
        clean,
        target,
        _dir: dir,
    }
}

fn pipeline() -> PatchPipeline {
    let naming = PatchNaming {
        source_prefix: "pkg".to_string(),
        ..PatchNaming::default()
    };
    PatchPipeline::new(naming, PatchEngine::new(PatchOptions::default()))
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn files_under(root: &Path) -> Vec<String> {
    if !root.exists() {
        return Vec::new();
    }
    bt_common::fs::list_files(root)
        .unwrap()
        .iter()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .collect()
}

#[test]
fn single_patch_end_to_end() {
    let t = trees();
    write(&t.clean, "pkg/Foo.java", "a\nb\nc\n");
    write(
        &t.patches,
        "Foo.java.patch",
        "--- a/pkg/Foo.java\n+++ b/pkg/Foo.java\n@@ -1,3 +1,3 @@\n a\n-b\n+B\n c\n",
    );

    let report = pipeline().run(&t.patches, &t.clean, &t.target).unwrap();

    assert_eq!(
        std::fs::read_to_string(t.target.join("pkg/Foo.java")).unwrap(),
        "a\nB\nc\n"
    );
    assert_eq!(report.files.len(), 1);
    assert_eq!(report.files[0].target, PathBuf::from("pkg/Foo.java"));
    assert_eq!(report.files[0].hunks, 1);
    // The clean tree is never modified
    assert_eq!(
        std::fs::read_to_string(t.clean.join("pkg/Foo.java")).unwrap(),
        "a\nb\nc\n"
    );
}

#[test]
fn missing_source_writes_nothing() {
    let t = trees();
    write(&t.clean, "pkg/Bar.java", "x\n");
    write(&t.patches, "Bar.patch", "@@ -1 +1 @@\n-x\n+y\n");
    write(&t.patches, "Foo.java.patch", "@@ -1 +1 @@\n-a\n+b\n");

    let err = pipeline().run(&t.patches, &t.clean, &t.target).unwrap_err();

    match err {
        PipelineError::MissingSource { patch, expected } => {
            assert!(patch.ends_with("Foo.java.patch"));
            assert_eq!(expected, t.clean.join("pkg/Foo.java"));
        }
        other => panic!("expected MissingSource, got {other:?}"),
    }
    // Bar.patch sorted first and applied in memory, but nothing was written
    assert!(files_under(&t.target).is_empty());
}

#[test]
fn conflict_aborts_with_patch_and_hunk() {
    let t = trees();
    write(&t.clean, "pkg/A.java", "a\n");
    write(&t.clean, "pkg/B.java", "one\ntwo\n");
    write(&t.patches, "A.patch", "@@ -1 +1 @@\n-a\n+A\n");
    write(
        &t.patches,
        "B.patch",
        "@@ -1,1 +1,1 @@\n-one\n+ONE\n@@ -2,1 +2,1 @@\n-three\n+THREE\n",
    );

    let err = pipeline().run(&t.patches, &t.clean, &t.target).unwrap_err();

    match err {
        PipelineError::Patch { patch, source } => {
            assert!(patch.ends_with("B.patch"));
            assert!(matches!(source, PatchError::Conflict { hunk: 2, .. }));
        }
        other => panic!("expected a conflict, got {other:?}"),
    }
    assert!(files_under(&t.target).is_empty());
}

#[test]
fn malformed_patch_aborts() {
    let t = trees();
    write(&t.clean, "pkg/A.java", "a\n");
    write(&t.patches, "A.patch", "this is not a diff\n");

    let err = pipeline().run(&t.patches, &t.clean, &t.target).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Patch {
            source: PatchError::Malformed { .. },
            ..
        }
    ));
}

#[test]
fn patches_apply_in_lexicographic_order() {
    let t = trees();
    for name in ["Zeta", "Alpha", "Mid"] {
        write(&t.clean, &format!("pkg/{name}.java"), "v1\n");
        write(&t.patches, &format!("{name}.patch"), "@@ -1 +1 @@\n-v1\n+v2\n");
    }

    let report = pipeline().run(&t.patches, &t.clean, &t.target).unwrap();

    let order: Vec<String> = report
        .files
        .iter()
        .map(|f| f.patch.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(order, ["Alpha.patch", "Mid.patch", "Zeta.patch"]);
}

#[test]
fn only_patched_files_are_written() {
    let t = trees();
    write(&t.clean, "pkg/Patched.java", "a\n");
    write(&t.clean, "pkg/Untouched.java", "u\n");
    write(&t.patches, "Patched.patch", "@@ -1 +1 @@\n-a\n+b\n");

    pipeline().run(&t.patches, &t.clean, &t.target).unwrap();

    assert_eq!(files_under(&t.target), ["pkg/Patched.java"]);
}

#[test]
fn rerun_produces_identical_output() {
    let t = trees();
    write(&t.clean, "pkg/Foo.java", "x\na\nb\nc\n");
    write(&t.patches, "Foo.patch", "@@ -1,3 +1,3 @@\n a\n-b\n+B\n c\n");

    pipeline().run(&t.patches, &t.clean, &t.target).unwrap();
    let first = bt_common::fs::digest_tree(&t.target).unwrap();
    pipeline().run(&t.patches, &t.clean, &t.target).unwrap();
    let second = bt_common::fs::digest_tree(&t.target).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        std::fs::read_to_string(t.target.join("pkg/Foo.java")).unwrap(),
        "x\na\nB\nc\n"
    );
}
