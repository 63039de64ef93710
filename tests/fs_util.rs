use camino::Utf8PathBuf;

use kira_trials::domain::EXPORT_FILE_NAME;
use kira_trials::fs_util::{resolve_output_path, write_atomic};

#[test]
fn directory_output_gets_fixed_file_name() {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    assert_eq!(resolve_output_path(&root), root.join(EXPORT_FILE_NAME));

    let file = root.join("custom.xlsx");
    assert_eq!(resolve_output_path(&file), file);
}

#[test]
fn write_atomic_creates_parents_and_replaces() {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    let target = root.join("nested").join(EXPORT_FILE_NAME);

    write_atomic(&target, b"first").unwrap();
    write_atomic(&target, b"second").unwrap();

    assert_eq!(std::fs::read(target.as_std_path()).unwrap(), b"second");
    let leftovers = std::fs::read_dir(root.join("nested").as_std_path())
        .unwrap()
        .count();
    assert_eq!(leftovers, 1);
}
