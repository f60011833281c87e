use control_engine::local_file_name;
use pretty_assertions::assert_eq;

#[test]
fn local_names_are_windows_safe() {
    assert_eq!(local_file_name("search laptop.csv"), "search laptop.csv");
    assert_eq!(local_file_name("a:b?c.csv"), "a_b_c.csv");
    assert_eq!(local_file_name("CON.csv"), "CON_.csv");
    assert_eq!(local_file_name("..."), "download");
    assert_eq!(local_file_name("__x__"), "x");
}

#[test]
fn long_names_keep_their_extension() {
    let remote = format!("{}.csv", "r".repeat(300));
    let local = local_file_name(&remote);
    assert_eq!(local.len(), 120);
    assert!(local.ends_with(".csv"));
}
