#[test]
fn dtk_error_ui() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/dtk_error_pass.rs");
}
