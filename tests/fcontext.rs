//! Integration tests against the public API, covering the concrete scenarios and
//! testable properties of the file-context lookup backend (S1–S6, properties 1–9).

use std::fs;
use std::io::Write;
use std::path::Path;

use fcontext::fcontext::filetype::{S_IFDIR, S_IFLNK, S_IFREG};
use fcontext::{Environment, Handle, Options};
use tempfile::TempDir;

fn init_tracing() {
    use std::sync::Once;
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn write_specfile(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

fn load(path: &Path) -> Handle {
    init_tracing();
    let options = Options::new().with_path(path).base_only(true);
    Handle::init(&options, &Environment::system()).expect("handle should load")
}

// S1 — basic match.
#[test]
fn basic_match() {
    let dir = TempDir::new().unwrap();
    let path = write_specfile(
        &dir,
        "file_contexts",
        "/.*            system_u:object_r:default_t\n\
         /etc(/.*)?     system_u:object_r:etc_t\n",
    );
    let handle = load(&path);
    let label = handle.lookup(b"/etc/passwd", S_IFREG).unwrap().unwrap();
    assert_eq!(label.context(), "system_u:object_r:etc_t");
}

// Regression: a stem-bearing spec must still full-match against the whole key, not
// just the portion left after the stem is stripped off.
#[test]
fn stem_bearing_literal_spec_returns_its_label() {
    let dir = TempDir::new().unwrap();
    let path = write_specfile(
        &dir,
        "file_contexts",
        "/.*            system_u:object_r:default_t\n\
         /etc/passwd    system_u:object_r:etc_passwd_t\n",
    );
    let handle = load(&path);
    let label = handle.lookup(b"/etc/passwd", S_IFREG).unwrap().unwrap();
    assert_eq!(label.context(), "system_u:object_r:etc_passwd_t");
    // A different file under the same stem must not spuriously match the literal spec.
    assert_eq!(
        handle.lookup(b"/etc/shadow", S_IFREG).unwrap().unwrap().context(),
        "system_u:object_r:default_t"
    );
}

// S2 — stem narrowing.
#[test]
fn stem_narrowing() {
    let dir = TempDir::new().unwrap();
    let path = write_specfile(
        &dir,
        "file_contexts",
        "/.*            system_u:object_r:default_t\n\
         /etc(/.*)?     system_u:object_r:etc_t\n\
         /usr(/.*)?     system_u:object_r:usr_t\n",
    );
    let handle = load(&path);
    assert_eq!(
        handle.lookup(b"/usr/bin/ls", S_IFREG).unwrap().unwrap().context(),
        "system_u:object_r:usr_t"
    );
    assert_eq!(
        handle.lookup(b"/etc/passwd", S_IFREG).unwrap().unwrap().context(),
        "system_u:object_r:etc_t"
    );
}

// S3 — mode filter.
#[test]
fn mode_filter() {
    let dir = TempDir::new().unwrap();
    let path = write_specfile(
        &dir,
        "file_contexts",
        "/.*            system_u:object_r:default_t\n\
         /tmp/.*  -- system_u:object_r:tmp_t\n",
    );
    let handle = load(&path);
    assert_eq!(
        handle.lookup(b"/tmp/x", S_IFDIR).unwrap().unwrap().context(),
        "system_u:object_r:default_t"
    );
    assert_eq!(
        handle.lookup(b"/tmp/x", S_IFREG).unwrap().unwrap().context(),
        "system_u:object_r:tmp_t"
    );
}

// S4 — <<none>> sentinel.
#[test]
fn none_sentinel_is_not_found() {
    let dir = TempDir::new().unwrap();
    let path = write_specfile(
        &dir,
        "file_contexts",
        "/.*            system_u:object_r:default_t\n\
         /proc/kcore    <<none>>\n",
    );
    let handle = load(&path);
    assert!(handle.lookup(b"/proc/kcore", S_IFREG).unwrap().is_none());
}

// S5 — best match with alias.
#[test]
fn best_match_prefers_longer_alias_prefix() {
    let dir = TempDir::new().unwrap();
    let path = write_specfile(
        &dir,
        "file_contexts",
        "/home(/.*)?           system_u:object_r:home_t\n\
         /export/home(/.*)?    system_u:object_r:export_home_t\n",
    );
    let handle = load(&path);
    let label = handle
        .best_match(
            b"/home/alice",
            &[b"/export/home/alice".as_slice()],
            S_IFDIR,
        )
        .unwrap()
        .unwrap();
    assert_eq!(label.context(), "system_u:object_r:export_home_t");
}

#[test]
fn best_match_exact_spec_wins_over_longer_regex_prefix() {
    let dir = TempDir::new().unwrap();
    let path = write_specfile(
        &dir,
        "file_contexts",
        "/export/home(/.*)?     system_u:object_r:export_home_t\n\
         /home/alice            system_u:object_r:alice_home_t\n",
    );
    let handle = load(&path);
    let label = handle
        .best_match(b"/home/alice", &[b"/export/home/alice".as_slice()], 0)
        .unwrap()
        .unwrap();
    assert_eq!(label.context(), "system_u:object_r:alice_home_t");
}

// S6 — cmp subset.
#[test]
fn cmp_detects_subset() {
    let dir = TempDir::new().unwrap();
    let small = write_specfile(
        &dir,
        "small",
        "/a     system_u:object_r:a_t\n\
         /b     system_u:object_r:b_t\n",
    );
    let big = write_specfile(
        &dir,
        "big",
        "/a        system_u:object_r:a_t\n\
         /b        system_u:object_r:b_t\n\
         /c(/.*)?  system_u:object_r:c_t\n",
    );
    let h_small = load(&small);
    let h_big = load(&big);
    assert_eq!(h_small.cmp(&h_big), fcontext::Ordering::Subset);
    assert_eq!(h_big.cmp(&h_small), fcontext::Ordering::Superset);
}

#[test]
fn cmp_equal_handles() {
    let dir = TempDir::new().unwrap();
    let a = write_specfile(&dir, "a", "/etc(/.*)?  system_u:object_r:etc_t\n");
    let b = write_specfile(&dir, "b", "/etc(/.*)?  system_u:object_r:etc_t\n");
    let h_a = load(&a);
    let h_b = load(&b);
    assert_eq!(h_a.cmp(&h_b), fcontext::Ordering::Equal);
}

// Property 1 — last-match-wins among regex specs.
#[test]
fn last_match_wins() {
    let dir = TempDir::new().unwrap();
    let path = write_specfile(
        &dir,
        "file_contexts",
        "/var(/.*)?      system_u:object_r:var_t\n\
         /var/log(/.*)?  system_u:object_r:var_log_t\n",
    );
    let handle = load(&path);
    // Both patterns match /var/log/messages; the later-loaded one wins.
    assert_eq!(
        handle
            .lookup(b"/var/log/messages", S_IFREG)
            .unwrap()
            .unwrap()
            .context(),
        "system_u:object_r:var_log_t"
    );
}

// Property 3 — slash canonicalization.
#[test]
fn slash_canonicalization() {
    let dir = TempDir::new().unwrap();
    let path = write_specfile(
        &dir,
        "file_contexts",
        "/etc(/.*)?     system_u:object_r:etc_t\n",
    );
    let handle = load(&path);
    let canon = handle.lookup(b"/etc/passwd", S_IFREG).unwrap();
    let messy = handle.lookup(b"/etc//passwd", S_IFREG).unwrap();
    assert_eq!(canon, messy);
}

// Property 4 — stem narrowing never crosses into a different stem.
#[test]
fn stem_never_matches_across_segments() {
    let dir = TempDir::new().unwrap();
    let path = write_specfile(
        &dir,
        "file_contexts",
        "/usr(/.*)?  system_u:object_r:usr_t\n",
    );
    let handle = load(&path);
    assert!(handle.lookup(b"/var/usr/fake", S_IFREG).unwrap().is_none());
}

// Property 5 — mode filter never returns a spec whose mode bits differ.
#[test]
fn mode_filter_excludes_mismatched_types() {
    let dir = TempDir::new().unwrap();
    let path = write_specfile(&dir, "file_contexts", "/bin/sh  -l  system_u:object_r:shell_exec_t\n");
    let handle = load(&path);
    assert!(handle.lookup(b"/bin/sh", S_IFREG).unwrap().is_none());
    assert_eq!(
        handle.lookup(b"/bin/sh", S_IFLNK).unwrap().unwrap().context(),
        "system_u:object_r:shell_exec_t"
    );
}

// Property 8 — idempotent close.
#[test]
fn close_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = write_specfile(&dir, "file_contexts", "/etc(/.*)?  system_u:object_r:etc_t\n");
    let mut handle = load(&path);
    handle.close();
    handle.close();
}

// Property 9 — nodups_specs detection via `VALIDATE`.
#[test]
fn duplicate_spec_detected_when_validating() {
    let dir = TempDir::new().unwrap();
    let path = write_specfile(
        &dir,
        "file_contexts",
        "/etc(/.*)?  system_u:object_r:etc_t\n\
         /etc(/.*)?  system_u:object_r:other_t\n",
    );
    let options = Options::new().with_path(&path).base_only(true).validating(true);
    let err = Handle::init(&options, &Environment::system()).unwrap_err();
    assert!(matches!(err, fcontext::Error::DuplicateSpec { .. }));
}

#[test]
fn missing_primary_specfile_is_an_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("does_not_exist");
    let options = Options::new().with_path(&missing).base_only(true);
    let err = Handle::init(&options, &Environment::system()).unwrap_err();
    assert!(matches!(err, fcontext::Error::Io { .. }));
}

#[test]
fn missing_overlay_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    let path = write_specfile(&dir, "file_contexts", "/etc(/.*)?  system_u:object_r:etc_t\n");
    // base_only = false (default): resolver looks for .homedirs/.local, finds neither.
    let options = Options::new().with_path(&path);
    Handle::init(&options, &Environment::system()).expect("missing overlays are not fatal");
}

#[test]
fn subset_filters_loaded_specs() {
    let dir = TempDir::new().unwrap();
    let path = write_specfile(
        &dir,
        "file_contexts",
        "/etc(/.*)?   system_u:object_r:etc_t\n\
         /usr(/.*)?   system_u:object_r:usr_t\n",
    );
    let options = Options::new().with_path(&path).base_only(true).subset("/etc");
    let handle = Handle::init(&options, &Environment::system()).unwrap();
    assert_eq!(handle.spec_count(), 1);
    assert!(handle.lookup(b"/usr/bin/ls", S_IFREG).unwrap().is_none());
}

#[test]
fn stats_reports_unused_specs() {
    let dir = TempDir::new().unwrap();
    let path = write_specfile(
        &dir,
        "file_contexts",
        "/etc(/.*)?   system_u:object_r:etc_t\n\
         /usr(/.*)?   system_u:object_r:usr_t\n",
    );
    let handle = load(&path);
    handle.lookup(b"/etc/passwd", S_IFREG).unwrap();
    // /usr(/.*)? was never queried.
    assert_eq!(handle.stats(), 1);
}

#[test]
fn partial_match_reports_prefix_hits() {
    let dir = TempDir::new().unwrap();
    let path = write_specfile(&dir, "file_contexts", "/etc/selinux(/.*)?  system_u:object_r:etc_t\n");
    let handle = load(&path);
    assert!(handle.partial_match(b"/etc").unwrap());
    assert!(!handle.partial_match(b"/var").unwrap());
}

#[test]
fn substitution_overlay_is_consulted_explicitly() {
    let dir = TempDir::new().unwrap();
    let path = write_specfile(&dir, "file_contexts", "/real(/.*)?  system_u:object_r:real_t\n");
    write_specfile(&dir, "file_contexts.subs", "/alias /real\n");
    let options = Options::new().with_path(&path).base_only(true);
    let handle = Handle::init(&options, &Environment::system()).unwrap();
    assert_eq!(handle.substitute("/alias"), "/real");
    assert_eq!(handle.substitute("/untouched"), "/untouched");
}

// Binary ↔ text equivalence (property 7), built by hand-assembling the compiled format
// (§6.1) from the same pattern/context pairs as a text file.
#[test]
fn binary_and_text_loads_compare_equal() {
    use fcontext::fcontext::binary::{MAGIC, MAX_KNOWN_VERSION};
    use fcontext::fcontext::regex_engine::CompiledRegex;

    let dir = TempDir::new().unwrap();
    let text_path = write_specfile(&dir, "text_form", "/etc(/.*)?  system_u:object_r:etc_t\n");

    let pattern = "/etc(/.*)?";
    let compiled = CompiledRegex::compile(pattern).unwrap();
    let blob = compiled.to_bytes();

    let mut buf = Vec::new();
    buf.extend_from_slice(&MAGIC.to_le_bytes());
    buf.extend_from_slice(&MAX_KNOWN_VERSION.to_le_bytes());
    let host_ver = fcontext::fcontext::regex_engine::engine_version();
    buf.extend_from_slice(&(host_ver.len() as u32).to_le_bytes());
    buf.extend_from_slice(host_ver.as_bytes());
    let host_arch = fcontext::fcontext::regex_engine::engine_arch_string();
    buf.extend_from_slice(&(host_arch.len() as u32).to_le_bytes());
    buf.extend_from_slice(host_arch.as_bytes());

    // one stem: "/etc"
    buf.extend_from_slice(&1u32.to_le_bytes());
    buf.extend_from_slice(&4u32.to_le_bytes());
    buf.extend_from_slice(b"/etc\0");

    // one spec
    buf.extend_from_slice(&1u32.to_le_bytes());
    let ctx = b"system_u:object_r:etc_t\0";
    buf.extend_from_slice(&(ctx.len() as u32).to_le_bytes());
    buf.extend_from_slice(ctx);
    let pattern_text = b"/etc(/.*)?\0";
    buf.extend_from_slice(&(pattern_text.len() as u32).to_le_bytes());
    buf.extend_from_slice(pattern_text);
    buf.extend_from_slice(&0u32.to_le_bytes()); // mode: any
    // No embedded second `/` in this pattern's literal prefix ("/etc"), so the text
    // loader assigns no stem either (see `text::embedded_stem`) — keep both sides -1
    // so the comparator's stem-presence check agrees.
    buf.extend_from_slice(&(-1i32).to_le_bytes()); // stem_id -1
    buf.extend_from_slice(&1u32.to_le_bytes()); // has_meta_chars
    buf.extend_from_slice(&4u32.to_le_bytes()); // prefix_len ("/etc")
    buf.extend_from_slice(&(blob.len() as u32).to_le_bytes());
    buf.extend_from_slice(&blob);

    let binary_path = dir.path().join("binary_form");
    fs::write(&binary_path, &buf).unwrap();

    let h_text = load(&text_path);
    let h_binary = load(&binary_path);
    assert_eq!(h_text.cmp(&h_binary), fcontext::Ordering::Equal);
}
