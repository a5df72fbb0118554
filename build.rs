use std::process::Command;

/// Stdout of a successful git invocation, trimmed.
fn git(args: &[&str]) -> Option<String> {
    let out = Command::new("git").args(args).output().ok()?;
    out.status
        .success()
        .then(|| String::from_utf8_lossy(&out.stdout).trim().to_string())
}

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");

    let release = git(&["describe", "--exact-match", "--tags", "HEAD"]).is_some();
    let version = match (release, git(&["rev-parse", "--short", "HEAD"])) {
        (true, _) => std::env::var("CARGO_PKG_VERSION").unwrap_or_default(),
        (false, Some(hash)) if !hash.is_empty() => format!("dev@{hash}"),
        (false, _) => "dev@unknown".to_string(),
    };
    println!("cargo:rustc-env=FOLIO_VERSION={version}");
}
