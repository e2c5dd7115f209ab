use std::process::Command;

fn git(args: &[&str]) -> Option<String> {
    let out = Command::new("git").args(args).output().ok()?;
    out.status
        .success()
        .then(|| String::from_utf8_lossy(&out.stdout).trim().to_string())
}

/// Short commit hash for the startup banner, "-dirty" when the tree has edits
fn main() {
    let version = match git(&["rev-parse", "--short", "HEAD"]) {
        Some(hash) if git(&["diff", "--quiet"]).is_none() => format!("{}-dirty", hash),
        Some(hash) => hash,
        None => "unknown".to_string(),
    };

    println!("cargo:rustc-env=GIT_HASH={}", version);
    for path in [".git/HEAD", ".git/refs/heads", ".git/index"] {
        println!("cargo:rerun-if-changed={}", path);
    }
}
