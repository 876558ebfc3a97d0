use assert_cmd::Command;

/// A `homelab` command whose tool settings point at programs that do not exist, so nothing on the
/// machine running the tests is touched.
fn homelab() -> Command {
    let mut cmd = Command::cargo_bin("homelab").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("GITHUB_USER")
        .env_remove("GITHUB_REPO")
        .env("HOMELAB_K3D_PATH", "/nonexistent/k3d")
        .env("HOMELAB_DOCKER_PATH", "/nonexistent/docker")
        .env("HOMELAB_FLUX_PATH", "/nonexistent/flux")
        .env("HOMELAB_BREW_PATH", "/nonexistent/brew");
    cmd
}

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn help_lists_subcommands() {
    let output = homelab().arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = stdout(&output);
    for subcommand in ["create", "destroy", "status"] {
        assert!(stdout.contains(subcommand), "{}", stdout);
    }
}

#[test]
fn unknown_match_mode_is_rejected() {
    homelab()
        .args(&["--match-mode", "fuzzy", "status"])
        .assert()
        .failure();
}

#[test]
fn create_requires_repository_owner() {
    let output = homelab()
        .args(&["create", "--github-repo", "fleet"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--github-owner"), "{}", stderr);
}

#[test]
fn status_without_cluster_manager_is_unknown() {
    let output = homelab()
        .args(&["--name", "homelab", "status"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(stdout(&output).starts_with("homelab: unknown"), "{}", stdout(&output));
}

#[test]
fn status_json() {
    let output = homelab().args(&["status", "--json"]).output().unwrap();
    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains(r#""state": "unknown""#), "{}", stdout);
    assert!(stdout.contains(r#""name": "homelab""#), "{}", stdout);
}

#[test]
fn destroy_without_cluster_manager_succeeds_quietly() {
    let output = homelab().arg("destroy").output().unwrap();
    assert!(output.status.success());
    assert!(stdout(&output).is_empty(), "{}", stdout(&output));
}

#[test]
fn create_fails_when_runtime_never_starts() {
    let dir = tempfile::TempDir::new().unwrap();
    let output = homelab()
        .env("HOMELAB_RUNTIME_LAUNCH", "/nonexistent/launcher")
        .args(&[
            "create",
            "--github-owner",
            "octocat",
            "--github-repo",
            "fleet",
            "--kubeconfig-output",
            dir.path().join("config").to_str().unwrap(),
            "--bootstrap-marker",
            dir.path().join("marker").to_str().unwrap(),
            "--ready-attempts",
            "2",
            "--ready-interval-secs",
            "0",
        ])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unable to provision cluster 'homelab'"), "{}", stderr);
    assert!(stderr.contains("did not become reachable"), "{}", stderr);
    assert!(!dir.path().join("marker").exists());
}
