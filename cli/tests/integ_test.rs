#![cfg(feature = "integ")]
use assert_cmd::Command;

/// Requires `docker` and `k3d`. We will test:
/// `homelab status` finds a cluster created out of band
/// `homelab destroy` deletes it exactly once
/// `homelab status` no longer finds it
#[test]
fn status_and_destroy() {
    let cluster_name = "homelab-integ";
    let status = std::process::Command::new("k3d")
        .args(&["cluster", "create", cluster_name, "--servers", "1", "--agents", "0", "--wait"])
        .status()
        .unwrap();
    assert!(status.success());

    let output = Command::cargo_bin("homelab")
        .unwrap()
        .args(&["--name", cluster_name, "status"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("homelab-integ: present"));

    // A prefix of the name must not be mistaken for the cluster.
    let output = Command::cargo_bin("homelab")
        .unwrap()
        .args(&["--name", "homelab-in", "destroy"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(output.stdout.is_empty());

    let output = Command::cargo_bin("homelab")
        .unwrap()
        .args(&["--name", cluster_name, "destroy"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "Cluster 'homelab-integ' was deleted."
    );

    let output = Command::cargo_bin("homelab")
        .unwrap()
        .args(&["--name", cluster_name, "destroy"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(output.stdout.is_empty());

    let output = Command::cargo_bin("homelab")
        .unwrap()
        .args(&["--name", cluster_name, "status"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("homelab-integ: absent"));
}
