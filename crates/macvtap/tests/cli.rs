//! Protocol behavior of the plugin binary that needs no privileges.

use assert_cmd::Command;
use predicates::prelude::*;

fn plugin(command: &str) -> Command {
    let mut cmd = Command::cargo_bin("macvtap").unwrap();
    cmd.env_clear()
        .env("CNI_COMMAND", command)
        .env("CNI_CONTAINERID", "dummy")
        .env("CNI_IFNAME", "net1");
    cmd
}

#[test]
fn version_lists_supported_versions() {
    plugin("VERSION")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""cniVersion":"1.0.0""#))
        .stdout(predicate::str::contains(
            r#""supportedVersions":["0.1.0","0.2.0","0.3.0","0.3.1","0.4.0","1.0.0"]"#,
        ));
}

#[test]
fn missing_command_is_an_environment_error() {
    Command::cargo_bin("macvtap")
        .unwrap()
        .env_clear()
        .assert()
        .code(1)
        .stdout(predicate::str::contains(r#""code":4"#))
        .stdout(predicate::str::contains("CNI_COMMAND"));
}

#[test]
fn unknown_command_fails() {
    plugin("GC")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("unknown CNI_COMMAND"));
}

#[test]
fn check_succeeds_silently() {
    plugin("CHECK")
        .env("CNI_NETNS", "/var/run/netns/sandbox")
        .write_stdin(r#"{"cniVersion":"0.3.1","name":"mynet","type":"macvtap","master":"eth0"}"#)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn del_without_netns_succeeds() {
    plugin("DEL")
        .write_stdin(r#"{"cniVersion":"0.3.1","name":"mynet","type":"macvtap","master":"eth0"}"#)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn del_with_empty_netns_succeeds() {
    plugin("DEL")
        .env("CNI_NETNS", "")
        .env("CNI_ARGS", "")
        .write_stdin(r#"{"cniVersion":"0.3.1","name":"mynet","type":"macvtap","master":"eth0"}"#)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn del_with_empty_netns_ignores_interface_name() {
    plugin("DEL")
        .env("CNI_NETNS", "")
        .env("CNI_IFNAME", "not/a/name")
        .assert()
        .success();
}

#[test]
fn add_without_netns_fails() {
    plugin("ADD")
        .write_stdin(r#"{"cniVersion":"0.3.1","name":"mynet","type":"macvtap","master":"eth0"}"#)
        .assert()
        .code(1)
        .stdout(predicate::str::contains(r#""code":4"#))
        .stdout(predicate::str::contains("CNI_NETNS"));
}

#[test]
fn add_with_conflicting_sources_fails() {
    plugin("ADD")
        .env("CNI_NETNS", "/var/run/netns/sandbox")
        .write_stdin(
            r#"{"cniVersion":"0.3.1","name":"mynet","type":"macvtap","master":"eth0","deviceID":"mvtap7"}"#,
        )
        .assert()
        .code(1)
        .stdout(predicate::str::contains(r#""code":7"#));
}

#[test]
fn add_with_malformed_config_fails() {
    plugin("ADD")
        .env("CNI_NETNS", "/var/run/netns/sandbox")
        .write_stdin("{not json")
        .assert()
        .code(1)
        .stdout(predicate::str::contains(r#""code":6"#));
}

#[test]
fn add_with_unsupported_version_fails() {
    plugin("ADD")
        .env("CNI_NETNS", "/var/run/netns/sandbox")
        .write_stdin(r#"{"cniVersion":"9.9.9","name":"mynet","type":"macvtap","master":"eth0"}"#)
        .assert()
        .code(1)
        .stdout(predicate::str::contains(r#""code":1"#));
}
