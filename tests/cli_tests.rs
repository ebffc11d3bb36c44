use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn runner() -> Command {
    let mut cmd = Command::cargo_bin("device-test-runner").unwrap();
    cmd.env("NO_COLOR", "1");
    cmd
}

/// Writes a configuration whose source root is `root`, with one filter file
/// disabling `A.B` for net_unittests.
///
/// 写入一个以 `root` 为源码根目录的配置，并带有一个为 net_unittests 禁用 `A.B` 的过滤文件。
fn write_project(root: &Path) -> std::path::PathBuf {
    fs::create_dir_all(root.join("filters")).unwrap();
    fs::write(root.join("filters/net_unittests_disabled"), "A.B\n").unwrap();
    fs::write(
        root.join("filters/net_unittests_emulator_additional_disabled"),
        "C.D\n",
    )
    .unwrap();
    let config = format!(
        r#"
language = "en"
source_root = "{}"
filter_dir = "filters"

[[suites]]
path = "out/Debug/net_unittests"

[[suites]]
path = "out/Debug/base_unittests"
gtest_filter = "FileUtilTest.*"
"#,
        root.display()
    );
    let path = root.join("DeviceTests.toml");
    fs::write(&path, config).unwrap();
    path
}

/// The top-level help lists every subcommand.
/// 顶层帮助列出所有子命令。
#[test]
fn test_help_lists_subcommands() {
    runner()
        .args(["--lang", "en", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("inspect"))
        .stdout(predicate::str::contains("init"));
}

/// `init --non-interactive` writes a template that loads back cleanly.
/// `init --non-interactive` 写入一个可以重新正常加载的模板。
#[test]
fn test_init_writes_loadable_template() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("conf/DeviceTests.toml");

    runner()
        .args(["--lang", "zh-CN", "init", "--non-interactive", "--output"])
        .arg(&output)
        .assert()
        .success();

    let content = fs::read_to_string(&output).unwrap();
    assert!(content.contains("language = \"zh-CN\""));
    let config = device_test_runner::core::config::load_config(&output).unwrap();
    assert_eq!(config.language, "zh-CN");
    assert_eq!(config.suites.len(), 2);
}

/// An existing file is left alone without `--force`.
/// 没有 `--force` 时不会修改现有文件。
#[test]
fn test_init_refuses_to_overwrite() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("DeviceTests.toml");
    fs::write(&output, "# mine\n").unwrap();

    runner()
        .args(["--lang", "en", "init", "--non-interactive", "--output"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
    assert_eq!(fs::read_to_string(&output).unwrap(), "# mine\n");

    runner()
        .args(["--lang", "en", "init", "--non-interactive", "--force", "--output"])
        .arg(&output)
        .assert()
        .success();
    assert!(fs::read_to_string(&output).unwrap().contains("[[suites]]"));
}

/// `inspect` shows the composed filter, including emulator-only exclusions.
/// `inspect` 显示组合后的过滤器，包括仅限模拟器的排除项。
#[test]
fn test_inspect_shows_filters() {
    let dir = tempdir().unwrap();
    let config = write_project(dir.path());

    runner()
        .args(["--lang", "en", "inspect", "--config"])
        .arg(&config)
        .args(["--device", "emulator-5554", "--suite", "net_unittests"])
        .assert()
        .success()
        .stdout(predicate::str::contains("net_unittests"))
        .stdout(predicate::str::contains("*-A.B:C.D"))
        .stdout(predicate::str::contains("Mock test server"))
        .stdout(predicate::str::contains("base_unittests").not());

    runner()
        .args(["--lang", "en", "inspect", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("FileUtilTest.*"))
        .stdout(predicate::str::contains("*-A.B"))
        .stdout(predicate::str::contains("C.D").not());
}

#[test]
fn test_missing_config_fails() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope.toml");

    runner()
        .args(["--lang", "en", "inspect", "--config"])
        .arg(&missing)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));

    runner()
        .args(["--lang", "en", "run", "--config"])
        .arg(&missing)
        .assert()
        .failure();
}

#[test]
fn test_unknown_suite_fails() {
    let dir = tempdir().unwrap();
    let config = write_project(dir.path());

    runner()
        .args(["--lang", "en", "inspect", "--config"])
        .arg(&config)
        .args(["--suite", "no_such_tests"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no_such_tests"));
}

#[test]
fn test_shard_flags_must_come_together() {
    let dir = tempdir().unwrap();
    let config = write_project(dir.path());

    runner()
        .args(["--lang", "en", "run", "--total-runners", "2", "--config"])
        .arg(&config)
        .assert()
        .failure();
}

/// Without a working adb every suite aborts during SetUp; the run fails and
/// still writes its JSON report.
///
/// 没有可用的 adb 时，每个套件都会在 SetUp 期间中止；运行失败，但仍会写入 JSON 报告。
#[test]
fn test_run_without_adb_reports_aborted_suites() {
    let dir = tempdir().unwrap();
    let config = write_project(dir.path());
    let report = dir.path().join("reports/run.json");

    runner()
        .args(["--lang", "en", "run", "--adb", "/nonexistent/adb", "--device", "emulator-5554", "--config"])
        .arg(&config)
        .arg("--json")
        .arg(&report)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Aborted"));

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["failed"], true);
    assert_eq!(json["suites"].as_array().unwrap().len(), 2);
}

#[test]
fn test_run_without_devices_fails() {
    let dir = tempdir().unwrap();
    let config = write_project(dir.path());

    runner()
        .args(["--lang", "en", "run", "--adb", "/nonexistent/adb", "--config"])
        .arg(&config)
        .assert()
        .failure();
}
