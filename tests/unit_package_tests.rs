//! # Package and Tool Unit Tests / 包与工具单元测试
//!
//! Unit tests for the on-device invocation of both package variants and for
//! the instrumentation tool settings.
//!
//! 两种包变体的设备端调用以及插桩工具设置的单元测试。

use device_test_runner::core::models::{ArtifactKind, ArtifactReference};
use device_test_runner::core::package::{PackageOptions, TestPackage};
use device_test_runner::core::tools::Tool;
use std::time::Duration;

fn package(path: &str, tool: Tool) -> TestPackage {
    TestPackage::new(
        ArtifactReference::from_path(path),
        PackageOptions {
            timeout: Duration::from_secs(60),
            cleanup_test_files: false,
            tool,
            symbols_dir: None,
            strip_tool: None,
        },
    )
}

#[cfg(test)]
mod invocation_tests {
    use super::*;

    #[test]
    fn test_variant_follows_artifact_kind() {
        assert_eq!(
            package("out/Debug/base_unittests", Tool::None).kind(),
            ArtifactKind::NativeExecutable
        );
        assert_eq!(
            package("out/Debug/base_unittests.apk", Tool::None).kind(),
            ArtifactKind::PackagedApp
        );
    }

    #[test]
    fn test_executable_script() {
        let script = package("out/Debug/base_unittests", Tool::None)
            .render_invocation("A.*-A.Slow", "")
            .unwrap();
        let lines: Vec<&str> = script.lines().collect();

        assert_eq!(lines[0], "#!/system/bin/sh");
        assert_eq!(lines[1], "cd /data/local/tmp");
        assert!(lines[2].starts_with("/data/local/tmp/base_unittests "));
        assert!(lines[2].contains("A.*-A.Slow"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_extra_arguments_are_split_and_quoted() {
        let script = package("out/Debug/base_unittests", Tool::None)
            .render_invocation("*", "--v=1 --name 'two words'")
            .unwrap();
        let command = script.lines().nth(2).unwrap();
        let argv = shlex::split(command).unwrap();

        assert_eq!(
            argv,
            vec![
                "/data/local/tmp/base_unittests",
                "--gtest_filter=*",
                "--v=1",
                "--name",
                "two words"
            ]
        );
    }

    #[test]
    fn test_unbalanced_arguments_are_rejected() {
        let result = package("out/Debug/base_unittests", Tool::None).render_invocation("*", "--name 'oops");
        assert!(result.is_err());
    }

    #[test]
    fn test_tool_wrapper_prefixes_executable() {
        let script = package("out/Debug/base_unittests", Tool::Memcheck)
            .render_invocation("*", "")
            .unwrap();
        let command = script.lines().nth(2).unwrap();
        assert!(command.starts_with("/data/local/tmp/valgrind/bin/valgrind --tool=memcheck"));
        assert!(command.contains(" /data/local/tmp/base_unittests "));
    }

    #[test]
    fn test_apk_command_line() {
        let command_line = package("out/Debug/content_unittests.apk", Tool::None)
            .render_invocation("Gpu.*", "--single-process")
            .unwrap();
        let argv = shlex::split(&command_line).unwrap();

        assert_eq!(argv, vec!["content_unittests", "--gtest_filter=Gpu.*", "--single-process"]);
    }

    #[test]
    fn test_line_timeout_scales_with_tool() {
        assert_eq!(
            package("out/Debug/base_unittests", Tool::None).line_timeout(),
            Duration::from_secs(60)
        );
        assert_eq!(
            package("out/Debug/base_unittests", Tool::ThreadSanitizer).line_timeout(),
            Duration::from_secs(60 * 30)
        );
    }
}

#[cfg(test)]
mod tool_tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        for (name, tool) in [
            ("none", Tool::None),
            ("asan", Tool::AddressSanitizer),
            ("memcheck", Tool::Memcheck),
            ("tsan", Tool::ThreadSanitizer),
        ] {
            assert_eq!(name.parse::<Tool>().unwrap(), tool);
            assert_eq!(tool.to_string(), name);
        }
        assert_eq!("".parse::<Tool>().unwrap(), Tool::None);
        assert!("helgrind".parse::<Tool>().is_err());
    }

    #[test]
    fn test_wrappers_and_scales() {
        assert_eq!(Tool::None.wrapper(), None);
        assert_eq!(Tool::None.timeout_scale(), 1);
        assert_eq!(
            Tool::AddressSanitizer.wrapper().as_deref(),
            Some("/data/local/tmp/asanwrapper")
        );
        assert_eq!(Tool::AddressSanitizer.timeout_scale(), 2);
        assert!(Tool::ThreadSanitizer.wrapper().unwrap().contains("--tool=tsan"));
        assert_eq!(Tool::Memcheck.timeout_scale(), 20);
    }
}
