// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

use {
    self::input::{BuildDir, Packages, RecordingRunner},
    crate::{esptool::HostEnv, ExitCode},
};


/// The full esptool argv for a complete build directory.
fn expected_argv(build: &BuildDir, packages: &Packages, flash_size: &str) -> Vec<String> {
    [
        "python",
        &packages.esptool(),
        "--chip",
        "esp32s3",
        "merge_bin",
        "-o",
        &build.file("merged-firmware.bin"),
        "--flash_mode",
        "dio",
        "--flash_freq",
        "80m",
        "--flash_size",
        flash_size,
        "0x0",
        &build.file("bootloader.bin"),
        "0x8000",
        &build.file("partitions.bin"),
        "0x10000",
        &build.file("firmware.bin"),
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Merge a complete build directory with esptool found in PlatformIO's packages.
#[test]
fn merge_complete_build_dir() {
    let build = BuildDir::complete();
    let packages = Packages::with_esptool();
    let mut runner = RecordingRunner::default();
    let output = test(&packages.env(), &mut runner, ["merge", "-b", &build.dir()]);
    assert_eq!(output.exit_code, ExitCode(0));
    assert_eq!(runner.calls, [expected_argv(&build, &packages, "8MB")]);
    assert!(output.stdout.is_empty());
    assert!(output.stderr.is_empty());
}

/// The first match in path order wins, and only `.bin` files match.
#[test]
fn merge_picks_first_sorted_match() {
    let build = BuildDir::empty()
        .with("bootloader.bin.bak", b"old")
        .with("bootloader_dio_80m.bin", b"boot")
        .with("partitions_b.bin", b"b")
        .with("partitions_a.bin", b"a")
        .with("firmware_v2.bin", b"v2")
        .with("firmware_v1.bin", b"v1")
        .with("merged-firmware.bin", b"stale");
    let packages = Packages::with_esptool();
    let mut runner = RecordingRunner::default();
    let output = test(&packages.env(), &mut runner, ["merge", "-b", &build.dir()]);
    assert_eq!(output.exit_code, ExitCode(0));
    assert_eq!(runner.calls.len(), 1);
    let argv = &runner.calls[0];
    assert_eq!(argv[14], build.file("bootloader_dio_80m.bin"));
    assert_eq!(argv[16], build.file("partitions_a.bin"));
    assert_eq!(argv[18], build.file("firmware_v1.bin"));
}

/// Any missing input skips the merge without running anything.
#[test]
fn merge_skips_missing_input() {
    for missing in ["bootloader.bin", "partitions.bin", "firmware.bin"] {
        let build = BuildDir::complete().without(missing);
        let packages = Packages::with_esptool();
        let mut runner = RecordingRunner::default();
        let output = test(&packages.env(), &mut runner, ["merge", "-b", &build.dir()]);
        assert_eq!(output.exit_code, ExitCode(0), "missing {missing}");
        assert!(runner.calls.is_empty(), "missing {missing}");
        assert!(output.stderr.is_empty());
    }
}

/// A build directory that doesn't exist yet is a skip, not an error.
#[test]
fn merge_skips_missing_build_dir() {
    let build = BuildDir::empty();
    let packages = Packages::with_esptool();
    let mut runner = RecordingRunner::default();
    let output = test(
        &packages.env(),
        &mut runner,
        ["merge", "-b", &build.file("not-built-yet")],
    );
    assert_eq!(output.exit_code, ExitCode(0));
    assert!(runner.calls.is_empty());
}

/// Without esptool in the packages directory the merge is skipped.
#[test]
fn merge_skips_missing_esptool() {
    let build = BuildDir::complete();
    let packages = Packages::empty();
    let mut runner = RecordingRunner::default();
    let output = test(&packages.env(), &mut runner, ["merge", "-b", &build.dir()]);
    assert_eq!(output.exit_code, ExitCode(0));
    assert!(runner.calls.is_empty());

    // Nowhere to look at all.
    let output = test(&HostEnv::default(), &mut runner, ["merge", "-b", &build.dir()]);
    assert_eq!(output.exit_code, ExitCode(0));
    assert!(runner.calls.is_empty());

    // An explicit path that isn't there.
    let output = test(
        &Packages::with_esptool().env(),
        &mut runner,
        [
            "merge",
            "-b",
            &build.dir(),
            "--esptool",
            &build.file("esptool.py"),
        ],
    );
    assert_eq!(output.exit_code, ExitCode(0));
    assert!(runner.calls.is_empty());
}

/// esptool is found through PLATFORMIO_CORE_DIR and HOME too.
#[test]
fn merge_finds_esptool_in_core_dir() {
    let build = BuildDir::complete();
    let core = tempfile::tempdir().unwrap();
    let tool = core.path().join("packages").join("tool-esptoolpy");
    std::fs::create_dir_all(&tool).unwrap();
    std::fs::write(tool.join("esptool.py"), b"").unwrap();
    let script = tool.join("esptool.py").to_str().unwrap().to_owned();

    let env = HostEnv {
        core_dir: Some(core.path().to_path_buf()),
        ..Default::default()
    };
    let mut runner = RecordingRunner::default();
    let output = test(&env, &mut runner, ["merge", "-b", &build.dir()]);
    assert_eq!(output.exit_code, ExitCode(0));
    assert_eq!(runner.calls[0][1], script);

    let home = tempfile::tempdir().unwrap();
    let tool = home.path().join(".platformio/packages/tool-esptoolpy");
    std::fs::create_dir_all(&tool).unwrap();
    std::fs::write(tool.join("esptool.py"), b"").unwrap();
    let env = HostEnv {
        home: Some(home.path().to_path_buf()),
        ..Default::default()
    };
    let mut runner = RecordingRunner::default();
    let output = test(&env, &mut runner, ["merge", "-b", &build.dir()]);
    assert_eq!(output.exit_code, ExitCode(0));
    assert_eq!(runner.calls[0][1], tool.join("esptool.py").to_str().unwrap());
}

/// PYTHONEXE picks the interpreter unless --python overrides it.
#[test]
fn merge_python_interpreter() {
    let build = BuildDir::complete();
    let packages = Packages::with_esptool();
    let env = HostEnv {
        python_exe: Some("/penv/bin/python".into()),
        ..packages.env()
    };
    let mut runner = RecordingRunner::default();
    test(&env, &mut runner, ["merge", "-b", &build.dir()]);
    test(
        &env,
        &mut runner,
        ["merge", "-b", &build.dir(), "--python", "python3.11"],
    );
    assert_eq!(runner.calls.len(), 2);
    assert_eq!(runner.calls[0][0], "/penv/bin/python");
    assert_eq!(runner.calls[1][0], "python3.11");
}

/// A dry run prints the shell command and runs nothing.
#[test]
fn merge_dry_run() {
    let build = BuildDir::named("build dir")
        .with("bootloader.bin", b"b")
        .with("partitions.bin", b"p")
        .with("firmware.bin", b"f");
    let packages = Packages::with_esptool();
    let mut runner = RecordingRunner::default();
    let output = test(
        &packages.env(),
        &mut runner,
        ["merge", "-b", &build.dir(), "--dry-run"],
    );
    assert_eq!(output.exit_code, ExitCode(0));
    assert!(runner.calls.is_empty());
    assert_eq!(output.stdout.lines().count(), 1);
    assert!(output.stdout.starts_with("python "));
    assert!(output.stdout.contains(" --chip esp32s3 merge_bin -o '"));
    assert!(output
        .stdout
        .contains(" --flash_mode dio --flash_freq 80m --flash_size 8MB 0x0 '"));
    assert!(output
        .stdout
        .contains(&format!("'{}'", build.file("merged-firmware.bin"))));
    assert!(output
        .stdout
        .contains(&format!("0x8000 '{}'", build.file("partitions.bin"))));
    assert!(output
        .stdout
        .contains(&format!("0x10000 '{}'", build.file("firmware.bin"))));
    // Nothing gets written.
    assert!(!build.path().join("merged-firmware.bin").exists());
}

/// --output moves the merged image.
#[test]
fn merge_custom_output() {
    let build = BuildDir::complete();
    let packages = Packages::with_esptool();
    let out = build.root().join("dist").join("dial.bin");
    let mut runner = RecordingRunner::default();
    let output = test(
        &packages.env(),
        &mut runner,
        ["merge", "-b", &build.dir(), "-o", out.to_str().unwrap()],
    );
    assert_eq!(output.exit_code, ExitCode(0));
    assert_eq!(runner.calls[0][5], "-o");
    assert_eq!(runner.calls[0][6], out.to_str().unwrap());
}

/// --flash-size beats the board manifest, which beats the default.
#[test]
fn merge_flash_size_precedence() {
    let build = BuildDir::complete();
    let packages = Packages::with_esptool();
    let board = build.root().join("m5stack-stamps3.json");
    std::fs::write(
        &board,
        r#"{ "name": "M5Stack StampS3", "upload": { "flash_size": "16MB" } }"#,
    )
    .unwrap();
    let board = board.to_str().unwrap();

    let mut runner = RecordingRunner::default();
    test(
        &packages.env(),
        &mut runner,
        ["merge", "-b", &build.dir(), "--board", board],
    );
    test(
        &packages.env(),
        &mut runner,
        [
            "merge",
            "-b",
            &build.dir(),
            "--board",
            board,
            "--flash-size",
            "4mb",
        ],
    );
    assert_eq!(runner.calls[0], expected_argv(&build, &packages, "16MB"));
    assert_eq!(runner.calls[1], expected_argv(&build, &packages, "4MB"));
}

/// A board manifest without upload.flash_size falls back to 8MB.
#[test]
fn merge_board_without_flash_size() {
    let build = BuildDir::complete();
    let packages = Packages::with_esptool();
    let board = build.root().join("board.json");
    std::fs::write(&board, r#"{ "name": "no upload section" }"#).unwrap();
    let mut runner = RecordingRunner::default();
    let output = test(
        &packages.env(),
        &mut runner,
        ["merge", "-b", &build.dir(), "--board", board.to_str().unwrap()],
    );
    assert_eq!(output.exit_code, ExitCode(0));
    assert_eq!(runner.calls, [expected_argv(&build, &packages, "8MB")]);
}

/// Bad flash sizes are rejected before anything runs.
#[test]
fn merge_invalid_flash_size() {
    let build = BuildDir::complete();
    let packages = Packages::with_esptool();
    let mut runner = RecordingRunner::default();
    let output = test(
        &packages.env(),
        &mut runner,
        ["merge", "-b", &build.dir(), "--flash-size", "3MB"],
    );
    assert_eq!(output.exit_code, ExitCode(1));
    assert!(output.stderr.contains(r#"invalid flash size "3MB""#));
    assert!(runner.calls.is_empty());

    let board = build.root().join("board.json");
    std::fs::write(&board, r#"{ "upload": { "flash_size": "huge" } }"#).unwrap();
    let output = test(
        &packages.env(),
        &mut runner,
        ["merge", "-b", &build.dir(), "--board", board.to_str().unwrap()],
    );
    assert_eq!(output.exit_code, ExitCode(1));
    assert!(output.stderr.contains("upload.flash_size"));
    assert!(runner.calls.is_empty());
}

/// A broken board manifest doesn't matter when the merge is skipped anyway.
#[test]
fn merge_skip_ignores_board() {
    let build = BuildDir::empty();
    let packages = Packages::with_esptool();
    let board = build.root().join("board.json");
    std::fs::write(&board, "{").unwrap();
    let mut runner = RecordingRunner::default();
    let output = test(
        &packages.env(),
        &mut runner,
        ["merge", "-b", &build.dir(), "--board", board.to_str().unwrap()],
    );
    assert_eq!(output.exit_code, ExitCode(0));
    assert!(runner.calls.is_empty());
}

/// Settings can come from the config file, with paths relative to it.
#[test]
fn merge_config_file() {
    let build = BuildDir::complete();
    let packages = Packages::with_esptool();
    let config = build.root().join("merge-bin.toml");
    std::fs::write(
        &config,
        format!(
            "build_dir = \"m5dial\"\nflash_size = \"32MB\"\nesptool = \"{}\"\n",
            packages.esptool()
        ),
    )
    .unwrap();
    let mut runner = RecordingRunner::default();
    let output = test(
        &HostEnv::default(),
        &mut runner,
        ["merge", "-c", config.to_str().unwrap()],
    );
    assert_eq!(output.exit_code, ExitCode(0));
    assert_eq!(runner.calls, [expected_argv(&build, &packages, "32MB")]);
}

/// Specifying a setting in both places is an error.
#[test]
fn merge_config_conflicts() {
    let build = BuildDir::complete();
    let packages = Packages::with_esptool();
    let config = build.root().join("merge-bin.toml");
    std::fs::write(&config, "build_dir = \"m5dial\"\nflash_size = \"8MB\"\n").unwrap();
    let config = config.to_str().unwrap();
    let mut runner = RecordingRunner::default();

    let output = test(
        &packages.env(),
        &mut runner,
        ["merge", "-c", config, "--flash-size", "16MB"],
    );
    assert_eq!(output.exit_code, ExitCode(1));
    assert!(output
        .stderr
        .contains("flash size specified in both config and cli"));

    let output = test(
        &packages.env(),
        &mut runner,
        ["merge", "-c", config, "-b", &build.dir()],
    );
    assert_eq!(output.exit_code, ExitCode(1));
    assert!(output
        .stderr
        .contains("build directory specified in both config and cli"));

    assert!(runner.calls.is_empty());
}

/// A missing or malformed config file is an error.
#[test]
fn merge_bad_config_file() {
    let build = BuildDir::complete();
    let packages = Packages::with_esptool();
    let mut runner = RecordingRunner::default();
    let missing = build.root().join("missing.toml");
    let output = test(
        &packages.env(),
        &mut runner,
        ["merge", "-c", missing.to_str().unwrap()],
    );
    assert_eq!(output.exit_code, ExitCode(1));
    assert!(output.stderr.contains("failed to read config file"));

    let bad = build.root().join("bad.toml");
    std::fs::write(&bad, "build_dir = [").unwrap();
    let output = test(&packages.env(), &mut runner, ["merge", "-c", bad.to_str().unwrap()]);
    assert_eq!(output.exit_code, ExitCode(1));
    assert!(output.stderr.contains("config file format error in TOML"));
    assert!(runner.calls.is_empty());
}

/// The build directory has to come from somewhere.
#[test]
fn merge_without_build_dir() {
    let packages = Packages::with_esptool();
    let mut runner = RecordingRunner::default();
    let output = test(&packages.env(), &mut runner, ["merge"]);
    assert_eq!(output.exit_code, ExitCode(1));
    assert!(output.stderr.contains("build directory must be specified"));
    assert!(runner.calls.is_empty());
}

/// A failing esptool fails the hook.
#[test]
fn merge_esptool_fails() {
    let build = BuildDir::complete();
    let packages = Packages::with_esptool();
    let mut runner = RecordingRunner::failing(2);
    let output = test(&packages.env(), &mut runner, ["merge", "-b", &build.dir()]);
    assert_eq!(output.exit_code, ExitCode(1));
    assert_eq!(runner.calls.len(), 1);
    assert!(output
        .stderr
        .contains("esptool merge_bin failed with exit code 2"));
}

/// The interpreter not being there fails the hook too.
#[test]
fn merge_python_missing() {
    let build = BuildDir::complete();
    let packages = Packages::with_esptool();
    let mut runner = RecordingRunner {
        spawn_error: true,
        ..Default::default()
    };
    let output = test(&packages.env(), &mut runner, ["merge", "-b", &build.dir()]);
    assert_eq!(output.exit_code, ExitCode(1));
    assert!(output.stderr.contains("failed to run esptool"));
}

/// Locate reports what a merge would use.
#[test]
fn locate_reports_inputs_and_tool() {
    let build = BuildDir::complete().without("partitions.bin");
    let packages = Packages::with_esptool();
    let mut runner = RecordingRunner::default();
    let output = test(&packages.env(), &mut runner, ["locate", "-b", &build.dir()]);
    assert_eq!(output.exit_code, ExitCode(0));
    assert!(output.stdout.contains(&build.file("bootloader.bin")));
    assert!(output.stdout.contains(&build.file("firmware.bin")));
    assert!(output.stdout.contains(&packages.esptool()));
    assert!(output.stdout.contains("None"));
    assert!(runner.calls.is_empty());
}

/// Help goes to stdout and is not an error.
#[test]
fn help() {
    let mut runner = RecordingRunner::default();
    let output = test(&HostEnv::default(), &mut runner, ["merge", "--help"]);
    assert_eq!(output.exit_code, ExitCode(0));
    assert!(output.stdout.contains("--flash-size"));
    assert!(output.stderr.is_empty());
}

/// Unknown arguments are reported by clap.
#[test]
fn unknown_argument() {
    let mut runner = RecordingRunner::default();
    let output = test(&HostEnv::default(), &mut runner, ["merge", "--flash-mode", "qio"]);
    assert_eq!(output.exit_code, ExitCode(1));
    assert!(output.stderr.contains("--flash-mode"));
    assert!(output.stdout.is_empty());
}

fn test<const N: usize>(env: &HostEnv, runner: &mut RecordingRunner, args: [&str; N]) -> Output {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let exit_code = crate::main_args(
        std::iter::once("merge-bin").chain(args),
        env,
        runner,
        &mut stdout,
        &mut stderr,
    );
    println!("* args: {:?}", args);
    println!("* exit_code: {:?}", exit_code);
    println!("* stdout:\n{}", String::from_utf8_lossy(&stdout));
    println!("* stderr:\n{}", String::from_utf8_lossy(&stderr));
    Output {
        exit_code,
        stdout: String::from_utf8(stdout).unwrap(),
        stderr: String::from_utf8(stderr).unwrap(),
    }
}

#[derive(Debug)]
struct Output {
    exit_code: ExitCode,
    stdout: String,
    stderr: String,
}
