use std::path::Path;

use clap::Parser;
use similar_asserts::assert_eq;
use test_log::test;
use vllm_now::config::GenerateArgs;
use vllm_now::discovery::StaticDevices;
use vllm_now::error::GeneratorError;

fn args(output_dir: &Path, extra: &[&str]) -> GenerateArgs {
    let output_dir = format!("--output-dir={}", output_dir.display());
    let mut argv = vec![
        "vllm-now",
        "--hf-home=/data/hf",
        "--hf-token-path=",
        output_dir.as_str(),
    ];
    // Blank unless the test pins devices, so a CUDA_VISIBLE_DEVICES set in the
    // environment does not leak in.
    if !extra.iter().any(|arg| arg.starts_with("--visible-devices")) {
        argv.push("--visible-devices=");
    }
    argv.extend_from_slice(extra);
    GenerateArgs::try_parse_from(argv).expect("should parse arguments")
}

fn read(dir: &Path, name: &str) -> String {
    std::fs::read_to_string(dir.join(name)).expect("artifact should exist")
}

fn upstreams(nginx: &str) -> Vec<String> {
    nginx
        .lines()
        .filter_map(|line| line.trim().strip_prefix("server "))
        .filter_map(|entry| entry.strip_suffix(":8000;"))
        .map(str::to_string)
        .collect()
}

#[test]
fn writes_consistent_artifacts() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let args = args(
        dir.path(),
        &["--model", "mistralai/Mistral-7B-v0.1", "--tensor-parallel-size", "2"],
    );

    let summary = vllm_now::run(&args, &StaticDevices(vec![0, 1, 2, 3, 4, 5]))
        .expect("should generate");
    assert_eq!(summary.servers, 3);
    assert_eq!(summary.listen_port, 80);

    let compose = read(dir.path(), "docker-compose.yml");
    let nginx = read(dir.path(), "nginx.conf");

    let manifest: serde_yaml::Value = serde_yaml::from_str(&compose).expect("valid yaml");
    let services: Vec<String> = manifest["services"]
        .as_mapping()
        .expect("services mapping")
        .keys()
        .filter_map(|key| key.as_str())
        .filter(|name| *name != "load-balancer")
        .map(str::to_string)
        .collect();

    assert_eq!(
        services,
        vec!["vllm-server-0", "vllm-server-1", "vllm-server-2"]
    );
    assert_eq!(upstreams(&nginx), services);
    assert!(compose.contains("    - /data/hf:/root/.cache/huggingface:rw\n"));
    assert!(compose.contains("device_ids: ['4', '5']"));
}

#[test]
fn device_override_beats_discovery() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let args = args(dir.path(), &["--visible-devices=3,2", "--model=m"]);

    assert_eq!(args.visible_devices.as_deref(), Some("3,2"));

    let summary = vllm_now::run(&args, &StaticDevices(vec![0, 1, 2, 3, 4, 5, 6, 7]))
        .expect("should generate");
    assert_eq!(summary.servers, 2);

    let compose = read(dir.path(), "docker-compose.yml");
    let first = compose.find("device_ids: ['3']").expect("group for device 3");
    let second = compose.find("device_ids: ['2']").expect("group for device 2");
    assert!(first < second);
    assert!(!compose.contains("vllm-server-2"));
    assert_eq!(
        upstreams(&read(dir.path(), "nginx.conf")),
        vec!["vllm-server-0", "vllm-server-1"]
    );
}

#[test]
fn generator_option_after_vllm_args_is_rejected() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let args = args(dir.path(), &["--model", "m", "--listen-port", "81"]);
    assert_eq!(args.listen_port, 80);

    let err = vllm_now::run(&args, &StaticDevices(vec![0])).expect_err("should fail");
    assert_eq!(
        err.downcast_ref::<GeneratorError>(),
        Some(&GeneratorError::MisplacedOption {
            name: "listen-port".to_string()
        })
    );
    assert_eq!(std::fs::read_dir(dir.path()).expect("read dir").count(), 0);
}

#[test]
fn params_file_is_merged_under_command_line() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let params_file = dir.path().join("params.yaml");
    std::fs::write(
        &params_file,
        "model: from-file\nvllm_version: v0.6.3\nmax-model-len: 8192\nenforce_eager: false\n",
    )
    .expect("should write params file");

    let params_arg = format!("--params-file={}", params_file.display());
    let args = args(dir.path(), &[params_arg.as_str(), "--model=from-cli"]);
    vllm_now::run(&args, &StaticDevices(vec![0])).expect("should generate");

    let compose = read(dir.path(), "docker-compose.yml");
    assert!(compose.contains("  image: vllm/vllm-openai:v0.6.3\n"));
    assert!(compose.contains(
        "    - --model=from-cli\n    - --max-model-len=8192\n  volumes:\n"
    ));
    assert!(!compose.contains("enforce-eager"));
}

#[test]
fn missing_model_writes_nothing() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let args = args(dir.path(), &["--dtype=half"]);

    let err = vllm_now::run(&args, &StaticDevices(vec![0, 1])).expect_err("should fail");
    assert_eq!(
        err.downcast_ref::<GeneratorError>(),
        Some(&GeneratorError::MissingRequiredParameter {
            name: "model".to_string()
        })
    );

    let entries = std::fs::read_dir(dir.path()).expect("read dir").count();
    assert_eq!(entries, 0);
}

#[test]
fn non_scalar_parameter_writes_nothing() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let out = dir.path().join("out");
    let params_file = dir.path().join("params.json");
    std::fs::write(&params_file, r#"{"model": "m", "lora_modules": {"a": "b"}}"#)
        .expect("should write params file");

    let params_arg = format!("--params-file={}", params_file.display());
    let args = args(&out, &[params_arg.as_str()]);

    let err = vllm_now::run(&args, &StaticDevices(vec![0])).expect_err("should fail");
    assert!(matches!(
        err.downcast_ref::<GeneratorError>(),
        Some(GeneratorError::InvalidParameterType { name, .. }) if name == "lora_modules"
    ));
    assert!(!out.exists());
}

#[test]
fn invalid_group_size_writes_nothing() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let args = args(dir.path(), &["--model=m", "--tensor-parallel-size=-2"]);

    let err = vllm_now::run(&args, &StaticDevices(vec![0, 1])).expect_err("should fail");
    assert_eq!(
        err.downcast_ref::<GeneratorError>(),
        Some(&GeneratorError::InvalidGroupSize { value: -2 })
    );
    assert!(!dir.path().join("docker-compose.yml").exists());
    assert!(!dir.path().join("nginx.conf").exists());
}

#[test]
fn repeated_runs_are_byte_identical() {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let args = args(
        dir.path(),
        &["--model=m", "--tensor-parallel-size=2", "--trust-remote-code"],
    );
    let devices = StaticDevices(vec![0, 1, 2, 3]);

    vllm_now::run(&args, &devices).expect("first run");
    let first = (read(dir.path(), "docker-compose.yml"), read(dir.path(), "nginx.conf"));

    vllm_now::run(&args, &devices).expect("second run");
    let second = (read(dir.path(), "docker-compose.yml"), read(dir.path(), "nginx.conf"));

    assert_eq!(first, second);
}
