//! End-to-end tests of the classmap binary

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tempfile::tempdir;

fn classmap() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_classmap"));
    cmd.env("CLASSMAP_LOG_LEVEL", "off");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn write(root: &Path, path: &str, content: &str) {
    let full = root.join(path);
    fs::create_dir_all(full.parent().unwrap()).unwrap();
    fs::write(full, content).unwrap();
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn zoo(root: &Path) {
    write(root, "animal.ts", "export class Animal {\n  name: string;\n}\n");
    write(
        root,
        "dog.ts",
        "import { Animal } from './animal';\nexport class Dog extends Animal {\n  bark(): void {}\n}\n",
    );
}

#[test]
fn test_scan_text() {
    let dir = tempdir().unwrap();
    zoo(dir.path());

    let output = classmap().arg("scan").arg(dir.path()).output().unwrap();
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("class animal.ts::Animal @ (40, 40)"));
    assert!(text.contains("    +bark(): void"));
    assert!(text.contains("dog.ts::Dog -[inheritance]-> animal.ts::Animal"));
}

#[test]
fn test_scan_json_reports_diagnostics() {
    let dir = tempdir().unwrap();
    zoo(dir.path());
    write(dir.path(), "broken.ts", "export class Broken {\n  x: number;\n");

    let output = classmap()
        .args(["scan", "--format", "json"])
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let document: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(document["version"], 1);
    let nodes = document["diagram"]["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 3);
    assert_eq!(nodes[0]["id"], "animal.ts::Animal");
    let edges = document["diagram"]["edges"].as_array().unwrap();
    assert_eq!(edges[0]["kind"], "inheritance");
    assert_eq!(edges[0]["style"]["line"], "solid");
    let diagnostics = document["diagnostics"].as_array().unwrap();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0]["kind"], "parse-error");
    assert_eq!(diagnostics[0]["path"], "broken.ts");
}

#[test]
fn test_scan_with_config_and_output_file() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src");
    write(&src, "a/engine.ts", "export class Engine {}");
    write(&src, "car.ts", "class Car { engine: Engine }");
    let config = dir.path().join("classmap.toml");
    fs::write(&config, "naming = \"global\"\n").unwrap();
    let out = dir.path().join("diagram.txt");

    let status = classmap()
        .arg("--config")
        .arg(&config)
        .arg("scan")
        .arg(&src)
        .arg("--output")
        .arg(&out)
        .status()
        .unwrap();
    assert!(status.success());

    let text = fs::read_to_string(&out).unwrap();
    assert!(text.contains("class Engine @"));
    assert!(text.contains("Car -[association]-> Engine (1)"));
}

#[test]
fn test_invalid_config_fails() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("classmap.toml");
    fs::write(&config, "layout = { columns = 0 }\n").unwrap();

    let output = classmap()
        .arg("--config")
        .arg(&config)
        .arg("scan")
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("columns"));
}

#[test]
fn test_scan_missing_directory_fails() {
    let dir = tempdir().unwrap();
    let output = classmap()
        .arg("scan")
        .arg(dir.path().join("missing"))
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Not a directory"));
}

#[test]
fn test_diff_prints_canonical_changes() {
    let old = tempdir().unwrap();
    let new = tempdir().unwrap();
    zoo(old.path());
    zoo(new.path());
    write(new.path(), "animal.ts", "export class Animal {\n  name: string;\n  legs: number;\n}\n");
    fs::remove_file(new.path().join("dog.ts")).unwrap();
    write(new.path(), "cat.ts", "import { Animal } from './animal';\nexport class Cat extends Animal {}\n");

    let output = classmap()
        .arg("diff")
        .arg(old.path())
        .arg(new.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "~ class animal.ts::Animal\n\
         + class cat.ts::Cat\n\
         + cat.ts::Cat -[inheritance]-> animal.ts::Animal\n\
         - dog.ts::Dog\n\
         - dog.ts::Dog -[inheritance]-> animal.ts::Animal\n"
    );
}

#[test]
fn test_watch_prints_updates() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.ts", "export class A {}\n");
    let config = dir.path().join("classmap.toml");
    fs::write(&config, "quiescence_ms = 50\nmax_batch_wait_ms = 500\n").unwrap();

    let mut child = classmap()
        .arg("--config")
        .arg(&config)
        .args(["watch", "--max-updates", "2"])
        .arg(dir.path())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let (line_tx, line_rx) = mpsc::channel();
    let reader = BufReader::new(child.stdout.take().unwrap());
    thread::spawn(move || {
        for line in reader.lines().map_while(Result::ok) {
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    let wait_for = |needle: &str| {
        let deadline = Instant::now() + Duration::from_secs(20);
        while let Some(left) = deadline.checked_duration_since(Instant::now()) {
            match line_rx.recv_timeout(left) {
                Ok(line) if line == needle => return true,
                Ok(_) => continue,
                Err(_) => return false,
            }
        }
        false
    };

    assert!(wait_for("+ class a.ts::A"), "initial diagram not printed");
    // give the watcher time to register before editing
    thread::sleep(Duration::from_millis(200));
    write(dir.path(), "b.ts", "import { A } from './a';\nexport class B extends A {}\n");
    let seen = wait_for("+ b.ts::B -[inheritance]-> a.ts::A");
    if !seen {
        let _ = child.kill();
    }
    assert!(seen, "edit was not picked up");

    let status = child.wait().unwrap();
    assert!(status.success());
}
