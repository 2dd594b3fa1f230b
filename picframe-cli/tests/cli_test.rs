//! End-to-end tests for the `picframe` binary

use anyhow::Result;
use picframe_core::navigation::{DisplayGeometry, FolderLayout, NavLayout, SourceLayout};
use picframe_core::PicframeConfig;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

fn picframe(dir: &Path, args: &[&str]) -> Result<Output> {
    let output = Command::new(env!("CARGO_BIN_EXE_picframe"))
        .args(args)
        .current_dir(dir)
        .env_remove("PICFRAME_CONFIG")
        .env_remove("RUST_LOG")
        .output()?;
    Ok(output)
}

/// Media root with one folder of five images and a config pointing at it
fn frame(temp_dir: &TempDir) -> (PathBuf, PicframeConfig) {
    let media_root = temp_dir.path().join("card");
    let folder = media_root.join("Garden");
    std::fs::create_dir_all(&folder).unwrap();
    for name in ["e.png", "c.jpg", "a.png", "d.bmp", "b.JPG", "notes.txt"] {
        std::fs::write(folder.join(name), b"image").unwrap();
    }

    let mut config = PicframeConfig::default();
    config.catalog.media_root = media_root;
    config.catalog.page_size = 2;
    let config_path = temp_dir.path().join("picframe.yaml");
    std::fs::write(&config_path, config.to_yaml().unwrap()).unwrap();
    (config_path, config)
}

fn tap(point: picframe_core::navigation::TouchPoint) -> String {
    format!("tap {} {}\n", point.x, point.y)
}

#[test]
fn test_list_json_pages_through_everything() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (config_path, config) = frame(&temp_dir);
    let folder = config.catalog.media_root.join("Garden");

    let output = picframe(
        temp_dir.path(),
        &[
            "--config",
            config_path.to_str().unwrap(),
            "list",
            folder.to_str().unwrap(),
            "--all",
            "--json",
        ],
    )?;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let listing: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let names: Vec<&str> = listing["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["a.png", "b.JPG", "c.jpg", "d.bmp", "e.png"]);
    assert_eq!(listing["has_more"], false);
    Ok(())
}

#[test]
fn test_folders_lists_image_folders() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (config_path, _) = frame(&temp_dir);

    let output = picframe(temp_dir.path(), &["--config", config_path.to_str().unwrap(), "folders"])?;
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "Garden");
    Ok(())
}

#[test]
fn test_run_script_navigates_a_folder() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (config_path, config) = frame(&temp_dir);
    let geometry = DisplayGeometry::from_config(&config.display);

    let script = [
        tap(SourceLayout::new(&geometry).local.center()),
        tap(FolderLayout::new(&geometry, 1).row(0).center()),
        tap(NavLayout::new(&geometry).next.center()),
        tap(NavLayout::new(&geometry).next.center()),
        "quit\n".to_string(),
    ]
    .concat();
    let script_path = temp_dir.path().join("session.txt");
    std::fs::write(&script_path, script)?;

    let output = picframe(
        temp_dir.path(),
        &[
            "--config",
            config_path.to_str().unwrap(),
            "run",
            "--script",
            script_path.to_str().unwrap(),
        ],
    )?;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let files: Vec<&str> = stdout
        .lines()
        .filter_map(|line| line.strip_prefix("[file] "))
        .collect();
    assert_eq!(files, vec!["a.png", "b.JPG", "c.jpg"]);
    Ok(())
}

#[test]
fn test_run_reports_failure_exit_status() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut config = PicframeConfig::default();
    config.catalog.media_root = temp_dir.path().join("no-card");
    let config_path = temp_dir.path().join("picframe.yaml");
    std::fs::write(&config_path, config.to_yaml()?)?;

    let geometry = DisplayGeometry::from_config(&config.display);
    let script_path = temp_dir.path().join("session.txt");
    std::fs::write(&script_path, tap(SourceLayout::new(&geometry).local.center()))?;

    let output = picframe(
        temp_dir.path(),
        &[
            "--config",
            config_path.to_str().unwrap(),
            "run",
            "--script",
            script_path.to_str().unwrap(),
        ],
    )?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("[message]"));
    Ok(())
}

#[test]
fn test_malformed_explicit_config_fails() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("broken.yaml");
    std::fs::write(&config_path, "catalog:\n  page_size: 0\n")?;

    let output = picframe(temp_dir.path(), &["--config", config_path.to_str().unwrap(), "config"])?;
    assert!(!output.status.success());
    Ok(())
}

/// Answer one request with `body` and a digest header that does not match it
fn serve_corrupted_once(body: &'static [u8]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        let Ok((mut socket, _)) = listener.accept() else {
            return;
        };
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match socket.read(&mut buf) {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nX-Content-SHA256: {}\r\nConnection: close\r\n\r\n",
            body.len(),
            "0".repeat(64)
        );
        let _ = socket.write_all(head.as_bytes());
        let _ = socket.write_all(body);
    });
    format!("http://{addr}/photo.png")
}

#[test]
fn test_rejected_download_is_logged_under_integrity_target() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let url = serve_corrupted_once(b"tampered image");

    let output = picframe(temp_dir.path(), &["fetch", &url, "--memory"])?;
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    let rejection = stderr
        .lines()
        .find(|line| line.contains("DOWNLOAD REJECTED"))
        .unwrap_or_else(|| panic!("no rejection logged:\n{stderr}"));
    assert!(rejection.contains("integrity"), "{rejection}");
    Ok(())
}

#[test]
fn test_serve_stores_posted_image() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let (config_path, config) = frame(&temp_dir);

    let mut child = Command::new(env!("CARGO_BIN_EXE_picframe"))
        .args([
            "--config",
            config_path.to_str().unwrap(),
            "serve",
            "--listen",
            "127.0.0.1:0",
        ])
        .current_dir(temp_dir.path())
        .env_remove("PICFRAME_CONFIG")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;

    let mut banner = String::new();
    BufReader::new(child.stdout.take().unwrap()).read_line(&mut banner)?;
    let addr = banner
        .split_whitespace()
        .find_map(|word| word.strip_prefix("http://"))
        .unwrap_or_else(|| panic!("no address in {banner:?}"))
        .to_string();

    let body = b"BM tiny";
    let mut stream = TcpStream::connect(&addr)?;
    write!(
        stream,
        "POST /upload/porch.bmp HTTP/1.1\r\nHost: frame\r\nContent-Type: image/bmp\r\nContent-Length: {}\r\n\r\n",
        body.len()
    )?;
    stream.write_all(body)?;
    let mut reply = String::new();
    stream.read_to_string(&mut reply)?;

    child.kill()?;
    child.wait()?;

    assert!(reply.starts_with("HTTP/1.1 200"), "{reply}");
    let stored = config.catalog.media_root.join("upload/porch.bmp");
    assert_eq!(std::fs::read(stored)?, body);
    Ok(())
}
