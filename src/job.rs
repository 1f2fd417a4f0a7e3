use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::process::{Command, Stdio};

use log::{error, info};

use crate::error::{Error, Result};
use crate::options::Options;
use crate::transform::{dedup, DedupReport};
use crate::utils::format_bytes;
use crate::{load_with, parse, LoadOptions};

///
/// Convert one asset into one component file.
///
/// Loads `input`, optionally deduplicates it, generates the component, pipes it
/// through the configured formatter and writes it to `output`. Nothing is left
/// at `output` when any step fails.
///
pub fn convert<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q, options: &Options) -> Result<()> {
  let input = input.as_ref();
  let output = output.as_ref();

  let metadata = fs::metadata(input).map_err(|e| Error::io(input, e))?;

  let load_options = LoadOptions {
    fingerprint: options.transform,
  };
  let mut graph = load_with(input, &load_options)?;

  let report = if options.transform {
    Some(dedup(&mut graph))
  } else {
    None
  };

  let display_name = input
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_default();
  let mut options = options.clone();
  options.size = Some(size_line(&display_name, metadata.len(), report.as_ref()));

  let root = match &options.root {
    Some(root) => root.clone(),
    None => input.parent().map(Path::to_path_buf).unwrap_or_default(),
  };
  let file_name = relative_path(input, &root);

  let source = parse(&file_name, &mut graph, &options)?;
  let source = match &options.formatter {
    Some(command) => format_source(command, &source)?,
    None => source,
  };

  write_atomic(output, &source)?;
  info!("gltfjsx: wrote [{}].", output.display());
  Ok(())
}

/// `robot.glb [1.2KB]`, plus what dedup merged.
fn size_line(file: &str, bytes: u64, report: Option<&DedupReport>) -> String {
  let mut line = format!("{} [{}]", file, format_bytes(bytes));
  if let Some(report) = report {
    line.push_str(&format!(
      ", deduplicated {} geometries and {} materials",
      report.geometries, report.materials
    ));
  }
  line
}

///
/// Path of `file` as seen from `root`, joined with `/`.
///
/// Both paths are compared component by component without touching the file
/// system, so they should be either both relative or both absolute.
///
pub fn relative_path(file: &Path, root: &Path) -> String {
  let file: Vec<Component> = file
    .components()
    .filter(|c| !matches!(c, Component::CurDir))
    .collect();
  let root: Vec<Component> = root
    .components()
    .filter(|c| !matches!(c, Component::CurDir))
    .collect();

  let common = file
    .iter()
    .zip(root.iter())
    .take_while(|(a, b)| a == b)
    .count();

  let mut parts: Vec<String> = Vec::new();
  for _ in common..root.len() {
    parts.push("..".to_string());
  }
  for component in &file[common..] {
    parts.push(component.as_os_str().to_string_lossy().into_owned());
  }
  parts.join("/")
}

///
/// Run `command` with `source` on stdin and return its stdout.
///
fn format_source(command: &str, source: &str) -> Result<String> {
  let failed = |reason: String| Error::Formatter {
    command: command.to_string(),
    reason,
  };

  let mut words = command.split_whitespace();
  let program = words
    .next()
    .ok_or_else(|| failed("empty command".to_string()))?;

  let mut child = Command::new(program)
    .args(words)
    .stdin(Stdio::piped())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .spawn()
    .map_err(|e| failed(e.to_string()))?;

  // Feed stdin from its own thread so a chatty formatter can't fill stdout first.
  let mut stdin = child
    .stdin
    .take()
    .ok_or_else(|| failed("stdin unavailable".to_string()))?;
  let input = source.to_string();
  let writer = std::thread::spawn(move || stdin.write_all(input.as_bytes()));

  let result = child.wait_with_output().map_err(|e| failed(e.to_string()))?;
  match writer.join() {
    Ok(Ok(())) => {}
    Ok(Err(e)) => return Err(failed(e.to_string())),
    Err(_) => return Err(failed("stdin writer panicked".to_string())),
  }

  if !result.status.success() {
    let stderr = String::from_utf8_lossy(&result.stderr);
    error!("gltfjsx: formatter [{}] failed. {}", command, stderr.trim());
    return Err(failed(format!("{}", result.status)));
  }
  String::from_utf8(result.stdout).map_err(|e| failed(e.to_string()))
}

///
/// Write through a sibling temporary file renamed into place.
///
fn write_atomic(output: &Path, contents: &str) -> Result<()> {
  let temp = temp_path(output);
  if let Err(e) = fs::write(&temp, contents) {
    drop(fs::remove_file(&temp));
    return Err(Error::io(&temp, e));
  }
  if let Err(e) = fs::rename(&temp, output) {
    drop(fs::remove_file(&temp));
    return Err(Error::io(output, e));
  }
  Ok(())
}

fn temp_path(output: &Path) -> PathBuf {
  let name = output
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_default();
  output.with_file_name(format!(".{}.tmp", name))
}
