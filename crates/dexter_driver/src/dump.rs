use std::path::Path;

use colored::*;
use dexter_config::DexterConfig;

/// File-system safe form of a method or file name.
pub fn sanitize_dump_name(name: &str) -> String {
  name
    .chars()
    .map(|ch| {
      if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
        ch
      } else {
        '_'
      }
    })
    .collect()
}

/// Writes `content` to `dump_dir/file_name`, or to stdout under a header when
/// no dump directory is configured.
pub(crate) fn write_dump_output(
  config: &DexterConfig,
  header: &str,
  file_name: &str,
  content: &str,
) -> Result<(), ()> {
  let Some(dump_dir) = &config.dump_dir else {
    println!("// {}\n{}", header, content);
    return Ok(());
  };

  let output_dir = Path::new(dump_dir);
  if let Err(e) = std::fs::create_dir_all(output_dir) {
    eprintln!(
      "{} Failed to create dump directory '{}': {}",
      "Error:".red().bold(),
      output_dir.display(),
      e
    );
    return Err(());
  }

  let output_path = output_dir.join(file_name);
  if let Err(e) = std::fs::write(&output_path, content) {
    eprintln!(
      "{} Failed to write dump file '{}': {}",
      "Error:".red().bold(),
      output_path.display(),
      e
    );
    return Err(());
  }

  Ok(())
}
