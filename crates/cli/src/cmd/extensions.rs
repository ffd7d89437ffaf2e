//! Implementation of the `brats extensions` command.
//!
//! Shows which PHP extensions a generated fixture would enable for each
//! version, using the table built into the library.

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};

use brats_lib::fixture::extensions::ExtensionTable;
use brats_lib::version::major_minor;

use crate::output::{Mark, print_warning};

/// Execute the extensions command.
///
/// Every version is printed; the command fails afterwards if any version has
/// no family in the table.
pub fn cmd_extensions(versions: &[String]) -> Result<()> {
  let table = ExtensionTable::builtin().context("Failed to load PHP extension table")?;

  for version in versions {
    let family = major_minor(version);
    if !table.has_family(version) {
      print_warning(&format!("{version}: no extension family {family}"));
      continue;
    }

    let extensions = table.extensions_for(version).unwrap_or_default();
    println!(
      "{} {} {}",
      Mark::Pass.paint(Stream::Stdout),
      version.if_supports_color(Stream::Stdout, |s| s.bold()),
      format!("(family {family})").if_supports_color(Stream::Stdout, |s| s.dimmed())
    );
    println!("    {}", extensions.join(", "));
  }

  if !table.zend_extensions().is_empty() {
    println!("  zend: {}", table.zend_extensions().join(", "));
  }

  table.validate_coverage(versions).context("Extension table is incomplete")?;
  Ok(())
}
