use std::error::Error;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_LOCALE: &str = "en";
const LOCALES_DIR: &str = "locales";

fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo:rerun-if-changed={LOCALES_DIR}");

    let mut catalogs = Vec::new();
    let mut paths = fs::read_dir(LOCALES_DIR)?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
        .collect::<Vec<PathBuf>>();
    paths.sort();

    for path in paths {
        println!("cargo:rerun-if-changed={}", path.display());
        let Some(locale) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        let table = fs::read_to_string(&path)?.parse::<toml::Table>()?;
        let mut entries = Vec::new();
        flatten("", &table, &mut entries, &path)?;
        entries.sort();
        catalogs.push((locale.to_string(), entries));
    }

    let mut out = String::new();
    writeln!(out, "pub const DEFAULT_LOCALE: &str = {DEFAULT_LOCALE:?};")?;
    writeln!(out, "pub static LOCALES: &[(&str, &[(&str, &str)])] = &[")?;
    for (locale, entries) in &catalogs {
        writeln!(out, "    ({locale:?}, &[")?;
        for (key, value) in entries {
            writeln!(out, "        ({key:?}, {value:?}),")?;
        }
        writeln!(out, "    ]),")?;
    }
    writeln!(out, "];")?;

    let out_dir = PathBuf::from(std::env::var("OUT_DIR")?);
    fs::write(out_dir.join("onboarding_i18n_generated.rs"), out)?;
    Ok(())
}

fn flatten(
    prefix: &str,
    table: &toml::Table,
    entries: &mut Vec<(String, String)>,
    source: &Path,
) -> Result<(), Box<dyn Error>> {
    for (key, value) in table {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            toml::Value::String(text) => entries.push((full_key, text.clone())),
            toml::Value::Table(nested) => flatten(&full_key, nested, entries, source)?,
            other => {
                return Err(format!(
                    "{}: `{full_key}` must be a string or table, found {}",
                    source.display(),
                    other.type_str()
                )
                .into());
            }
        }
    }
    Ok(())
}
