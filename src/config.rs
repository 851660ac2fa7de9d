//! File configuration and its merge with command-line arguments.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use dirgrab_core::DEFAULT_MAX_DEPTH;
use dirgrab_core::download::{
    CONNECT_TIMEOUT_SECS, DEFAULT_WORKERS, MAX_WORKERS, MIN_WORKERS, READ_TIMEOUT_SECS,
};

use crate::cli::Args;

const DEFAULT_OUTPUT_DIR: &str = "output";
const DEFAULT_CACHE_FILE: &str = "html-cache.json";
const MAX_DEPTH_LIMIT: usize = 1024;

/// Defaults read from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Listing to mirror when none is given on the command line.
    pub origin: Option<String>,
    /// Output directory.
    pub output_dir: Option<PathBuf>,
    /// Listing cache file.
    pub cache_file: Option<PathBuf>,
    /// Concurrent downloads (1..=64).
    pub workers: Option<u8>,
    /// Listing depth limit.
    pub max_depth: Option<usize>,
    /// Substrings removed from output names.
    pub strip: Option<Vec<String>>,
    /// HTTP connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// HTTP read timeout in seconds.
    pub read_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Validates values against the same limits the CLI enforces.
    pub fn validate(&self) -> Result<()> {
        if let Some(workers) = self.workers
            && !(MIN_WORKERS..=MAX_WORKERS).contains(&usize::from(workers))
        {
            bail!(
                "Invalid config value for `workers`: {workers}. Expected range: {MIN_WORKERS}..={MAX_WORKERS}"
            );
        }
        if let Some(depth) = self.max_depth
            && depth > MAX_DEPTH_LIMIT
        {
            bail!("Invalid config value for `max_depth`: {depth}. Expected range: 0..={MAX_DEPTH_LIMIT}");
        }
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Resolves the config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/dirgrab/config.toml`
/// 2. `$HOME/.config/dirgrab/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    config_path_from(env_var_non_empty_os("XDG_CONFIG_HOME"), env_var_non_empty_os("HOME"))
}

fn config_path_from(xdg_config_home: Option<OsString>, home: Option<OsString>) -> Option<PathBuf> {
    if let Some(xdg) = xdg_config_home {
        return Some(PathBuf::from(xdg).join("dirgrab").join("config.toml"));
    }
    let home = home?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("dirgrab")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file from the default path, if one exists.
pub fn load_default_file_config() -> Result<Option<FileConfig>> {
    let Some(path) = resolve_default_config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }
    load_file_config(&path).map(Some)
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_no = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };
        let key = raw_key.trim();
        let value = raw_value.trim();
        let context = || format!("Invalid `{key}` value on line {line_no}");

        match key {
            "origin" => cfg.origin = Some(parse_string_literal(value).with_context(context)?),
            "output_dir" => {
                cfg.output_dir = Some(PathBuf::from(
                    parse_string_literal(value).with_context(context)?,
                ));
            }
            "cache_file" => {
                cfg.cache_file = Some(PathBuf::from(
                    parse_string_literal(value).with_context(context)?,
                ));
            }
            "workers" => {
                let parsed = parse_integer_u64(value).with_context(context)?;
                let workers = u8::try_from(parsed)
                    .map_err(|_| anyhow::anyhow!("workers out of range for u8"))
                    .with_context(context)?;
                cfg.workers = Some(workers);
            }
            "max_depth" => {
                let parsed = parse_integer_u64(value).with_context(context)?;
                let depth = usize::try_from(parsed)
                    .map_err(|_| anyhow::anyhow!("max_depth out of range for usize"))
                    .with_context(context)?;
                cfg.max_depth = Some(depth);
            }
            "strip" => cfg.strip = Some(parse_string_list(value).with_context(context)?),
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "read_timeout_secs" => {
                cfg.read_timeout_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            unknown => bail!("Unknown configuration key: '{unknown}' on line {line_no}"),
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

/// Accepts a single string or an array of strings.
fn parse_string_list(raw_value: &str) -> Result<Vec<String>> {
    let Some(inner) = raw_value
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    else {
        return Ok(vec![parse_string_literal(raw_value)?]);
    };

    let mut items = Vec::new();
    let mut in_string = false;
    let mut start = 0;
    for (index, ch) in inner.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            ',' if !in_string => {
                items.push(parse_string_literal(inner[start..index].trim())?);
                start = index + 1;
            }
            _ => {}
        }
    }
    let last = inner[start..].trim();
    if !last.is_empty() {
        items.push(parse_string_literal(last)?);
    }
    Ok(items)
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

/// Effective run settings after merging CLI arguments over file values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub origin: String,
    pub output_dir: PathBuf,
    /// `None` when caching is disabled.
    pub cache_file: Option<PathBuf>,
    pub workers: usize,
    pub max_depth: usize,
    pub strip: Vec<String>,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
}

impl Settings {
    /// Merges `args` over `file`, falling back to built-in defaults.
    pub fn resolve(args: &Args, file: Option<&FileConfig>) -> Result<Self> {
        let file = file.cloned().unwrap_or_default();

        let Some(origin) = args.origin.clone().or(file.origin) else {
            bail!("No origin URL given. Pass it as an argument or set `origin` in the config file");
        };

        let cache_file = if args.no_cache {
            None
        } else {
            Some(
                args.cache_file
                    .clone()
                    .or(file.cache_file)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_FILE)),
            )
        };

        let strip = if args.strip.is_empty() {
            file.strip.unwrap_or_default()
        } else {
            args.strip.clone()
        };

        Ok(Self {
            origin,
            output_dir: args
                .output_dir
                .clone()
                .or(file.output_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            cache_file,
            workers: args
                .workers
                .or(file.workers)
                .map_or(DEFAULT_WORKERS, usize::from),
            max_depth: args
                .max_depth
                .or(file.max_depth)
                .unwrap_or(DEFAULT_MAX_DEPTH),
            strip,
            connect_timeout_secs: file
                .connect_timeout_secs
                .unwrap_or(CONNECT_TIMEOUT_SECS),
            read_timeout_secs: file.read_timeout_secs.unwrap_or(READ_TIMEOUT_SECS),
        })
    }
}
