use seedgate_core::{normalize_keywords, ConfigError, CoreError, FilterConfig, StorageError};
use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

const KEY_MAX_SIZE: &str = "max_size_gb";
const KEY_KEYWORDS: &str = "keywords";
const KEY_MAX_SEEDING_SIZE: &str = "max_seeding_size_gb";

/// Persists the filter criteria as `key=value` lines.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `None` when the record is absent, incomplete or malformed.
    pub async fn load(&self) -> Result<Option<FilterConfig>, CoreError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No filter configuration at {}", self.path.display());
                return Ok(None);
            }
            Err(source) => {
                return Err(StorageError::ReadFailed {
                    path: self.path.display().to_string(),
                    source,
                }
                .into())
            }
        };

        match parse_record(&contents) {
            Ok(config) => {
                info!(
                    "Loaded filter configuration: max torrent size {} GB, {} keywords, max seeding size {} GB",
                    config.max_torrent_size_gb,
                    config.keywords.len(),
                    config.max_seeding_size_gb
                );
                Ok(Some(config))
            }
            Err(e) => {
                warn!(
                    "Ignoring filter configuration at {}: {}",
                    self.path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    /// Replaces the record atomically through a sibling temp file.
    pub async fn save(&self, config: &FilterConfig) -> Result<(), CoreError> {
        let tmp_path = PathBuf::from(format!("{}.tmp", self.path.display()));
        let write_failed = |source| StorageError::WriteFailed {
            path: self.path.display().to_string(),
            source,
        };

        let mut file = tokio::fs::File::create(&tmp_path)
            .await
            .map_err(write_failed)?;
        file.write_all(render_record(config).as_bytes())
            .await
            .map_err(write_failed)?;
        file.sync_all().await.map_err(write_failed)?;
        drop(file);

        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(write_failed)?;
        info!("Saved filter configuration to {}", self.path.display());
        Ok(())
    }

    /// Asks for the three filter values, re-asking on invalid answers, then persists them.
    pub async fn prompt_and_save<R, W>(
        &self,
        input: &mut R,
        output: &mut W,
    ) -> Result<FilterConfig, CoreError>
    where
        R: BufRead,
        W: Write,
    {
        let max_torrent_size_gb = prompt_until(
            input,
            output,
            "Maximum size of a single torrent in GB (0 for unlimited): ",
            parse_size,
        )?;
        let keywords = prompt_until(
            input,
            output,
            "Filter keywords (comma separated): ",
            |answer| {
                let keywords = normalize_keywords(answer.split(','));
                if keywords.is_empty() {
                    Err("Please enter at least one keyword.".to_string())
                } else {
                    Ok(keywords)
                }
            },
        )?;
        let max_seeding_size_gb = prompt_until(
            input,
            output,
            "Maximum total size Transmission may use for seeding in GB: ",
            parse_size,
        )?;

        let config = FilterConfig {
            max_torrent_size_gb,
            keywords,
            max_seeding_size_gb,
        };
        self.save(&config).await?;
        Ok(config)
    }
}

fn prompt_until<R, W, T, F>(
    input: &mut R,
    output: &mut W,
    question: &str,
    parse: F,
) -> Result<T, CoreError>
where
    R: BufRead,
    W: Write,
    F: Fn(&str) -> Result<T, String>,
{
    loop {
        write!(output, "{}", question)?;
        output.flush()?;

        let mut answer = String::new();
        if input.read_line(&mut answer)? == 0 {
            return Err(ConfigError::PromptAborted {
                reason: "input closed before all values were entered".to_string(),
            }
            .into());
        }

        match parse(answer.trim()) {
            Ok(value) => return Ok(value),
            Err(hint) => writeln!(output, "{}", hint)?,
        }
    }
}

fn parse_size(value: &str) -> Result<f64, String> {
    match value.parse::<f64>() {
        Ok(size) if size.is_finite() && size >= 0.0 => Ok(size),
        _ => Err("Please enter a non-negative number.".to_string()),
    }
}

pub(crate) fn parse_record(contents: &str) -> Result<FilterConfig, ConfigError> {
    let mut values = HashMap::new();
    for line in contents.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "line".to_string(),
                value: line.to_string(),
            })?;
        values.insert(key.trim(), value.trim());
    }

    let field = |key: &str| {
        values
            .get(key)
            .copied()
            .ok_or_else(|| ConfigError::MissingField {
                field: key.to_string(),
            })
    };
    let size_field = |key: &str| {
        let raw = field(key)?;
        parse_size(raw).map_err(|_| ConfigError::InvalidValue {
            field: key.to_string(),
            value: raw.to_string(),
        })
    };

    let max_torrent_size_gb = size_field(KEY_MAX_SIZE)?;
    let max_seeding_size_gb = size_field(KEY_MAX_SEEDING_SIZE)?;
    let keywords = normalize_keywords(field(KEY_KEYWORDS)?.split(','));
    if keywords.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: KEY_KEYWORDS.to_string(),
            value: String::new(),
        });
    }

    Ok(FilterConfig {
        max_torrent_size_gb,
        keywords,
        max_seeding_size_gb,
    })
}

pub(crate) fn render_record(config: &FilterConfig) -> String {
    let keywords: Vec<&str> = config.keywords.iter().map(String::as_str).collect();
    format!(
        "{}={}\n{}={}\n{}={}\n",
        KEY_MAX_SIZE,
        config.max_torrent_size_gb,
        KEY_KEYWORDS,
        keywords.join(","),
        KEY_MAX_SEEDING_SIZE,
        config.max_seeding_size_gb
    )
}
