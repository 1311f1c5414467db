//! Markdown note vault capability (`notes`).
//!
//! Params: `{ "action": "append_daily" | "write" | "search", ... }`
//! - `append_daily`: `content` is appended as a timestamped bullet to `Daily/<date>.md`
//! - `write`: `content` is written to a new `<folder>/<title>.md` (folder defaults to
//!   `Inbox`); an existing note is never overwritten, a `_2`, `_3`, ... suffix is added
//!   instead
//! - `search`: `query` is matched case-insensitively against file names and bodies

use super::{text_param, Capability};
use anyhow::{anyhow, bail, Context};
use chrono::Local;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

const DAILY_FOLDER: &str = "Daily";
const DEFAULT_FOLDER: &str = "Inbox";
const MAX_SEARCH_RESULTS: usize = 20;
const MAX_NAME_SUFFIX: u32 = 1000;

pub struct NoteVaultCapability {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl NoteVaultCapability {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            write_lock: Mutex::new(()),
        }
    }

    async fn append_daily(&self, content: &str) -> anyhow::Result<Value> {
        let now = Local::now();
        let dir = self.root.join(DAILY_FOLDER);
        let path = dir.join(format!("{}.md", now.format("%Y-%m-%d")));

        let _guard = self.write_lock.lock().await;
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("opening {}", path.display()))?;
        file.write_all(format!("- {} {}\n", now.format("%H:%M"), content).as_bytes())
            .await?;
        file.flush().await?;

        Ok(json!({ "path": self.relative(&path) }))
    }

    async fn write(&self, title: &str, folder: &str, content: &str) -> anyhow::Result<Value> {
        let dir = self.root.join(sanitize(folder)?);
        let stem = sanitize(title)?;

        let _guard = self.write_lock.lock().await;
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;

        for n in 1..=MAX_NAME_SUFFIX {
            let path = if n == 1 {
                dir.join(format!("{}.md", stem))
            } else {
                dir.join(format!("{}_{}.md", stem, n))
            };

            let mut file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(e).with_context(|| format!("creating {}", path.display()))
                }
            };
            file.write_all(content.as_bytes())
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            file.flush().await?;

            return Ok(json!({ "path": self.relative(&path) }));
        }

        bail!("no free note name for '{}' in {}", stem, dir.display())
    }

    async fn search(&self, query: &str) -> anyhow::Result<Value> {
        let needle = query.to_lowercase();
        let mut matches = Vec::new();

        if fs::metadata(&self.root).await.is_err() {
            return Ok(json!({ "matches": matches }));
        }

        let mut pending = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir)
                .await
                .with_context(|| format!("reading {}", dir.display()))?;

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                    continue;
                }
                if path.extension().and_then(|e| e.to_str()) != Some("md") {
                    continue;
                }

                let name_hit = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map(|s| s.to_lowercase().contains(&needle))
                    .unwrap_or(false);
                let body_hit = name_hit
                    || fs::read_to_string(&path)
                        .await
                        .map(|body| body.to_lowercase().contains(&needle))
                        .unwrap_or(false);

                if body_hit {
                    matches.push(self.relative(&path));
                }
            }
        }

        matches.sort();
        matches.truncate(MAX_SEARCH_RESULTS);
        Ok(json!({ "matches": matches }))
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

/// Keep note and folder names inside the vault.
fn sanitize(name: &str) -> anyhow::Result<String> {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        bail!("note name '{}' is empty after sanitizing", name);
    }
    Ok(cleaned)
}

#[async_trait::async_trait]
impl Capability for NoteVaultCapability {
    fn description(&self) -> &str {
        "Append to the daily note, write a new note, or search the note vault"
    }

    async fn invoke(&self, params: Value) -> anyhow::Result<Value> {
        let action = text_param(&params, "action").unwrap_or_else(|| "search".to_string());

        match action.as_str() {
            "append_daily" => {
                let content = text_param(&params, "content")
                    .ok_or_else(|| anyhow!("append_daily needs 'content'"))?;
                self.append_daily(&content).await
            }
            "write" => {
                let content = text_param(&params, "content")
                    .ok_or_else(|| anyhow!("write needs 'content'"))?;
                let title = text_param(&params, "title").unwrap_or_else(|| {
                    format!("Note_{}", Local::now().format("%Y-%m-%d_%H-%M-%S"))
                });
                let folder =
                    text_param(&params, "folder").unwrap_or_else(|| DEFAULT_FOLDER.to_string());
                self.write(&title, &folder, &content).await
            }
            "search" => {
                let query = text_param(&params, "query")
                    .ok_or_else(|| anyhow!("search needs 'query'"))?;
                self.search(&query).await
            }
            other => bail!("unknown notes action '{}'", other),
        }
    }
}
