//! File-backed project catalog.
//!
//! The whole collection lives in one JSON array on disk. Every mutation is
//! read-full / mutate-in-memory / rewrite-full with no locking or
//! versioning — under concurrent admin writes the last rewrite wins. That
//! shape is deliberate and must not grow transactional guarantees.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use uuid::Uuid;

/// One project record as stored on disk and served over the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub github_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_url: Option<String>,
}

/// Tags arrive either as a JSON array or as one comma-separated string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    List(Vec<String>),
    Csv(String),
}

impl TagsInput {
    fn normalize(self) -> Vec<String> {
        match self {
            TagsInput::List(tags) => tags
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            TagsInput::Csv(csv) => csv
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }
}

/// Admin input for a new project. All string fields are trimmed before
/// validation; `title`, `description` and `githubUrl` must be non-empty.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub github_url: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub live_url: Option<String>,
    #[serde(default)]
    pub tags: Option<TagsInput>,
}

impl NewProject {
    fn into_project(self) -> Result<Project, StoreError> {
        let title = self.title.trim().to_string();
        let description = self.description.trim().to_string();
        let github_url = self.github_url.trim().to_string();

        if title.is_empty() {
            return Err(StoreError::Invalid("title is required".to_string()));
        }
        if description.is_empty() {
            return Err(StoreError::Invalid("description is required".to_string()));
        }
        if github_url.is_empty() {
            return Err(StoreError::Invalid("githubUrl is required".to_string()));
        }

        let live_url = self
            .live_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        Ok(Project {
            id: Uuid::new_v4().to_string(),
            title,
            description,
            image: self.image.trim().to_string(),
            tags: self.tags.map(TagsInput::normalize).unwrap_or_default(),
            github_url,
            live_url,
        })
    }
}

/// Errors surfaced by the store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Rejected admin input (missing required field).
    #[error("{0}")]
    Invalid(String),
    /// No record with the requested id.
    #[error("project not found: {0}")]
    NotFound(String),
    /// The backing file does not hold a top-level JSON array.
    #[error("project file is corrupt: expected a top-level array")]
    Corrupt,
    #[error("project file is corrupt: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Durable CRUD over the project collection.
pub struct ProjectStore {
    path: PathBuf,
}

impl ProjectStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Create the backing file as an empty collection if it does not exist.
    pub async fn ensure_initialized(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        if tokio::fs::try_exists(&self.path).await? {
            return Ok(());
        }
        tokio::fs::write(&self.path, "[]\n").await?;
        Ok(())
    }

    /// Read and parse the full collection, newest first.
    ///
    /// Legacy and hand-edited files are tolerated: each element is coerced
    /// field-by-field to the expected types and a missing id is synthesized.
    pub async fn list(&self) -> Result<Vec<Project>, StoreError> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        let parsed: Value = serde_json::from_str(&contents)?;
        let items = parsed.as_array().ok_or(StoreError::Corrupt)?;
        Ok(items.iter().map(coerce_project).collect())
    }

    /// Validate the input, prepend the new record and rewrite the file.
    pub async fn create(&self, input: NewProject) -> Result<Project, StoreError> {
        let project = input.into_project()?;
        let mut projects = self.list().await?;
        projects.insert(0, project.clone());
        self.write_all(&projects).await?;
        Ok(project)
    }

    /// Remove the record with the given id and rewrite the file.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut projects = self.list().await?;
        let before = projects.len();
        projects.retain(|p| p.id != id);
        if projects.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.write_all(&projects).await
    }

    /// Rewrite the whole backing file in one pass. No partial-write path.
    async fn write_all(&self, projects: &[Project]) -> Result<(), StoreError> {
        let mut body = serde_json::to_string_pretty(projects)?;
        body.push('\n');
        tokio::fs::write(&self.path, body).await?;
        Ok(())
    }
}

/// Coerce one loose JSON element into a well-typed record.
fn coerce_project(value: &Value) -> Project {
    Project {
        id: match value.get("id") {
            Some(id) => coerce_string(id),
            None => Uuid::new_v4().to_string(),
        },
        title: value.get("title").map(coerce_string).unwrap_or_default(),
        description: value
            .get("description")
            .map(coerce_string)
            .unwrap_or_default(),
        image: value.get("image").map(coerce_string).unwrap_or_default(),
        tags: coerce_tags(value.get("tags")),
        github_url: value.get("githubUrl").map(coerce_string).unwrap_or_default(),
        live_url: value
            .get("liveUrl")
            .map(coerce_string)
            .filter(|u| !u.is_empty()),
    }
}

fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn coerce_tags(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().map(coerce_string).collect(),
        Some(Value::String(csv)) => csv
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> ProjectStore {
        ProjectStore::new(dir.path().join("projects.json"))
    }

    fn sample(title: &str) -> NewProject {
        NewProject {
            title: title.to_string(),
            description: "a thing I built".to_string(),
            github_url: "https://github.com/me/thing".to_string(),
            ..NewProject::default()
        }
    }

    #[tokio::test]
    async fn create_prepends_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.ensure_initialized().await.unwrap();

        let first = store.create(sample("first")).await.unwrap();
        let second = store.create(sample("second")).await.unwrap();

        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second.id);
        assert_eq!(all[1].id, first.id);
    }

    #[tokio::test]
    async fn create_rejects_blank_required_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.ensure_initialized().await.unwrap();

        let mut input = sample("ok");
        input.title = "   ".to_string();
        let err = store.create(input).await.unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));

        // the collection is untouched
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_normalizes_csv_tags() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.ensure_initialized().await.unwrap();

        let mut input = sample("tagged");
        input.tags = Some(TagsInput::Csv("rust, axum , ,tokio".to_string()));
        let created = store.create(input).await.unwrap();
        assert_eq!(created.tags, vec!["rust", "axum", "tokio"]);
    }

    #[tokio::test]
    async fn delete_removes_exactly_one_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.ensure_initialized().await.unwrap();

        let keep = store.create(sample("keep")).await.unwrap();
        let drop = store.create(sample("drop")).await.unwrap();

        store.delete(&drop.id).await.unwrap();
        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, keep.id);
    }

    #[tokio::test]
    async fn delete_unknown_id_leaves_collection_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.ensure_initialized().await.unwrap();
        store.create(sample("only")).await.unwrap();

        let err = store.delete("no-such-id").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_coerces_legacy_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        tokio::fs::create_dir_all(dir.path()).await.unwrap();
        tokio::fs::write(
            dir.path().join("projects.json"),
            r#"[{"id": 7, "title": "old", "description": null, "tags": "a,b", "githubUrl": "gh"},
                {"title": "no id", "description": "d", "tags": ["x"], "githubUrl": "gh2", "liveUrl": ""}]"#,
        )
        .await
        .unwrap();

        let all = store.list().await.unwrap();
        assert_eq!(all[0].id, "7");
        assert_eq!(all[0].description, "");
        assert_eq!(all[0].tags, vec!["a", "b"]);
        assert!(!all[1].id.is_empty(), "missing id is synthesized");
        assert_eq!(all[1].tags, vec!["x"]);
        assert_eq!(all[1].live_url, None, "empty liveUrl collapses to absent");
    }

    #[tokio::test]
    async fn list_fails_on_non_array_top_level() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        tokio::fs::create_dir_all(dir.path()).await.unwrap();
        tokio::fs::write(dir.path().join("projects.json"), r#"{"not": "an array"}"#)
            .await
            .unwrap();

        let err = store.list().await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt));
    }
}
