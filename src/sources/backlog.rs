//! Backlog (issue tracker) webhook payloads.
//!
//! Field names follow Backlog's outgoing webhook JSON verbatim, which mixes
//! camelCase with a few snake_case keys.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::CategoryKey;
use crate::error::RelayError;
use crate::format::{EmbedField, FormatContext, MessageFields, diff_excerpt, excerpt, non_empty};

/// The documented Backlog activity types (`type` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityType {
    IssueCreated,
    IssueUpdated,
    IssueCommented,
    IssueDeleted,
    WikiCreated,
    WikiUpdated,
    WikiDeleted,
    FileAdded,
    FileUpdated,
    FileDeleted,
    SvnCommitted,
    GitPushed,
    GitRepositoryCreated,
    IssueMultiUpdated,
    ProjectUserAdded,
    ProjectUserRemoved,
    CommentNotificationAdded,
    PullRequestAdded,
    PullRequestUpdated,
    PullRequestCommented,
    PullRequestDeleted,
    MilestoneCreated,
    MilestoneUpdated,
    MilestoneDeleted,
    ProjectGroupAdded,
    ProjectGroupDeleted,
}

impl ActivityType {
    pub fn from_code(code: i64) -> Option<Self> {
        use ActivityType::*;
        let kind = match code {
            1 => IssueCreated,
            2 => IssueUpdated,
            3 => IssueCommented,
            4 => IssueDeleted,
            5 => WikiCreated,
            6 => WikiUpdated,
            7 => WikiDeleted,
            8 => FileAdded,
            9 => FileUpdated,
            10 => FileDeleted,
            11 => SvnCommitted,
            12 => GitPushed,
            13 => GitRepositoryCreated,
            14 => IssueMultiUpdated,
            15 => ProjectUserAdded,
            16 => ProjectUserRemoved,
            17 => CommentNotificationAdded,
            18 => PullRequestAdded,
            19 => PullRequestUpdated,
            20 => PullRequestCommented,
            21 => PullRequestDeleted,
            22 => MilestoneCreated,
            23 => MilestoneUpdated,
            24 => MilestoneDeleted,
            25 => ProjectGroupAdded,
            26 => ProjectGroupDeleted,
            _ => return None,
        };
        Some(kind)
    }

    /// Short human description, used for the `{action}` placeholder.
    pub fn description(self) -> &'static str {
        use ActivityType::*;
        match self {
            IssueCreated => "issue created",
            IssueUpdated => "issue updated",
            IssueCommented => "issue commented",
            IssueDeleted => "issue deleted",
            WikiCreated => "wiki page created",
            WikiUpdated => "wiki page updated",
            WikiDeleted => "wiki page deleted",
            FileAdded => "file added",
            FileUpdated => "file updated",
            FileDeleted => "file deleted",
            SvnCommitted => "subversion commit",
            GitPushed => "git push",
            GitRepositoryCreated => "git repository created",
            IssueMultiUpdated => "issues updated",
            ProjectUserAdded => "project member added",
            ProjectUserRemoved => "project member removed",
            CommentNotificationAdded => "comment notification added",
            PullRequestAdded => "pull request created",
            PullRequestUpdated => "pull request updated",
            PullRequestCommented => "pull request commented",
            PullRequestDeleted => "pull request deleted",
            MilestoneCreated => "milestone created",
            MilestoneUpdated => "milestone updated",
            MilestoneDeleted => "milestone deleted",
            ProjectGroupAdded => "project group added",
            ProjectGroupDeleted => "project group removed",
        }
    }

    fn is_issue(self) -> bool {
        use ActivityType::*;
        matches!(self, IssueCreated | IssueUpdated | IssueCommented | IssueDeleted)
    }

    fn is_wiki(self) -> bool {
        use ActivityType::*;
        matches!(self, WikiCreated | WikiUpdated | WikiDeleted)
    }

    fn is_pull_request(self) -> bool {
        use ActivityType::*;
        matches!(self, PullRequestAdded | PullRequestUpdated | PullRequestCommented | PullRequestDeleted)
    }
}

/// Read the `type` discriminator.
pub fn classify(body: &Value) -> Result<CategoryKey, RelayError> {
    match body.get("type") {
        Some(kind) => kind
            .as_i64()
            .map(CategoryKey::IssueTracker)
            .ok_or_else(|| RelayError::MalformedPayload(format!("`type` is not an integer: {kind}"))),
        None => Err(RelayError::MalformedPayload("missing `type`".to_string())),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacklogEvent {
    #[serde(rename = "type")]
    pub kind: i64,
    #[serde(default)]
    pub project: Option<Project>,
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub created_user: Option<User>,
    #[serde(default)]
    pub created: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Project {
    pub project_key: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct User {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Named {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Comment {
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Change {
    pub field: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Content {
    pub id: Option<i64>,
    #[serde(rename = "key_id")]
    pub key_id: Option<i64>,
    /// Pull request number.
    pub number: Option<i64>,
    pub summary: Option<String>,
    pub description: Option<String>,
    /// Wiki page name.
    pub name: Option<String>,
    /// Wiki page body.
    pub content: Option<String>,
    /// Wiki page diff on update.
    pub diff: Option<String>,
    pub issue_type: Option<Named>,
    pub assignee: Option<User>,
    pub priority: Option<Named>,
    pub milestone: Option<Vec<Named>>,
    pub versions: Option<Vec<Named>>,
    pub due_date: Option<String>,
    pub comment: Option<Comment>,
    pub changes: Option<Vec<Change>>,
    pub repository: Option<Named>,
}

fn first_name(list: Option<&Vec<Named>>) -> Option<String> {
    list.and_then(|l| l.first())
        .and_then(|n| non_empty(n.name.as_deref()))
}

impl BacklogEvent {
    fn project_key(&self, ctx: &FormatContext) -> Option<String> {
        self.project
            .as_ref()
            .and_then(|p| non_empty(p.project_key.as_deref()))
            .or_else(|| non_empty(ctx.project_prefix.as_deref()))
    }

    pub fn message_fields(&self, key: &CategoryKey, ctx: &FormatContext) -> MessageFields {
        let empty = Content::default();
        let content = self.content.as_ref().unwrap_or(&empty);
        let activity = match key {
            CategoryKey::IssueTracker(code) => ActivityType::from_code(*code),
            _ => None,
        };
        let base_url = non_empty(ctx.backlog_base_url.as_deref())
            .map(|u| u.trim_end_matches('/').to_string());
        let project_key = self.project_key(ctx);

        let mut fields = MessageFields {
            actor: self.created_user.as_ref().and_then(|u| non_empty(u.name.as_deref())),
            action: activity.map(|a| a.description().to_string()),
            timestamp: self
                .created
                .as_deref()
                .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                .map(|t| t.with_timezone(&Utc)),
            ..Default::default()
        };

        if let Some(name) = self.project.as_ref().and_then(|p| non_empty(p.name.as_deref())) {
            fields.details.push(EmbedField::inline("Project", name));
        }

        let Some(activity) = activity else {
            return fields;
        };

        let comment = content.comment.as_ref().and_then(|c| non_empty(c.content.as_deref()));

        if activity.is_issue() {
            let number = content.key_id.or(content.id);
            let issue_key = match (&project_key, number) {
                (Some(prefix), Some(n)) => Some(format!("{prefix}-{n}")),
                (None, Some(n)) => Some(format!("#{n}")),
                (_, None) => None,
            };
            if let (Some(base), Some(prefix), Some(n)) = (&base_url, &project_key, number) {
                fields.url = Some(format!("{base}/view/{prefix}-{n}"));
            }
            fields.identifier = issue_key;
            fields.title = non_empty(content.summary.as_deref());
            fields.excerpt = match activity {
                ActivityType::IssueCreated => non_empty(content.description.as_deref()),
                ActivityType::IssueUpdated | ActivityType::IssueCommented => comment,
                _ => None,
            }
            .map(|t| excerpt(&t));

            if matches!(activity, ActivityType::IssueCreated | ActivityType::IssueUpdated) {
                fields.details.extend(issue_details(content));
            }
        } else if activity.is_wiki() {
            fields.identifier = non_empty(content.name.as_deref());
            fields.title = fields.identifier.clone();
            if let (Some(base), Some(id)) = (&base_url, content.id) {
                fields.url = Some(format!("{base}/alias/wiki/{id}"));
            }
            fields.excerpt = match activity {
                ActivityType::WikiCreated => non_empty(content.content.as_deref()).map(|t| excerpt(&t)),
                ActivityType::WikiUpdated => non_empty(content.diff.as_deref()).map(|d| diff_excerpt(&d)),
                _ => None,
            };
        } else if activity.is_pull_request() {
            fields.identifier = content.number.map(|n| format!("PR #{n}"));
            fields.title = non_empty(content.summary.as_deref());
            let repo = content.repository.as_ref().and_then(|r| non_empty(r.name.as_deref()));
            if let (Some(base), Some(prefix), Some(repo), Some(n)) =
                (&base_url, &project_key, &repo, content.number)
            {
                fields.url = Some(format!("{base}/git/{prefix}/{repo}/pullRequests/{n}"));
            }
            if let Some(repo) = repo {
                fields.details.push(EmbedField::inline("Repository", repo));
            }
            fields.excerpt = match activity {
                ActivityType::PullRequestAdded => non_empty(content.description.as_deref()),
                ActivityType::PullRequestUpdated | ActivityType::PullRequestCommented => comment,
                _ => None,
            }
            .map(|t| excerpt(&t));
        }

        if matches!(activity, ActivityType::IssueUpdated | ActivityType::PullRequestUpdated) {
            fields.details.extend(change_details(content));
        }

        fields
    }
}

fn issue_details(content: &Content) -> Vec<EmbedField> {
    let candidates = [
        ("Type", content.issue_type.as_ref().and_then(|n| non_empty(n.name.as_deref()))),
        ("Assignee", content.assignee.as_ref().and_then(|u| non_empty(u.name.as_deref()))),
        ("Priority", content.priority.as_ref().and_then(|n| non_empty(n.name.as_deref()))),
        ("Milestone", first_name(content.milestone.as_ref())),
        ("Version", first_name(content.versions.as_ref())),
        ("Due date", non_empty(content.due_date.as_deref()).map(|d| d.chars().take(10).collect())),
    ];

    candidates
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| EmbedField::inline(name, v)))
        .collect()
}

fn change_details(content: &Content) -> Vec<EmbedField> {
    content
        .changes
        .iter()
        .flatten()
        .filter_map(|change| {
            let field = non_empty(change.field.as_deref())?;
            let old = non_empty(change.old_value.as_deref()).unwrap_or_else(|| "-".to_string());
            let new = non_empty(change.new_value.as_deref()).unwrap_or_else(|| "-".to_string());
            Some(EmbedField {
                name: field,
                value: excerpt(&format!("{old} → {new}")),
                inline: false,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(body: Value) -> BacklogEvent {
        serde_json::from_value(body).unwrap()
    }

    fn issue_created() -> Value {
        json!({
            "id": 3153,
            "type": 1,
            "created": "2024-05-01T09:30:00Z",
            "project": { "id": 92, "projectKey": "SUB", "name": "Subtasks" },
            "content": {
                "id": 4809,
                "key_id": 12,
                "summary": "Login page is broken",
                "description": "Steps to reproduce...",
                "issueType": { "id": 1, "name": "Bug" },
                "priority": { "id": 2, "name": "High" },
                "assignee": { "id": 5, "name": "bob" },
                "milestone": [{ "id": 30, "name": "v1.2" }],
                "versions": [],
                "dueDate": "2024-05-10T00:00:00Z"
            },
            "notifications": [],
            "createdUser": { "id": 1, "userId": "alice", "name": "Alice" }
        })
    }

    fn ctx() -> FormatContext {
        FormatContext {
            backlog_base_url: Some("https://example.backlog.com/".into()),
            project_prefix: None,
        }
    }

    #[test]
    fn test_classify_reads_type() {
        assert_eq!(classify(&issue_created()).unwrap(), CategoryKey::IssueTracker(1));
        assert_eq!(classify(&json!({ "type": 99 })).unwrap(), CategoryKey::IssueTracker(99));
    }

    #[test]
    fn test_classify_missing_type() {
        let err = classify(&json!({ "content": {} })).unwrap_err();
        assert!(matches!(err, RelayError::MalformedPayload(_)));
    }

    #[test]
    fn test_classify_non_integer_type() {
        assert!(classify(&json!({ "type": "1" })).is_err());
        assert!(classify(&json!({ "type": 1.5 })).is_err());
        assert!(classify(&json!([1])).is_err());
    }

    #[test]
    fn test_activity_codes() {
        assert_eq!(ActivityType::from_code(1), Some(ActivityType::IssueCreated));
        assert_eq!(ActivityType::from_code(26), Some(ActivityType::ProjectGroupDeleted));
        assert_eq!(ActivityType::from_code(27), None);
    }

    #[test]
    fn test_issue_created_fields() {
        let event = parse(issue_created());
        let fields = event.message_fields(&CategoryKey::IssueTracker(1), &ctx());

        assert_eq!(fields.actor.as_deref(), Some("Alice"));
        assert_eq!(fields.identifier.as_deref(), Some("SUB-12"));
        assert_eq!(fields.title.as_deref(), Some("Login page is broken"));
        assert_eq!(fields.url.as_deref(), Some("https://example.backlog.com/view/SUB-12"));
        assert_eq!(fields.excerpt.as_deref(), Some("Steps to reproduce..."));
        assert_eq!(fields.action.as_deref(), Some("issue created"));
        assert!(fields.timestamp.is_some());

        let names: Vec<&str> = fields.details.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Project", "Type", "Assignee", "Priority", "Milestone", "Due date"]);
        let due = fields.details.iter().find(|f| f.name == "Due date").unwrap();
        assert_eq!(due.value, "2024-05-10");
    }

    #[test]
    fn test_issue_key_falls_back_to_prefix_and_id() {
        let event = parse(json!({
            "type": 1,
            "content": { "id": 77, "summary": "x" },
            "createdUser": { "name": "Alice" }
        }));
        let ctx = FormatContext {
            backlog_base_url: Some("https://example.backlog.com".into()),
            project_prefix: Some("PRJ".into()),
        };
        let fields = event.message_fields(&CategoryKey::IssueTracker(1), &ctx);
        assert_eq!(fields.identifier.as_deref(), Some("PRJ-77"));
        assert_eq!(fields.url.as_deref(), Some("https://example.backlog.com/view/PRJ-77"));
    }

    #[test]
    fn test_issue_without_prefix_or_base_url() {
        let event = parse(json!({
            "type": 4,
            "content": { "key_id": 5 },
            "createdUser": { "name": "Alice" }
        }));
        let fields = event.message_fields(&CategoryKey::IssueTracker(4), &FormatContext::default());
        assert_eq!(fields.identifier.as_deref(), Some("#5"));
        assert!(fields.url.is_none());
        assert!(fields.excerpt.is_none());
    }

    #[test]
    fn test_missing_created_user_leaves_actor_empty() {
        let mut body = issue_created();
        body.as_object_mut().unwrap().remove("createdUser");
        let fields = parse(body).message_fields(&CategoryKey::IssueTracker(1), &ctx());
        assert!(fields.actor.is_none());
    }

    #[test]
    fn test_issue_comment_uses_comment_text() {
        let event = parse(json!({
            "type": 3,
            "project": { "projectKey": "SUB" },
            "content": {
                "key_id": 12,
                "summary": "Login page is broken",
                "comment": { "id": 9, "content": "Reproduced on staging" }
            },
            "createdUser": { "name": "Carol" }
        }));
        let fields = event.message_fields(&CategoryKey::IssueTracker(3), &ctx());
        assert_eq!(fields.excerpt.as_deref(), Some("Reproduced on staging"));
        assert!(fields.details.iter().all(|f| f.name != "Type"));
    }

    #[test]
    fn test_issue_update_lists_changes() {
        let event = parse(json!({
            "type": 2,
            "project": { "projectKey": "SUB" },
            "content": {
                "key_id": 12,
                "summary": "Login page is broken",
                "changes": [
                    { "field": "status", "old_value": "1", "new_value": "2", "type": "standard" },
                    { "field": "assigner", "old_value": "", "new_value": "bob", "type": "standard" }
                ]
            },
            "createdUser": { "name": "Alice" }
        }));
        let fields = event.message_fields(&CategoryKey::IssueTracker(2), &ctx());
        let status = fields.details.iter().find(|f| f.name == "status").unwrap();
        assert_eq!(status.value, "1 → 2");
        assert!(!status.inline);
        let assigner = fields.details.iter().find(|f| f.name == "assigner").unwrap();
        assert_eq!(assigner.value, "- → bob");
    }

    #[test]
    fn test_wiki_update_fences_diff() {
        let event = parse(json!({
            "type": 6,
            "project": { "projectKey": "SUB" },
            "content": { "id": 40, "name": "Onboarding", "content": "# Hi", "diff": "-old\n+new" },
            "createdUser": { "name": "Dave" }
        }));
        let fields = event.message_fields(&CategoryKey::IssueTracker(6), &ctx());
        assert_eq!(fields.identifier.as_deref(), Some("Onboarding"));
        assert_eq!(fields.excerpt.as_deref(), Some("```diff\n-old\n+new\n```"));
        assert_eq!(fields.url.as_deref(), Some("https://example.backlog.com/alias/wiki/40"));
    }

    #[test]
    fn test_pull_request_fields() {
        let event = parse(json!({
            "type": 18,
            "project": { "projectKey": "SUB" },
            "content": {
                "id": 2,
                "number": 7,
                "summary": "Add retry button",
                "description": "Closes SUB-12",
                "repository": { "id": 3, "name": "web" }
            },
            "createdUser": { "name": "Erin" }
        }));
        let fields = event.message_fields(&CategoryKey::IssueTracker(18), &ctx());
        assert_eq!(fields.identifier.as_deref(), Some("PR #7"));
        assert_eq!(
            fields.url.as_deref(),
            Some("https://example.backlog.com/git/SUB/web/pullRequests/7")
        );
        assert_eq!(fields.excerpt.as_deref(), Some("Closes SUB-12"));
    }

    #[test]
    fn test_null_lists_are_accepted() {
        let event = parse(json!({
            "type": 1,
            "content": { "key_id": 1, "milestone": null, "versions": null, "assignee": null },
            "createdUser": { "name": "Alice" }
        }));
        let fields = event.message_fields(&CategoryKey::IssueTracker(1), &ctx());
        assert!(fields.details.is_empty());
    }
}
