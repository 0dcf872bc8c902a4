//! Static category → rule table.
//!
//! Lookups that miss are treated exactly like disabled rules: the event is
//! accepted and not forwarded.

use crate::sources::CategoryKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRule {
    pub enabled: bool,
    pub priority: Priority,
    /// Message text with `{placeholder}` slots. Empty only for disabled rules.
    pub template: &'static str,
}

const fn on(priority: Priority, template: &'static str) -> CategoryRule {
    CategoryRule { enabled: true, priority, template }
}

const OFF: CategoryRule = CategoryRule { enabled: false, priority: Priority::Low, template: "" };

/// Backlog `type` codes.
static ISSUE_TRACKER_RULES: &[(i64, CategoryRule)] = &[
    (1, on(Priority::High, "{actor} created issue {identifier} {title}")),
    (2, on(Priority::Medium, "{actor} updated issue {identifier} {title}")),
    (3, on(Priority::Medium, "{actor} commented on issue {identifier} {title}")),
    (4, on(Priority::High, "{actor} deleted issue {identifier} {title}")),
    (5, on(Priority::Medium, "{actor} created wiki page {identifier}")),
    (6, on(Priority::Low, "{actor} updated wiki page {identifier}")),
    (7, on(Priority::Medium, "{actor} deleted wiki page {identifier}")),
    (8, OFF),  // file added
    (9, OFF),  // file updated
    (10, OFF), // file deleted
    (11, OFF), // svn commit
    (12, OFF), // git push
    (13, OFF), // git repository created
    (14, OFF), // issues bulk updated
    (15, OFF), // project member added
    (16, OFF), // project member removed
    (17, OFF), // comment notification
    (18, on(Priority::High, "{actor} opened pull request {identifier} {title}")),
    (19, on(Priority::Medium, "{actor} updated pull request {identifier} {title}")),
    (20, on(Priority::Medium, "{actor} commented on pull request {identifier} {title}")),
    (21, OFF), // pull request deleted
    (22, OFF), // milestone created
    (23, OFF), // milestone updated
    (24, OFF), // milestone deleted
    (25, OFF), // project group added
    (26, OFF), // project group removed
];

/// Kibela `(resource_type, action)` pairs.
static WIKI_TOOL_RULES: &[(&str, &str, CategoryRule)] = &[
    ("blog", "create", on(Priority::High, "{actor} published the blog post \"{identifier}\"")),
    ("blog", "update", on(Priority::Medium, "{actor} updated the blog post \"{identifier}\"")),
    ("blog", "delete", on(Priority::Medium, "{actor} deleted the blog post \"{identifier}\"")),
    ("wiki", "create", on(Priority::High, "{actor} created the wiki page \"{identifier}\"")),
    ("wiki", "update", on(Priority::Medium, "{actor} updated the wiki page \"{identifier}\"")),
    ("wiki", "delete", on(Priority::Medium, "{actor} deleted the wiki page \"{identifier}\"")),
    ("comment", "create", on(Priority::Medium, "{actor} commented on \"{identifier}\"")),
    ("comment", "update", on(Priority::Low, "{actor} edited a comment on \"{identifier}\"")),
    ("comment", "delete", on(Priority::Low, "{actor} deleted a comment on \"{identifier}\"")),
    ("comment_reply", "create", on(Priority::Medium, "{actor} replied to a comment on \"{identifier}\"")),
    ("comment_reply", "update", on(Priority::Low, "{actor} edited a reply on \"{identifier}\"")),
    ("comment_reply", "delete", on(Priority::Low, "{actor} deleted a reply on \"{identifier}\"")),
];

static CONNECTIVITY_TEST_RULE: CategoryRule =
    on(Priority::Low, "Kibela outgoing webhook test received. The relay is reachable.");

pub fn lookup(key: &CategoryKey) -> Option<&'static CategoryRule> {
    match key {
        CategoryKey::IssueTracker(code) => ISSUE_TRACKER_RULES
            .iter()
            .find(|(c, _)| c == code)
            .map(|(_, rule)| rule),
        CategoryKey::WikiTool { resource, action } => WIKI_TOOL_RULES
            .iter()
            .find(|(r, a, _)| *r == resource.as_str() && *a == action.as_str())
            .map(|(_, _, rule)| rule),
        CategoryKey::ConnectivityTest => Some(&CONNECTIVITY_TEST_RULE),
    }
}

/// Every key present in the table, with its rule.
pub fn all() -> impl Iterator<Item = (CategoryKey, &'static CategoryRule)> {
    let issue_tracker = ISSUE_TRACKER_RULES
        .iter()
        .map(|(code, rule)| (CategoryKey::IssueTracker(*code), rule));
    let wiki_tool = WIKI_TOOL_RULES.iter().map(|(resource, action, rule)| {
        (
            CategoryKey::WikiTool { resource: resource.to_string(), action: action.to_string() },
            rule,
        )
    });
    issue_tracker
        .chain(wiki_tool)
        .chain(std::iter::once((CategoryKey::ConnectivityTest, &CONNECTIVITY_TEST_RULE)))
}
