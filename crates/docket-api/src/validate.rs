//! Input validation. Every function collects all failing fields before
//! returning, so callers get one itemized `AccessError::Validation`.

use chrono::{DateTime, NaiveDate};

use docket_types::api::{
    CreateTodoRequest, FieldError, RegisterRequest, TodoQuery, UpdateTodoRequest,
};
use docket_types::models::{Category, Role};

use crate::error::AccessError;

pub const TITLE_MAX: usize = 100;
pub const DESCRIPTION_MAX: usize = 500;
pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 32;
pub const PASSWORD_MIN: usize = 8;

/// A validated creation request.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTodo {
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    pub due_date: Option<NaiveDate>,
}

/// A validated partial update. Only fields that are `Some` get applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub category: Option<Category>,
    pub due_date: Option<Option<NaiveDate>>,
    pub completed: Option<bool>,
}

/// Status/category narrowing for todo listings.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ListFilter {
    pub completed: Option<bool>,
    pub category: Option<Category>,
}

pub fn new_todo(req: CreateTodoRequest) -> Result<NewTodo, AccessError> {
    let mut errors = Vec::new();

    check_title(&req.title, &mut errors);
    let description = req.description.and_then(|d| description(d, &mut errors));
    let category = category(&req.category, &mut errors);
    let due_date = req.due_date.and_then(|d| due_date(&d, &mut errors));

    match category {
        Some(category) if errors.is_empty() => Ok(NewTodo {
            title: req.title,
            description,
            category,
            due_date,
        }),
        _ => Err(AccessError::Validation(errors)),
    }
}

pub fn todo_patch(req: UpdateTodoRequest) -> Result<TodoPatch, AccessError> {
    let mut errors = Vec::new();

    if let Some(title) = &req.title {
        check_title(title, &mut errors);
    }
    let patch = TodoPatch {
        description: req
            .description
            .map(|d| d.and_then(|d| description(d, &mut errors))),
        category: req.category.as_deref().and_then(|c| category(c, &mut errors)),
        due_date: req
            .due_date
            .map(|d| d.and_then(|d| due_date(&d, &mut errors))),
        completed: req.completed,
        title: req.title,
    };

    if errors.is_empty() {
        Ok(patch)
    } else {
        Err(AccessError::Validation(errors))
    }
}

pub fn role(value: &str) -> Result<Role, AccessError> {
    value
        .parse()
        .map_err(|_| AccessError::invalid("role", "Role must be one of: user, admin"))
}

pub fn list_filter(query: &TodoQuery) -> Result<ListFilter, AccessError> {
    let mut errors = Vec::new();

    let completed = match query.status.as_deref() {
        None | Some("all") => None,
        Some("pending") => Some(false),
        Some("completed") => Some(true),
        Some(_) => {
            errors.push(FieldError::new(
                "status",
                "Status must be one of: all, pending, completed",
            ));
            None
        }
    };
    let category = query.category.as_deref().and_then(|c| category(c, &mut errors));

    if errors.is_empty() {
        Ok(ListFilter { completed, category })
    } else {
        Err(AccessError::Validation(errors))
    }
}

pub fn registration(req: &RegisterRequest) -> Result<(), AccessError> {
    let mut errors = Vec::new();

    let username_len = req.username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&username_len) {
        errors.push(FieldError::new(
            "username",
            format!("Username must be between {USERNAME_MIN} and {USERNAME_MAX} characters"),
        ));
    }
    // Login treats any identifier with '@' as an email.
    if req.username.contains('@') {
        errors.push(FieldError::new("username", "Username must not contain '@'"));
    }
    let well_formed = req
        .email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty() && !domain.contains('@'));
    if !well_formed {
        errors.push(FieldError::new("email", "Email must be a valid address"));
    }
    if req.password.chars().count() < PASSWORD_MIN {
        errors.push(FieldError::new(
            "password",
            format!("Password must be at least {PASSWORD_MIN} characters"),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AccessError::Validation(errors))
    }
}

fn check_title(title: &str, errors: &mut Vec<FieldError>) {
    let len = title.chars().count();
    if !(1..=TITLE_MAX).contains(&len) {
        errors.push(FieldError::new(
            "title",
            format!("Title must be between 1 and {TITLE_MAX} characters"),
        ));
    }
}

/// Empty descriptions are stored as absent.
fn description(value: String, errors: &mut Vec<FieldError>) -> Option<String> {
    if value.chars().count() > DESCRIPTION_MAX {
        errors.push(FieldError::new(
            "description",
            format!("Description must be at most {DESCRIPTION_MAX} characters"),
        ));
        return None;
    }
    (!value.is_empty()).then_some(value)
}

fn category(value: &str, errors: &mut Vec<FieldError>) -> Option<Category> {
    match value.parse() {
        Ok(category) => Some(category),
        Err(_) => {
            errors.push(FieldError::new(
                "category",
                "Category must be one of: Urgent, Non-Urgent",
            ));
            None
        }
    }
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp. Empty means unset.
fn due_date(value: &str, errors: &mut Vec<FieldError>) -> Option<NaiveDate> {
    if value.is_empty() {
        return None;
    }
    let parsed = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()));
    if parsed.is_none() {
        errors.push(FieldError::new("dueDate", "Due date must be a valid date"));
    }
    parsed
}
