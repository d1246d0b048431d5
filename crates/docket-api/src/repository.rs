//! Access-scoped repository: every read and write of users and todos goes
//! through here, with the ownership and role rules applied uniformly.

use anyhow::{Context, anyhow};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use tracing::info;
use uuid::Uuid;

use docket_db::models::{TodoOwnerRow, TodoRow, UserRow};
use docket_db::{Database, TodoFilter};
use docket_types::api::{CreateTodoRequest, DeleteResponse, TodoQuery, UpdateTodoRequest};
use docket_types::models::{Category, OwnerSummary, Role, Todo, TodoView, User};

use crate::error::AccessError;
use crate::permission::{Permission, Principal};
use crate::validate::{self, ListFilter, TodoPatch};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct Repository<'a> {
    db: &'a Database,
}

impl<'a> Repository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Admins see every todo with its owner attached; everyone else sees
    /// only their own. The query filter narrows either set.
    pub fn list_todos(&self, principal: &Principal, query: &TodoQuery) -> Result<Vec<TodoView>, AccessError> {
        let filter = validate::list_filter(query)?;

        if principal.can(Permission::ViewAllTodos) {
            return self.todos_with_owners(filter);
        }

        let rows = self.db.find_todos(&TodoFilter {
            owner_id: Some(principal.user_id.to_string()),
            ..store_filter(filter)
        })?;
        rows.into_iter()
            .map(|row| Ok(TodoView { todo: todo_from_row(row)?, owner: None }))
            .collect()
    }

    pub fn create_todo(&self, principal: &Principal, req: CreateTodoRequest) -> Result<Todo, AccessError> {
        let input = validate::new_todo(req)?;

        let owner_id = principal.user_id.to_string();
        if self.db.get_user_by_id(&owner_id)?.is_none() {
            return Err(AccessError::NotFound("user"));
        }

        let row = TodoRow {
            id: Uuid::new_v4().to_string(),
            title: input.title,
            description: input.description,
            category: input.category.as_str().to_string(),
            due_date: input.due_date.map(format_date),
            completed: false,
            owner_id,
            created_at: now(),
        };
        self.db.insert_todo(&row)?;

        info!("Todo {} created by {}", row.id, row.owner_id);
        todo_from_row(row)
    }

    /// Checks existence, then ownership, then validates the touched fields.
    pub fn update_todo(
        &self,
        principal: &Principal,
        id: Uuid,
        req: UpdateTodoRequest,
    ) -> Result<Todo, AccessError> {
        let mut row = self.owned_todo(principal, id)?;
        let patch = validate::todo_patch(req)?;
        apply_patch(&mut row, patch);

        if !self.db.update_todo(&row)? {
            return Err(AccessError::NotFound("todo"));
        }

        info!("Todo {} updated by {}", row.id, principal.user_id);
        todo_from_row(row)
    }

    pub fn delete_todo(&self, principal: &Principal, id: Uuid) -> Result<DeleteResponse, AccessError> {
        let row = self.owned_todo(principal, id)?;

        if !self.db.delete_todo(&row.id)? {
            return Err(AccessError::NotFound("todo"));
        }

        info!("Todo {} deleted by {}", row.id, principal.user_id);
        Ok(DeleteResponse {
            message: "Todo deleted".into(),
            id,
        })
    }

    pub fn list_users(&self, principal: &Principal) -> Result<Vec<User>, AccessError> {
        principal.require(Permission::ManageUsers)?;

        self.db
            .list_users()?
            .into_iter()
            .map(user_from_row)
            .collect()
    }

    pub fn list_all_todos_with_owners(&self, principal: &Principal) -> Result<Vec<TodoView>, AccessError> {
        principal.require(Permission::ViewAllTodos)?;
        self.todos_with_owners(ListFilter::default())
    }

    /// Admins may change any role, their own included.
    pub fn set_user_role(&self, principal: &Principal, target: Uuid, role: &str) -> Result<User, AccessError> {
        principal.require(Permission::ManageUsers)?;
        let role = validate::role(role)?;

        let target_id = target.to_string();
        if !self.db.update_user_role(&target_id, role.as_str())? {
            return Err(AccessError::NotFound("user"));
        }

        info!("User {} set to role {} by {}", target_id, role, principal.user_id);
        let row = self
            .db
            .get_user_by_id(&target_id)?
            .ok_or(AccessError::NotFound("user"))?;
        user_from_row(row)
    }

    fn owned_todo(&self, principal: &Principal, id: Uuid) -> Result<TodoRow, AccessError> {
        let row = self
            .db
            .get_todo(&id.to_string())?
            .ok_or(AccessError::NotFound("todo"))?;
        principal.require_owner_or(parse_id(&row.owner_id)?, Permission::ModifyAnyTodo)?;
        Ok(row)
    }

    fn todos_with_owners(&self, filter: ListFilter) -> Result<Vec<TodoView>, AccessError> {
        self.db
            .find_todos_with_owners(&store_filter(filter))?
            .into_iter()
            .map(view_from_owner_row)
            .collect()
    }
}

fn store_filter(filter: ListFilter) -> TodoFilter {
    TodoFilter {
        owner_id: None,
        completed: filter.completed,
        category: filter.category.map(|c| c.as_str().to_string()),
    }
}

fn apply_patch(row: &mut TodoRow, patch: TodoPatch) {
    if let Some(title) = patch.title {
        row.title = title;
    }
    if let Some(description) = patch.description {
        row.description = description;
    }
    if let Some(category) = patch.category {
        row.category = category.as_str().to_string();
    }
    if let Some(due_date) = patch.due_date {
        row.due_date = due_date.map(format_date);
    }
    if let Some(completed) = patch.completed {
        row.completed = completed;
    }
}

/// Public user record. The password hash is dropped here.
pub fn user_from_row(row: UserRow) -> Result<User, AccessError> {
    Ok(User {
        id: parse_id(&row.id)?,
        role: row
            .role
            .parse::<Role>()
            .map_err(|e| anyhow!("Corrupt role on user '{}': {}", row.id, e))?,
        created_at: parse_timestamp(&row.created_at)?,
        username: row.username,
        email: row.email,
    })
}

fn todo_from_row(row: TodoRow) -> Result<Todo, AccessError> {
    Ok(Todo {
        id: parse_id(&row.id)?,
        category: row
            .category
            .parse::<Category>()
            .map_err(|e| anyhow!("Corrupt category on todo '{}': {}", row.id, e))?,
        due_date: row
            .due_date
            .as_deref()
            .map(|d| NaiveDate::parse_from_str(d, DATE_FORMAT))
            .transpose()
            .with_context(|| format!("Corrupt due_date on todo '{}'", row.id))?,
        owner_id: parse_id(&row.owner_id)?,
        created_at: parse_timestamp(&row.created_at)?,
        title: row.title,
        description: row.description,
        completed: row.completed,
    })
}

fn view_from_owner_row(row: TodoOwnerRow) -> Result<TodoView, AccessError> {
    let owner = match (row.owner_username, row.owner_email) {
        (Some(username), Some(email)) => Some(OwnerSummary {
            id: parse_id(&row.todo.owner_id)?,
            username,
            email,
        }),
        _ => None,
    };
    Ok(TodoView {
        todo: todo_from_row(row.todo)?,
        owner,
    })
}

pub(crate) fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_id(id: &str) -> Result<Uuid, AccessError> {
    let parsed = id.parse::<Uuid>().with_context(|| format!("Corrupt id '{}'", id))?;
    Ok(parsed)
}

fn parse_timestamp(ts: &str) -> Result<DateTime<Utc>, AccessError> {
    let parsed = DateTime::parse_from_rfc3339(ts)
        .with_context(|| format!("Corrupt timestamp '{}'", ts))?;
    Ok(parsed.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        db: Database,
        alice: Principal,
        bob: Principal,
        admin: Principal,
    }

    fn add_user(db: &Database, username: &str, role: Role) -> Principal {
        let id = Uuid::new_v4();
        db.insert_user(&UserRow {
            id: id.to_string(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: "$argon2id$placeholder".to_string(),
            role: role.as_str().to_string(),
            created_at: now(),
        })
        .unwrap();
        Principal::new(id, role)
    }

    fn fixture() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let alice = add_user(&db, "alice", Role::User);
        let bob = add_user(&db, "bob", Role::User);
        let admin = add_user(&db, "root", Role::Admin);
        Fixture { db, alice, bob, admin }
    }

    fn create(title: &str, category: &str) -> CreateTodoRequest {
        CreateTodoRequest {
            title: title.to_string(),
            description: None,
            category: category.to_string(),
            due_date: None,
        }
    }

    fn complete() -> UpdateTodoRequest {
        UpdateTodoRequest {
            completed: Some(true),
            ..Default::default()
        }
    }

    #[test]
    fn users_see_exactly_their_own_todos() {
        let f = fixture();
        let repo = Repository::new(&f.db);
        let a1 = repo.create_todo(&f.alice, create("a1", "Urgent")).unwrap();
        let a2 = repo.create_todo(&f.alice, create("a2", "Non-Urgent")).unwrap();
        let b1 = repo.create_todo(&f.bob, create("b1", "Urgent")).unwrap();

        let visible: Vec<Uuid> = repo
            .list_todos(&f.alice, &TodoQuery::default())
            .unwrap()
            .into_iter()
            .map(|v| v.todo.id)
            .collect();
        assert_eq!(visible.len(), 2);
        assert!(visible.contains(&a1.id));
        assert!(visible.contains(&a2.id));
        assert!(!visible.contains(&b1.id));

        let views = repo.list_todos(&f.bob, &TodoQuery::default()).unwrap();
        assert!(views.iter().all(|v| v.todo.owner_id == f.bob.user_id && v.owner.is_none()));
    }

    #[test]
    fn admin_sees_every_todo_with_owner() {
        let f = fixture();
        let repo = Repository::new(&f.db);
        repo.create_todo(&f.alice, create("a1", "Urgent")).unwrap();
        repo.create_todo(&f.bob, create("b1", "Urgent")).unwrap();

        let views = repo.list_todos(&f.admin, &TodoQuery::default()).unwrap();
        assert_eq!(views.len(), 2);
        let owners: Vec<_> = views
            .iter()
            .map(|v| v.owner.as_ref().unwrap().username.as_str())
            .collect();
        assert!(owners.contains(&"alice"));
        assert!(owners.contains(&"bob"));

        let all = repo.list_all_todos_with_owners(&f.admin).unwrap();
        assert_eq!(all, views);
    }

    #[test]
    fn empty_store_lists_nothing() {
        let f = fixture();
        let repo = Repository::new(&f.db);
        assert!(repo.list_todos(&f.alice, &TodoQuery::default()).unwrap().is_empty());
        assert!(repo.list_todos(&f.admin, &TodoQuery::default()).unwrap().is_empty());
    }

    #[test]
    fn filter_never_widens_visibility() {
        let f = fixture();
        let repo = Repository::new(&f.db);
        let a1 = repo.create_todo(&f.alice, create("a1", "Urgent")).unwrap();
        repo.create_todo(&f.alice, create("a2", "Non-Urgent")).unwrap();
        repo.create_todo(&f.bob, create("b1", "Urgent")).unwrap();
        repo.update_todo(&f.alice, a1.id, complete()).unwrap();

        let query = TodoQuery {
            status: Some("completed".into()),
            category: Some("Urgent".into()),
        };
        let views = repo.list_todos(&f.alice, &query).unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].todo.id, a1.id);

        let pending = TodoQuery {
            status: Some("pending".into()),
            category: None,
        };
        assert_eq!(repo.list_todos(&f.admin, &pending).unwrap().len(), 2);
    }

    #[test]
    fn create_rejects_bad_title_and_category() {
        let f = fixture();
        let repo = Repository::new(&f.db);
        match repo.create_todo(&f.alice, create("", "Urgent")) {
            Err(AccessError::Validation(errors)) => assert_eq!(errors[0].field, "title"),
            other => panic!("unexpected {other:?}"),
        }
        match repo.create_todo(&f.alice, create("ok", "Other")) {
            Err(AccessError::Validation(errors)) => assert_eq!(errors[0].field, "category"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(repo.list_todos(&f.alice, &TodoQuery::default()).unwrap().is_empty());
    }

    #[test]
    fn create_requires_existing_owner() {
        let f = fixture();
        let repo = Repository::new(&f.db);
        let ghost = Principal::new(Uuid::new_v4(), Role::User);
        assert!(matches!(
            repo.create_todo(&ghost, create("x", "Urgent")),
            Err(AccessError::NotFound("user"))
        ));
    }

    #[test]
    fn buy_milk_scenario() {
        let f = fixture();
        let repo = Repository::new(&f.db);

        let todo = repo.create_todo(&f.alice, create("Buy milk", "Non-Urgent")).unwrap();
        assert!(!todo.completed);
        assert_eq!(todo.owner_id, f.alice.user_id);
        assert_eq!(todo.category, Category::NonUrgent);

        assert!(matches!(
            repo.update_todo(&f.bob, todo.id, complete()),
            Err(AccessError::AccessDenied)
        ));

        let updated = repo.update_todo(&f.admin, todo.id, complete()).unwrap();
        assert!(updated.completed);
        assert_eq!(updated.owner_id, f.alice.user_id);
        assert_eq!(updated.title, "Buy milk");
    }

    #[test]
    fn foreign_update_is_denied_even_with_invalid_input() {
        let f = fixture();
        let repo = Repository::new(&f.db);
        let todo = repo.create_todo(&f.alice, create("mine", "Urgent")).unwrap();
        let bad = UpdateTodoRequest {
            title: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(
            repo.update_todo(&f.bob, todo.id, bad),
            Err(AccessError::AccessDenied)
        ));
        assert!(matches!(
            repo.delete_todo(&f.bob, todo.id),
            Err(AccessError::AccessDenied)
        ));
    }

    #[test]
    fn partial_update_revalidates_touched_fields() {
        let f = fixture();
        let repo = Repository::new(&f.db);
        let todo = repo.create_todo(&f.alice, create("mine", "Urgent")).unwrap();

        let bad = UpdateTodoRequest {
            category: Some("Whenever".into()),
            ..Default::default()
        };
        assert!(matches!(
            repo.update_todo(&f.alice, todo.id, bad),
            Err(AccessError::Validation(_))
        ));

        let edit = UpdateTodoRequest {
            description: Some(Some("two litres".into())),
            due_date: Some(Some("2026-12-24".into())),
            ..Default::default()
        };
        let updated = repo.update_todo(&f.alice, todo.id, edit).unwrap();
        assert_eq!(updated.category, Category::Urgent);
        assert_eq!(updated.description.as_deref(), Some("two litres"));
        assert_eq!(updated.due_date, NaiveDate::from_ymd_opt(2026, 12, 24));

        let clear = UpdateTodoRequest {
            due_date: Some(None),
            ..Default::default()
        };
        assert_eq!(repo.update_todo(&f.alice, todo.id, clear).unwrap().due_date, None);
    }

    #[test]
    fn deleted_todo_is_gone_for_everyone() {
        let f = fixture();
        let repo = Repository::new(&f.db);
        let todo = repo.create_todo(&f.alice, create("temp", "Urgent")).unwrap();

        let confirmation = repo.delete_todo(&f.alice, todo.id).unwrap();
        assert_eq!(confirmation.id, todo.id);

        for principal in [&f.alice, &f.admin] {
            assert!(matches!(
                repo.update_todo(principal, todo.id, complete()),
                Err(AccessError::NotFound("todo"))
            ));
            assert!(matches!(
                repo.delete_todo(principal, todo.id),
                Err(AccessError::NotFound("todo"))
            ));
        }
    }

    #[test]
    fn admin_may_delete_any_todo() {
        let f = fixture();
        let repo = Repository::new(&f.db);
        let todo = repo.create_todo(&f.bob, create("bob's", "Urgent")).unwrap();
        assert!(repo.delete_todo(&f.admin, todo.id).is_ok());
    }

    #[test]
    fn user_admin_listings_are_admin_only() {
        let f = fixture();
        let repo = Repository::new(&f.db);
        assert!(matches!(repo.list_users(&f.alice), Err(AccessError::AccessDenied)));
        assert!(matches!(
            repo.list_all_todos_with_owners(&f.alice),
            Err(AccessError::AccessDenied)
        ));
        assert!(matches!(
            repo.set_user_role(&f.alice, f.bob.user_id, "admin"),
            Err(AccessError::AccessDenied)
        ));

        let users = repo.list_users(&f.admin).unwrap();
        assert_eq!(users.len(), 3);
        let serialized = serde_json::to_string(&users).unwrap();
        assert!(!serialized.contains("argon2"));
        assert!(!serialized.contains("password"));
    }

    #[test]
    fn set_role_validates_then_looks_up() {
        let f = fixture();
        let repo = Repository::new(&f.db);

        assert!(matches!(
            repo.set_user_role(&f.admin, f.bob.user_id, "superadmin"),
            Err(AccessError::Validation(_))
        ));
        assert!(matches!(
            repo.set_user_role(&f.admin, Uuid::new_v4(), "admin"),
            Err(AccessError::NotFound("user"))
        ));

        let promoted = repo.set_user_role(&f.admin, f.bob.user_id, "admin").unwrap();
        assert_eq!(promoted.role, Role::Admin);
        assert_eq!(promoted.id, f.bob.user_id);
    }

    #[test]
    fn admin_may_demote_themselves() {
        let f = fixture();
        let repo = Repository::new(&f.db);
        let demoted = repo.set_user_role(&f.admin, f.admin.user_id, "user").unwrap();
        assert_eq!(demoted.role, Role::User);
    }
}
