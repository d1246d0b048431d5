use crate::models::{TodoOwnerRow, TodoRow, UserRow};
use crate::Database;
use anyhow::Result;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params_from_iter};

const USER_COLUMNS: &str = "id, username, email, password, role, created_at";
const TODO_COLUMNS: &str =
    "t.id, t.title, t.description, t.category, t.due_date, t.completed, t.owner_id, t.created_at";

/// Store-level filter for `find_todos`. Every set field narrows the result.
#[derive(Debug, Default, Clone)]
pub struct TodoFilter {
    pub owner_id: Option<String>,
    pub completed: Option<bool>,
    pub category: Option<String>,
}

impl Database {
    // -- Users --

    pub fn insert_user(&self, user: &UserRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password, role, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                (
                    &user.id,
                    &user.username,
                    &user.email,
                    &user.password,
                    &user.role,
                    &user.created_at,
                ),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username = ?1", username))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email = ?1", email))
    }

    /// Login lookup: an identifier containing '@' is an email, anything else
    /// a username.
    pub fn get_user_by_identifier(&self, identifier: &str) -> Result<Option<UserRow>> {
        if identifier.contains('@') {
            self.get_user_by_email(identifier)
        } else {
            self.get_user_by_username(identifier)
        }
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users ORDER BY created_at, rowid"
            ))?;
            let rows = stmt
                .query_map([], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns false when no user has this id.
    pub fn update_user_role(&self, id: &str, role: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("UPDATE users SET role = ?1 WHERE id = ?2", (role, id))?;
            Ok(changed > 0)
        })
    }

    /// Role change keyed by username or email, used for the startup admin bootstrap.
    pub fn update_user_role_by_identifier(&self, identifier: &str, role: &str) -> Result<bool> {
        match self.get_user_by_identifier(identifier)? {
            Some(user) => self.update_user_role(&user.id, role),
            None => Ok(false),
        }
    }

    // -- Todos --

    pub fn insert_todo(&self, todo: &TodoRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO todos (id, title, description, category, due_date, completed, owner_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    todo.id,
                    todo.title,
                    todo.description,
                    todo.category,
                    todo.due_date,
                    todo.completed,
                    todo.owner_id,
                    todo.created_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_todo(&self, id: &str) -> Result<Option<TodoRow>> {
        self.with_conn(|conn| {
            let todo = conn
                .query_row(
                    &format!("SELECT {TODO_COLUMNS} FROM todos t WHERE t.id = ?1"),
                    [id],
                    todo_from_row,
                )
                .optional()?;
            Ok(todo)
        })
    }

    /// Newest first.
    pub fn find_todos(&self, filter: &TodoFilter) -> Result<Vec<TodoRow>> {
        self.with_conn(|conn| {
            let (clause, params) = where_clause(filter);
            let mut stmt = conn.prepare(&format!(
                "SELECT {TODO_COLUMNS} FROM todos t{clause}
                 ORDER BY t.created_at DESC, t.rowid DESC"
            ))?;
            let rows = stmt
                .query_map(params_from_iter(params), todo_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Like `find_todos`, with the owner's username and email joined in a
    /// single query.
    pub fn find_todos_with_owners(&self, filter: &TodoFilter) -> Result<Vec<TodoOwnerRow>> {
        self.with_conn(|conn| {
            let (clause, params) = where_clause(filter);
            let mut stmt = conn.prepare(&format!(
                "SELECT {TODO_COLUMNS}, u.username, u.email
                 FROM todos t
                 LEFT JOIN users u ON t.owner_id = u.id{clause}
                 ORDER BY t.created_at DESC, t.rowid DESC"
            ))?;
            let rows = stmt
                .query_map(params_from_iter(params), |row| {
                    Ok(TodoOwnerRow {
                        todo: todo_from_row(row)?,
                        owner_username: row.get(8)?,
                        owner_email: row.get(9)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Writes every mutable column. `owner_id` and `created_at` are never
    /// touched. Returns false when the row no longer exists.
    pub fn update_todo(&self, todo: &TodoRow) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE todos
                 SET title = ?1, description = ?2, category = ?3, due_date = ?4, completed = ?5
                 WHERE id = ?6",
                rusqlite::params![
                    todo.title,
                    todo.description,
                    todo.category,
                    todo.due_date,
                    todo.completed,
                    todo.id,
                ],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_todo(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM todos WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }
}

/// Names the users column behind a UNIQUE constraint failure, if that is
/// what `err` is.
pub fn unique_violation(err: &anyhow::Error) -> Option<&'static str> {
    match err.downcast_ref::<rusqlite::Error>() {
        Some(rusqlite::Error::SqliteFailure(e, Some(msg)))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            if msg.contains("users.email") {
                Some("email")
            } else if msg.contains("users.username") {
                Some("username")
            } else {
                None
            }
        }
        _ => None,
    }
}

fn query_user(conn: &Connection, predicate: &str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE {predicate}"
    ))?;
    let row = stmt.query_row([value], user_from_row).optional()?;
    Ok(row)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        role: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn todo_from_row(row: &Row<'_>) -> rusqlite::Result<TodoRow> {
    Ok(TodoRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        due_date: row.get(4)?,
        completed: row.get(5)?,
        owner_id: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn where_clause(filter: &TodoFilter) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut params = Vec::new();

    if let Some(owner_id) = &filter.owner_id {
        params.push(Value::Text(owner_id.clone()));
        clauses.push(format!("t.owner_id = ?{}", params.len()));
    }
    if let Some(completed) = filter.completed {
        params.push(Value::Integer(i64::from(completed)));
        clauses.push(format!("t.completed = ?{}", params.len()));
    }
    if let Some(category) = &filter.category {
        params.push(Value::Text(category.clone()));
        clauses.push(format!("t.category = ?{}", params.len()));
    }

    if clauses.is_empty() {
        (String::new(), params)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), params)
    }
}
