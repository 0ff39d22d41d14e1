use crate::auth::{self, AuthOutcome, Role};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{get_required_str, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let role_raw = match get_required_str(&req.params, "role") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let Some(role) = Role::parse(&role_raw) else {
        return err(
            &req.id,
            "bad_params",
            "role must be student, teacher or administrator",
            None,
        );
    };
    let account_id = match get_required_str(&req.params, "accountId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let secret = match get_required_str(&req.params, "secret") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    match auth::authenticate(conn, role, &account_id, &secret) {
        Ok(AuthOutcome::Authenticated {
            principal,
            legacy_secret,
        }) => {
            let result = json!({
                "role": principal.role.as_str(),
                "accountId": principal.account_id,
                "displayName": principal.display_name,
                "legacySecret": legacy_secret,
            });
            state.session.start(principal);
            ok(&req.id, result)
        }
        Ok(AuthOutcome::NotFound) => err(&req.id, "not_found", "account not found", None),
        Ok(AuthOutcome::InvalidSecret) => err(&req.id, "invalid_secret", "incorrect secret", None),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.session.end();
    ok(&req.id, json!({ "ok": true }))
}

fn handle_session(state: &mut AppState, req: &Request) -> serde_json::Value {
    let principal = state.session.current().map(|p| {
        json!({
            "role": p.role.as_str(),
            "accountId": p.account_id,
            "displayName": p.display_name,
        })
    });
    ok(&req.id, json!({ "principal": principal }))
}

/// Permitted only while the administrators table is empty; every later
/// principal is registered by a logged-in administrator.
fn bootstrap_admin(
    conn: &rusqlite::Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let username = get_required_str(params, "username")?;
    let name = get_required_str(params, "name")?;
    let email = get_required_str(params, "email")?;
    let secret = get_required_str(params, "secret")?;
    if username.is_empty() || name.is_empty() || email.is_empty() || secret.is_empty() {
        return Err(HandlerErr::new(
            "validation_failed",
            "username, name, email and secret must not be empty",
        ));
    }

    let existing: i64 = conn
        .query_row("SELECT COUNT(*) FROM administrators", [], |r| r.get(0))
        .map_err(HandlerErr::db)?;
    if existing > 0 {
        return Err(HandlerErr::new(
            "forbidden",
            "an administrator is already provisioned",
        ));
    }

    conn.execute(
        "INSERT INTO administrators(username, name, email, password) VALUES(?, ?, ?, ?)",
        (&username, &name, &email, auth::hash_secret(&secret)),
    )
    .map_err(|e| HandlerErr::new("db_insert_failed", e.to_string()))?;

    Ok(json!({ "username": username }))
}

fn handle_bootstrap_admin(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match bootstrap_admin(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.login" => Some(handle_login(state, req)),
        "auth.logout" => Some(handle_logout(state, req)),
        "auth.session" => Some(handle_session(state, req)),
        "setup.bootstrapAdmin" => Some(handle_bootstrap_admin(state, req)),
        _ => None,
    }
}
