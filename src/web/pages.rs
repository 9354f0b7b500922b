//! Server-rendered HTML. Every interpolated value goes through `html_escape`.

use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use std::fmt::Write;
use std::time::Duration;

use crate::auth::Principal;
use crate::db::{Subscription, User};
use crate::services::ServerStatsFormatted;

fn nav(principal: Option<&Principal>) -> String {
    match principal {
        Some(p) => {
            let admin = if p.is_superuser {
                r#" | <a href="/users">Users</a> | <a href="/subscribers">Subscribers</a>"#
            } else {
                ""
            };
            format!(
                r#"<nav><a href="/dashboard">Dashboard</a> | <a href="/profile">Profile</a> | <a href="/server-stats">Server stats</a>{admin} | <a href="/logout">Log out ({})</a></nav>"#,
                text(&p.username)
            )
        }
        None => r#"<nav><a href="/">Home</a> | <a href="/login">Log in</a> | <a href="/register">Register</a></nav>"#
            .to_string(),
    }
}

pub fn layout(title: &str, principal: Option<&Principal>, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"en\"><head><meta charset=\"utf-8\"><title>{title} | FastStack</title></head>\n<body>{nav}<main><h1>{title}</h1>{body}</main></body></html>\n",
        title = text(title),
        nav = nav(principal),
    ))
}

fn flash(error: Option<&str>) -> String {
    error.map_or_else(String::new, |e| {
        format!(r#"<p class="error" role="alert">{}</p>"#, text(e))
    })
}

pub fn home(principal: Option<&Principal>) -> Html<String> {
    let body = match principal {
        Some(p) => format!(
            r#"<p>Welcome back, {}.</p><p><a href="/dashboard">Go to your dashboard</a></p>"#,
            text(&p.username)
        ),
        None => r#"<p>A small starter with accounts, roles and a newsletter list.</p><p><a href="/login">Log in</a> or <a href="/register">create an account</a>.</p>"#
            .to_string(),
    };
    layout("Home", principal, &body)
}

pub fn login(error: Option<&str>, username: &str) -> Html<String> {
    let body = format!(
        r#"{flash}<form method="post" action="/login">
<label>Username <input name="username" value="{username}" required></label>
<label>Password <input type="password" name="password" required></label>
<button type="submit">Log in</button></form>
<p>No account? <a href="/register">Register</a></p>"#,
        flash = flash(error),
        username = attr(username),
    );
    layout("Log in", None, &body)
}

pub fn register(error: Option<&str>, username: &str, email: &str, full_name: &str) -> Html<String> {
    let body = format!(
        r#"{flash}<form method="post" action="/register">
<label>Username <input name="username" value="{username}" required></label>
<label>Email <input type="email" name="email" value="{email}" required></label>
<label>Full name <input name="full_name" value="{full_name}"></label>
<label>Password <input type="password" name="password" required></label>
<label>Confirm password <input type="password" name="confirm_password" required></label>
<button type="submit">Create account</button></form>"#,
        flash = flash(error),
        username = attr(username),
        email = attr(email),
        full_name = attr(full_name),
    );
    layout("Register", None, &body)
}

pub fn dashboard(principal: &Principal, user: &User) -> Html<String> {
    let role = if user.is_superuser {
        "Administrator"
    } else {
        "Member"
    };
    let body = format!(
        "<p>Signed in as <strong>{}</strong> ({role}).</p><p>Member since {}.</p>",
        text(&user.username),
        text(&user.created_at),
    );
    layout("Dashboard", Some(principal), &body)
}

pub fn profile(
    principal: &Principal,
    user: &User,
    message: Option<&str>,
    error: Option<&str>,
) -> Html<String> {
    let notice = message.map_or_else(String::new, |m| {
        format!(r#"<p class="notice" role="status">{}</p>"#, text(m))
    });
    let body = format!(
        r#"{notice}{flash}<dl><dt>Username</dt><dd>{username}</dd><dt>Email</dt><dd>{email}</dd></dl>
<h2>Details</h2>
<form method="post" action="/profile/update">
<label>Full name <input name="full_name" value="{full_name}"></label>
<button type="submit">Save</button></form>
<h2>Change password</h2>
<form method="post" action="/profile/password">
<label>Current password <input type="password" name="current_password" required></label>
<label>New password <input type="password" name="new_password" required></label>
<label>Confirm new password <input type="password" name="confirm_password" required></label>
<button type="submit">Change password</button></form>"#,
        flash = flash(error),
        username = text(&user.username),
        email = text(&user.email),
        full_name = attr(user.full_name.as_deref().unwrap_or_default()),
    );
    layout("Profile", Some(principal), &body)
}

pub fn server_stats(principal: &Principal, stats: &ServerStatsFormatted) -> Html<String> {
    let s = &stats.stats;
    let rows = [
        ("Hostname", s.hostname.clone()),
        (
            "Platform",
            format!("{} {} ({})", s.platform, s.platform_version, s.architecture),
        ),
        ("CPU", format!("{} cores, {:.1}%", s.cpu_count, s.cpu_percent)),
        (
            "Memory",
            format!(
                "{} of {} ({:.1}%)",
                stats.memory_used_formatted, stats.memory_total_formatted, s.memory_percent
            ),
        ),
        (
            "Disk",
            format!(
                "{} of {} ({:.1}%)",
                stats.disk_used_formatted, stats.disk_total_formatted, s.disk_percent
            ),
        ),
        ("Uptime", stats.uptime_formatted.clone()),
        (
            "Process",
            format!(
                "pid {} using {}",
                s.process_id, stats.process_memory_rss_formatted
            ),
        ),
        ("Version", s.app_version.clone()),
    ];

    let mut body = String::from("<table>");
    for (label, value) in rows {
        let _ = write!(body, "<tr><th>{label}</th><td>{}</td></tr>", text(&value));
    }
    body.push_str("</table>");
    layout("Server stats", Some(principal), &body)
}

fn checkbox(form: &str, name: &str, checked: bool) -> String {
    format!(
        r#"<input form="{form}" type="checkbox" name="{name}" value="on"{}>"#,
        if checked { " checked" } else { "" }
    )
}

pub fn users(
    principal: &Principal,
    users: &[User],
    total: u64,
    search: &str,
    error: Option<&str>,
) -> Html<String> {
    let mut body = format!(
        r#"{flash}<form method="get" action="/users"><input name="search" value="{search}" placeholder="Search"><button type="submit">Search</button></form>
<p>{total} users</p><table><tr><th>ID</th><th>Username</th><th>Email</th><th>Full name</th><th>New password</th><th>Active</th><th>Superuser</th><th></th></tr>"#,
        flash = flash(error),
        search = attr(search),
    );

    for user in users {
        let form = format!("edit-{}", user.id);
        let _ = write!(
            body,
            r#"<tr><td>{id}<form id="{form}" method="post" action="/users/edit/{id}"></form></td>
<td><input form="{form}" name="username" value="{username}"></td>
<td><input form="{form}" name="email" value="{email}"></td>
<td><input form="{form}" name="full_name" value="{full_name}"></td>
<td><input form="{form}" type="password" name="password" placeholder="Leave blank to keep" autocomplete="new-password"></td>
<td>{active}</td><td>{superuser}</td>
<td><button form="{form}" type="submit">Save</button> <button type="button" data-delete-url="/users/delete/{id}">Delete</button></td></tr>"#,
            id = user.id,
            username = attr(&user.username),
            email = attr(&user.email),
            full_name = attr(user.full_name.as_deref().unwrap_or_default()),
            active = checkbox(&form, "is_active", user.is_active),
            superuser = checkbox(&form, "is_superuser", user.is_superuser),
        );
    }
    body.push_str(r#"</table><script src="/assets/admin.js"></script>"#);

    layout("Users", Some(principal), &body)
}

pub fn subscribers(principal: &Principal, subscribers: &[Subscription], total: u64) -> Html<String> {
    let mut body = format!(
        "<p>{total} subscribers, {} shown</p><table><tr><th>Email</th><th>Name</th><th>Company</th><th>Interests</th><th>Since</th><th></th></tr>",
        subscribers.len()
    );

    for sub in subscribers {
        let _ = write!(
            body,
            r#"<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td><button type="button" data-delete-url="/subscribers/delete/{}">Delete</button></td></tr>"#,
            text(&sub.email),
            text(&sub.name),
            text(sub.company.as_deref().unwrap_or_default()),
            text(&sub.interests.as_deref().unwrap_or_default().join(", ")),
            text(&sub.created_at),
            sub.id,
        );
    }
    body.push_str(r#"</table><script src="/assets/admin.js"></script>"#);

    layout("Subscribers", Some(principal), &body)
}

pub fn error_page(status: StatusCode, message: &str) -> Response {
    let title = status.canonical_reason().unwrap_or("Error");
    let body = format!(
        r#"<p>{}</p><p><a href="/dashboard">Back to the dashboard</a></p>"#,
        text(message)
    );
    (status, layout(title, None, &body)).into_response()
}

pub fn too_many_requests(retry_after: Duration) -> Response {
    let mut response = error_page(
        StatusCode::TOO_MANY_REQUESTS,
        &format!(
            "Too many attempts. Try again in {} seconds.",
            retry_after.as_secs()
        ),
    );
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after.as_secs()));
    response
}
