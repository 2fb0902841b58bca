//! Minimal server-rendered pages.
//!
//! Every dynamic value goes through [`escape`]; every identity placed in a
//! URL goes through [`with_user`].

use std::fmt::Write;

use eventhub_types::models::{Event, MyEvent};

/// Append `?user=<identity>` to `path`, percent-encoding the identity.
pub fn with_user(path: &str, user: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(user.as_bytes()).collect();
    format!("{}?user={}", path, encoded)
}

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, user: Option<&str>, body: &str) -> String {
    let nav = match user {
        Some(user) => format!(
            r#"<nav><a href="{}">Events</a> | <a href="{}">My events</a> | <a href="/checkout">Checkout</a> | <a href="/login">Log out</a></nav>"#,
            escape(&with_user("/events", user)),
            escape(&with_user("/my-events", user)),
        ),
        None => r#"<nav><a href="/login">Log in</a> | <a href="/register">Register</a></nav>"#.to_string(),
    };

    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n<body>\n{nav}\n<h1>{title}</h1>\n{body}\n</body>\n</html>\n",
        title = escape(title),
        nav = nav,
        body = body,
    )
}

fn credentials_form(action: &str, submit: &str) -> String {
    format!(
        r#"<form method="post" action="{action}">
<label>Username <input name="username" required></label>
<label>Password <input name="password" type="password" required></label>
<button type="submit">{submit}</button>
</form>"#
    )
}

pub fn register() -> String {
    layout("Register", None, &credentials_form("/register", "Register"))
}

pub fn login(error: Option<&str>) -> String {
    let mut body = String::new();
    if let Some(error) = error {
        let _ = write!(body, r#"<p class="error">{}</p>"#, escape(error));
    }
    body.push_str(&credentials_form("/login", "Log in"));
    layout("Login", None, &body)
}

pub fn events(user: &str, events: &[Event]) -> String {
    let mut body = String::from("<table>\n<tr><th>Event</th><th>Fee</th><th></th></tr>\n");
    for event in events {
        let href = with_user(&format!("/register_event/{}", event.id), user);
        let _ = writeln!(
            body,
            r#"<tr><td>{}</td><td>{}</td><td><a href="{}">Register</a></td></tr>"#,
            escape(&event.name),
            event.fee,
            escape(&href),
        );
    }
    body.push_str("</table>");
    layout("Events", Some(user), &body)
}

pub fn my_events(user: &str, events: &[MyEvent]) -> String {
    let body = if events.is_empty() {
        "<p>You have not registered for any events yet.</p>".to_string()
    } else {
        let mut body = String::from("<table>\n<tr><th>Event</th><th>Fee</th></tr>\n");
        for event in events {
            let _ = writeln!(
                body,
                "<tr><td>{}</td><td>{}</td></tr>",
                escape(&event.name),
                event.fee
            );
        }
        body.push_str("</table>");
        body
    };
    layout("My events", Some(user), &body)
}

pub fn checkout(total: i64) -> String {
    layout("Checkout", None, &format!(r#"<p>Total: <span id="total">{}</span></p>"#, total))
}

/// Error page. With an identity, the navigation links keep it.
pub fn error(status: u16, detail: &str, user: Option<&str>) -> String {
    layout(
        "Something went wrong",
        user,
        &format!("<p>Error {}</p>\n<pre>{}</pre>", status, escape(detail)),
    )
}
