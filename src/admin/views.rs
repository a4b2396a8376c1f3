//! Inline HTML for the admin pages. Small enough that a template engine would
//! be more ceremony than markup; every dynamic value goes through [`escape`].

use crate::admin::{engine::FieldValue, schema::TableDescriptor};

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>{} - Booking admin</title></head>
<body>
  <nav><a href="/dashboard">Dashboard</a></nav>
  {body}
</body>
</html>"#,
        escape(title)
    )
}

pub fn dashboard_page(user_count: i64, item_count: i64, tables: &[TableDescriptor]) -> String {
    let links = tables
        .iter()
        .map(|t| format!(r#"<li><a href="/model/{0}">{0}</a></li>"#, t.name))
        .collect::<Vec<_>>()
        .join("\n    ");
    let body = format!(
        r#"<h1>Dashboard</h1>
  <p>Users: {user_count}</p>
  <p>Items: {item_count}</p>
  <ul>
    {links}
  </ul>
  <form method="post" action="/logout"><button type="submit">Log out</button></form>"#
    );
    layout("Dashboard", &body)
}

pub fn model_list_page(table: &TableDescriptor, rows: &[Vec<FieldValue>]) -> String {
    let header = table
        .columns
        .iter()
        .map(|c| format!("<th>{}</th>", escape(c.name)))
        .collect::<Vec<_>>()
        .join("");
    let body_rows = rows
        .iter()
        .map(|row| {
            let id = row.first().map(|v| v.render()).unwrap_or_default();
            let cells = row
                .iter()
                .map(|v| format!("<td>{}</td>", escape(&v.render())))
                .collect::<Vec<_>>()
                .join("");
            format!(
                r#"<tr>{cells}<td><a href="/model/{table}/edit/{id}">edit</a>
<form method="post" action="/model/{table}/delete/{id}"><button type="submit">delete</button></form></td></tr>"#,
                table = table.name,
            )
        })
        .collect::<Vec<_>>()
        .join("\n    ");
    let body = format!(
        r#"<h1>{name}</h1>
  <p><a href="/model/{name}/create">New row</a></p>
  <table border="1">
    <tr>{header}<th></th></tr>
    {body_rows}
  </table>"#,
        name = table.name,
    );
    layout(table.name, &body)
}

pub fn create_page(table: &TableDescriptor) -> String {
    let inputs = table
        .columns
        .iter()
        .map(|c| {
            format!(
                r#"<label>{0} <input type="text" name="{0}"></label><br>"#,
                escape(c.name)
            )
        })
        .collect::<Vec<_>>()
        .join("\n    ");
    let body = format!(
        r#"<h1>New {name} row</h1>
  <form method="post" action="/model/{name}/create">
    {inputs}
    <button type="submit">Create</button>
  </form>"#,
        name = table.name,
    );
    layout(table.name, &body)
}

pub fn edit_page(table: &TableDescriptor, id: i64, row: &[FieldValue]) -> String {
    let inputs = table
        .columns
        .iter()
        .zip(row)
        .map(|(c, v)| {
            format!(
                r#"<label>{0} <input type="text" name="{0}" value="{1}"></label><br>"#,
                escape(c.name),
                escape(&v.render())
            )
        })
        .collect::<Vec<_>>()
        .join("\n    ");
    let body = format!(
        r#"<h1>Edit {name} #{id}</h1>
  <form method="post" action="/model/{name}/edit/{id}">
    {inputs}
    <button type="submit">Save</button>
  </form>"#,
        name = table.name,
    );
    layout(table.name, &body)
}
