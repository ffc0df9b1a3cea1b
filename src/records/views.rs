//! Server-rendered HTML pages.

use std::fmt::Write;

use super::repo_types::Record;
use crate::records::repo::sql_timestamp;

pub struct UploadPage<'a> {
    pub consumed: f64,
    pub budget: f64,
    pub remaining: f64,
    pub records: &'a [Record],
}

pub struct ResultPage<'a> {
    pub food: Option<&'a str>,
    pub calories: f64,
    pub consumed: f64,
    pub remaining: f64,
}

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html>\n<head><meta charset=\"utf-8\"><title>{}</title></head>\n<body>\n{}\n</body>\n</html>\n",
        escape(title),
        body
    )
}

pub fn upload_page(page: &UploadPage<'_>) -> String {
    let mut body = String::new();
    body.push_str("<h1>Calorie log</h1>\n");
    let _ = write!(
        body,
        "<p>Today: <span id=\"consumed\">{:.1}</span> / {:.1} kcal, \
         <span id=\"remaining\">{:.1}</span> kcal left</p>\n",
        round1(page.consumed),
        page.budget,
        round1(page.remaining)
    );
    body.push_str(
        "<form method=\"post\" action=\"/\" enctype=\"multipart/form-data\">\n\
         <input type=\"file\" name=\"photo\" accept=\".png,.jpg,.jpeg\">\n\
         <input type=\"number\" name=\"weight\" value=\"100\" min=\"0\" step=\"any\"> g\n\
         <button type=\"submit\">Upload</button>\n\
         </form>\n",
    );

    if page.records.is_empty() {
        body.push_str("<p>No records yet.</p>");
    } else {
        body.push_str("<table>\n<tr><th>Date</th><th>Photo</th><th>Food</th><th>kcal</th></tr>\n");
        for r in page.records {
            let name = escape(&r.filename);
            let _ = writeln!(
                body,
                "<tr><td>{}</td><td><a href=\"/uploads/{}\">{}</a></td><td>{}</td><td>{:.1}</td></tr>",
                sql_timestamp(r.date).unwrap_or_default(),
                name,
                name,
                escape(r.food_name.as_deref().unwrap_or("unknown")),
                round1(r.calories)
            );
        }
        body.push_str("</table>");
    }
    layout("Calorie log", &body)
}

pub fn result_page(page: &ResultPage<'_>) -> String {
    let body = format!(
        "<h1>Result</h1>\n\
         <p>Food: <span id=\"food\">{}</span></p>\n\
         <p>Calories: <span id=\"calories\">{:.1}</span> kcal</p>\n\
         <p>Eaten today: <span id=\"consumed\">{:.1}</span> kcal</p>\n\
         <p>Remaining today: <span id=\"remaining\">{:.1}</span> kcal</p>\n\
         <p><a href=\"/\">Back</a></p>",
        escape(page.food.unwrap_or("unknown")),
        round1(page.calories),
        round1(page.consumed),
        round1(page.remaining)
    );
    layout("Result", &body)
}

pub fn error_page(title: &str, message: &str) -> String {
    let body = format!(
        "<h1>{}</h1>\n<p>{}</p>\n<p><a href=\"/\">Back</a></p>",
        escape(title),
        escape(message)
    );
    layout(title, &body)
}
