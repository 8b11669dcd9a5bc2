use crate::chanting::{can_modify, selectable_dates, HistoryTable, SortDirection, PAGE_SIZES};
use crate::models::{ChantingEntry, UserProfile};
use crate::notify::{Notice, NoticeLevel};
use crate::stats::{DashboardRange, DashboardSummary};
use crate::validation::{FieldErrors, ProfileForm, SignupForm};
use chrono::NaiveDate;

const COUNTRY_CODES: [(&str, &str); 4] = [("+91", "IN"), ("+1", "US"), ("+44", "UK"), ("+61", "AU")];

pub struct ChantingView<'a> {
    pub user: &'a UserProfile,
    pub table: &'a HistoryTable,
    pub entries: &'a [ChantingEntry],
    pub today: NaiveDate,
    pub notices: Vec<Notice>,
}

pub struct ProfileView<'a> {
    pub user: &'a UserProfile,
    pub form: ProfileForm,
    pub errors: FieldErrors,
    pub editing: bool,
    pub notices: Vec<Notice>,
}

/// Shown while the startup identity check is running; reloads itself.
pub fn render_waiting(path: &str) -> String {
    layout(
        "Loading",
        &format!(r#"<meta http-equiv="refresh" content="1;url={}" />"#, escape(path)),
        None,
        &[],
        r#"<section class="card center"><button disabled>Loading...</button></section>"#,
    )
}

pub fn render_login(google_client_id: Option<&str>, notices: &[Notice]) -> String {
    let sign_in = match google_client_id {
        Some(client_id) => format!(
            r#"<script src="https://accounts.google.com/gsi/client" async></script>
  <script>
    function onGoogleCredential(response) {{
      const form = document.getElementById("google-form");
      form.credential.value = response.credential;
      form.submit();
    }}
  </script>
  <div id="g_id_onload" data-client_id="{}" data-callback="onGoogleCredential"></div>
  <div class="g_id_signin" data-type="standard" data-theme="outline"></div>
  <form id="google-form" method="post" action="/login/google">
    <input type="hidden" name="credential" />
  </form>"#,
            escape(client_id)
        ),
        None => r#"<p class="hint">Google sign-in is not configured (set GOOGLE_CLIENT_ID). Paste an ID token instead:</p>
  <form method="post" action="/login/google" class="stack">
    <input name="credential" placeholder="Google ID token" />
    <button class="btn-primary">Sign in</button>
  </form>"#
            .to_string(),
    };

    let body = format!(
        r#"<section class="card">
  <h2>Login</h2>
  {sign_in}
  <p class="hint"><a href="/signup">Signup</a></p>
</section>"#
    );
    layout("Login", "", None, notices, &body)
}

pub fn render_signup(form: &SignupForm, errors: &FieldErrors, notices: &[Notice]) -> String {
    let country_options: String = COUNTRY_CODES
        .iter()
        .map(|(code, iso)| {
            format!(
                r#"<option value="{code}"{}>{code} ({iso})</option>"#,
                selected(form.country_code == *code)
            )
        })
        .collect();

    let body = format!(
        r#"<section class="card">
  <h2>Registration Form</h2>
  <p class="hint">Please fill in your personal details</p>
  <form method="post" action="/signup" class="stack">
    {first}
    {last}
    {email}
    <label>Phone Number
      <div class="row">
        <select name="country_code">{country_options}</select>
        <input name="phone_number" value="{phone}" maxlength="10" inputmode="numeric" placeholder="10 digit number" />
      </div>
      {phone_error}{country_error}
    </label>
    {facilitator}
    <div class="row">
      <a class="button" href="/signup">Reset</a>
      <button class="btn-primary">Submit</button>
    </div>
  </form>
</section>"#,
        first = text_field("First Name", "first_name", &form.first_name, errors, true),
        last = text_field("Last Name", "last_name", &form.last_name, errors, true),
        email = text_field("Email", "email", &form.email, errors, true),
        phone = escape(&form.phone_number),
        phone_error = field_error(errors, "phone_number"),
        country_error = field_error(errors, "country_code"),
        facilitator = text_field(
            "Facilitator Name",
            "facilitator_name",
            &form.facilitator_name,
            errors,
            true
        ),
    );
    layout("Signup", "", None, notices, &body)
}

pub fn render_chanting(view: &ChantingView<'_>) -> String {
    let table = view.table;

    let date_choices: String = selectable_dates(view.today)
        .into_iter()
        .enumerate()
        .map(|(index, date)| {
            format!(
                r#"<label class="chip"><input type="radio" name="date" value="{}"{} />{}</label>"#,
                date,
                if index == 0 { " checked" } else { "" },
                date.format("%d %b")
            )
        })
        .collect();

    let rows: String = if view.entries.is_empty() {
        r#"<tr><td colspan="3" class="hint">No chanting records yet</td></tr>"#.to_string()
    } else {
        view.entries
            .iter()
            .map(|entry| entry_row(entry, view.today))
            .collect()
    };

    let link = |page: u32, size: u32, direction: &str| {
        format!("/chanting?page={page}&size={size}&direction={direction}")
    };
    let direction = table.direction();
    let sort_link = link(1, table.size(), direction.toggled().as_str());
    let arrow = match direction {
        SortDirection::Asc => "&uarr;",
        SortDirection::Desc => "&darr;",
    };

    let sizes: String = PAGE_SIZES
        .iter()
        .map(|size| {
            if *size == table.size() {
                format!(r#"<span class="tab active">{size}</span>"#)
            } else {
                format!(
                    r#"<a class="tab" href="{}">{size}</a>"#,
                    link(table.page(), *size, direction.as_str())
                )
            }
        })
        .collect();

    let prev = if table.has_prev() {
        format!(
            r#"<a class="button" href="{}">Prev</a>"#,
            link(table.page() - 1, table.size(), direction.as_str())
        )
    } else {
        r#"<span class="button disabled">Prev</span>"#.to_string()
    };
    let next = if table.has_next() {
        format!(
            r#"<a class="button" href="{}">Next</a>"#,
            link(table.page() + 1, table.size(), direction.as_str())
        )
    } else {
        r#"<span class="button disabled">Next</span>"#.to_string()
    };

    let body = format!(
        r#"<section class="card">
  <h2>Add Chanting Rounds</h2>
  <form method="post" action="/chanting" class="stack">
    <input name="rounds" inputmode="numeric" placeholder="Enter rounds" />
    <div class="row wrap">{date_choices}</div>
    <button class="btn-primary">Save</button>
  </form>
</section>
<section class="card">
  <div class="row spread">
    <a class="button" href="{refresh}" title="Refresh">&#x21bb;</a>
    <h2>Chanting History</h2>
    <a class="button" href="{sort_link}">Date {arrow}</a>
  </div>
  <table>
    <thead><tr><th>Date</th><th>Rounds</th><th></th></tr></thead>
    <tbody>{rows}</tbody>
  </table>
  <div class="row spread">
    <div class="tabs"><span class="hint">Rows:</span>{sizes}</div>
    <div class="row">{prev}<span>Page {page} of {total}</span>{next}</div>
  </div>
</section>"#,
        refresh = link(table.page(), table.size(), direction.as_str()),
        page = table.page(),
        total = table.total_pages(),
    );
    layout("Chanting", "", Some(view.user), &view.notices, &body)
}

fn entry_row(entry: &ChantingEntry, today: NaiveDate) -> String {
    let controls = if can_modify(entry.chanting_date, today) {
        format!(
            r#"<form method="post" action="/chanting/{id}/edit" class="row">
        <input type="hidden" name="date" value="{date}" />
        <input name="rounds" value="{rounds}" inputmode="numeric" class="narrow" />
        <button>Update</button>
      </form>
      <form method="post" action="/chanting/{id}/delete">
        <input type="hidden" name="date" value="{date}" />
        <button class="btn-danger" title="Delete">&#x1f5d1;</button>
      </form>"#,
            id = entry.chanting_id,
            date = entry.chanting_date,
            rounds = entry.chanting_rounds,
        )
    } else {
        String::new()
    };
    format!(
        r#"<tr><td>{}</td><td>{} rounds</td><td class="row">{controls}</td></tr>"#,
        entry.chanting_date.format("%d %b %Y"),
        entry.chanting_rounds
    )
}

pub fn render_dashboard(
    user: &UserProfile,
    range: DashboardRange,
    summary: &DashboardSummary,
    notices: &[Notice],
) -> String {
    let ranges: String = DashboardRange::ALL
        .iter()
        .map(|option| {
            if *option == range {
                format!(r#"<span class="tab active">{}</span>"#, option.label())
            } else {
                format!(
                    r#"<a class="tab" href="/dashboard?range={}">{}</a>"#,
                    option.key(),
                    option.label()
                )
            }
        })
        .collect();

    let body = format!(
        r#"<section class="card">
  <div class="row spread">
    <h2>Dashboard</h2>
    <div class="tabs">{ranges}</div>
  </div>
  <div class="panel">
    {ideal}{committed}{met}{average}{streak}
  </div>
  <div class="chart-card">{chart}</div>
</section>"#,
        ideal = stat("Ideal", &summary.ideal_rounds.to_string()),
        committed = stat("Committed", &summary.committed_rounds.to_string()),
        met = stat(
            "Days Met Commitment",
            &format!("{}/{}", summary.met_commitment_days, summary.recorded_days)
        ),
        average = stat("Average", &summary.average_rounds.to_string()),
        streak = stat("Streak", &format!("{} &#x1f525;", summary.current_streak)),
        chart = chart_svg(summary),
    );
    layout("Dashboard", "", Some(user), notices, &body)
}

fn stat(label: &str, value: &str) -> String {
    format!(
        r#"<div class="stat"><span class="label">{label}</span><span class="value">{value}</span></div>"#
    )
}

/// Actual rounds against the committed and ideal lines.
fn chart_svg(summary: &DashboardSummary) -> String {
    const WIDTH: f64 = 720.0;
    const HEIGHT: f64 = 240.0;
    const PAD: f64 = 28.0;

    if summary.points.is_empty() {
        return r#"<p class="hint">No records in this range</p>"#.to_string();
    }

    let peak = f64::from(summary.peak_rounds().max(1));
    let steps = (summary.points.len().max(2) - 1) as f64;
    let x = |index: usize| PAD + index as f64 * (WIDTH - 2.0 * PAD) / steps;
    let y = |rounds: u32| HEIGHT - PAD - f64::from(rounds) * (HEIGHT - 2.0 * PAD) / peak;

    let line = |value: &dyn Fn(usize) -> u32| -> String {
        (0..summary.points.len())
            .map(|index| format!("{:.1},{:.1}", x(index), y(value(index))))
            .collect::<Vec<_>>()
            .join(" ")
    };

    let actual = line(&|i| summary.points[i].chanting_rounds);
    let committed = line(&|i| summary.points[i].committed_rounds);
    let ideal = line(&|i| summary.points[i].ideal_rounds);

    let first = summary.points[0].date.format("%d %b");
    let last = summary.points[summary.points.len() - 1].date.format("%d %b");

    format!(
        r##"<svg id="chart" viewBox="0 0 {WIDTH} {HEIGHT}" role="img" aria-label="Rounds per day">
  <line class="chart-axis" x1="{PAD}" y1="{base:.1}" x2="{right:.1}" y2="{base:.1}" />
  <polyline points="{ideal}" fill="none" stroke="#f97316" stroke-width="2" />
  <polyline points="{committed}" fill="none" stroke="#16a34a" stroke-width="2" />
  <polyline points="{actual}" fill="none" stroke="#2563eb" stroke-width="3" />
  <text class="chart-label" x="{PAD}" y="{label_y:.1}">{first}</text>
  <text class="chart-label" x="{right:.1}" y="{label_y:.1}" text-anchor="end">{last}</text>
</svg>
<p class="hint"><span style="color:#2563eb">Actual Rounds</span> &middot; <span style="color:#16a34a">Committed Rounds</span> &middot; <span style="color:#f97316">Ideal Rounds</span></p>"##,
        base = HEIGHT - PAD,
        right = WIDTH - PAD,
        label_y = HEIGHT - 8.0,
    )
}

pub fn render_profile(view: &ProfileView<'_>) -> String {
    let user = view.user;
    let form = &view.form;
    let errors = &view.errors;
    let editable = view.editing;

    let signed_up = user
        .signed_up_on()
        .map(|date| format!("Signed up on {}", date.format("%d %b %Y")))
        .unwrap_or_default();

    let country_options: String = COUNTRY_CODES
        .iter()
        .map(|(code, iso)| {
            format!(
                r#"<option value="{code}"{}>{code} ({iso})</option>"#,
                selected(form.country_code == *code)
            )
        })
        .collect();

    let actions = if editable {
        r#"<button class="btn-primary" form="profile-form">Save</button>
    <a class="button" href="/profile">Cancel</a>"#
    } else {
        r#"<a class="button btn-primary" href="/profile?edit=1">Edit Profile</a>"#
    };

    let body = format!(
        r#"<section class="card">
  <h2>My Profile</h2>
  <p class="hint">{signed_up}</p>
  <form id="profile-form" method="post" action="/profile" class="stack">
    {first}
    {last}
    <label>Email<input value="{email}" disabled /></label>
    <label>Phone Number
      <div class="row">
        <select name="country_code"{disabled}>{country_options}</select>
        <input name="phone_number" value="{phone}" maxlength="10" inputmode="numeric"{disabled} />
      </div>
      {phone_error}{country_error}
    </label>
    {rounds}
    <p>Status: <strong class="status-{status_class}">{status}</strong></p>
  </form>
  <div class="row">{actions}</div>
</section>"#,
        first = text_field("First Name", "first_name", &form.first_name, errors, editable),
        last = text_field("Last Name", "last_name", &form.last_name, errors, editable),
        email = escape(&user.email),
        phone = escape(&form.phone_number),
        disabled = if editable { "" } else { " disabled" },
        phone_error = field_error(errors, "phone_number"),
        country_error = field_error(errors, "country_code"),
        rounds = text_field(
            "Committed Rounds",
            "committed_rounds",
            &form.committed_rounds,
            errors,
            editable
        ),
        status = user.status.label(),
        status_class = user.status.label().to_ascii_lowercase(),
    );
    layout("Profile", "", Some(user), &view.notices, &body)
}

pub fn render_unauthorized(user: Option<&UserProfile>) -> String {
    layout(
        "Unauthorized",
        "",
        user,
        &[],
        r#"<section class="card center">
  <h2>Unauthorized</h2>
  <p class="hint">Your account does not have access to that page.</p>
  <a class="button" href="/chanting">Back</a>
</section>"#,
    )
}

pub fn render_error(status: reqwest::StatusCode, message: &str) -> String {
    let body = format!(
        r#"<section class="card center">
  <h2>{}</h2>
  <p class="hint">{}</p>
  <a class="button" href="/chanting">Back</a>
</section>"#,
        status.as_u16(),
        escape(message)
    );
    layout("Error", "", None, &[], &body)
}

fn text_field(label: &str, name: &str, value: &str, errors: &FieldErrors, editable: bool) -> String {
    format!(
        r#"<label>{label}<input name="{name}" value="{}"{} />{}</label>"#,
        escape(value),
        if editable { "" } else { " disabled" },
        field_error(errors, name)
    )
}

fn field_error(errors: &FieldErrors, name: &str) -> String {
    errors
        .get(name)
        .map(|message| format!(r#"<span class="field-error">{}</span>"#, escape(message)))
        .unwrap_or_default()
}

fn selected(is_selected: bool) -> &'static str {
    if is_selected { " selected" } else { "" }
}

fn nav(user: Option<&UserProfile>) -> String {
    let Some(user) = user else {
        return String::new();
    };
    format!(
        r#"<nav class="row spread">
    <div class="row"><a href="/chanting">Chanting</a><a href="/dashboard">Dashboard</a><a href="/profile">Profile</a></div>
    <div class="row">
      <span class="hint">{}</span>
      <form method="post" action="/logout"><button>Logout</button></form>
      <form method="post" action="/logout-all"><button>Logout everywhere</button></form>
    </div>
  </nav>"#,
        escape(&user.display_name())
    )
}

fn notices_html(notices: &[Notice]) -> String {
    notices
        .iter()
        .map(|notice| {
            let kind = match notice.level {
                NoticeLevel::Success => "ok",
                NoticeLevel::Error => "error",
            };
            format!(
                r#"<p class="status" data-type="{kind}">{}</p>"#,
                escape(&notice.message)
            )
        })
        .collect()
}

fn layout(
    title: &str,
    head: &str,
    user: Option<&UserProfile>,
    notices: &[Notice],
    body: &str,
) -> String {
    LAYOUT_HTML
        .replace("{{TITLE}}", &escape(title))
        .replace("{{HEAD}}", head)
        .replace("{{NAV}}", &nav(user))
        .replace("{{NOTICES}}", &notices_html(notices))
        .replace("{{BODY}}", body)
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

const LAYOUT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  {{HEAD}}
  <title>{{TITLE}} &middot; Chanting Tracker</title>
  <style>
    :root {
      --bg-1: #f8f3e6;
      --bg-2: #f5d3a7;
      --ink: #2b2a28;
      --accent: #ff6b4a;
      --accent-2: #2f4858;
      --card: rgba(255, 255, 255, 0.86);
      --shadow: 0 24px 60px rgba(47, 72, 88, 0.18);
    }

    * { box-sizing: border-box; }

    body {
      margin: 0;
      min-height: 100vh;
      background: radial-gradient(circle at top, var(--bg-2), transparent 60%),
        linear-gradient(135deg, var(--bg-1), #ffe9d4 60%, #f9f2e9 100%);
      color: var(--ink);
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      display: grid;
      justify-items: center;
      padding: 32px 18px 48px;
    }

    .app { width: min(860px, 100%); display: grid; gap: 20px; }
    .card {
      background: var(--card);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 28px;
      display: grid;
      gap: 16px;
    }
    .center { justify-items: center; text-align: center; }
    h2 { margin: 0; font-family: "Fraunces", "Georgia", serif; }
    nav a { color: var(--accent-2); font-weight: 600; text-decoration: none; }
    .row { display: flex; gap: 10px; align-items: center; }
    .wrap { flex-wrap: wrap; }
    .spread { justify-content: space-between; flex-wrap: wrap; }
    .stack { display: grid; gap: 12px; }
    label { display: grid; gap: 6px; font-weight: 600; }
    input, select { padding: 10px 12px; border-radius: 12px; border: 1px solid rgba(47, 72, 88, 0.2); font: inherit; }
    .narrow { width: 5em; }
    .chip { display: inline-flex; gap: 6px; font-weight: 500; }
    button, .button {
      appearance: none;
      border: none;
      border-radius: 999px;
      padding: 10px 16px;
      font: inherit;
      font-weight: 600;
      cursor: pointer;
      background: rgba(47, 72, 88, 0.08);
      color: var(--accent-2);
      text-decoration: none;
    }
    .btn-primary { background: var(--accent); color: white; }
    .btn-danger { background: transparent; }
    .disabled { opacity: 0.4; cursor: default; }
    table { width: 100%; border-collapse: collapse; }
    th, td { text-align: left; padding: 8px; border-bottom: 1px solid rgba(47, 72, 88, 0.08); }
    .tabs { display: flex; gap: 6px; padding: 6px; background: rgba(47, 72, 88, 0.08); border-radius: 999px; align-items: center; }
    .tab { border-radius: 999px; padding: 6px 12px; color: #6b645d; text-decoration: none; font-weight: 600; }
    .tab.active { background: white; color: var(--accent-2); }
    .panel { display: grid; grid-template-columns: repeat(auto-fit, minmax(130px, 1fr)); gap: 12px; }
    .stat { background: white; border-radius: 18px; padding: 14px; display: grid; gap: 6px; }
    .stat .label { font-size: 0.8rem; text-transform: uppercase; letter-spacing: 0.12em; color: #8b857d; }
    .stat .value { font-size: 1.5rem; font-weight: 600; color: var(--accent-2); }
    .chart-card { background: white; border-radius: 20px; padding: 16px; }
    #chart { width: 100%; height: 260px; display: block; }
    .chart-axis { stroke: rgba(47, 72, 88, 0.25); stroke-dasharray: 4 6; }
    .chart-label { fill: #7a746d; font-size: 11px; }
    .hint { margin: 0; color: #6f6a65; font-size: 0.9rem; font-weight: 400; }
    .status { margin: 0; font-size: 0.95rem; }
    .status[data-type="error"], .field-error { color: #c63b2b; font-weight: 400; }
    .status[data-type="ok"], .status-active { color: #2d7a4b; }
    .status-inactive { color: #c63b2b; }
  </style>
</head>
<body>
  <main class="app">
  {{NAV}}
  {{NOTICES}}
  {{BODY}}
  </main>
</body>
</html>
"#;
