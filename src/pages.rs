use std::collections::BTreeMap;

use maud::{html, Markup, PreEscaped, DOCTYPE};

use crate::{alarm::AlarmRecord, alarm_edit::AlarmForm};

const DISPLAY_TIME_FORMAT: &str = "%a %Y-%m-%d %H:%M";

/// what the index page needs to know
#[derive(Debug)]
pub struct IndexView<'a> {
    pub alarms: &'a BTreeMap<String, AlarmRecord>,
    /// false until setup has been saved once
    pub setup_done: bool,
    pub scheduler_running: bool,
    pub notice: Option<&'a str>,
}

/// the short codes passed around in `?notice=` after a redirect
#[must_use]
pub fn notice_message(code: &str) -> &'static str {
    match code {
        "updated" => "Alarm updated successfully.",
        "deleted" => "Alarm deleted successfully.",
        "not-found" => "Alarm not found.",
        "saved" => "Alarm saved.",
        "setup-saved" => "Credentials saved.",
        _ => "Done.",
    }
}

#[must_use]
pub fn alarm_link(action: &str, name: &str) -> String {
    format!("/{action}/{}", urlencoding::encode(name))
}

pub fn index(view: &IndexView<'_>) -> Markup {
    layout(
        "Alarms",
        html! {
            @if let Some(code) = view.notice {
                div class="notice" { (notice_message(code)) }
            }
            @if !view.setup_done {
                div class="notice warn" {
                    "No API key set yet, alarms won't fire until you "
                    a href="/setup" { "set one up" }
                    "."
                }
            }
            p class="muted" {
                @if view.scheduler_running { "Alarm loop running." } @else { "Alarm loop not running." }
            }
            @if view.alarms.is_empty() {
                p { "No alarms yet." }
            } @else {
                table {
                    thead {
                        tr {
                            th { "Name" }
                            th { "Next" }
                            th { "Intensity" }
                            th { "Duration" }
                            th { "Vibrate before" }
                            th {}
                        }
                    }
                    tbody {
                        @for (name, alarm) in view.alarms {
                            tr {
                                td { (name) }
                                td { (alarm.fire_at.format(DISPLAY_TIME_FORMAT).to_string()) }
                                td { (alarm.intensity.to_string()) }
                                td { (format!("{}s", alarm.duration_secs())) }
                                td { @if alarm.vibrate_before { "yes" } @else { "no" } }
                                td {
                                    a href=(alarm_link("edit", name)) { "edit" }
                                    " "
                                    a href=(alarm_link("delete", name)) { "delete" }
                                }
                            }
                        }
                    }
                }
            }
            p { a class="btn" href="/add" { "Add alarm" } }
        },
    )
}

/// the add and edit pages share one form
pub fn alarm_form(heading: &str, action: &str, form: &AlarmForm, error: Option<&str>) -> Markup {
    layout(
        heading,
        html! {
            h1 { (heading) }
            @if let Some(error) = error {
                div class="notice error" { (error) }
            }
            form method="post" action=(action) {
                label for="name" { "Name" }
                input id="name" type="text" name="name" value=(form.name) required;
                label for="time" { "Time" }
                input id="time" type="time" name="time" value=(form.time) required;
                label for="intensity" { "Intensity (0-100)" }
                input id="intensity" type="number" name="intensity" min="0" max="100"
                    value=(form.intensity) required;
                label for="duration" { "Duration (seconds)" }
                input id="duration" type="number" name="duration" min="0" step="0.001"
                    value=(form.duration) required;
                label {
                    input type="checkbox" name="vibrate_before" checked[form.vibrate_before()];
                    " Vibrate a minute before"
                }
                button type="submit" class="btn" { "Save" }
                " "
                a href="/" { "Cancel" }
            }
        },
    )
}

pub fn setup(api_key: &str, shock_id: &str, error: Option<&str>) -> Markup {
    layout(
        "Setup",
        html! {
            h1 { "Setup" }
            @if let Some(error) = error {
                div class="notice error" { (error) }
            }
            form method="post" action="/setup" {
                label for="api_key" { "OpenShock API key" }
                input id="api_key" type="password" name="api_key" value=(api_key) required;
                label for="shock_id" { "Shocker id" }
                input id="shock_id" type="text" name="shock_id" value=(shock_id) required;
                button type="submit" class="btn" { "Save" }
                " "
                a href="/" { "Cancel" }
            }
        },
    )
}

pub fn error_page(message: &str) -> Markup {
    layout(
        "Error",
        html! {
            h1 { "Something went wrong" }
            div class="notice error" { (message) }
            p { a href="/" { "Back to alarms" } }
        },
    )
}

fn layout(title: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " | OpenShockClock" }
                style { (PreEscaped(STYLES)) }
            }
            body {
                header {
                    a class="brand" href="/" { "OpenShockClock" }
                    nav {
                        a href="/" { "Alarms" }
                        a href="/add" { "Add" }
                        a href="/setup" { "Setup" }
                    }
                }
                main { (body) }
            }
        }
    }
}

const STYLES: &str = r"
body { font-family: sans-serif; margin: 0; background: #15171c; color: #e6e6e6; }
header { display: flex; justify-content: space-between; padding: 0.8em 1.2em; background: #20232b; }
header a { color: #e6e6e6; text-decoration: none; margin-left: 1em; }
.brand { font-weight: bold; margin-left: 0; }
main { padding: 1em 1.2em; }
table { border-collapse: collapse; width: 100%; }
th, td { text-align: left; padding: 0.3em 0.6em; border-bottom: 1px solid #333; }
a { color: #8ab4f8; }
form { display: flex; flex-direction: column; max-width: 22em; gap: 0.3em; }
.btn { background: #3b6fd8; color: white; border: 0; padding: 0.4em 0.9em; border-radius: 4px; text-decoration: none; }
.notice { padding: 0.5em 0.8em; margin-bottom: 0.8em; border-radius: 4px; background: #24402c; }
.notice.warn { background: #4a3f1c; }
.notice.error { background: #4a1c1c; }
.muted { color: #999; }
";
