use axum::{
    extract::{Form, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use log::{error, info};
use serde::Deserialize;
use tokio::net::TcpListener;

use crate::{
    alarm::AlarmRecord,
    alarm_edit::AlarmForm,
    config::{blocking, AlarmStore, CredentialSource, Credentials},
    error::{ConfigError, ValidationError},
    pages::{self, IndexView},
    scheduler::SchedulerHandle,
};

/// default port of the web ui
pub const DEFAULT_PORT: u16 = 1260;

/// shared by every request handler
#[derive(Clone)]
pub struct AppState {
    pub store: AlarmStore,
    pub credentials: CredentialSource,
    pub scheduler: SchedulerHandle,
}

#[derive(Debug, Deserialize)]
struct NoticeQuery {
    notice: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SetupForm {
    #[serde(default)]
    api_key: String,
    #[serde(default)]
    shock_id: String,
}

impl SetupForm {
    fn credentials(&self) -> Result<Credentials, ValidationError> {
        let api_key = self.api_key.trim();
        let shock_id = self.shock_id.trim();
        if api_key.is_empty() {
            return Err(ValidationError::Missing("API key"));
        }
        if shock_id.is_empty() {
            return Err(ValidationError::Missing("shocker id"));
        }
        Ok(Credentials::new(api_key, shock_id))
    }
}

impl IntoResponse for ConfigError {
    fn into_response(self) -> Response {
        error!("request failed: {self}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(pages::error_page(&self.to_string()).into_string()),
        )
            .into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/add", get(add_page).post(add_alarm))
        .route("/edit/{name}", get(edit_page).post(edit_alarm))
        .route("/delete/{name}", get(delete_alarm))
        .route("/setup", get(setup_page).post(save_setup))
        .with_state(state)
}

/// serve the ui until the process exits
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("web ui listening on http://{addr}");
    }
    axum::serve(listener, router(state)).await
}

fn now() -> chrono::NaiveDateTime {
    chrono::Local::now().naive_local()
}

fn notice_redirect(code: &str) -> Response {
    Redirect::to(&format!("/?notice={code}")).into_response()
}

fn invalid(page: maud::Markup) -> Response {
    (StatusCode::BAD_REQUEST, Html(page.into_string())).into_response()
}

async fn index(
    State(state): State<AppState>,
    Query(query): Query<NoticeQuery>,
) -> Result<Html<String>, ConfigError> {
    let store = state.store.clone();
    let credentials = state.credentials.clone();
    let (alarms, setup_done) =
        blocking(move || Ok((store.list_all()?, credentials.exists()))).await?;
    let view = IndexView {
        alarms: &alarms,
        setup_done,
        scheduler_running: state.scheduler.is_running(),
        notice: query.notice.as_deref(),
    };
    Ok(Html(pages::index(&view).into_string()))
}

async fn add_page() -> Html<String> {
    Html(pages::alarm_form("Add alarm", "/add", &AlarmForm::default(), None).into_string())
}

async fn add_alarm(
    State(state): State<AppState>,
    Form(form): Form<AlarmForm>,
) -> Result<Response, ConfigError> {
    let (name, record) = match form.build(now()) {
        Ok(alarm) => alarm,
        Err(e) => {
            return Ok(invalid(pages::alarm_form(
                "Add alarm",
                "/add",
                &form,
                Some(&e.to_string()),
            )));
        }
    };
    let store = state.store.clone();
    let (saved_name, saved) = (name.clone(), record.clone());
    blocking(move || store.upsert(&saved_name, &saved)).await?;
    info!("added alarm {name} at {}", record.fire_at);
    state.scheduler.ensure_started();
    Ok(notice_redirect("saved"))
}

async fn edit_page(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ConfigError> {
    let Some(record) = find(&state.store, &name).await? else {
        return Ok(notice_redirect("not-found"));
    };
    let form = AlarmForm::from_record(&name, &record);
    let page = pages::alarm_form("Edit alarm", &pages::alarm_link("edit", &name), &form, None);
    Ok(Html(page.into_string()).into_response())
}

async fn edit_alarm(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Form(form): Form<AlarmForm>,
) -> Result<Response, ConfigError> {
    if find(&state.store, &name).await?.is_none() {
        return Ok(notice_redirect("not-found"));
    }
    let (new_name, record) = match form.build(now()) {
        Ok(alarm) => alarm,
        Err(e) => {
            return Ok(invalid(pages::alarm_form(
                "Edit alarm",
                &pages::alarm_link("edit", &name),
                &form,
                Some(&e.to_string()),
            )));
        }
    };

    let store = state.store.clone();
    let (old, new, saved) = (name.clone(), new_name.clone(), record.clone());
    let result = blocking(move || {
        if new == old {
            store.upsert(&old, &saved)
        } else {
            store.rename(&old, &new, &saved)
        }
    })
    .await;
    match result {
        Ok(()) => {}
        // deleted between the check above and now
        Err(ConfigError::AlarmNotFound(_)) => return Ok(notice_redirect("not-found")),
        Err(e) => return Err(e),
    }
    info!("updated alarm {new_name} to {}", record.fire_at);
    state.scheduler.ensure_started();
    Ok(notice_redirect("updated"))
}

async fn delete_alarm(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ConfigError> {
    let store = state.store.clone();
    let target = name.clone();
    if blocking(move || store.delete(&target)).await? {
        info!("deleted alarm {name}");
        Ok(notice_redirect("deleted"))
    } else {
        Ok(notice_redirect("not-found"))
    }
}

async fn setup_page(State(state): State<AppState>) -> Result<Html<String>, ConfigError> {
    let credentials = state.credentials.clone();
    let page = match blocking(move || credentials.load()).await? {
        Some(credentials) => pages::setup(&credentials.api_key, &credentials.shocker_id, None),
        None => pages::setup("", "", None),
    };
    Ok(Html(page.into_string()))
}

async fn save_setup(
    State(state): State<AppState>,
    Form(form): Form<SetupForm>,
) -> Result<Response, ConfigError> {
    let credentials = match form.credentials() {
        Ok(credentials) => credentials,
        Err(e) => {
            return Ok(invalid(pages::setup(
                &form.api_key,
                &form.shock_id,
                Some(&e.to_string()),
            )));
        }
    };
    let source = state.credentials.clone();
    let saved = credentials.clone();
    blocking(move || source.save(&saved)).await?;
    info!("saved credentials for shocker {}", credentials.shocker_id);
    state.scheduler.ensure_started();
    Ok(notice_redirect("setup-saved"))
}

async fn find(store: &AlarmStore, name: &str) -> Result<Option<AlarmRecord>, ConfigError> {
    let store = store.clone();
    let name = name.to_string();
    blocking(move || store.get(&name)).await
}
