use std::{
    collections::BTreeMap,
    time::{Duration, Instant},
};

use eframe::{
    egui::{self, CentralPanel, Grid, ScrollArea, ViewportBuilder},
    run_native,
};
use log::warn;

use crate::{
    alarm::AlarmRecord, config::AlarmStore, pages::alarm_link, scheduler::SchedulerHandle,
};

const WINDOW_TITLE: &str = "OpenShockClock";

/// how often the window re-reads the alarm file
const REFRESH_EVERY: Duration = Duration::from_secs(5);

pub struct ClockWindow {
    url: String,
    store: AlarmStore,
    scheduler: SchedulerHandle,
    alarms: Result<BTreeMap<String, AlarmRecord>, String>,
    last_refresh: Option<Instant>,
}

impl ClockWindow {
    #[must_use]
    pub fn new(url: String, store: AlarmStore, scheduler: SchedulerHandle) -> Self {
        Self {
            url,
            store,
            scheduler,
            alarms: Ok(BTreeMap::new()),
            last_refresh: None,
        }
    }

    fn refresh(&mut self) {
        if self
            .last_refresh
            .is_some_and(|last| last.elapsed() < REFRESH_EVERY)
        {
            return;
        }
        self.alarms = self.store.list_all().map_err(|e| {
            warn!("couldn't load alarms for the window: {e}");
            e.to_string()
        });
        self.last_refresh = Some(Instant::now());
    }

    /// open a page of the web ui in the browser
    fn open(&self, ui: &egui::Ui, path: &str) {
        ui.ctx()
            .open_url(egui::OpenUrl::new_tab(page_url(&self.url, path)));
    }

    fn list_alarms(&self, ui: &mut egui::Ui) {
        match &self.alarms {
            Err(e) => {
                ui.colored_label(egui::Color32::LIGHT_RED, e.as_str());
            }
            Ok(alarms) if alarms.is_empty() => {
                ui.label("no alarms yet");
            }
            Ok(alarms) => {
                Grid::new("alarms").striped(true).show(ui, |ui| {
                    for (name, alarm) in alarms {
                        ui.label(name.as_str());
                        ui.label(alarm.fire_at.format("%a %H:%M").to_string());
                        ui.label(format!("intensity {}", alarm.intensity));
                        ui.label(format!("{}s", alarm.duration_secs()));
                        ui.label(if alarm.vibrate_before { "vibrates first" } else { "" });
                        if ui.button("edit").clicked() {
                            self.open(ui, &alarm_link("edit", name));
                        }
                        ui.end_row();
                    }
                });
            }
        }
    }
}

impl eframe::App for ClockWindow {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.refresh();
        CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading(WINDOW_TITLE);
                ui.label(chrono::Local::now().format("%H:%M").to_string());
            });
            ui.hyperlink_to(format!("open alarms ({})", self.url), &self.url);
            ui.horizontal(|ui| {
                if ui.button("add alarm").clicked() {
                    self.open(ui, "/add");
                }
                if ui.button("setup").clicked() {
                    self.open(ui, "/setup");
                }
            });
            ui.label(if self.scheduler.is_running() {
                "alarm loop running"
            } else {
                "alarm loop not running"
            });
            ui.separator();
            ScrollArea::vertical().show(ui, |ui| self.list_alarms(ui));
        });
        // keep the clock and the list fresh without user input
        ctx.request_repaint_after(Duration::from_secs(1));
    }
}

fn page_url(base: &str, path: &str) -> String {
    format!("{}{path}", base.trim_end_matches('/'))
}

/// open the window, returns when it is closed
pub fn run(
    url: String,
    store: AlarmStore,
    scheduler: SchedulerHandle,
) -> Result<(), eframe::Error> {
    let native_options = eframe::NativeOptions {
        viewport: ViewportBuilder::default()
            .with_title(WINDOW_TITLE)
            .with_inner_size([785.0, 400.0]),
        ..Default::default()
    };
    run_native(
        WINDOW_TITLE,
        native_options,
        Box::new(|_| Ok(Box::new(ClockWindow::new(url, store, scheduler)))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_urls_point_into_web_ui() {
        assert_eq!(page_url("http://localhost:1260", "/add"), "http://localhost:1260/add");
        assert_eq!(page_url("http://localhost:1260/", "/setup"), "http://localhost:1260/setup");
        assert_eq!(
            page_url("http://localhost:1260", &alarm_link("edit", "Nap time")),
            "http://localhost:1260/edit/Nap%20time"
        );
    }
}
