mod form;
mod map;

use form::{FormField, Observation, ReportForm};
use guardcore::model::{DashboardSnapshot, ReportStatus, Severity, UserReport};
use guardcore::view::marker::{report_palette, severity_color, POINT_FILL, SENSOR_BLUE};
use guardcore::view::{
    DashboardPage, DetectionCard, IncidentCard, MapController, MarkerId, Notice, Popup, Rgb,
};
use iced::{
    time,
    widget::{button, column, row, scrollable, text, text_input, Canvas, Column, Container},
    Alignment, Color, Element, Length, Size, Subscription, Task, Theme, Vector,
};
use map::{CanvasSurface, MapCanvas};
use serde::Deserialize;
use std::time::Duration;

const AGGREGATOR_URL_VAR: &str = "GUARDGRID_AGGREGATOR_URL";
const DEFAULT_AGGREGATOR_URL: &str = "http://127.0.0.1:9000";
const POLL_INTERVAL: Duration = Duration::from_secs(5);
const FRAME_INTERVAL: Duration = Duration::from_millis(16);
const MAX_NOTICES: usize = 5;

fn main() -> iced::Result {
    env_logger::init();
    iced::application(Dashboard::boot, Dashboard::update, Dashboard::view)
        .title(application_title)
        .subscription(application_subscription)
        .theme(application_theme)
        .run()
}

fn application_title(_: &Dashboard) -> String {
    "GuardGrid Wildfire Dashboard".into()
}

fn application_subscription(state: &Dashboard) -> Subscription<Message> {
    let poll = time::every(POLL_INTERVAL).map(|_| Message::Poll);
    if state.is_flying() {
        Subscription::batch([poll, time::every(FRAME_INTERVAL).map(Message::AnimationFrame)])
    } else {
        poll
    }
}

fn application_theme(_: &Dashboard) -> Theme {
    Theme::Dark
}

struct Dashboard {
    aggregator_url: String,
    page: DashboardPage,
    map: MapController<CanvasSurface>,
    popup: Option<Popup>,
    form: ReportForm,
    notices: Vec<Notice>,
    status: String,
}

#[derive(Debug, Clone)]
pub enum Message {
    Poll,
    SnapshotFetched(Result<DashboardSnapshot, String>),
    AnimationFrame(time::Instant),
    ViewportResized(Size),
    MapPanned(Vector),
    MapZoomed(f32),
    MarkerHovered(Option<MarkerId>),
    MarkerClicked(MarkerId),
    MapClicked,
    IncidentSelected(String),
    DismissNotice(usize),
    FormFieldChanged(FormField, String),
    ObservationToggled(Observation),
    SubmitReport,
    ReportSubmitted(Result<UserReport, String>),
}

impl Dashboard {
    fn boot() -> (Self, Task<Message>) {
        let aggregator_url = std::env::var(AGGREGATOR_URL_VAR)
            .unwrap_or_else(|_| DEFAULT_AGGREGATOR_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        log::info!("polling aggregator at {aggregator_url}");

        let mut map = MapController::new();
        map.mount(CanvasSurface::new());

        let fetch = fetch_snapshot(aggregator_url.clone());
        (
            Dashboard {
                aggregator_url,
                page: DashboardPage::new(),
                map,
                popup: None,
                form: ReportForm::default(),
                notices: Vec::new(),
                status: "Loading wildfire data...".into(),
            },
            Task::perform(fetch, Message::SnapshotFetched),
        )
    }

    fn update(state: &mut Self, message: Message) -> Task<Message> {
        match message {
            Message::Poll => {
                return Task::perform(
                    fetch_snapshot(state.aggregator_url.clone()),
                    Message::SnapshotFetched,
                );
            }
            Message::SnapshotFetched(Ok(snapshot)) => {
                state.page.apply_snapshot(&snapshot);
                for notice in state.page.take_notices() {
                    state.push_notice(notice);
                }
                state.page.sync(&mut state.map);
                state.status = format!(
                    "{} incidents | {} sensors | {} reports | {} events | {} detections",
                    state.page.incidents.data.len(),
                    state.page.sensors.data.len(),
                    state.page.reports.data.len(),
                    state.page.events.data.len(),
                    state.page.detections.data.len(),
                );
            }
            Message::SnapshotFetched(Err(err)) => {
                log::warn!("snapshot fetch failed: {err}");
                state.status = format!("Aggregator unreachable: {err}");
            }
            Message::AnimationFrame(now) => {
                if let Some(surface) = state.map.surface_mut() {
                    surface.advance(now);
                }
            }
            Message::ViewportResized(size) => {
                if let Some(surface) = state.map.surface_mut() {
                    surface.set_viewport(size);
                }
            }
            Message::MapPanned(delta) => {
                if let Some(surface) = state.map.surface_mut() {
                    surface.pan(delta);
                }
            }
            Message::MapZoomed(steps) => {
                if let Some(surface) = state.map.surface_mut() {
                    surface.zoom_by(steps);
                }
            }
            Message::MarkerHovered(id) => state.map.hover(id),
            Message::MarkerClicked(id) => {
                state.popup = state.map.popup(id).cloned();
                if state.page.handle_marker_click(&state.map, id) {
                    state.page.sync(&mut state.map);
                }
            }
            Message::MapClicked => state.popup = None,
            Message::IncidentSelected(id) => {
                state.page.select(&id);
                state.popup = None;
                state.page.sync(&mut state.map);
            }
            Message::DismissNotice(index) => {
                if index < state.notices.len() {
                    state.notices.remove(index);
                }
            }
            Message::FormFieldChanged(field, value) => state.form.update_field(field, value),
            Message::ObservationToggled(observation) => state.form.toggle(observation),
            Message::SubmitReport => {
                if state.form.submitting {
                    return Task::none();
                }
                state.form.submitting = true;
                state.status = "Submitting report...".into();
                return Task::perform(
                    submit_report(state.aggregator_url.clone(), state.form.clone()),
                    Message::ReportSubmitted,
                );
            }
            Message::ReportSubmitted(Ok(report)) => {
                log::info!("report {} submitted", report.id);
                state.form.reset();
                state.status =
                    "Report submitted. Thank you for helping keep your community safe.".into();
                return Task::perform(
                    fetch_snapshot(state.aggregator_url.clone()),
                    Message::SnapshotFetched,
                );
            }
            Message::ReportSubmitted(Err(err)) => {
                log::warn!("report submission failed: {err}");
                state.form.submitting = false;
                state.status = err;
            }
        }
        Task::none()
    }

    fn view(state: &Self) -> Element<'_, Message> {
        let layout = row![
            state.sidebar_view(),
            state.map_view(),
            state.report_view(),
        ]
        .spacing(16)
        .align_y(Alignment::Start)
        .padding(16);

        Container::new(layout)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn is_flying(&self) -> bool {
        self.map.surface().is_some_and(CanvasSurface::is_flying)
    }

    fn push_notice(&mut self, notice: Notice) {
        self.notices.push(notice);
        if self.notices.len() > MAX_NOTICES {
            self.notices.remove(0);
        }
    }

    fn sidebar_view(&self) -> Element<'_, Message> {
        let sidebar = self.page.sidebar();

        let mut detections = Column::new().spacing(8);
        if self.page.detections.loading {
            detections = detections.push(text("Loading satellite detections...").size(12));
        } else if sidebar.detections.is_empty() {
            detections = detections.push(text("No thermal detections").size(12));
        }
        for card in &sidebar.detections {
            detections = detections.push(detection_card(card));
        }
        if let Some(note) = &sidebar.overflow_note {
            detections = detections.push(text(note.clone()).size(11));
        }

        let contained = sidebar
            .contained
            .iter()
            .fold(Column::new().spacing(8), |col, card| col.push(incident_card(card)));

        let locations = self.page.fire_locations();
        let areas = if locations.is_empty() {
            Column::new().push(text("No located fires yet").size(12))
        } else {
            locations.iter().fold(Column::new().spacing(2), |col, location| {
                col.push(text(location.to_string()).size(12))
            })
        };

        let content = column![
            text("Wildfire Monitor").size(24),
            row![
                text(format!("{} active", sidebar.active_count))
                    .size(16)
                    .color(rgb(severity_color(Severity::Critical))),
                text(format!("{} contained", sidebar.contained_count)).size(16),
            ]
            .spacing(12),
            text("Satellite detections").size(18),
            detections,
            text("Contained incidents").size(18),
            contained,
            text("Areas with active fire").size(18),
            areas,
        ]
        .spacing(10)
        .padding(6);

        Container::new(scrollable(content).height(Length::Fill))
            .width(Length::Fixed(320.0))
            .height(Length::Fill)
            .into()
    }

    fn map_view(&self) -> Element<'_, Message> {
        let canvas: Element<'_, Message> = match self.map.surface() {
            Some(surface) => Canvas::new(MapCanvas { surface })
                .width(Length::Fill)
                .height(Length::Fill)
                .into(),
            None => text("Map unavailable").into(),
        };

        let popup = self
            .popup
            .as_ref()
            .map(popup_view)
            .unwrap_or_else(|| Column::new().push(text("Click a marker for details").size(12)));

        let notices = self.notices.iter().enumerate().fold(
            Column::new().spacing(4),
            |col, (index, notice)| {
                col.push(
                    row![
                        column![
                            text(notice.title.clone())
                                .size(14)
                                .color(Color::from_rgb(0.94, 0.33, 0.31)),
                            text(notice.description.clone()).size(12),
                        ]
                        .width(Length::Fill),
                        button("Dismiss")
                            .on_press(Message::DismissNotice(index))
                            .padding(4),
                    ]
                    .spacing(8)
                    .align_y(Alignment::Center),
                )
            },
        );

        column![
            notices,
            canvas,
            row![popup.width(Length::Fill), legend_view()].spacing(16),
            text(&self.status).size(13),
        ]
        .spacing(10)
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
    }

    fn report_view(&self) -> Element<'_, Message> {
        let toggle = |label: &str, observation: Observation| {
            let mark = if self.form.is_checked(observation) { "[x]" } else { "[ ]" };
            button(text(format!("{mark} {label}")).size(13))
                .on_press(Message::ObservationToggled(observation))
                .padding(6)
        };

        let submit = button(if self.form.submitting { "Submitting..." } else { "Submit report" })
            .on_press_maybe((!self.form.submitting).then_some(Message::SubmitReport))
            .padding(10);

        column![
            text("Report a Fire").size(22),
            text_input("Address (optional)", &self.form.address)
                .on_input(|value| Message::FormFieldChanged(FormField::Address, value))
                .padding(6),
            row![
                text_input("Latitude", &self.form.latitude)
                    .on_input(|value| Message::FormFieldChanged(FormField::Latitude, value))
                    .padding(6),
                text_input("Longitude", &self.form.longitude)
                    .on_input(|value| Message::FormFieldChanged(FormField::Longitude, value))
                    .padding(6),
            ]
            .spacing(6),
            text("Used when no address is given.").size(11),
            toggle("Visible smoke", Observation::Smoke),
            toggle("Visible flames", Observation::Flames),
            toggle("Smell of smoke", Observation::Smell),
            text_input("What do you see?", &self.form.description)
                .on_input(|value| Message::FormFieldChanged(FormField::Description, value))
                .padding(6),
            text_input("Photo file (optional)", &self.form.photo_path)
                .on_input(|value| Message::FormFieldChanged(FormField::PhotoPath, value))
                .padding(6),
            submit,
        ]
        .spacing(10)
        .padding(6)
        .width(Length::Fixed(300.0))
        .into()
    }
}

fn detection_card<'a>(card: &DetectionCard) -> Element<'a, Message> {
    Container::new(
        column![
            row![
                text(card.place.clone()).size(14).width(Length::Fill),
                text(card.badge.label().to_uppercase())
                    .size(11)
                    .color(rgb(severity_color(card.badge))),
            ],
            text(card.coordinates.clone()).size(11),
            text(format!("Brightness {} | FRP {}", card.brightness, card.frp)).size(11),
            text(format!("{} | confidence {}", card.date, card.confidence)).size(11),
        ]
        .spacing(2),
    )
    .padding(6)
    .into()
}

fn incident_card<'a>(card: &IncidentCard) -> Element<'a, Message> {
    let marker = if card.is_selected { "> " } else { "" };
    button(
        column![
            text(format!("{marker}{}", card.name)).size(14),
            text(card.location.clone()).size(11),
            text(format!(
                "Started {} | {} | {} contained | {} personnel",
                card.started, card.size, card.containment, card.personnel
            ))
            .size(11),
        ]
        .spacing(2),
    )
    .on_press(Message::IncidentSelected(card.id.clone()))
    .width(Length::Fill)
    .padding(6)
    .into()
}

fn popup_view(popup: &Popup) -> Column<'_, Message> {
    let mut content = Column::new().spacing(3).push(
        row![
            text(popup.title.clone()).size(16).color(rgb(popup.accent)),
            text(popup.badge.clone().unwrap_or_default()).size(11),
        ]
        .spacing(8),
    );
    if let Some(body) = &popup.body {
        content = content.push(text(body.clone()).size(12));
    }
    for line in &popup.lines {
        content = content.push(text(format!("{}: {}", line.label, line.value)).size(12));
    }
    if !popup.tags.is_empty() {
        content = content.push(text(popup.tags.join(" | ")).size(11));
    }
    if let Some(footer) = &popup.footer {
        content = content.push(text(footer.clone()).size(10));
    }
    content
}

fn legend_view() -> Column<'static, Message> {
    let entries = [
        ("Critical incident", severity_color(Severity::Critical)),
        ("High incident", severity_color(Severity::High)),
        ("Medium incident", severity_color(Severity::Medium)),
        ("Low incident", severity_color(Severity::Low)),
        ("Ground sensor", SENSOR_BLUE),
        ("Satellite fire", POINT_FILL),
        ("Citizen report", report_palette(ReportStatus::Pending).0),
    ];
    entries.into_iter().fold(
        Column::new().spacing(2).push(text("Legend").size(14)),
        |col, (label, color)| col.push(text(format!("\u{25cf} {label}")).size(11).color(rgb(color))),
    )
}

fn rgb(color: Rgb) -> Color {
    Color::from_rgb8(color.r, color.g, color.b)
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

async fn fetch_snapshot(base_url: String) -> Result<DashboardSnapshot, String> {
    let response = reqwest::get(format!("{base_url}/snapshot"))
        .await
        .map_err(|e| e.to_string())?;
    if !response.status().is_success() {
        return Err(format!("snapshot request returned {}", response.status()));
    }
    response
        .json::<DashboardSnapshot>()
        .await
        .map_err(|e| e.to_string())
}

async fn submit_report(base_url: String, form: ReportForm) -> Result<UserReport, String> {
    let photo = match form.photo_file() {
        Some(path) => Some(form::read_photo(path.to_string()).await?),
        None => None,
    };
    let submission = form.to_submission(photo)?;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{base_url}/reports"))
        .json(&submission)
        .send()
        .await
        .map_err(|e| e.to_string())?;
    if response.status().is_success() {
        return response
            .json::<UserReport>()
            .await
            .map_err(|e| e.to_string());
    }
    let status = response.status();
    match response.json::<ErrorBody>().await {
        Ok(body) => Err(body.error),
        Err(_) => Err(format!("Failed to submit report: {status}")),
    }
}
