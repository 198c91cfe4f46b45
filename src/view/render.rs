use chrono::Local;

use crate::view::state::{StadiumView, ViewState};

const WIDTH: usize = 56;

fn rule(ch: char) -> String {
    format!("+{}+", ch.to_string().repeat(WIDTH))
}

fn centered(text: &str) -> String {
    let len = text.chars().count();
    if len >= WIDTH {
        let clipped: String = text.chars().take(WIDTH).collect();
        return format!("|{clipped}|");
    }
    let left = (WIDTH - len) / 2;
    let right = WIDTH - len - left;
    format!("|{}{}{}|", " ".repeat(left), text, " ".repeat(right))
}

fn idle_lines(view: &StadiumView) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(alert) = view.alert() {
        lines.push(centered(&format!("!! {alert}")));
        lines.push(centered(""));
    }
    let drop_zone = if view.drag_active() {
        vec![
            centered("[ RELEASE TO UPLOAD ]"),
            centered(""),
            centered("DROP YOUR PHOTO HERE"),
        ]
    } else {
        vec![
            centered("[ CAMERA ]"),
            centered(""),
            centered("DROP YOUR PHOTO HERE"),
            centered("or click to upload"),
        ]
    };
    lines.extend(drop_zone);
    lines
}

fn analyzing_lines(view: &StadiumView) -> Vec<String> {
    let mut lines = vec![centered("( o )"), centered("SCANNING CROWD...")];
    if let Some(file_name) = view.file_name() {
        lines.push(centered(""));
        lines.push(centered(&format!("on screen: {file_name}")));
    }
    lines
}

fn match_lines(view: &StadiumView) -> Vec<String> {
    let Some(result) = view.result() else {
        return Vec::new();
    };
    let you = view.file_name().unwrap_or("you");
    let portrait = result.match_image_url.as_deref().unwrap_or("?");
    vec![
        centered(&format!("YOU ({you})")),
        centered(""),
        centered("LOOKS LIKE"),
        centered(""),
        centered(&result.match_name.to_uppercase()),
        centered(portrait),
        centered(""),
        centered("ANNOUNCER SAYS:"),
        centered(&format!("\"{}\"", result.match_comment)),
        centered(&format!("Reason: {}", result.match_reason)),
        centered(""),
        centered("[ PLAY AGAIN ]"),
    ]
}

/// Draws the jumbotron for the current state with the given footer clock.
pub fn render_at(view: &StadiumView, clock: &str) -> String {
    let body = match view.state() {
        ViewState::Idle => idle_lines(view),
        ViewState::Analyzing => analyzing_lines(view),
        ViewState::MatchFound => match_lines(view),
    };

    let mut lines = vec![rule('='), centered("LOOKALIKE CAM"), rule('=')];
    lines.push(centered(""));
    lines.extend(body);
    lines.push(centered(""));
    lines.push(rule('-'));
    let footer = format!("CAM-01 [REC]  LIVE BROADCAST // STADIUM FEED  {clock}");
    lines.push(centered(&footer));
    lines.push(rule('='));
    lines.join("\n")
}

pub fn render(view: &StadiumView) -> String {
    render_at(view, &Local::now().format("%H:%M:%S").to_string())
}
