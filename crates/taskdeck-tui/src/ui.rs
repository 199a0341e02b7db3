use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Paragraph};
use ratatui::Frame;

use taskdeck_core::config::StatusStyle;

use crate::app::{App, SPINNER_FRAMES};

pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let block = Block::bordered()
        .border_type(BorderType::Plain)
        .border_style(Style::default().fg(Color::Cyan))
        .title(
            Line::from(format!("⚡ Taskdeck [{}]", app.session_id()))
                .cyan()
                .bold(),
        );
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines: Vec<Line> = Vec::new();
    if let Some(message) = app.error_message() {
        lines.push(Line::from(message.to_string()).red());
        lines.push(Line::default());
    }

    if app.tasks.is_empty() {
        lines.push(Line::from("No tasks").dark_gray());
    } else {
        for task in &app.tasks {
            let style = app.config.style_for(task.status);
            lines.push(task_line(&style, &task.title, app.spinner_frame));
        }
    }

    frame.render_widget(Paragraph::new(lines), pad(inner));
}

fn task_line(style: &StatusStyle, title: &str, spinner_frame: usize) -> Line<'static> {
    let icon = if style.use_spinner {
        SPINNER_FRAMES[spinner_frame].to_string()
    } else {
        style.icon.clone()
    };

    let mut title_style = Style::default().fg(color_from_name(&style.text_color));
    if style.strikethrough {
        title_style = title_style.add_modifier(Modifier::CROSSED_OUT);
    }

    Line::from(vec![
        Span::styled(icon, Style::default().fg(color_from_name(&style.icon_color))),
        Span::raw(" "),
        Span::styled(title.to_string(), title_style),
    ])
}

fn color_from_name(name: &str) -> Color {
    match name {
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "white" => Color::White,
        "gray" | "grey" => Color::DarkGray,
        _ => Color::Reset,
    }
}

fn pad(area: Rect) -> Rect {
    Rect {
        x: area.x.saturating_add(1),
        y: area.y,
        width: area.width.saturating_sub(2),
        height: area.height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn color_names_map_to_terminal_colors() {
        assert_eq!(color_from_name("red"), Color::Red);
        assert_eq!(color_from_name("grey"), Color::DarkGray);
        assert_eq!(color_from_name("mauve"), Color::Reset);
    }

    #[test]
    fn draw_renders_titles_and_placeholder() {
        let temp = TempDir::new().expect("tempdir");
        fs::write(
            temp.path().join("tasks.json"),
            r#"{"s1":[{"id":1,"title":"ship it","status":"pending"}]}"#,
        )
        .expect("write tasks");

        let app = App::new(temp.path().to_path_buf(), "s1".to_string());
        let backend = TestBackend::new(40, 6);
        let mut terminal = Terminal::new(backend).expect("terminal");
        terminal.draw(|frame| draw(frame, &app)).expect("draw");
        let rendered = format!("{:?}", terminal.backend().buffer());
        assert!(rendered.contains("ship it"));

        let empty = App::new(temp.path().to_path_buf(), "other".to_string());
        terminal.draw(|frame| draw(frame, &empty)).expect("draw");
        let rendered = format!("{:?}", terminal.backend().buffer());
        assert!(rendered.contains("No tasks"));
    }
}
