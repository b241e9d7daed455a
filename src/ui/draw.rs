use anyhow::Result;
use ratatui::backend::Backend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::line::NORMAL as LINE;
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState,
};
use ratatui::{Frame, Terminal};
// Use Popup from tui-widgets to render modals
use tui_widgets::popup::Popup;

use crate::config::{RgbColor, TopBarButton};
use crate::contact::{ContactRecord, FieldId};
use crate::controller::{Dialog, Severity, ViewPayload};
use crate::filter::SearchFilter;
use crate::tree::TreeRow;

use super::app::App;
use super::edit::SearchRow;
use super::panes::Panel;

const TREE_HELP: &str = "j/k: move  Enter: open  Space: expand  Tab: contacts";
const LIST_HELP: &str = "j/k: move  Enter/e: edit  a: add  /: search  Tab: navigation";
const SEARCH_HELP: &str = "Enter: search  Tab/Up/Down: move  Space: toggle  Esc: back";
const FORM_HELP: &str = "Enter: save  Tab/Up/Down: move  Esc: cancel";
const HELP_MODAL_FOOTER: &str = "Esc/q: close";
const SHARE_TEXT: &str = "Send this address book to a friend.\n\nSharing is not available in this build.";

const LIST_COLUMNS: [FieldId; 4] = [FieldId::Name, FieldId::Email, FieldId::Phone, FieldId::City];

pub fn render<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    terminal.draw(|frame| draw_frame(frame, app))?;
    Ok(())
}

fn draw_frame(frame: &mut Frame<'_>, app: &mut App) {
    let size = frame.area();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(size);

    draw_header(frame, layout[0], app);
    draw_body(frame, layout[1], app);
    draw_footer(frame, layout[2], app);

    match app.dialog() {
        Some(Dialog::Help) => draw_help_modal(frame, size, app),
        Some(Dialog::Share) => draw_share_modal(frame, size, app),
        None => {}
    }
}

fn draw_header(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let buttons_width = calculate_buttons_width(app.top_bar_buttons()).min(area.width);
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(buttons_width)])
        .split(area);

    let title = Line::from(vec![
        Span::styled(" ADDRBOOK ", header_text_style(app).add_modifier(Modifier::BOLD)),
        Span::styled(LINE.vertical, separator_style(app)),
        Span::raw(format!(" {}", app.controller.view().title())),
    ]);
    frame.render_widget(Paragraph::new(title), chunks[0]);
    draw_top_bar_buttons(frame, chunks[1], app);
}

fn calculate_buttons_width(buttons: &[TopBarButton]) -> u16 {
    if buttons.is_empty() {
        return 0;
    }
    let button_width = button_content_width(buttons);
    let count = buttons.len() as u16;
    button_width * count + count.saturating_sub(1)
}

// " F1: TITLE " with keys padded to three columns
fn button_content_width(buttons: &[TopBarButton]) -> u16 {
    (1 + 3 + 2 + max_title_len(buttons) + 1) as u16
}

fn max_title_len(buttons: &[TopBarButton]) -> usize {
    buttons
        .iter()
        .map(|b| b.action.title().len())
        .max()
        .unwrap_or(0)
}

fn draw_top_bar_buttons(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let buttons = app.top_bar_buttons();
    if buttons.is_empty() || area.width == 0 {
        return;
    }

    let max_title_len = max_title_len(buttons);
    let button_width = button_content_width(buttons);

    let colors = app.ui_colors();
    let button_style = Style::default()
        .fg(color(colors.selection_fg))
        .bg(color(colors.selection_bg))
        .add_modifier(Modifier::BOLD);

    let mut x = area.x;
    for (idx, button) in buttons.iter().enumerate() {
        if x + button_width > area.x + area.width {
            break;
        }

        let text = format!(
            " {}: {:^width$} ",
            button.key,
            button.action.title(),
            width = max_title_len
        );
        let button_area = Rect::new(x, area.y, button_width, 1);
        frame.render_widget(
            Paragraph::new(text).style(button_style).alignment(Alignment::Center),
            button_area,
        );
        x += button_width;

        if idx < buttons.len() - 1 && x < area.x + area.width {
            frame.render_widget(Paragraph::new(" "), Rect::new(x, area.y, 1, 1));
            x += 1;
        }
    }
}

fn draw_body(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let tree_width = app.tree_width().min(area.width / 2);
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(tree_width), Constraint::Min(0)])
        .split(area);

    draw_tree(frame, chunks[0], app);
    draw_main(frame, chunks[1], app);
}

fn pane_block(app: &App, panel: Panel, title: String) -> Block<'static> {
    let active = app.focus == panel;
    let title_style = if active {
        header_text_style(app).add_modifier(Modifier::BOLD)
    } else {
        header_text_style(app)
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app, active))
        .title(Line::from(Span::styled(format!(" {} ", title), title_style)))
}

fn draw_tree(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let block = pane_block(app, Panel::Tree, Panel::Tree.title().to_string());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = app.tree_rows();
    let items: Vec<ListItem> = rows.iter().map(|row| build_tree_item(row, app)).collect();

    let mut state = ListState::default();
    if app.focus == Panel::Tree && !rows.is_empty() {
        state.select(Some(app.tree_cursor.min(rows.len() - 1)));
    }

    let list = List::new(items)
        .highlight_style(selection_style(app))
        .highlight_symbol(" ")
        .repeat_highlight_symbol(false);
    frame.render_stateful_widget(list, inner, &mut state);
}

fn build_tree_item(row: &TreeRow, app: &App) -> ListItem<'static> {
    let indent = "  ".repeat(row.depth as usize);
    let marker = match (row.children_allowed, row.expanded) {
        (true, true) => "▾ ",
        (true, false) => "▸ ",
        (false, _) => "  ",
    };
    let text = format!("{}{}{}", indent, marker, row.caption);

    let mut item = ListItem::new(Line::from(text));
    if row.selected {
        item = item.style(header_text_style(app).add_modifier(Modifier::BOLD));
    }
    item
}

fn draw_main(frame: &mut Frame<'_>, area: Rect, app: &App) {
    match app.controller.current_view() {
        ViewPayload::List { filter, records } => draw_contact_list(frame, area, app, filter, &records),
        ViewPayload::SearchEntry => draw_search_form(frame, area, app),
    }

    if app.editor.active {
        draw_contact_form(frame, area, app);
    }
}

fn draw_contact_list(
    frame: &mut Frame<'_>,
    area: Rect,
    app: &App,
    filter: Option<&SearchFilter>,
    records: &[&ContactRecord],
) {
    let store = app.controller.store();
    let view_title = app.controller.view().title();
    let title = match filter {
        Some(filter) => format!(
            "{} {} {} ({}/{})",
            view_title,
            LINE.vertical,
            filter,
            records.len(),
            store.len()
        ),
        None => format!("{} ({})", view_title, store.len()),
    };
    let block = pane_block(app, Panel::Main, title);

    if records.is_empty() {
        let message = if store.is_empty() {
            "No contacts"
        } else {
            "No matching contacts"
        };
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Paragraph::new(message).alignment(Alignment::Center), inner);
        return;
    }

    let header = Row::new(
        LIST_COLUMNS
            .iter()
            .map(|field| Cell::from(field.label().to_string())),
    )
    .style(header_text_style(app).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = records
        .iter()
        .map(|record| {
            Row::new(
                LIST_COLUMNS
                    .iter()
                    .map(|field| Cell::from(record.field(*field).into_owned())),
            )
        })
        .collect();

    let widths = [
        Constraint::Percentage(30),
        Constraint::Percentage(35),
        Constraint::Percentage(17),
        Constraint::Percentage(18),
    ];

    let mut state = TableState::default();
    if app.focus == Panel::Main {
        state.select(Some(app.list_selected.min(records.len() - 1)));
    }

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .highlight_style(selection_style(app));
    frame.render_stateful_widget(table, area, &mut state);
}

fn draw_search_form(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let block = pane_block(app, Panel::Main, app.controller.view().title().to_string());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let form = &app.search_form;
    let active = app.focus == Panel::Main && !app.editor.active;
    let label_width = 12usize;

    let check = |on: bool| if on { "[x]" } else { "[ ]" };
    let lines: Vec<Line> = SearchRow::ALL
        .iter()
        .map(|row| {
            let (label, value) = match row {
                SearchRow::Field => ("Field", format!("< {} >", form.field.label())),
                SearchRow::Term => ("Term", form.term.value().to_string()),
                SearchRow::MatchCase => ("Match case", check(form.match_case).to_string()),
                SearchRow::Prefix => ("Prefix only", check(form.only_prefix).to_string()),
            };
            let highlight = active && form.row == *row;
            let (label_style, value_style) = line_styles(app, highlight);
            Line::from(vec![
                Span::styled(format!(" {:<width$}", label, width = label_width), label_style),
                Span::styled(value, value_style),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), inner);

    if active && form.row == SearchRow::Term {
        let x = inner.x + 1 + label_width as u16 + form.term.visual_cursor() as u16;
        let y = inner.y + 1;
        if x < inner.x + inner.width && y < inner.y + inner.height {
            frame.set_cursor_position((x, y));
        }
    }
}

fn draw_contact_form(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let editor = &app.editor;
    let field_count = editor.fields().count() as u16;
    let width = area.width.saturating_sub(4).min(60);
    let height = (field_count + 2).min(area.height);
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let modal_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, modal_area);

    let title = if editor.target().is_some() {
        " EDIT CONTACT "
    } else {
        " NEW CONTACT "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app, true))
        .title(Line::from(Span::styled(title, header_text_style(app))))
        .title_alignment(Alignment::Center);
    let inner = block.inner(modal_area);
    frame.render_widget(block, modal_area);

    let label_width = FieldId::EDITABLE
        .iter()
        .map(|field| field.label().len())
        .max()
        .unwrap_or(0)
        + 2;

    let lines: Vec<Line> = editor
        .fields()
        .enumerate()
        .map(|(idx, (field, value))| {
            let (label_style, value_style) = line_styles(app, idx == editor.focused());
            Line::from(vec![
                Span::styled(
                    format!(" {:<width$}", field.label(), width = label_width),
                    label_style,
                ),
                Span::styled(value.to_string(), value_style),
            ])
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);

    let cursor_x = inner.x + 1 + label_width as u16 + editor.visual_cursor() as u16;
    let cursor_y = inner.y + editor.focused() as u16;
    if cursor_x < inner.x + inner.width && cursor_y < inner.y + inner.height {
        frame.set_cursor_position((cursor_x, cursor_y));
    }
}

fn draw_footer(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let hint = if app.dialog().is_some() {
        HELP_MODAL_FOOTER
    } else if app.editor.active {
        FORM_HELP
    } else {
        match app.focus {
            Panel::Tree => TREE_HELP,
            Panel::Main => match app.controller.current_view() {
                ViewPayload::SearchEntry => SEARCH_HELP,
                ViewPayload::List { .. } => LIST_HELP,
            },
        }
    };
    let message = match &app.status {
        Some(status) => format!(" {}  {}  {}", status, LINE.vertical, hint),
        None => format!(" {}", hint),
    };

    let colors = app.ui_colors();
    let mut style = Style::default()
        .fg(color(colors.status_fg))
        .bg(color(colors.status_bg));
    if status_is_warning(app) {
        style = style.add_modifier(Modifier::BOLD | Modifier::REVERSED);
    }

    let background = Block::default().style(Style::default().bg(color(colors.status_bg)));
    frame.render_widget(background, area);
    frame.render_widget(Paragraph::new(message).style(style), area);
}

/// Whether the status line is showing a warning from the controller.
fn status_is_warning(app: &App) -> bool {
    match (app.status.as_deref(), app.controller.last_notification()) {
        (Some(status), Some(notification)) => {
            notification.severity == Severity::Warning && notification.message == status
        }
        _ => false,
    }
}

fn draw_help_modal(frame: &mut Frame<'_>, area: Rect, app: &App) {
    // 2/3 width, 80% height
    let width = area.width.saturating_mul(2).saturating_div(3).max(40).min(area.width);
    let height = area.height.saturating_mul(4).saturating_div(5).max(10).min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let modal_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, modal_area);

    let header_style = header_text_style(app);
    let content_width = width.saturating_sub(4) as usize;
    let action_width = 20usize;

    let sections = app.help_entries();
    let mut lines: Vec<Line> = Vec::new();
    for (section_idx, section) in sections.iter().enumerate() {
        let header_text = format!(" {} ", section.title);
        let padding_total = content_width.saturating_sub(header_text.len());
        let left_pad = padding_total / 2;
        let right_pad = padding_total - left_pad;
        lines.push(Line::from(Span::styled(
            format!(
                "{}{}{}",
                LINE.horizontal.repeat(left_pad),
                header_text,
                LINE.horizontal.repeat(right_pad)
            ),
            header_style,
        )));

        for entry in &section.entries {
            lines.push(Line::from(vec![
                Span::raw(format!("{:<width$}", entry.action, width = action_width)),
                Span::styled(entry.keys.clone(), header_style),
            ]));
        }

        if section_idx < sections.len() - 1 {
            lines.push(Line::from(""));
        }
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app, true))
        .title(Line::from(Span::styled(" HELP ", header_style)))
        .title_bottom(Line::from(Span::styled(
            format!(" {} ", HELP_MODAL_FOOTER),
            header_style,
        )))
        .title_alignment(Alignment::Center);

    let inner = block.inner(modal_area);
    frame.render_widget(block, modal_area);
    frame.render_widget(Paragraph::new(lines), inner);
}

fn draw_share_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let title_line = Line::from(Span::styled(" SHARE ", header_text_style(app)));
    let popup = Popup::new(Text::from(SHARE_TEXT))
        .title(title_line)
        .border_style(border_style(app, true));

    frame.render_stateful_widget_ref(popup, area, &mut app.modal_popup);
}

fn line_styles(app: &App, highlight: bool) -> (Style, Style) {
    if highlight {
        let style = selection_style(app);
        (style, style)
    } else {
        (header_text_style(app), Style::default())
    }
}

fn selection_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default()
        .fg(color(colors.selection_fg))
        .bg(color(colors.selection_bg))
}

fn border_style(app: &App, active: bool) -> Style {
    let colors = app.ui_colors();
    let style = Style::default().fg(color(colors.border));
    if active {
        style.add_modifier(Modifier::BOLD)
    } else {
        style
    }
}

fn header_text_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default().fg(color(colors.separator))
}

fn separator_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default().fg(color(colors.separator))
}

fn color(rgb: RgbColor) -> Color {
    Color::Rgb(rgb.r, rgb.g, rgb.b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::contact::ContactDraft;
    use crate::controller::ViewController;
    use crate::store::ContactStore;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::backend::TestBackend;

    fn screen(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        render(&mut terminal, app).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn app(config: &Config) -> App<'_> {
        let store = ContactStore::with_records([
            ContactDraft::new("Alice", "Smith"),
            ContactDraft::new("Bob", "Jones"),
        ]);
        App::new(ViewController::new(store), config)
    }

    #[test]
    fn test_renders_tree_and_contact_list() {
        let config = Config::default();
        let mut app = app(&config);
        let text = screen(&mut app);
        assert!(text.contains("Show All"));
        assert!(text.contains("Search"));
        assert!(text.contains("Alice Smith"));
        assert!(text.contains("Bob Jones"));
        assert!(text.contains("HELP"));
    }

    #[test]
    fn test_empty_results_and_counts() {
        let config = Config::default();
        let mut app = app(&config);
        assert!(screen(&mut app).contains("CONTACTS (2)"));

        app.handle_key(KeyEvent::new(KeyCode::F(3), KeyModifiers::NONE));
        for c in "zzz".chars() {
            app.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        }
        app.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));

        let text = screen(&mut app);
        assert!(text.contains("(0/2)"));
        assert!(text.contains("No matching contacts"));
        assert!(!status_is_warning(&app));
    }

    #[test]
    fn test_renders_filtered_results_and_saved_node() {
        let config = Config::default();
        let mut app = app(&config);
        app.handle_key(KeyEvent::new(KeyCode::F(3), KeyModifiers::NONE));
        for c in "jon".chars() {
            app.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        }
        app.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));

        let text = screen(&mut app);
        assert!(text.contains("last_name=*jon*"));
        assert!(text.contains("Bob Jones"));
        assert!(!text.contains("Alice Smith"));
    }
}
