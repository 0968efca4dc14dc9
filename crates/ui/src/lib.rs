//! ratatui-based host for the facsimile viewer.

use std::cell::RefCell;
use std::io::{self, Stdout};
use std::rc::Rc;
use std::time::Duration;

use anyhow::Context as _;
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{event, terminal};
use monocle_application::{ManifestKind, ViewerConfig, ViewerController, ViewerError};
use monocle_core::{Panel, Theme, TransformState, ViewerSettings, ZoomStep};
use monocle_engine::{ImageState, ImageStore, ManifestLoader};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, Borders, Clear, HighlightSpacing, List, ListItem, ListState, Paragraph, Wrap,
};
use ratatui_image::picker::Picker;
use ratatui_image::protocol::Protocol as ImageProtocol;
use ratatui_image::{Image as ImageWidget, Resize};
use tracing::{debug, info, warn};

mod image_protocol;
mod screen;
mod view;

use image_protocol::TerminalHints;
use screen::{Screen, TerminalRenderer};

pub struct Ui {
    controller: ViewerController,
    screen: Rc<RefCell<Screen>>,
    loader: ManifestLoader,
    images: ImageStore,
    images_seen: u64,
    image_picker: Picker,
    cursor: Cursor,
    surface_image: SurfaceImage,
    image_area: Option<Rect>,
    notice: Option<String>,
}

#[derive(Debug, Default)]
struct Cursor {
    listing: usize,
    collection: usize,
}

#[derive(Debug, Clone, PartialEq)]
struct RenderKey {
    src: String,
    transform: TransformState,
    width: u16,
    height: u16,
    theme: Theme,
}

#[derive(Default)]
struct SurfaceImage {
    key: Option<RenderKey>,
    protocol: Option<ImageProtocol>,
    error: Option<String>,
    pending: bool,
}

#[derive(Debug, Clone, Copy)]
struct Palette {
    base: Style,
    accent: Color,
    muted: Color,
    image_background: image::Rgba<u8>,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                base: Style::default().fg(Color::Gray).bg(Color::Reset),
                accent: Color::Yellow,
                muted: Color::DarkGray,
                image_background: image::Rgba([0, 0, 0, 255]),
            },
            Theme::Light => Self {
                base: Style::default().fg(Color::Black).bg(Color::White),
                accent: Color::Blue,
                muted: Color::Gray,
                image_background: image::Rgba([255, 255, 255, 255]),
            },
        }
    }
}

impl Ui {
    /// Wires a controller to the background manifest loader, the image
    /// store and a terminal renderer.
    pub fn new(settings: ViewerSettings) -> anyhow::Result<Self> {
        let loader = ManifestLoader::spawn()?;
        let images = ImageStore::spawn()?;
        let screen = Rc::new(RefCell::new(Screen::new(settings.theme)));

        let controller = ViewerController::builder()
            .settings(settings)
            .fetcher(loader.sender())
            .renderer(TerminalRenderer::new(Rc::clone(&screen)))
            .preloader(images.clone())
            .build()
            .context("wire viewer")?;

        Ok(Self {
            controller,
            screen,
            loader,
            images,
            images_seen: 0,
            image_picker: Picker::halfblocks(),
            cursor: Cursor::default(),
            surface_image: SurfaceImage::default(),
            image_area: None,
            notice: None,
        })
    }

    pub fn run(&mut self, config: ViewerConfig) -> anyhow::Result<()> {
        let mut terminal = setup_terminal()?;
        let palette = Palette::for_theme(self.controller.settings().theme);
        self.image_picker =
            image_protocol::detect_picker(TerminalHints::from_env(), palette.image_background);
        terminal.clear().ok();

        self.controller.initialize(config);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.event_loop(&mut terminal)
        }));
        let restore_result = restore_terminal(&mut terminal);

        match (result, restore_result) {
            (Ok(Ok(())), restore) => restore,
            (Ok(Err(err)), _) => Err(err),
            (Err(panic), Ok(())) => Err(anyhow::anyhow!(panic_to_string(panic))),
            (Err(panic), Err(err)) => Err(anyhow::anyhow!(
                "{}\n(additionally failed to restore terminal: {err})",
                panic_to_string(panic)
            )),
        }
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ) -> anyhow::Result<()> {
        let tick_rate = Duration::from_millis(50);
        let mut needs_redraw = true;

        loop {
            self.apply_completions();
            if self.screen.borrow_mut().take_dirty() {
                needs_redraw = true;
            }
            let images_now = self.images.generation();
            if images_now != self.images_seen {
                self.images_seen = images_now;
                needs_redraw |= self.surface_image.pending;
            }
            if needs_redraw {
                terminal.draw(|frame| self.draw(frame.area(), frame))?;
                needs_redraw = false;
            }

            if !event::poll(tick_rate)? {
                continue;
            }

            match event::read()? {
                Event::Resize(_, _) => needs_redraw = true,
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Release {
                        continue;
                    }
                    needs_redraw = true;
                    if self.handle_key(key) {
                        info!("quit");
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => {
                    if self.handle_mouse(mouse) {
                        needs_redraw = true;
                    }
                }
                _ => {}
            }
        }
    }

    fn apply_completions(&mut self) {
        for response in self.loader.poll() {
            let kind = response.kind;
            match self.controller.complete(response) {
                Ok(()) => match kind {
                    ManifestKind::Facsimile => self.cursor.collection = 0,
                    ManifestKind::Listing => self.cursor.listing = 0,
                },
                Err(err) => debug!(%err, "manifest completion not applied"),
            }
        }
        self.sync_collection_cursor();
    }

    fn sync_collection_cursor(&mut self) {
        if let Some(index) = self.controller.navigator().current_index()
            && self.controller.panel() == Panel::OneSurface
        {
            self.cursor.collection = index;
        }
    }

    /// Returns true when the viewer should close.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        self.notice = None;
        let panel = self.controller.panel();

        let result = match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('l') => self.controller.show_listing(),
            KeyCode::Char('c') => self.controller.show_collection(),
            KeyCode::Char('n') => self.controller.switch_surface(1),
            KeyCode::Char('p') => self.controller.switch_surface(-1),
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.controller.zoom_by(ZoomStep::In);
                Ok(())
            }
            KeyCode::Char('-') | KeyCode::Char('_') => {
                self.controller.zoom_by(ZoomStep::Out);
                Ok(())
            }
            KeyCode::Char('r') => {
                self.controller.rotate_step();
                Ok(())
            }
            KeyCode::Char('0') => {
                self.controller.reset_transform();
                Ok(())
            }
            KeyCode::Char('m') => {
                self.controller.toggle_metadata();
                Ok(())
            }
            KeyCode::Char('t') => {
                let theme = self.controller.cycle_theme();
                self.image_picker
                    .set_background_color(Palette::for_theme(theme).image_background);
                Ok(())
            }
            KeyCode::Up => self.arrow(panel, 0, -1),
            KeyCode::Down => self.arrow(panel, 0, 1),
            KeyCode::Left => self.arrow(panel, -1, 0),
            KeyCode::Right => self.arrow(panel, 1, 0),
            KeyCode::Enter => self.activate(panel),
            _ => Ok(()),
        };

        if let Err(err) = result {
            self.notice = Some(err.to_string());
        }
        self.sync_collection_cursor();
        false
    }

    /// Pans the surface, or moves the list cursor on the list panels.
    fn arrow(&mut self, panel: Panel, dx: i32, dy: i32) -> Result<(), ViewerError> {
        let (listing_len, thumbnail_len) = {
            let screen = self.screen.borrow();
            (screen.listing.len(), screen.thumbnails.len())
        };
        match panel {
            Panel::OneSurface => {
                self.controller.pan_by(dx, dy);
            }
            Panel::Listing => {
                self.cursor.listing = step_cursor(self.cursor.listing, dy, listing_len);
            }
            Panel::Collection => {
                let delta = if dy != 0 { dy } else { dx };
                self.cursor.collection = step_cursor(self.cursor.collection, delta, thumbnail_len);
            }
            Panel::None => {}
        }
        Ok(())
    }

    fn activate(&mut self, panel: Panel) -> Result<(), ViewerError> {
        match panel {
            Panel::Listing => self
                .controller
                .open_listing_entry(self.cursor.listing)
                .map(|_| ()),
            Panel::Collection => {
                let image_url = self
                    .screen
                    .borrow()
                    .thumbnails
                    .get(self.cursor.collection)
                    .map(|thumbnail| thumbnail.image_url.clone());
                match image_url {
                    Some(image_url) => self.controller.select_surface_by_url(&image_url),
                    None => Ok(()),
                }
            }
            Panel::OneSurface => self.controller.show_collection(),
            Panel::None => Ok(()),
        }
    }

    /// Maps mouse gestures on the image area to drag operations. Returns
    /// whether anything changed.
    fn handle_mouse(&mut self, mouse: MouseEvent) -> bool {
        let pointer = self
            .image_area
            .and_then(|area| view::pointer_in(area, mouse.column, mouse.row));

        match (mouse.kind, pointer) {
            (MouseEventKind::Down(MouseButton::Left), Some(pointer)) => {
                self.controller.begin_drag(pointer)
            }
            (MouseEventKind::Drag(MouseButton::Left), Some(pointer)) => {
                self.controller.continue_drag(pointer)
            }
            (MouseEventKind::Drag(_) | MouseEventKind::Moved, None) => {
                if self.controller.transform().is_dragging() {
                    debug!("pointer left the image; drag cancelled");
                    self.controller.cancel_drag();
                }
                false
            }
            (MouseEventKind::Up(MouseButton::Left), _) => {
                self.controller.end_drag();
                false
            }
            (MouseEventKind::ScrollUp, Some(_)) => self.controller.zoom_by(ZoomStep::In),
            (MouseEventKind::ScrollDown, Some(_)) => self.controller.zoom_by(ZoomStep::Out),
            _ => false,
        }
    }

    fn draw(&mut self, area: Rect, frame: &mut ratatui::Frame) {
        let screen = self.screen.borrow().clone();
        let palette = Palette::for_theme(screen.theme);
        frame.render_widget(Clear, area);
        frame.render_widget(Block::default().style(palette.base), area);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ])
            .split(area);

        let header = Paragraph::new(Text::from(self.header_lines(&screen)))
            .alignment(Alignment::Center)
            .style(palette.base)
            .block(Block::default().borders(Borders::BOTTOM));
        frame.render_widget(header, layout[0]);

        let (main_area, side_area) = if screen.metadata_visible && screen.panel != Panel::None {
            let body = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
                .split(layout[1]);
            (body[0], Some(body[1]))
        } else {
            (layout[1], None)
        };

        self.image_area = None;
        match screen.panel {
            Panel::None => self.draw_placeholder(&screen, &palette, main_area, frame),
            Panel::Listing => self.draw_listing(&screen, &palette, main_area, frame),
            Panel::Collection => self.draw_collection(&screen, &palette, main_area, frame),
            Panel::OneSurface => self.draw_surface(&screen, &palette, main_area, frame),
        }
        if let Some(side_area) = side_area {
            frame.render_widget(self.metadata_panel(&screen, &palette), side_area);
        }

        let footer = Paragraph::new(Text::from(self.footer_lines(&screen, &palette)))
            .alignment(Alignment::Center)
            .style(palette.base)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::TOP));
        frame.render_widget(footer, layout[2]);
    }

    fn header_lines(&self, screen: &Screen) -> Vec<Line<'static>> {
        let title = if screen.metadata.title.is_empty() {
            "Monocle".to_string()
        } else {
            format!("Monocle · {}", screen.metadata.title)
        };
        let mut status = vec![Span::raw(screen.panel.to_string())];
        if self.controller.is_loading() {
            status.push(Span::raw(" · loading"));
        }
        status.push(Span::raw(format!(
            " · {}",
            image_protocol::protocol_label(&self.image_picker)
        )));

        vec![
            Line::from(Span::styled(
                title,
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(status),
        ]
    }

    fn draw_placeholder(
        &self,
        screen: &Screen,
        palette: &Palette,
        area: Rect,
        frame: &mut ratatui::Frame,
    ) {
        let line = match &screen.error {
            Some(message) => Line::from(Span::styled(
                message.clone(),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )),
            None if self.controller.is_loading() => Line::raw("loading..."),
            None => Line::from(Span::styled(
                "Nothing to show.",
                Style::default().fg(palette.muted),
            )),
        };
        let paragraph = Paragraph::new(line)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .style(palette.base)
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(paragraph, area);
    }

    fn draw_listing(
        &mut self,
        screen: &Screen,
        palette: &Palette,
        area: Rect,
        frame: &mut ratatui::Frame,
    ) {
        let max_width = usize::from(area.width.saturating_sub(6)).max(8);
        let items = screen
            .listing
            .iter()
            .map(|item| {
                ListItem::new(Text::from(vec![
                    Line::raw(view::fit_width(&item.title, max_width)),
                    Line::from(Span::styled(
                        view::fit_width(&item.href, max_width),
                        Style::default().fg(palette.muted),
                    )),
                ]))
            })
            .collect::<Vec<_>>();

        self.cursor.listing = self.cursor.listing.min(items.len().saturating_sub(1));
        let title = format!("Listing · {} facsimiles", items.len());
        self.draw_list(items, title, self.cursor.listing, palette, area, frame);
    }

    fn draw_collection(
        &mut self,
        screen: &Screen,
        palette: &Palette,
        area: Rect,
        frame: &mut ratatui::Frame,
    ) {
        let max_width = usize::from(area.width.saturating_sub(12)).max(8);
        let items = screen
            .thumbnails
            .iter()
            .map(|thumbnail| {
                ListItem::new(Line::from(vec![
                    Span::raw(format!("{:>4}  ", thumbnail.index + 1)),
                    Span::raw(view::fit_width(&thumbnail.image_url, max_width)),
                ]))
            })
            .collect::<Vec<_>>();

        self.cursor.collection = self.cursor.collection.min(items.len().saturating_sub(1));
        let title = format!("Collection · {} surfaces", items.len());
        self.draw_list(items, title, self.cursor.collection, palette, area, frame);
    }

    fn draw_list(
        &self,
        items: Vec<ListItem<'static>>,
        title: String,
        selected: usize,
        palette: &Palette,
        area: Rect,
        frame: &mut ratatui::Frame,
    ) {
        let highlight_style = Style::default()
            .fg(Color::Black)
            .bg(palette.accent)
            .add_modifier(Modifier::BOLD);
        let has_items = !items.is_empty();
        let list = List::new(items)
            .style(palette.base)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(highlight_style)
            .highlight_symbol("> ")
            .highlight_spacing(HighlightSpacing::Always);

        let mut state = ListState::default();
        state.select(has_items.then_some(selected));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_surface(
        &mut self,
        screen: &Screen,
        palette: &Palette,
        area: Rect,
        frame: &mut ratatui::Frame,
    ) {
        let title = match &screen.surface {
            Some(surface) => format!(
                "p{}/{} · {:.0}% · {}° · {}",
                surface.index + 1,
                surface.count,
                screen.transform.scale * 100.0,
                screen.transform.rotation_degrees,
                surface.image_url
            ),
            None => "Surface".to_string(),
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .style(palette.base);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);
        self.image_area = Some(inner);
        self.ensure_surface_image(screen, palette, inner);

        if let Some(protocol) = self.surface_image.protocol.as_ref() {
            let proto_area = protocol.area();
            let draw_width = proto_area.width.min(inner.width);
            let draw_height = proto_area.height.min(inner.height);
            let draw_area = Rect::new(
                inner.x + inner.width.saturating_sub(draw_width) / 2,
                inner.y + inner.height.saturating_sub(draw_height) / 2,
                draw_width,
                draw_height,
            );
            frame.render_widget(ImageWidget::new(protocol), draw_area);
        } else {
            let message = self
                .surface_image
                .error
                .clone()
                .unwrap_or_else(|| "loading...".to_string());
            frame.render_widget(
                Paragraph::new(message)
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: true }),
                inner,
            );
        }
    }

    fn ensure_surface_image(&mut self, screen: &Screen, palette: &Palette, area: Rect) {
        let Some(surface) = screen.surface.as_ref() else {
            self.surface_image = SurfaceImage::default();
            return;
        };
        let key = RenderKey {
            src: surface.src.clone(),
            transform: screen.transform,
            width: area.width,
            height: area.height,
            theme: screen.theme,
        };
        if self.surface_image.key.as_ref() == Some(&key) && !self.surface_image.pending {
            return;
        }
        self.surface_image = SurfaceImage {
            key: Some(key),
            ..SurfaceImage::default()
        };
        if area.width == 0 || area.height == 0 {
            return;
        }

        let image = match self.images.request(&surface.src) {
            ImageState::Ready(image) => image,
            ImageState::Pending => {
                self.surface_image.pending = true;
                return;
            }
            ImageState::Failed(error) => {
                warn!(src = %surface.src, %error, "surface image unavailable");
                self.surface_image.error = Some(error);
                return;
            }
        };

        let (font_w_px, font_h_px) = self.image_picker.font_size();
        let viewport_w_px = u32::from(area.width).saturating_mul(u32::from(font_w_px.max(1)));
        let viewport_h_px = u32::from(area.height).saturating_mul(u32::from(font_h_px.max(1)));
        let composed = view::compose_surface(
            &image,
            &screen.transform,
            viewport_w_px,
            viewport_h_px,
            palette.image_background,
        );

        match self.image_picker.new_protocol(
            composed,
            Rect::new(0, 0, area.width, area.height),
            Resize::Fit(None),
        ) {
            Ok(protocol) => self.surface_image.protocol = Some(protocol),
            Err(err) => {
                warn!(src = %surface.src, %err, "image protocol encode failed");
                self.surface_image.error = Some(err.to_string());
            }
        }
    }

    fn metadata_panel(&self, screen: &Screen, palette: &Palette) -> Paragraph<'static> {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let mut lines = Vec::new();
        if !screen.metadata.title.is_empty() {
            lines.push(Line::from(Span::styled(screen.metadata.title.clone(), bold)));
            lines.push(Line::raw(""));
        }
        for (caption, value) in &screen.metadata.rows {
            lines.push(Line::from(vec![
                Span::styled(format!("{caption}: "), bold),
                Span::raw(value.clone()),
            ]));
        }
        if let Some(origin) = &screen.metadata.listing_origin {
            lines.push(Line::raw(""));
            lines.push(Line::from(vec![
                Span::styled("Listing: ", bold),
                Span::styled(origin.clone(), Style::default().fg(palette.muted)),
            ]));
        }
        if screen.panel == Panel::OneSurface
            && let Some(surface) = &screen.surface
            && !surface.links.is_empty()
        {
            lines.push(Line::raw(""));
            lines.push(Line::from(Span::styled("Links", bold)));
            for link in &surface.links {
                lines.push(Line::from(vec![
                    Span::raw(format!("{} ", link.caption)),
                    Span::styled(link.href.clone(), Style::default().fg(palette.accent)),
                ]));
            }
        }

        Paragraph::new(Text::from(lines))
            .style(palette.base)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Metadata"))
    }

    fn footer_lines(&self, screen: &Screen, palette: &Palette) -> Vec<Line<'static>> {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let key = |label: &'static str, action: &'static str| {
            [Span::styled(label, bold), Span::raw(format!(" {action}  "))]
        };

        let mut spans = Vec::new();
        spans.extend(key("q", "quit"));
        match screen.panel {
            Panel::Listing => {
                spans.extend(key("↑/↓", "move"));
                spans.extend(key("Enter", "open"));
            }
            Panel::Collection => {
                spans.extend(key("↑/↓", "move"));
                spans.extend(key("Enter", "view"));
            }
            Panel::OneSurface => {
                spans.extend(key("n/p", "page"));
                spans.extend(key("+/-", "zoom"));
                spans.extend(key("r", "rotate"));
                spans.extend(key("arrows/drag", "pan"));
                spans.extend(key("0", "reset"));
            }
            Panel::None => {}
        }
        spans.extend(key("c", "collection"));
        spans.extend(key("l", "listing"));
        spans.extend(key("m", "metadata"));
        spans.extend(key("t", "theme"));

        let mut lines = vec![Line::from(spans)];
        let message = self.notice.clone().or_else(|| {
            screen
                .error
                .clone()
                .filter(|_| screen.panel != Panel::None)
        });
        if let Some(message) = message {
            lines.push(Line::from(Span::styled(
                message,
                Style::default().fg(palette.accent).add_modifier(Modifier::BOLD),
            )));
        }
        lines
    }
}

fn step_cursor(cursor: usize, delta: i32, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let next = if delta < 0 {
        cursor.saturating_sub(delta.unsigned_abs() as usize)
    } else {
        cursor.saturating_add(delta as usize)
    };
    next.min(len - 1)
}

fn setup_terminal() -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
    terminal::enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("enter alt screen")?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("create terminal")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    terminal::disable_raw_mode().context("disable raw mode")?;
    crossterm::execute!(terminal.backend_mut(), DisableMouseCapture, LeaveAlternateScreen)
        .context("leave alt screen")?;
    Ok(())
}

fn panic_to_string(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic: (unknown payload)".to_string()
    }
}
