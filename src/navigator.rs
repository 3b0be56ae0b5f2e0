// Incremental-search list navigator.
//
// A single-select list drawn with crossterm. Arrow keys move the cursor,
// typing jumps to the first entry whose label starts with what was typed,
// and callers bind extra keys either to a termination reason or to a
// handler that edits the selected item in place.
//
// Key handling (`handle_key`) is kept separate from the terminal loop
// (`run`) so the state machine can be driven directly in tests.

use crate::error::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::Print;
use crossterm::terminal::{self, ClearType};
use crossterm::{cursor, execute, queue};
use std::io::{self, Write};
use std::time::{Duration, Instant};

const INDICATOR: &str = "* ";
const BLANK: &str = "  ";

/// Why a session ended, other than a plain selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    NextPage,
    PreviousPage,
    Refine,
    Inspect,
    Thumbnail,
    Cancel,
    Add,
    Delete,
    Edit,
}

/// Result of a navigator session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Enter (or a handler) committed the item at this index.
    Selected(usize),
    /// A bound key ended the session. `index` is the cursor position, or
    /// `None` when the list was empty.
    Action { reason: Reason, index: Option<usize> },
    /// Ctrl-C.
    Interrupted,
}

/// What a key handler wants to happen next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Stay,
    Select,
    Finish(Reason),
}

type Handler<'a, T> = Box<dyn FnMut(&mut T) -> Result<Response> + 'a>;

/// Behaviour attached to a key.
pub enum Binding<'a, T> {
    Finish(Reason),
    Handler(Handler<'a, T>),
}

impl<'a, T> Binding<'a, T> {
    pub fn handler<F>(f: F) -> Self
    where
        F: FnMut(&mut T) -> Result<Response> + 'a,
    {
        Binding::Handler(Box::new(f))
    }
}

/// Characters typed in quick succession.
#[derive(Debug)]
struct Typeahead {
    value: String,
    last: Option<Instant>,
    timeout: Duration,
}

impl Typeahead {
    fn push(&mut self, c: char, now: Instant) -> &str {
        let stale = self
            .last
            .map_or(true, |last| now.saturating_duration_since(last) > self.timeout);
        if stale {
            self.value.clear();
        }
        self.value.push(c);
        self.last = Some(now);
        &self.value
    }
}

pub struct Navigator<'a, T> {
    items: Vec<T>,
    label: Box<dyn Fn(&T) -> String + 'a>,
    header: Vec<String>,
    placeholder: String,
    cursor: usize,
    offset: usize,
    viewport: usize,
    typeahead: Typeahead,
    bindings: Vec<(KeyCode, KeyModifiers, Binding<'a, T>)>,
}

impl<'a, T> Navigator<'a, T> {
    pub fn new<F>(items: Vec<T>, label: F) -> Self
    where
        F: Fn(&T) -> String + 'a,
    {
        Navigator {
            items,
            label: Box::new(label),
            header: Vec::new(),
            placeholder: "(empty)".into(),
            cursor: 0,
            offset: 0,
            viewport: 20,
            typeahead: Typeahead {
                value: String::new(),
                last: None,
                timeout: Duration::from_secs(1),
            },
            bindings: Vec::new(),
        }
    }

    /// Text shown above the list; may span several lines.
    pub fn header(mut self, text: &str) -> Self {
        self.header = text.lines().map(str::to_string).collect();
        self
    }

    /// Line shown instead of the list when there are no items.
    pub fn placeholder(mut self, text: &str) -> Self {
        self.placeholder = text.to_string();
        self
    }

    /// Initial cursor position, clamped to the list.
    pub fn cursor(mut self, index: usize) -> Self {
        self.cursor = index.min(self.items.len().saturating_sub(1));
        self.scroll_into_view();
        self
    }

    pub fn typeahead_timeout(mut self, timeout: Duration) -> Self {
        self.typeahead.timeout = timeout;
        self
    }

    pub fn bind(self, code: KeyCode, binding: Binding<'a, T>) -> Self {
        self.bind_with(code, KeyModifiers::NONE, binding)
    }

    pub fn bind_ctrl(self, c: char, binding: Binding<'a, T>) -> Self {
        self.bind_with(KeyCode::Char(c), KeyModifiers::CONTROL, binding)
    }

    pub fn bind_with(
        mut self,
        code: KeyCode,
        modifiers: KeyModifiers,
        binding: Binding<'a, T>,
    ) -> Self {
        self.bindings.push((code, modifiers, binding));
        self
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Cursor index, or `None` for an empty list.
    pub fn position(&self) -> Option<usize> {
        if self.items.is_empty() {
            None
        } else {
            Some(self.cursor)
        }
    }

    pub fn selected(&self) -> Option<&T> {
        self.position().map(|i| &self.items[i])
    }

    pub fn move_down(&mut self) {
        if self.cursor + 1 < self.items.len() {
            self.cursor += 1;
            self.scroll_into_view();
        }
    }

    pub fn move_up(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            self.scroll_into_view();
        }
    }

    fn set_viewport(&mut self, rows: usize) {
        self.viewport = rows.max(1);
        self.scroll_into_view();
    }

    fn scroll_into_view(&mut self) {
        if self.cursor < self.offset {
            self.offset = self.cursor;
        } else if self.cursor >= self.offset + self.viewport {
            self.offset = self.cursor + 1 - self.viewport;
        }
    }

    /// Jump to the first item whose label starts with the typed prefix,
    /// walking one row at a time.
    fn search(&mut self, c: char, now: Instant) {
        let prefix = self.typeahead.push(c, now).to_string();
        let label = &self.label;
        let Some(destination) = self
            .items
            .iter()
            .position(|item| label(item).to_lowercase().starts_with(&prefix))
        else {
            return;
        };
        while self.cursor < destination {
            self.move_down();
        }
        while self.cursor > destination {
            self.move_up();
        }
    }

    /// Apply one key press. Returns the termination when the session ends.
    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> Result<Option<Termination>> {
        if key.kind != KeyEventKind::Press {
            return Ok(None);
        }
        let mut modifiers = key.modifiers;
        modifiers.remove(KeyModifiers::SHIFT);

        if key.code == KeyCode::Char('c') && modifiers == KeyModifiers::CONTROL {
            return Ok(Some(Termination::Interrupted));
        }
        if let Some(slot) = self
            .bindings
            .iter()
            .position(|(code, mods, _)| *code == key.code && *mods == modifiers)
        {
            return self.dispatch(slot);
        }

        match key.code {
            KeyCode::Esc => {
                return Ok(Some(Termination::Action {
                    reason: Reason::Cancel,
                    index: self.position(),
                }))
            }
            KeyCode::Enter => return Ok(self.position().map(Termination::Selected)),
            KeyCode::Up => self.move_up(),
            KeyCode::Down => self.move_down(),
            KeyCode::PageUp => {
                for _ in 0..self.viewport {
                    self.move_up();
                }
            }
            KeyCode::PageDown => {
                for _ in 0..self.viewport {
                    self.move_down();
                }
            }
            KeyCode::Char(c) if modifiers.is_empty() && (c.is_alphabetic() || c == ' ') => {
                for lower in c.to_lowercase() {
                    self.search(lower, now);
                }
            }
            _ => {}
        }
        Ok(None)
    }

    fn dispatch(&mut self, slot: usize) -> Result<Option<Termination>> {
        let index = self.position();
        match &mut self.bindings[slot].2 {
            Binding::Finish(reason) => Ok(Some(Termination::Action {
                reason: *reason,
                index,
            })),
            Binding::Handler(handler) => {
                let Some(i) = index else {
                    return Ok(None);
                };
                Ok(match handler(&mut self.items[i])? {
                    Response::Stay => None,
                    Response::Select => Some(Termination::Selected(i)),
                    Response::Finish(reason) => Some(Termination::Action {
                        reason,
                        index: Some(i),
                    }),
                })
            }
        }
    }

    /// Rows currently in view, with the selection indicator applied.
    pub fn visible_lines(&self) -> Vec<String> {
        if self.items.is_empty() {
            return vec![format!("{BLANK}{}", self.placeholder)];
        }
        let end = (self.offset + self.viewport).min(self.items.len());
        (self.offset..end)
            .map(|i| {
                let marker = if i == self.cursor { INDICATOR } else { BLANK };
                format!("{marker}{}", (self.label)(&self.items[i]))
            })
            .collect()
    }

    fn draw(&mut self, out: &mut impl Write) -> Result<()> {
        let (width, height) = terminal::size()?;
        self.set_viewport((height as usize).saturating_sub(self.header.len() + 1));

        queue!(out, terminal::Clear(ClearType::All), cursor::MoveTo(0, 0))?;
        for line in &self.header {
            queue!(out, Print(clip(line, width)), cursor::MoveToNextLine(1))?;
        }
        queue!(out, cursor::MoveToNextLine(1))?;
        for line in self.visible_lines() {
            queue!(out, Print(clip(&line, width)), cursor::MoveToNextLine(1))?;
        }
        out.flush()?;
        Ok(())
    }

    /// Take over the terminal until a key ends the session. Returns how the
    /// session ended together with the (possibly edited) items.
    pub fn run(mut self) -> Result<(Termination, Vec<T>)> {
        let termination = {
            let _screen = Screen::enter()?;
            let mut stdout = io::stdout();
            loop {
                self.draw(&mut stdout)?;
                if let Event::Key(key) = event::read()? {
                    if let Some(termination) = self.handle_key(key, Instant::now())? {
                        break termination;
                    }
                }
            }
        };
        Ok((termination, self.items))
    }
}

fn clip(line: &str, width: u16) -> String {
    line.chars().take(width as usize).collect()
}

/// Raw mode and the alternate screen, restored on drop.
struct Screen;

impl Screen {
    fn enter() -> Result<Self> {
        terminal::enable_raw_mode()?;
        let screen = Screen;
        execute!(io::stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;
        Ok(screen)
    }
}

impl Drop for Screen {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), cursor::Show, terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn names() -> Vec<String> {
        vec!["Alpha".into(), "Beta".into(), "Charlie".into()]
    }

    fn navigator<'a>() -> Navigator<'a, String> {
        Navigator::new(names(), |s: &String| s.clone())
    }

    fn press(nav: &mut Navigator<'_, String>, code: KeyCode, at: Instant) -> Option<Termination> {
        nav.handle_key(key(code), at).unwrap()
    }

    #[test]
    fn typeahead_jumps_to_prefix_match() {
        let mut nav = navigator();
        let t0 = Instant::now();

        press(&mut nav, KeyCode::Char('b'), t0);
        assert_eq!(nav.selected().map(String::as_str), Some("Beta"));

        press(&mut nav, KeyCode::Char('c'), t0 + Duration::from_millis(1500));
        assert_eq!(nav.selected().map(String::as_str), Some("Charlie"));
    }

    #[test]
    fn typeahead_accumulates_within_timeout() {
        let mut nav = Navigator::new(
            vec!["Cat".to_string(), "Chaos".to_string(), "Charlie".to_string()],
            |s: &String| s.clone(),
        );
        let t0 = Instant::now();
        press(&mut nav, KeyCode::Char('c'), t0);
        assert_eq!(nav.position(), Some(0));
        press(&mut nav, KeyCode::Char('h'), t0 + Duration::from_millis(300));
        assert_eq!(nav.position(), Some(1));
        press(&mut nav, KeyCode::Char('a'), t0 + Duration::from_millis(600));
        press(&mut nav, KeyCode::Char('r'), t0 + Duration::from_millis(900));
        assert_eq!(nav.position(), Some(2));
    }

    #[test]
    fn typeahead_without_match_leaves_cursor() {
        let mut nav = navigator();
        let t0 = Instant::now();
        press(&mut nav, KeyCode::Char('a'), t0);
        press(&mut nav, KeyCode::Char('l'), t0 + Duration::from_millis(200));
        assert_eq!(nav.position(), Some(0));

        press(&mut nav, KeyCode::Down, t0);
        press(&mut nav, KeyCode::Char('x'), t0 + Duration::from_secs(5));
        press(&mut nav, KeyCode::Char('z'), t0 + Duration::from_millis(5200));
        assert_eq!(nav.position(), Some(1));
    }

    #[test]
    fn typeahead_walks_back_up() {
        let mut nav = navigator().cursor(2);
        press(&mut nav, KeyCode::Char('A'), Instant::now());
        assert_eq!(nav.position(), Some(0));
    }

    #[test]
    fn arrows_clamp_without_wrapping() {
        let mut nav = navigator();
        let now = Instant::now();
        press(&mut nav, KeyCode::Up, now);
        assert_eq!(nav.position(), Some(0));
        for _ in 0..5 {
            press(&mut nav, KeyCode::Down, now);
        }
        assert_eq!(nav.position(), Some(2));
    }

    #[test]
    fn enter_selects_and_escape_cancels() {
        let mut nav = navigator().cursor(1);
        let now = Instant::now();
        assert_eq!(press(&mut nav, KeyCode::Enter, now), Some(Termination::Selected(1)));
        assert_eq!(
            press(&mut nav, KeyCode::Esc, now),
            Some(Termination::Action {
                reason: Reason::Cancel,
                index: Some(1)
            })
        );
        assert_eq!(nav.handle_key(ctrl('c'), now).unwrap(), Some(Termination::Interrupted));
    }

    #[test]
    fn bound_keys_take_priority_over_typeahead() {
        let mut nav = navigator()
            .bind(KeyCode::Char('n'), Binding::Finish(Reason::NextPage))
            .bind_ctrl('a', Binding::Finish(Reason::Add));
        let now = Instant::now();
        assert_eq!(
            press(&mut nav, KeyCode::Char('n'), now),
            Some(Termination::Action {
                reason: Reason::NextPage,
                index: Some(0)
            })
        );
        assert_eq!(
            nav.handle_key(ctrl('a'), now).unwrap(),
            Some(Termination::Action {
                reason: Reason::Add,
                index: Some(0)
            })
        );
        assert_eq!(nav.position(), Some(0));
    }

    #[test]
    fn handlers_mutate_the_selected_item() {
        let calls = Cell::new(0);
        let mut nav = navigator()
            .cursor(1)
            .bind(
                KeyCode::Right,
                Binding::handler(|item: &mut String| {
                    calls.set(calls.get() + 1);
                    item.push('!');
                    Ok(Response::Stay)
                }),
            )
            .bind(KeyCode::Tab, Binding::handler(|_: &mut String| Ok(Response::Select)));
        let now = Instant::now();

        assert_eq!(press(&mut nav, KeyCode::Right, now), None);
        assert_eq!(press(&mut nav, KeyCode::Tab, now), Some(Termination::Selected(1)));
        assert_eq!(press(&mut nav, KeyCode::Right, now), None);
        assert_eq!(calls.get(), 2);
        assert_eq!(nav.into_items()[1], "Beta!!");
    }

    #[test]
    fn empty_list_shows_placeholder() {
        let mut nav = Navigator::new(Vec::<String>::new(), |s: &String| s.clone())
            .placeholder("No books yet")
            .bind(KeyCode::Right, Binding::handler(|_: &mut String| Ok(Response::Select)))
            .bind_ctrl('a', Binding::Finish(Reason::Add));
        let now = Instant::now();

        assert_eq!(nav.visible_lines(), vec!["  No books yet".to_string()]);
        assert_eq!(press(&mut nav, KeyCode::Enter, now), None);
        assert_eq!(press(&mut nav, KeyCode::Right, now), None);
        assert_eq!(press(&mut nav, KeyCode::Char('x'), now), None);
        assert_eq!(
            nav.handle_key(ctrl('a'), now).unwrap(),
            Some(Termination::Action {
                reason: Reason::Add,
                index: None
            })
        );
    }

    #[test]
    fn stepping_scrolls_the_viewport() {
        let items: Vec<String> = (0..10).map(|i| format!("item {i}")).collect();
        let mut nav = Navigator::new(items, |s: &String| s.clone());
        nav.set_viewport(3);
        assert_eq!(nav.visible_lines(), vec!["* item 0", "  item 1", "  item 2"]);

        for _ in 0..4 {
            nav.move_down();
        }
        assert_eq!(nav.visible_lines(), vec!["  item 2", "  item 3", "* item 4"]);

        nav.move_up();
        nav.move_up();
        nav.move_up();
        assert_eq!(nav.visible_lines(), vec!["* item 1", "  item 2", "  item 3"]);
    }

    #[test]
    fn preset_cursor_is_clamped_and_visible() {
        let items: Vec<String> = (0..10).map(|i| format!("item {i}")).collect();
        let mut nav = Navigator::new(items, |s: &String| s.clone()).cursor(42);
        assert_eq!(nav.position(), Some(9));
        nav.set_viewport(4);
        assert_eq!(nav.visible_lines().last().map(String::as_str), Some("* item 9"));
    }
}
