// UI layer: the interactive flows. The list screens are `Navigator`
// sessions; one-off questions use `dialoguer` prompts and network calls are
// wrapped in an `indicatif` spinner.

use crate::catalog::{Catalog, CatalogCandidate};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::navigator::{Binding, Navigator, Reason, Response, Termination};
use crate::record::{LibraryRecord, Metadata};
use crate::store::Library;
use crate::vcs::Git;
use crossterm::event::KeyCode;
use dialoguer::{Confirm, Input};
use indicatif::{ProgressBar, ProgressStyle};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

const BROWSE_HELP: &str = "Books

right/left - change status   enter - edit   ctrl-a - add
ctrl-d - delete   ctrl-t - view cover   esc - done";

const SEARCH_HELP: &str = "enter - select   v - view   t - view thumbnail   i - inspect
tab - refine search   left/right (p/n) - change page   esc - back";

const COMMIT_MESSAGE: &str = "Update books";

const NO_MORE_RESULTS: &str = "No more results.";

/// Paging state of one interactive catalog search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSession {
    pub query: String,
    pub page: usize,
    pub cursor: usize,
}

impl SearchSession {
    pub fn new(query: impl Into<String>) -> Self {
        SearchSession {
            query: query.into(),
            page: 0,
            cursor: 0,
        }
    }

    pub fn next_page(&mut self) {
        self.page += 1;
        self.cursor = 0;
    }

    /// Step back one page. Returns `false` on the first page.
    pub fn previous_page(&mut self) -> bool {
        if self.page == 0 {
            return false;
        }
        self.page -= 1;
        self.cursor = 0;
        true
    }

    pub fn refine(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.page = 0;
        self.cursor = 0;
    }

    /// Remember where the result list closed and decide what comes next.
    pub fn follow(&mut self, reason: Reason, index: Option<usize>) -> Followup {
        self.cursor = index.unwrap_or(0);
        match (reason, index) {
            (Reason::Cancel, _) => Followup::Cancel,
            (Reason::NextPage, _) => {
                self.next_page();
                Followup::Fetch
            }
            (Reason::PreviousPage, _) if self.previous_page() => Followup::Fetch,
            (Reason::Refine, _) => Followup::Refine,
            (Reason::Inspect, Some(i)) => Followup::Inspect(i),
            (Reason::Thumbnail, Some(i)) => Followup::Thumbnail(i),
            _ => Followup::Redisplay,
        }
    }
}

/// Next step of the search loop after the result list closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Followup {
    /// Request the session's current page from the catalog.
    Fetch,
    /// Show the same results again.
    Redisplay,
    /// Ask for a new query, starting from the current one.
    Refine,
    Inspect(usize),
    Thumbnail(usize),
    Cancel,
}

/// One page of results and an optional notice for the list header.
#[derive(Debug)]
struct Page {
    books: Vec<CatalogCandidate>,
    notice: Option<&'static str>,
}

/// Knobs for `interactive_search`.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Extra line shown in the list header.
    pub details: Option<String>,
    /// Skip the list when the catalog returns exactly one result.
    pub accept_single_result: bool,
}

/// Entry point of the interactive tool: sync, browse, then offer to publish.
pub fn main_menu(config: &Config, catalog: &dyn Catalog) -> Result<()> {
    let library = Library::open(&config.library);
    let git = Git::new(&config.library);
    let versioned = git.is_repository();
    if versioned {
        git.sync()?;
    }

    browse(config, catalog, &library)?;

    if versioned {
        let publish = Confirm::new()
            .with_prompt("Commit and push changes?")
            .default(true)
            .interact()?;
        if publish {
            git.publish(COMMIT_MESSAGE)?;
        }
    }
    Ok(())
}

/// Add a single book and return.
pub fn add(config: &Config, catalog: &dyn Catalog) -> Result<()> {
    let library = Library::open(&config.library);
    add_book(config, catalog, &library)?;
    Ok(())
}

fn browse(config: &Config, catalog: &dyn Catalog, library: &Library) -> Result<()> {
    let mut cursor = 0;
    let mut focus: Option<PathBuf> = None;
    loop {
        let records = library.scan()?;
        if let Some(path) = focus.take() {
            cursor = records
                .iter()
                .position(|r| r.path() == path)
                .unwrap_or(cursor);
        }

        let navigator = Navigator::new(records, LibraryRecord::label)
            .header(BROWSE_HELP)
            .placeholder("No books yet, press ctrl-a to add one")
            .typeahead_timeout(config.typeahead_timeout)
            .cursor(cursor)
            .bind(
                KeyCode::Right,
                Binding::handler(|r: &mut LibraryRecord| change_status(r, LibraryRecord::advance)),
            )
            .bind(
                KeyCode::Left,
                Binding::handler(|r: &mut LibraryRecord| change_status(r, LibraryRecord::retreat)),
            )
            .bind_ctrl('e', Binding::Finish(Reason::Edit))
            .bind_ctrl('a', Binding::Finish(Reason::Add))
            .bind_ctrl('d', Binding::Finish(Reason::Delete))
            .bind(KeyCode::Delete, Binding::Finish(Reason::Delete))
            .bind_ctrl('t', Binding::Finish(Reason::Thumbnail));

        let (termination, records) = navigator.run()?;
        match termination {
            Termination::Interrupted => interrupt(),
            Termination::Selected(i)
            | Termination::Action {
                reason: Reason::Edit,
                index: Some(i),
            } => {
                cursor = i;
                launch(&config.editor, records[i].path())?;
            }
            Termination::Action {
                reason: Reason::Add,
                index,
            } => {
                cursor = index.unwrap_or(0);
                if let Some(record) = add_book(config, catalog, library)? {
                    focus = Some(record.path().to_path_buf());
                }
            }
            Termination::Action {
                reason: Reason::Delete,
                index: Some(i),
            } => {
                cursor = i;
                confirm_delete(library, &records[i])?;
            }
            Termination::Action {
                reason: Reason::Thumbnail,
                index: Some(i),
            } => {
                cursor = i;
                match records[i].cover_path().filter(|p| p.exists()) {
                    Some(cover) => launch(&config.viewer, &cover)?,
                    None => {
                        println!("'{}' has no cover image.", records[i].title());
                        pause()?;
                    }
                }
            }
            Termination::Action {
                reason: Reason::Cancel,
                ..
            } => return Ok(()),
            Termination::Action { index, .. } => cursor = index.unwrap_or(cursor),
        }
    }
}

/// Apply a status step and persist it straight away.
fn change_status(
    record: &mut LibraryRecord,
    step: fn(&mut LibraryRecord) -> bool,
) -> Result<Response> {
    if step(record) {
        record.save()?;
        debug!(title = record.title(), status = %record.status(), "status changed");
    }
    Ok(Response::Stay)
}

fn confirm_delete(library: &Library, record: &LibraryRecord) -> Result<()> {
    let confirmed = Confirm::new()
        .with_prompt(format!("Delete '{}'?", record.title()))
        .default(false)
        .interact()?;
    if confirmed {
        library.delete(record)?;
        println!("Deleted '{}'.", record.title());
    }
    Ok(())
}

/// Search the catalog, let the user pick an edition and import it.
fn add_book(
    config: &Config,
    catalog: &dyn Catalog,
    library: &Library,
) -> Result<Option<LibraryRecord>> {
    let query = prompt_query("Search", None)?;
    if query.is_empty() {
        return Ok(None);
    }
    let options = SearchOptions::default();
    let Some(candidate) = interactive_search(config, catalog, &query, &options)? else {
        return Ok(None);
    };

    let progress = spinner("Adding book...");
    let record = library.import(&candidate, catalog);
    progress.finish_and_clear();
    let record = record?;
    println!("Added '{}'.", record.title());
    Ok(Some(record))
}

/// Paged interactive catalog search. Returns `None` when the user backs out.
pub fn interactive_search(
    config: &Config,
    catalog: &dyn Catalog,
    query: &str,
    options: &SearchOptions,
) -> Result<Option<CatalogCandidate>> {
    let scratch = tempfile::tempdir()?;
    let mut session = SearchSession::new(query);
    let mut results: Option<Page> = None;

    loop {
        let Page { books, notice } = match results.take() {
            Some(page) => page,
            None => match load_page(catalog, &mut session) {
                Ok(page) => page,
                Err(e) if e.is_not_found() => {
                    println!("No books found for '{}'.", session.query);
                    let query = prompt_query("Search", None)?;
                    if query.is_empty() {
                        return Ok(None);
                    }
                    session.refine(query);
                    continue;
                }
                Err(e) => return Err(e),
            },
        };

        if options.accept_single_result && books.len() == 1 {
            return Ok(books.into_iter().next());
        }

        let mut header = format!(
            "Add Book (page {})\n\nQuery: {}\n",
            session.page + 1,
            session.query
        );
        if let Some(details) = &options.details {
            header.push_str(&format!("Details: {details}\n"));
        }
        if let Some(notice) = notice {
            header.push_str(&format!("{notice}\n"));
        }
        header.push('\n');
        header.push_str(SEARCH_HELP);

        let viewer = config.viewer.as_str();
        let navigator = Navigator::new(books, CatalogCandidate::summary)
            .header(&header)
            .typeahead_timeout(config.typeahead_timeout)
            .cursor(session.cursor)
            .bind(
                KeyCode::Char('v'),
                Binding::handler(move |book: &mut CatalogCandidate| {
                    launch(viewer, &book.canonical_url)?;
                    Ok(Response::Stay)
                }),
            )
            .bind(KeyCode::Char('t'), Binding::Finish(Reason::Thumbnail))
            .bind(KeyCode::Char('i'), Binding::Finish(Reason::Inspect))
            .bind(KeyCode::Char('n'), Binding::Finish(Reason::NextPage))
            .bind(KeyCode::Right, Binding::Finish(Reason::NextPage))
            .bind(KeyCode::Char('p'), Binding::Finish(Reason::PreviousPage))
            .bind(KeyCode::Left, Binding::Finish(Reason::PreviousPage))
            .bind(KeyCode::Tab, Binding::Finish(Reason::Refine));

        let (termination, books) = navigator.run()?;
        let (reason, index) = match termination {
            Termination::Interrupted => interrupt(),
            Termination::Selected(i) => return Ok(books.into_iter().nth(i)),
            Termination::Action { reason, index } => (reason, index),
        };

        let redisplay = match session.follow(reason, index) {
            Followup::Cancel => return Ok(None),
            Followup::Fetch => false,
            Followup::Redisplay => true,
            Followup::Refine => {
                let query = prompt_query("Search", Some(&session.query))?;
                if query.is_empty() {
                    true
                } else {
                    session.refine(query);
                    false
                }
            }
            Followup::Inspect(i) => {
                if let Some(book) = books.get(i) {
                    inspect(config, catalog, book, scratch.path())?;
                }
                true
            }
            Followup::Thumbnail(i) => {
                if let Some(book) = books.get(i) {
                    preview_thumbnail(config, catalog, book, scratch.path())?;
                }
                true
            }
        };
        if redisplay {
            results = Some(Page {
                books,
                notice: None,
            });
        }
    }
}

/// Fetch the session's current page. Running past the last page steps back
/// to the previous one, so NotFound only escapes from the first page.
fn load_page(catalog: &dyn Catalog, session: &mut SearchSession) -> Result<Page> {
    let mut notice = None;
    loop {
        match fetch(catalog, session) {
            Ok(books) => return Ok(Page { books, notice }),
            Err(e) if e.is_not_found() && session.page > 0 => {
                session.previous_page();
                notice = Some(NO_MORE_RESULTS);
            }
            Err(e) => return Err(e),
        }
    }
}

fn fetch(catalog: &dyn Catalog, session: &SearchSession) -> Result<Vec<CatalogCandidate>> {
    let progress = spinner("Searching...");
    let result = catalog.search(&session.query, session.page);
    progress.finish_and_clear();
    result
}

/// Preview the cover, then dump the raw candidate and the metadata an
/// import would write.
fn inspect(
    config: &Config,
    catalog: &dyn Catalog,
    book: &CatalogCandidate,
    scratch: &Path,
) -> Result<()> {
    if book.thumbnail_url.is_some() {
        preview_thumbnail(config, catalog, book, scratch)?;
    }
    println!("{}", serde_json::to_string_pretty(book)?);
    println!("{}", serde_json::to_string_pretty(&Metadata::from_candidate(book))?);
    pause()
}

fn preview_thumbnail(
    config: &Config,
    catalog: &dyn Catalog,
    book: &CatalogCandidate,
    scratch: &Path,
) -> Result<()> {
    let Some(url) = &book.thumbnail_url else {
        println!("No thumbnail available.");
        return pause();
    };
    let path = scratch.join("thumbnail.jpg");
    let progress = spinner("Downloading thumbnail...");
    let downloaded = catalog.download(url, &path);
    progress.finish_and_clear();
    if downloaded? {
        launch(&config.viewer, &path)
    } else {
        println!("Thumbnail could not be downloaded.");
        pause()
    }
}

/// Ask for a free-text query; an empty answer means "give up".
pub fn prompt_query(prompt: &str, initial: Option<&str>) -> Result<String> {
    let mut input = Input::<String>::new();
    input.with_prompt(prompt).allow_empty(true);
    if let Some(initial) = initial {
        input.with_initial_text(initial);
    }
    Ok(input.interact_text()?.trim().to_string())
}

pub fn pause() -> Result<()> {
    Input::<String>::new()
        .with_prompt("Press enter to continue")
        .allow_empty(true)
        .interact_text()?;
    Ok(())
}

fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.tick();
    spinner
}

/// Run `command` (which may carry its own arguments) on `target` and wait.
pub fn launch(command: &str, target: impl AsRef<OsStr>) -> Result<()> {
    let mut parts = command.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| Error::Config("empty command configured".into()))?;
    info!(program, "launching");
    let status = Command::new(program).args(parts).arg(target).status()?;
    if !status.success() {
        return Err(Error::Command {
            program: command.to_string(),
            status: status.to_string(),
        });
    }
    Ok(())
}

/// Ctrl-C inside a list: leave immediately, as SIGINT would.
fn interrupt() -> ! {
    std::process::exit(130)
}
