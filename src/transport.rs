use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Where the router reads and writes the URL.
///
/// A transport reports URL changes made by the user (typing a URL, going
/// back in history) through the callback given to
/// [`init`](UrlTransport::init), and shows the URLs the router resolves
/// through [`update_url`](UrlTransport::update_url). URLs are always given
/// and reported relative to the application, without any base path.
pub trait UrlTransport {
    /// Starts listening to URL changes.
    fn init(&mut self, on_change: Box<dyn Fn(&str)>);

    /// The URL currently shown.
    fn current_url(&self) -> String;

    /// Shows a new URL. `force` is set when the router needs the URL to be
    /// reconciled again even though it may not have changed.
    fn update_url(&mut self, url: &str, force: bool);

    /// Stops listening to URL changes.
    fn kill(&mut self);
}

/// An in-memory [`UrlTransport`] that behaves like a browser history.
///
/// Clones share the same location, so a test or a host application can keep
/// a handle to drive navigation after giving one to a router:
///
/// ```
/// use stateroute::{MemoryTransport, UrlTransport};
///
/// let location = MemoryTransport::with_base_path("/app");
/// let mut transport = location.clone();
///
/// transport.update_url("/project/123", false);
/// assert_eq!(location.url(), "/app/project/123");
/// assert_eq!(transport.current_url(), "/project/123");
/// ```
#[derive(Clone, Default)]
pub struct MemoryTransport {
    location: Rc<RefCell<Location>>,
}

#[derive(Default)]
struct Location {
    base_path: String,
    // full URLs, base path included; empty means "/"
    history: Vec<String>,
    on_change: Option<Rc<dyn Fn(&str)>>,
}

impl Location {
    fn current(&self) -> String {
        match self.history.last() {
            Some(url) => url.clone(),
            None => self.full_url("/"),
        }
    }

    fn full_url(&self, url: &str) -> String {
        if url.starts_with('/') {
            format!("{}{}", self.base_path, url)
        } else {
            format!("{}/{}", self.base_path, url)
        }
    }

    fn relative_url(&self, full: &str) -> String {
        match full.strip_prefix(&self.base_path) {
            Some("") => "/".to_owned(),
            Some(url) => url.to_owned(),
            None => full.to_owned(),
        }
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport serving the application under `base_path`, like
    /// a History API adapter would.
    pub fn with_base_path(base_path: impl Into<String>) -> Self {
        let base_path = base_path.into();
        let transport = Self::default();
        transport.location.borrow_mut().base_path = base_path.trim_end_matches('/').to_owned();
        transport
    }

    /// Sets the URL shown before any router is bound.
    pub fn with_initial_url(self, url: &str) -> Self {
        {
            let mut location = self.location.borrow_mut();
            let full = location.full_url(url);
            location.history = vec![full];
        }
        self
    }

    /// The full URL currently shown, base path included.
    pub fn url(&self) -> String {
        self.location.borrow().current()
    }

    /// Every URL shown so far, base path included.
    pub fn history(&self) -> Vec<String> {
        self.location.borrow().history.clone()
    }

    /// Simulates the user visiting `url`.
    pub fn navigate(&self, url: &str) {
        let full = {
            let mut location = self.location.borrow_mut();
            let full = location.full_url(url);
            location.history.push(full.clone());
            full
        };
        self.notify(&full);
    }

    /// Simulates the user going back in history. Returns `false` if there is
    /// no previous entry.
    pub fn back(&self) -> bool {
        let full = {
            let mut location = self.location.borrow_mut();
            if location.history.len() < 2 {
                return false;
            }
            location.history.pop();
            location.current()
        };
        self.notify(&full);
        true
    }

    fn notify(&self, full: &str) {
        let (url, on_change) = {
            let location = self.location.borrow();
            (location.relative_url(full), location.on_change.clone())
        };

        // called without borrowing the location: the listener may push
        if let Some(on_change) = on_change {
            on_change(&url);
        }
    }
}

impl UrlTransport for MemoryTransport {
    fn init(&mut self, on_change: Box<dyn Fn(&str)>) {
        self.location.borrow_mut().on_change = Some(Rc::from(on_change));
    }

    fn current_url(&self) -> String {
        let location = self.location.borrow();
        location.relative_url(&location.current())
    }

    // Pushes a new history entry when the URL changes. Showing the same URL
    // again does not, whether forced or not.
    fn update_url(&mut self, url: &str, _force: bool) {
        let mut location = self.location.borrow_mut();
        let full = location.full_url(url);
        if location.current() != full {
            location.history.push(full);
        }
    }

    fn kill(&mut self) {
        self.location.borrow_mut().on_change = None;
    }
}

impl fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let location = self.location.borrow();
        f.debug_struct("MemoryTransport")
            .field("base_path", &location.base_path)
            .field("url", &location.current())
            .field("listening", &location.on_change.is_some())
            .finish()
    }
}
